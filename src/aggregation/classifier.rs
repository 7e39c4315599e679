use crate::record::TripRecord;

/// Decides whether a record belongs to the tracked category.
///
/// Implementations must be pure; the pipeline may call them from several
/// threads when aggregating shards.
pub trait RecordClassifier: Sync {
    fn is_member(&self, record: &TripRecord) -> bool;
}

impl<F> RecordClassifier for F
where
    F: Fn(&TripRecord) -> bool + Sync,
{
    fn is_member(&self, record: &TripRecord) -> bool {
        self(record)
    }
}

/// Case-sensitive identifier prefix match, e.g. `delivery` for delivery vans.
#[derive(Debug, Clone)]
pub struct PrefixClassifier {
    prefix: String,
}

impl PrefixClassifier {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl RecordClassifier for PrefixClassifier {
    fn is_member(&self, record: &TripRecord) -> bool {
        record.id.starts_with(&self.prefix)
    }
}
