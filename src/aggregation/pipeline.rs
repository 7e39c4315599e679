use rayon::prelude::*;
use tracing::{debug, warn};

use crate::aggregation::classifier::RecordClassifier;
use crate::aggregation::histogram::Histogram;
use crate::aggregation::types::{CategoryAggregate, CategoryTrip};
use crate::config::{HistogramSpec, PipelineConfig};
use crate::error::{AggregationError, ConfigError, Result};
use crate::record::TripRecord;

/// A histogram together with the [`HistogramSpec`] it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedHistogram {
    pub spec: HistogramSpec,
    pub histogram: Histogram,
}

impl NamedHistogram {
    fn build(spec: &HistogramSpec) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            spec: spec.clone(),
            histogram: Histogram::new(spec.bins, spec.max)?,
        })
    }

    /// Feeds the configured field of `record`, in the configured unit.
    fn add(&mut self, record: &TripRecord) {
        let value = self.spec.unit.convert(record.value(self.spec.field));
        self.histogram.add(value);
    }
}

/// Everything one pass produced. Owned by the caller once the pass is done.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub category_name: String,
    pub all_histograms: Vec<NamedHistogram>,
    pub category_histograms: Vec<NamedHistogram>,
    pub all: CategoryAggregate,
    pub category: CategoryAggregate,
    /// Category members in source order.
    pub members: Vec<CategoryTrip>,
}

impl PipelineResult {
    pub fn non_category_count(&self) -> usize {
        self.all.count - self.category.count
    }

    pub fn all_histogram(&self, name: &str) -> Option<&Histogram> {
        find(&self.all_histograms, name)
    }

    pub fn category_histogram(&self, name: &str) -> Option<&Histogram> {
        find(&self.category_histograms, name)
    }

    /// Folds the result of a later shard into this one. Histograms add
    /// bin-wise, aggregates field-wise, members are appended.
    pub fn merge(&mut self, other: PipelineResult) -> std::result::Result<(), ConfigError> {
        if self.category_name != other.category_name {
            return Err(ConfigError::LayoutMismatch {
                reason: format!(
                    "category {:?} vs {:?}",
                    self.category_name, other.category_name
                ),
            });
        }
        merge_histograms(&mut self.all_histograms, &other.all_histograms)?;
        merge_histograms(&mut self.category_histograms, &other.category_histograms)?;

        self.all.merge(&other.all);
        self.category.merge(&other.category);
        self.members.extend(other.members);
        Ok(())
    }
}

fn find<'a>(histograms: &'a [NamedHistogram], name: &str) -> Option<&'a Histogram> {
    histograms
        .iter()
        .find(|h| h.spec.name == name)
        .map(|h| &h.histogram)
}

fn merge_histograms(
    mine: &mut [NamedHistogram],
    theirs: &[NamedHistogram],
) -> std::result::Result<(), ConfigError> {
    if mine.len() != theirs.len() {
        return Err(ConfigError::LayoutMismatch {
            reason: format!("{} histograms vs {}", mine.len(), theirs.len()),
        });
    }
    for (a, b) in mine.iter_mut().zip(theirs) {
        if a.spec != b.spec {
            return Err(ConfigError::LayoutMismatch {
                reason: format!("histogram {:?} vs {:?}", a.spec.name, b.spec.name),
            });
        }
        a.histogram.merge(&b.histogram)?;
    }
    Ok(())
}

/// Accumulator state of one pass.
pub struct Pipeline {
    category_name: String,
    all_histograms: Vec<NamedHistogram>,
    category_histograms: Vec<NamedHistogram>,
    all: CategoryAggregate,
    category: CategoryAggregate,
    members: Vec<CategoryTrip>,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            category_name: config.category.name.clone(),
            all_histograms: config
                .all_histograms
                .iter()
                .map(NamedHistogram::build)
                .collect::<std::result::Result<_, _>>()?,
            category_histograms: config
                .category_histograms
                .iter()
                .map(NamedHistogram::build)
                .collect::<std::result::Result<_, _>>()?,
            all: CategoryAggregate::default(),
            category: CategoryAggregate::default(),
            members: Vec::new(),
        })
    }

    /// Feeds one record. `index` is its position in the source, used for
    /// error reporting only.
    pub fn push<C>(&mut self, index: usize, record: &TripRecord, classifier: &C) -> Result<()>
    where
        C: RecordClassifier + ?Sized,
    {
        record
            .validate()
            .map_err(|reason| AggregationError::MalformedRecord {
                index,
                id: record.id.clone(),
                reason,
            })?;

        for h in &mut self.all_histograms {
            h.add(record);
        }

        let trip = CategoryTrip::from_record(record);
        self.all.add(&trip);

        if classifier.is_member(record) {
            for h in &mut self.category_histograms {
                h.add(record);
            }
            self.category.add(&trip);
            self.members.push(trip);
        }

        Ok(())
    }

    pub fn finish(self) -> PipelineResult {
        for h in self.all_histograms.iter().chain(&self.category_histograms) {
            let offered = h.histogram.offered();
            let dropped = h.histogram.dropped();
            if offered > 0 && dropped * 2 > offered {
                warn!(
                    histogram = %h.spec.name,
                    dropped,
                    offered,
                    "Most values fell outside the histogram bins"
                );
            }
        }

        debug!(
            records = self.all.count,
            category = %self.category_name,
            members = self.category.count,
            "Pass finished"
        );

        PipelineResult {
            category_name: self.category_name,
            all_histograms: self.all_histograms,
            category_histograms: self.category_histograms,
            all: self.all,
            category: self.category,
            members: self.members,
        }
    }
}

/// Aggregates `records` in a single pass, in source order.
///
/// # Errors
///
/// Fails on an invalid configuration, or on the first record that breaks the
/// [`TripRecord::validate`] invariants.
#[tracing::instrument(skip_all, fields(records = records.len(), category = %config.category.name))]
pub fn run<C>(records: &[TripRecord], config: &PipelineConfig, classifier: &C) -> Result<PipelineResult>
where
    C: RecordClassifier + ?Sized,
{
    let mut pipeline = Pipeline::new(config)?;
    for (index, record) in records.iter().enumerate() {
        pipeline.push(index, record, classifier)?;
    }
    Ok(pipeline.finish())
}

/// Same result as [`run`], computed over `shards` contiguous shards in
/// parallel and merged in shard order.
///
/// When several shards hold malformed records, which one is reported is not
/// deterministic.
#[tracing::instrument(skip_all, fields(records = records.len(), shards = shards))]
pub fn run_sharded<C>(
    records: &[TripRecord],
    config: &PipelineConfig,
    classifier: &C,
    shards: usize,
) -> Result<PipelineResult>
where
    C: RecordClassifier + ?Sized,
{
    let shard_len = records.len().div_ceil(shards.max(1)).max(1);

    let partials = records
        .par_chunks(shard_len)
        .enumerate()
        .map(|(shard, chunk)| -> Result<PipelineResult> {
            let mut pipeline = Pipeline::new(config)?;
            for (offset, record) in chunk.iter().enumerate() {
                pipeline.push(shard * shard_len + offset, record, classifier)?;
            }
            Ok(pipeline.finish())
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(partials = partials.len(), shard_len, "Merging shards");

    let mut merged = Pipeline::new(config)?.finish();
    for partial in partials {
        merged.merge(partial)?;
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::classifier::PrefixClassifier;
    use crate::aggregation::types::Unit;
    use crate::record::{Field, trip};

    fn sample_records() -> Vec<TripRecord> {
        (0..60)
            .map(|i| {
                let id = if i % 3 == 0 {
                    format!("delivery_{i}")
                } else {
                    format!("car_{i}")
                };
                let mut r = trip(&id, 30.0 * i as f64, 250.0 * i as f64);
                r.waiting_time = (i % 7) as f64 * 12.5;
                r.stop_time = if i % 3 == 0 { 600.0 + i as f64 * 60.0 } else { 0.0 };
                r.reroute_no = (i % 5) as u32;
                r
            })
            .collect()
    }

    #[test]
    fn test_run_partitions_records() {
        let records = sample_records();
        let classifier = PrefixClassifier::new("delivery");
        let result = run(&records, &PipelineConfig::default(), &classifier).unwrap();

        let members = records.iter().filter(|r| classifier.is_member(r)).count();
        assert_eq!(result.all.count, records.len());
        assert_eq!(result.category.count, members);
        assert_eq!(result.non_category_count(), records.len() - members);
        assert_eq!(result.all.count, result.category.count + result.non_category_count());
        assert_eq!(result.members.len(), members);
        assert_eq!(result.members[0].vehicle_id, "delivery_0");
    }

    #[test]
    fn test_all_scope_bins_raw_values() {
        let records = vec![trip("car_0", 7.0, 1.0), trip("car_1", 1999.0, 1.0)];
        let result = run(&records, &PipelineConfig::default(), &PrefixClassifier::new("delivery")).unwrap();

        let duration = result.all_histogram("duration").unwrap();
        // width 5s: 7s lands in bin 1, 1999s in bin 399
        assert_eq!(duration.counts()[1], 1);
        assert_eq!(duration.counts()[399], 1);
        assert_eq!(result.category.count, 0);
        assert_eq!(result.category_histogram("duration").unwrap().offered(), 0);
    }

    #[test]
    fn test_category_scope_converts_units() {
        let mut r = trip("delivery_7", 3600.0, 12_000.0);
        r.stop_time = 45.0 * 60.0;
        let result = run(&[r], &PipelineConfig::default(), &PrefixClassifier::new("delivery")).unwrap();

        // stop time histogram is in minutes, width 20min: 45min -> bin 2
        let stop = result.category_histogram("stop_time").unwrap();
        assert_eq!(stop.counts()[2], 1);
        assert_eq!(result.category.duration, 60.0);
        assert_eq!(result.category.route_length, 12.0);
        assert_eq!(result.category.stop_time, 45.0);
    }

    #[test]
    fn test_custom_classifier() {
        let records = sample_records();
        let rerouted = |r: &TripRecord| r.reroute_no > 0;
        let result = run(&records, &PipelineConfig::default(), &rerouted).unwrap();
        assert_eq!(result.category.count, records.iter().filter(|r| r.reroute_no > 0).count());
    }

    #[test]
    fn test_run_fails_fast_on_malformed_record() {
        let mut records = sample_records();
        records[4].waiting_time = -3.0;
        records[9].duration = f64::NAN;

        let err = run(&records, &PipelineConfig::default(), &PrefixClassifier::new("delivery")).unwrap_err();
        match err {
            AggregationError::MalformedRecord { index, id, .. } => {
                assert_eq!(index, 4);
                assert_eq!(id, "car_4");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_run_rejects_bad_histogram_config() {
        let mut config = PipelineConfig::default();
        config.category_histograms.push(HistogramSpec::new("broken", "", "", Field::Duration, 0, 10.0));
        let err = run(&[], &config, &PrefixClassifier::new("delivery")).unwrap_err();
        assert!(matches!(err, AggregationError::Config(ConfigError::ZeroBins { .. })));
    }

    #[test]
    fn test_sharded_matches_single_pass() {
        let records = sample_records();
        let config = PipelineConfig::default();
        let classifier = PrefixClassifier::new("delivery");
        let single = run(&records, &config, &classifier).unwrap();

        for shards in [1, 2, 3, 7, 60, 200] {
            let sharded = run_sharded(&records, &config, &classifier, shards).unwrap();
            assert_eq!(sharded.all_histograms, single.all_histograms, "shards={shards}");
            assert_eq!(sharded.category_histograms, single.category_histograms);
            assert_eq!(sharded.all.count, single.all.count);
            assert_eq!(sharded.category.count, single.category.count);
            assert_eq!(sharded.members, single.members);
            assert!((sharded.all.duration - single.all.duration).abs() < 1e-9);
            assert!((sharded.category.route_length - single.category.route_length).abs() < 1e-9);
        }
    }

    #[test]
    fn test_run_rejects_converted_all_scope_histogram() {
        let mut config = PipelineConfig::default();
        config.all_histograms = vec![
            HistogramSpec::new("duration", "", "", Field::Duration, 10, 10.0).in_unit(Unit::Minutes),
        ];
        let err = run(&[trip("car_0", 300.0, 1.0)], &config, &PrefixClassifier::new("delivery")).unwrap_err();
        assert!(matches!(
            err,
            AggregationError::Config(ConfigError::ConvertedAllScope { .. })
        ));
    }

    #[test]
    fn test_sharded_reports_global_index_of_malformed_record() {
        let mut records = sample_records();
        records[47].route_length = -1.0;

        let err = run_sharded(&records, &PipelineConfig::default(), &PrefixClassifier::new("delivery"), 3)
            .unwrap_err();
        match err {
            AggregationError::MalformedRecord { index, id, reason } => {
                assert_eq!(index, 47);
                assert_eq!(id, "car_47");
                assert!(reason.contains("routeLength"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sharded_empty_input() {
        let result = run_sharded(&[], &PipelineConfig::default(), &PrefixClassifier::new("delivery"), 4).unwrap();
        assert_eq!(result.all.count, 0);
        assert!(result.members.is_empty());
    }

    #[test]
    fn test_merge_rejects_different_layout() {
        let classifier = PrefixClassifier::new("delivery");
        let mut a = run(&[], &PipelineConfig::default(), &classifier).unwrap();
        let mut other_config = PipelineConfig::default();
        other_config.all_histograms.pop();
        let b = run(&[], &other_config, &classifier).unwrap();
        assert!(matches!(a.merge(b), Err(ConfigError::LayoutMismatch { .. })));
    }
}
