use serde::Serialize;

use crate::error::ConfigError;

/// One bin of a [`Histogram`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BinSnapshot {
    pub lower_bound: f64,
    pub count: u64,
}

/// Fixed-range, fixed-bin-count frequency counter over `[0, max)`.
///
/// Values whose bin index falls outside `[1, bins - 1]` are dropped without
/// error. That includes bin 0: anything below one bin width is never counted,
/// so the lowest bucket always reads zero. This looks like an off-by-one in
/// the binning this reproduces, and is kept so the distributions stay
/// comparable with earlier reports.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    counts: Vec<u64>,
    max: f64,
    width: f64,
    offered: u64,
}

impl Histogram {
    pub fn new(bins: usize, max: f64) -> Result<Self, ConfigError> {
        if bins == 0 {
            return Err(ConfigError::ZeroBins { bins });
        }
        if !max.is_finite() || max <= 0.0 {
            return Err(ConfigError::InvalidMax { max });
        }

        Ok(Self {
            counts: vec![0; bins],
            max,
            width: max / bins as f64,
            offered: 0,
        })
    }

    /// Records `value`, returning whether it landed in a bin.
    pub fn add(&mut self, value: f64) -> bool {
        self.offered += 1;

        // NaN fails both comparisons, infinities fail one of them
        let index = (value / self.width).floor();
        if !(index >= 1.0 && index < self.counts.len() as f64) {
            return false;
        }

        self.counts[index as usize] += 1;
        true
    }

    /// Largest bin count, used to scale a chart's y axis.
    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// `(lower_bound, count)` per bin in ascending order.
    pub fn snapshot(&self) -> Vec<BinSnapshot> {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &count)| BinSnapshot {
                lower_bound: i as f64 * self.width,
                count,
            })
            .collect()
    }

    /// Adds `other` bin-wise. Both histograms must share bin count and domain.
    pub fn merge(&mut self, other: &Histogram) -> Result<(), ConfigError> {
        if self.counts.len() != other.counts.len() || self.max != other.max {
            return Err(ConfigError::ShapeMismatch {
                bins: self.counts.len(),
                max: self.max,
                other_bins: other.counts.len(),
                other_max: other.max,
            });
        }

        for (mine, theirs) in self.counts.iter_mut().zip(&other.counts) {
            *mine += theirs;
        }
        self.offered += other.offered;
        Ok(())
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Number of values that landed in a bin.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Number of values passed to [`Histogram::add`].
    pub fn offered(&self) -> u64 {
        self.offered
    }

    pub fn dropped(&self) -> u64 {
        self.offered - self.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_zero_bins() {
        assert!(matches!(
            Histogram::new(0, 10.0),
            Err(ConfigError::ZeroBins { .. })
        ));
    }

    #[test]
    fn test_new_rejects_non_positive_max() {
        assert!(matches!(
            Histogram::new(10, 0.0),
            Err(ConfigError::InvalidMax { .. })
        ));
        assert!(matches!(
            Histogram::new(10, -5.0),
            Err(ConfigError::InvalidMax { .. })
        ));
        assert!(Histogram::new(10, f64::NAN).is_err());
    }

    #[test]
    fn test_add_reference_example() {
        let mut h = Histogram::new(10, 10.0).unwrap();
        for v in [0.5, 1.2, 1.9, 9.9, 10.0, -1.0] {
            h.add(v);
        }

        let mut expected = vec![0u64; 10];
        expected[1] = 2;
        expected[9] = 1;
        assert_eq!(h.counts(), expected.as_slice());
        assert_eq!(h.max_count(), 2);
        assert_eq!(h.offered(), 6);
        assert_eq!(h.dropped(), 3);
    }

    #[test]
    fn test_add_in_range_increments_exactly_one_bin() {
        let mut h = Histogram::new(400, 2000.0).unwrap();
        for value in [5.0, 17.3, 999.0, 1994.9] {
            let before = h.counts().to_vec();
            assert!(h.add(value));
            let changed: Vec<_> = before
                .iter()
                .zip(h.counts())
                .filter(|(b, a)| b != a)
                .map(|(b, a)| a - b)
                .collect();
            assert_eq!(changed, vec![1]);
        }
    }

    #[test]
    fn test_add_drops_first_bin_and_overflow() {
        let mut h = Histogram::new(25, 500.0).unwrap();
        for value in [0.0, 19.99, 500.0, 1e9, -0.1, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(!h.add(value), "{value} should be dropped");
        }
        assert_eq!(h.total(), 0);
        assert_eq!(h.max_count(), 0);
        assert_eq!(h.dropped(), 8);
    }

    #[test]
    fn test_total_equals_offered_minus_dropped() {
        let mut h = Histogram::new(10, 10.0).unwrap();
        let values: Vec<f64> = (0..200).map(|i| i as f64 * 0.07 - 1.0).collect();
        let counted = values.iter().filter(|&&v| h.add(v)).count() as u64;
        assert_eq!(h.total(), counted);
        assert_eq!(h.total() + h.dropped(), values.len() as u64);
    }

    #[test]
    fn test_snapshot_bounds() {
        let mut h = Histogram::new(4, 2.0).unwrap();
        h.add(1.2);
        let snap = h.snapshot();
        assert_eq!(snap.len(), 4);
        assert_eq!(snap[0].lower_bound, 0.0);
        assert_eq!(snap[2], BinSnapshot { lower_bound: 1.0, count: 1 });
        assert_eq!(snap[3].lower_bound, 1.5);
    }

    #[test]
    fn test_merge_adds_bin_wise() {
        let mut a = Histogram::new(10, 10.0).unwrap();
        let mut b = Histogram::new(10, 10.0).unwrap();
        a.add(3.5);
        b.add(3.1);
        b.add(0.2);
        a.merge(&b).unwrap();
        assert_eq!(a.counts()[3], 2);
        assert_eq!(a.offered(), 3);
        assert_eq!(a.dropped(), 1);
    }

    #[test]
    fn test_merge_rejects_other_shape() {
        let mut a = Histogram::new(10, 10.0).unwrap();
        let b = Histogram::new(10, 20.0).unwrap();
        assert!(matches!(
            a.merge(&b),
            Err(ConfigError::ShapeMismatch { .. })
        ));
    }
}
