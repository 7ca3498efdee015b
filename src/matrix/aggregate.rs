//! Per-region aggregation of one sample's signal, with the
//! normalization knobs applied in a fixed order: library-size scaling
//! divides the signal, the read-length divisor turns summed base
//! coverage into read-count units, and RPKM additionally normalizes by
//! region width and sequencing depth.

use crate::common::models::RegionSet;
use crate::signal::Rle;

/// The read-length divisor `L`: one value shared by all samples, or one
/// per sample in input order.
#[derive(Debug, Clone)]
pub enum ReadLength {
    Uniform(f64),
    PerSample(Vec<f64>),
}

impl Default for ReadLength {
    fn default() -> Self {
        ReadLength::Uniform(1.0)
    }
}

/// Expand the read-length input into one divisor per sample.
///
/// A per-sample vector must have one entry or one entry per sample;
/// anything else degrades to a warning and a no-op divisor of 1 so a
/// sloppy caller gets raw sums instead of an aborted batch.
pub fn resolve_read_lengths(read_length: &ReadLength, n_samples: usize) -> Vec<f64> {
    match read_length {
        ReadLength::Uniform(l) => vec![*l; n_samples],
        ReadLength::PerSample(v) if v.len() == 1 => vec![v[0]; n_samples],
        ReadLength::PerSample(v) if v.len() == n_samples => v.clone(),
        ReadLength::PerSample(v) => {
            log::warn!(
                "read-length vector has {} entries for {} samples; ignoring it (divisor 1)",
                v.len(),
                n_samples
            );
            vec![1.0; n_samples]
        }
    }
}

/// Library-size scale divisor for one sample.
pub fn library_scale(total_mapped: f64, target_size: f64) -> f64 {
    total_mapped / target_size
}

/// Resolved normalization for one sample.
#[derive(Debug, Clone)]
pub struct SampleNorm {
    /// Divisor applied to the signal before aggregation; 1.0 disables
    /// library-size scaling.
    pub scale_factor: f64,
    /// The read-length divisor `L`.
    pub read_length: f64,
    /// Total mapped signal in millions; present only in RPKM mode.
    pub depth_millions: Option<f64>,
}

impl SampleNorm {
    pub fn raw() -> Self {
        SampleNorm {
            scale_factor: 1.0,
            read_length: 1.0,
            depth_millions: None,
        }
    }
}

/// One aggregate value per region for a single sample.
///
/// `signal` covers `[offset, offset + signal.len())` of the chromosome;
/// every region must fall inside that window. An empty region set
/// yields an empty vector, not an error.
pub fn region_values(
    regions: &RegionSet,
    signal: &Rle<f64>,
    offset: u32,
    norm: &SampleNorm,
) -> Vec<f64> {
    let prefix = signal.prefix();
    regions
        .into_iter()
        .map(|region| {
            let sum = prefix.sum(
                u64::from(region.start - offset),
                u64::from(region.end - offset),
            );
            let mut value = sum / norm.scale_factor / norm.read_length;
            if let Some(millions) = norm.depth_millions {
                let width_kb = f64::from(region.width()) / 1_000.0;
                value /= width_kb * millions;
            }
            value
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::models::Region;
    use pretty_assertions::assert_eq;

    fn regions(spans: &[(u32, u32)]) -> RegionSet {
        RegionSet::new(
            spans
                .iter()
                .map(|&(start, end)| Region {
                    chr: "chr1".to_string(),
                    start,
                    end,
                })
                .collect(),
            100,
        )
    }

    #[test]
    fn raw_norm_reproduces_summed_coverage() {
        let signal = Rle::from_dense(&[0.0, 2.0, 2.0, 2.0, 0.0, 3.0]);
        let set = regions(&[(1, 4), (5, 6)]);
        let values = region_values(&set, &signal, 0, &SampleNorm::raw());
        assert_eq!(values, vec![6.0, 3.0]);
    }

    #[test]
    fn constant_region_sums_to_value_times_width() {
        // Constant coverage v over a region of width w divides to v*w
        // under L = 1.
        let mut signal = Rle::new();
        signal.push_run(4.0, 25);
        let set = regions(&[(5, 15)]);
        let values = region_values(&set, &signal, 0, &SampleNorm::raw());
        assert_eq!(values, vec![4.0 * 10.0]);
    }

    #[test]
    fn scale_and_read_length_divide_the_sum() {
        let signal = Rle::from_dense(&[8.0, 8.0]);
        let set = regions(&[(0, 2)]);
        let norm = SampleNorm {
            scale_factor: library_scale(80_000_000.0, 40_000_000.0),
            read_length: 4.0,
            depth_millions: None,
        };
        // 16 / 2 / 4
        assert_eq!(region_values(&set, &signal, 0, &norm), vec![2.0]);
    }

    #[test]
    fn rpkm_divides_by_width_and_depth() {
        let mut signal = Rle::new();
        signal.push_run(100.0, 2_000);
        let set = regions(&[(0, 2_000)]);
        let norm = SampleNorm {
            scale_factor: 1.0,
            read_length: 100.0,
            depth_millions: Some(10.0),
        };
        // reads = 100*2000/100 = 2000; / 2 kb / 10 M
        assert_eq!(region_values(&set, &signal, 0, &norm), vec![100.0]);
    }

    #[test]
    fn offset_signals_aggregate_relative_to_their_window() {
        let signal = Rle::from_dense(&[1.0, 1.0, 1.0]);
        let set = regions(&[(10, 12)]);
        let values = region_values(&set, &signal, 10, &SampleNorm::raw());
        assert_eq!(values, vec![2.0]);
    }

    #[test]
    fn empty_region_set_yields_empty_values() {
        let signal = Rle::from_dense(&[1.0]);
        let set = regions(&[]);
        assert!(region_values(&set, &signal, 0, &SampleNorm::raw()).is_empty());
    }

    #[test]
    fn read_length_vector_shapes() {
        let uniform = resolve_read_lengths(&ReadLength::Uniform(36.0), 3);
        assert_eq!(uniform, vec![36.0, 36.0, 36.0]);

        let splat = resolve_read_lengths(&ReadLength::PerSample(vec![50.0]), 3);
        assert_eq!(splat, vec![50.0, 50.0, 50.0]);

        let exact = resolve_read_lengths(&ReadLength::PerSample(vec![1.0, 2.0, 3.0]), 3);
        assert_eq!(exact, vec![1.0, 2.0, 3.0]);

        // Mismatched shape degrades to the no-op divisor.
        let fallback = resolve_read_lengths(&ReadLength::PerSample(vec![1.0, 2.0]), 3);
        assert_eq!(fallback, vec![1.0, 1.0, 1.0]);
    }
}
