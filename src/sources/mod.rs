//! Coverage source adapters.
//!
//! A source produces a run-length coverage signal for one sample over
//! one chromosome (or a sub-range of it). Implementations differ only in
//! how the signal is computed: queried from a precomputed per-base
//! signal file ([`BigWigSource`], [`BedGraphSource`]), accumulated from
//! alignments ([`BamSource`]), or handed over pre-built
//! ([`MemorySource`]). Callers never branch on the kind past
//! construction.

pub mod bam;
pub mod bedgraph;
pub mod bigwig;
pub mod memory;
pub mod retry;

pub use bam::BamSource;
pub use bedgraph::BedGraphSource;
pub use bigwig::BigWigSource;
pub use memory::MemorySource;
pub use retry::RetryPolicy;

use crate::errors::{CovmatError, Result};
use crate::signal::Rle;

/// One capability: produce a coverage signal for (chromosome, range).
///
/// The returned signal spans exactly the queried domain, with positions
/// the source stores nothing for filled as zero coverage. Sources do not
/// mutate their inputs and may be re-opened on every call.
pub trait CoverageSource: Send + Sync {
    /// Display name for messages and default sample naming.
    fn label(&self) -> &str;

    /// Sequence length of `chrom` from the source's own metadata.
    /// Unknown chromosomes are a configuration error listing the valid
    /// names.
    fn chrom_length(&self, chrom: &str) -> Result<u32>;

    /// Coverage over `range` (0-based half-open), or the whole
    /// chromosome when `range` is `None`.
    fn coverage(&self, chrom: &str, range: Option<(u32, u32)>) -> Result<Rle<f64>>;
}

/// Clamp a requested range against the sequence length, defaulting to
/// the full chromosome.
pub(crate) fn resolve_range(
    range: Option<(u32, u32)>,
    length: u32,
    chrom: &str,
) -> Result<(u32, u32)> {
    match range {
        None => Ok((0, length)),
        Some((start, end)) => {
            if start >= end {
                return Err(CovmatError::Config(format!(
                    "empty range {}-{} on {}",
                    start, end, chrom
                )));
            }
            Ok((start.min(length), end.min(length)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_defaults_to_full_chromosome() {
        assert_eq!(resolve_range(None, 100, "chr1").unwrap(), (0, 100));
    }

    #[test]
    fn range_is_clamped_to_sequence_length() {
        assert_eq!(resolve_range(Some((50, 500)), 100, "chr1").unwrap(), (50, 100));
    }

    #[test]
    fn inverted_range_is_a_config_error() {
        assert!(resolve_range(Some((10, 10)), 100, "chr1").is_err());
    }
}
