//! Clustering of filter-passing positions into candidate regions.

use crate::common::models::{Region, RegionSet};
use crate::signal::Rle;

/// Cluster the true positions of `mask` into candidate regions.
///
/// Maximal runs of passing positions become preliminary regions; a
/// single left-to-right pass then merges consecutive regions whose
/// separating gap is at most `max_gap` positions (the boundary is
/// inclusive: a gap of exactly `max_gap` merges). Runs arrive sorted by
/// position, so one pass reaches the fixed point.
///
/// Returns `None` when no position passes. Callers must branch on that
/// explicitly; it means "no candidate regions", not a failure.
pub fn find_regions(mask: &Rle<bool>, chrom: &str, max_gap: u32) -> Option<RegionSet> {
    let runs = mask.true_runs();
    if runs.is_empty() {
        return None;
    }

    let mut merged: Vec<(u64, u64)> = Vec::with_capacity(runs.len());
    merged.push(runs[0]);
    for &(start, end) in &runs[1..] {
        let last = merged
            .last_mut()
            .expect("merged starts non-empty");
        // Half-open spans: the gap between [a,b) and [c,d) is c - b.
        if start - last.1 <= u64::from(max_gap) {
            last.1 = end;
        } else {
            merged.push((start, end));
        }
    }

    let regions = merged
        .into_iter()
        .map(|(start, end)| Region {
            chr: chrom.to_string(),
            start: start as u32,
            end: end as u32,
        })
        .collect();

    Some(RegionSet::new(regions, mask.len() as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mask_from_spans(len: u32, spans: &[(u32, u32)]) -> Rle<bool> {
        let mut mask = Rle::new();
        let mut pos = 0;
        for &(start, end) in spans {
            mask.push_run(false, start - pos);
            mask.push_run(true, end - start);
            pos = end;
        }
        mask.push_run(false, len - pos);
        mask
    }

    #[test]
    fn all_false_mask_yields_no_regions() {
        let mask = Rle::from_dense(&[false, false, false]);
        assert!(find_regions(&mask, "chr1", 10).is_none());
    }

    #[test]
    fn gap_boundary_is_inclusive() {
        // Passing spans covering bases 1-10 and 13-20 (1-based): two
        // intervening positions.
        let mask = mask_from_spans(30, &[(0, 10), (12, 20)]);

        let merged = find_regions(&mask, "chr1", 2).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.regions[0].start, 0);
        assert_eq!(merged.regions[0].end, 20);

        let separate = find_regions(&mask, "chr1", 1).unwrap();
        assert_eq!(separate.len(), 2);
        assert_eq!(
            (separate.regions[0].start, separate.regions[0].end),
            (0, 10)
        );
        assert_eq!(
            (separate.regions[1].start, separate.regions[1].end),
            (12, 20)
        );
    }

    #[test]
    fn chained_gaps_merge_in_one_pass() {
        let mask = mask_from_spans(30, &[(0, 4), (6, 10), (12, 16)]);
        let set = find_regions(&mask, "chr1", 2).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!((set.regions[0].start, set.regions[0].end), (0, 16));
    }

    #[test]
    fn clustering_is_idempotent() {
        let mask = mask_from_spans(50, &[(0, 5), (8, 12), (30, 40)]);
        let first = find_regions(&mask, "chr1", 3).unwrap();

        // Re-encode the clustered regions as a full-coverage mask and
        // cluster again with the same gap.
        let spans: Vec<(u32, u32)> = first
            .regions
            .iter()
            .map(|r| (r.start, r.end))
            .collect();
        let remask = mask_from_spans(50, &spans);
        let second = find_regions(&remask, "chr1", 3).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn sequence_length_travels_with_the_set() {
        let mask = mask_from_spans(42, &[(1, 2)]);
        let set = find_regions(&mask, "chr1", 0).unwrap();
        assert_eq!(set.seq_length, 42);
    }
}
