//! Ordered fan-out of independent work items.

use rayon::prelude::*;

use crate::errors::{CovmatError, Result};

/// Apply `f` to every item with at most `workers` threads, returning
/// results in input order regardless of completion order.
///
/// A worker count of one (or a single item) runs the plain sequential
/// loop in the calling thread; no pool is built. Pools are scoped to
/// the call, never shared globals, so the chromosome level and the
/// sample level can each size their own fan-out. The first error aborts
/// the batch; results from sibling items are discarded.
pub fn map_ordered<I, O, F>(items: &[I], workers: usize, f: F) -> Result<Vec<O>>
where
    I: Sync,
    O: Send,
    F: Fn(&I) -> Result<O> + Send + Sync,
{
    if workers <= 1 || items.len() <= 1 {
        return items.iter().map(f).collect();
    }

    // More workers than items is wasteful but not an error.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.min(items.len()))
        .build()
        .map_err(|e| CovmatError::Config(format!("failed to build worker pool: {}", e)))?;

    pool.install(|| items.par_iter().map(&f).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn output_order_matches_input_order_for_any_worker_count() {
        let items: Vec<u64> = (0..32).collect();
        let slow_square = |&n: &u64| -> Result<u64> {
            // Finish later items first to exercise reordering.
            std::thread::sleep(std::time::Duration::from_micros(200 - n * 5));
            Ok(n * n)
        };

        let sequential = map_ordered(&items, 1, slow_square).unwrap();
        let two = map_ordered(&items, 2, slow_square).unwrap();
        let many = map_ordered(&items, 16, slow_square).unwrap();

        assert_eq!(sequential, two);
        assert_eq!(sequential, many);
        assert_eq!(sequential[5], 25);
    }

    #[test]
    fn worker_count_above_item_count_is_tolerated() {
        let items = vec![1, 2];
        let doubled = map_ordered(&items, 64, |&n| Ok(n * 2)).unwrap();
        assert_eq!(doubled, vec![2, 4]);
    }

    #[test]
    fn a_failing_item_aborts_the_batch() {
        let items: Vec<u32> = (0..8).collect();
        let result = map_ordered(&items, 4, |&n| {
            if n == 5 {
                Err(CovmatError::Config("boom".to_string()))
            } else {
                Ok(n)
            }
        });
        assert!(result.is_err());
    }
}
