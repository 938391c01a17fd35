//! Proportional worker allocation and chunk sizing.

use crate::errors::PlanError;

/// Workers for each list, proportional to its share of the combined size.
///
/// `max(1, round(total_workers * size / combined))` per list, rounding half to
/// even. The result is approximate: the sum may differ from `total_workers`.
pub fn allocate_workers(sizes: &[usize], total_workers: usize) -> Result<Vec<usize>, PlanError> {
    if sizes.is_empty() {
        return Err(PlanError::NoLists);
    }
    if total_workers == 0 {
        return Err(PlanError::ZeroWorkers);
    }
    let combined: usize = sizes.iter().sum();
    if combined == 0 {
        return Err(PlanError::EmptyInput);
    }

    Ok(sizes
        .iter()
        .map(|&size| {
            let share = total_workers as f64 * (size as f64 / combined as f64);
            (share.round_ties_even() as usize).max(1)
        })
        .collect())
}

/// Shard length for a list: `ceil(size / workers)`.
pub fn chunk_size(size: usize, workers: usize) -> usize {
    size.div_ceil(workers.max(1))
}

/// Split `items` into contiguous chunks of `chunk_size`; the last may be shorter.
///
/// An empty input (or a zero chunk size) yields no chunks.
pub fn split_contiguous<T: Clone>(items: &[T], chunk_size: usize) -> Vec<Vec<T>> {
    if chunk_size == 0 {
        return Vec::new();
    }
    items.chunks(chunk_size).map(<[T]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_nine_and_three_with_four_workers() {
        assert_eq!(allocate_workers(&[9, 3], 4).unwrap(), vec![3, 1]);
    }

    #[test]
    fn test_single_list_gets_everything() {
        assert_eq!(allocate_workers(&[1000], 84).unwrap(), vec![84]);
        assert_eq!(allocate_workers(&[2], 84).unwrap(), vec![84]);
    }

    #[test]
    fn test_small_list_gets_at_least_one() {
        assert_eq!(allocate_workers(&[10_000, 1], 10).unwrap(), vec![10, 1]);
    }

    #[test]
    fn test_empty_list_contributes_zero_but_still_gets_one() {
        assert_eq!(allocate_workers(&[0, 10], 4).unwrap(), vec![1, 4]);
    }

    #[test]
    fn test_rounds_half_to_even() {
        // 5 * 1/2 = 2.5 -> 2 for both lists
        assert_eq!(allocate_workers(&[1, 1], 5).unwrap(), vec![2, 2]);
        // 7 * 1/2 = 3.5 -> 4
        assert_eq!(allocate_workers(&[1, 1], 7).unwrap(), vec![4, 4]);
    }

    #[test]
    fn test_zero_combined_size_is_error() {
        assert!(matches!(
            allocate_workers(&[0, 0], 4),
            Err(PlanError::EmptyInput)
        ));
    }

    #[test]
    fn test_no_lists_and_zero_workers_are_errors() {
        assert!(matches!(allocate_workers(&[], 4), Err(PlanError::NoLists)));
        assert!(matches!(
            allocate_workers(&[3], 0),
            Err(PlanError::ZeroWorkers)
        ));
    }

    #[test]
    fn test_chunk_size_is_ceiling() {
        assert_eq!(chunk_size(9, 3), 3);
        assert_eq!(chunk_size(3, 1), 3);
        assert_eq!(chunk_size(10, 4), 3);
        assert_eq!(chunk_size(0, 1), 0);
        assert_eq!(chunk_size(5, 0), 5);
    }

    #[test]
    fn test_split_contiguous_last_chunk_shorter() {
        let items: Vec<u32> = (0..10).collect();
        let chunks = split_contiguous(&items, 3);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], vec![0, 1, 2]);
        assert_eq!(chunks[3], vec![9]);
        assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), 10);
    }

    #[test]
    fn test_split_contiguous_empty() {
        let items: Vec<u32> = Vec::new();
        assert!(split_contiguous(&items, 0).is_empty());
        assert!(split_contiguous(&items, 4).is_empty());
    }

    #[test]
    fn test_shard_bounds_hold_across_sizes() {
        for size in 1..60usize {
            for workers in 1..12usize {
                let items: Vec<usize> = (0..size).collect();
                let chunk = chunk_size(size, workers);
                let chunks = split_contiguous(&items, chunk);
                assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= chunk));
                assert_eq!(chunks.concat(), items);
                assert!(chunks.len() <= workers);
            }
        }
    }
}
