//! Restore input order from the engine's origin indices.
//!
//! The engine reorders samples internally (e.g. along its space-partitioning tree) and
//! tags every output row with the index of the sample it came from. Those tags are the
//! only link back to the caller's order; emission order means nothing.

use crate::error::{Result, TsneError};
use crate::protocol::RawResult;

/// Sort records by origin index and return the vectors in input order.
///
/// After sorting, the origin indices must read exactly `0, 1, ..., N-1`; anything else
/// (out of range, duplicated, missing) means the output cannot be aligned with the input.
pub fn reorder(result: RawResult) -> Result<Vec<Vec<f64>>> {
    let mut records = result.records;

    // Stable, so ties would keep engine order; ties are rejected below anyway
    records.sort_by_key(|r| r.origin);

    for (position, record) in records.iter().enumerate() {
        if usize::try_from(record.origin).ok() != Some(position) {
            return Err(TsneError::mismatch(format!(
                "origin indices are not a permutation of 0..{}: found {} at sorted position {}",
                records.len(),
                record.origin,
                position
            )));
        }
    }

    Ok(records.into_iter().map(|r| r.vector).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RawRecord;
    use pretty_assertions::assert_eq;

    fn raw(records: Vec<(i32, Vec<f64>)>) -> RawResult {
        let n = records.len();
        RawResult {
            dims: records.first().map_or(0, |(_, v)| v.len()),
            records: records
                .into_iter()
                .map(|(origin, vector)| RawRecord { origin, vector })
                .collect(),
            costs: vec![0.0; n],
        }
    }

    #[test]
    fn test_two_point_swap() {
        let (a, b, c, d) = (0.1, 0.2, 0.3, 0.4);
        let result = raw(vec![(1, vec![a, b]), (0, vec![c, d])]);
        assert_eq!(reorder(result).unwrap(), vec![vec![c, d], vec![a, b]]);
    }

    #[test]
    fn test_arbitrary_permutation() {
        let order = [3, 0, 4, 2, 1];
        let result = raw(order.iter().map(|&i| (i, vec![i as f64 * 10.0])).collect());

        let ordered = reorder(result).unwrap();
        assert_eq!(
            ordered,
            vec![vec![0.0], vec![10.0], vec![20.0], vec![30.0], vec![40.0]]
        );
    }

    #[test]
    fn test_identity_is_untouched() {
        let result = raw(vec![(0, vec![1.0]), (1, vec![2.0]), (2, vec![3.0])]);
        assert_eq!(reorder(result).unwrap(), vec![vec![1.0], vec![2.0], vec![3.0]]);
    }

    #[test]
    fn test_duplicate_origin_rejected() {
        let result = raw(vec![(0, vec![1.0]), (0, vec![2.0])]);
        assert!(matches!(reorder(result), Err(TsneError::ProtocolMismatch(_))));
    }

    #[test]
    fn test_out_of_range_origin_rejected() {
        let result = raw(vec![(0, vec![1.0]), (5, vec![2.0])]);
        assert!(matches!(reorder(result), Err(TsneError::ProtocolMismatch(_))));

        let result = raw(vec![(-1, vec![1.0]), (0, vec![2.0])]);
        assert!(matches!(reorder(result), Err(TsneError::ProtocolMismatch(_))));
    }
}
