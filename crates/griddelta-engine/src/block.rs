//! Block index: fixed-size row windows as the unit of change-skipping.
//!
//! Rows in blocks whose digests match on both sides are skipped by the full
//! differ without a per-cell comparison.

use griddelta_model::Digest;

/// Number of blocks needed to cover `rows` rows.
pub(crate) fn block_count(rows: u32, block_size: u32) -> u32 {
    rows.div_ceil(block_size.max(1))
}

/// Row range `[start, end)` covered by block `index`, clamped to `rows`.
pub(crate) fn block_rows(index: u32, block_size: u32, rows: u32) -> (u32, u32) {
    let block_size = block_size.max(1);
    let start = index.saturating_mul(block_size).min(rows);
    let end = start.saturating_add(block_size).min(rows);
    (start, end)
}

/// True when block `index` must be compared cell-by-cell.
///
/// A block is skippable only when *both* sides carry a digest for it and the
/// digests agree; a missing digest on either side is conservatively treated
/// as changed (no information must mean more work, not a silent skip).
pub(crate) fn block_changed(
    before: Option<&[Digest]>,
    after: Option<&[Digest]>,
    index: u32,
) -> bool {
    let idx = index as usize;
    match (
        before.and_then(|d| d.get(idx)),
        after.and_then(|d| d.get(idx)),
    ) {
        (Some(b), Some(a)) => b != a,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::digest_of;

    fn changed_blocks(
        before: Option<&[Digest]>,
        after: Option<&[Digest]>,
        total_blocks: u32,
    ) -> Vec<u32> {
        (0..total_blocks)
            .filter(|&i| block_changed(before, after, i))
            .collect()
    }

    #[test]
    fn block_count_rounds_up() {
        assert_eq!(block_count(0, 1_000), 0);
        assert_eq!(block_count(1, 1_000), 1);
        assert_eq!(block_count(1_000, 1_000), 1);
        assert_eq!(block_count(1_001, 1_000), 2);
        assert_eq!(block_count(10_000, 1_000), 10);
    }

    #[test]
    fn block_rows_clamp_to_sheet() {
        assert_eq!(block_rows(0, 1_000, 10_000), (0, 1_000));
        assert_eq!(block_rows(9, 1_000, 9_500), (9_000, 9_500));
        assert_eq!(block_rows(10, 1_000, 9_500), (9_500, 9_500));
    }

    #[test]
    fn only_differing_blocks_are_changed() {
        let before: Vec<_> = (0..4).map(|i: u32| digest_of(&i)).collect();
        let mut after = before.clone();
        after[2] = digest_of(&99u32);

        assert_eq!(
            changed_blocks(Some(&before), Some(&after), 4),
            vec![2]
        );
    }

    #[test]
    fn missing_digests_are_conservatively_changed() {
        let digests: Vec<_> = (0..2).map(|i: u32| digest_of(&i)).collect();
        // One side unindexed: every block must be compared.
        assert_eq!(changed_blocks(None, Some(&digests), 2), vec![0, 1]);
        // Shorter digest list on one side: the uncovered block is changed.
        assert_eq!(
            changed_blocks(Some(&digests[..1]), Some(&digests), 2),
            vec![1]
        );
    }
}
