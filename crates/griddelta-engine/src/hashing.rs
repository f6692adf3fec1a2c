//! Content hashing for change detection.
//!
//! Every digest is SHA-256 over the canonical `serde_json` encoding of the
//! hashed value, so digests are deterministic across process restarts and
//! across machines for identical serialized input. The engine only ever
//! compares digests for equality; no cryptographic guarantees are implied.

use griddelta_model::{CellValue, Digest, SheetId, SheetState};
use serde::Serialize;
use sha2::{Digest as _, Sha256};

/// Hash any serializable value.
pub fn digest_of<T: Serialize>(value: &T) -> Digest {
    let bytes = serde_json::to_vec(value).expect("digest input is always JSON-serializable");
    Digest::from_bytes(Sha256::digest(&bytes).into())
}

/// Digest of a sheet's identity.
///
/// Metadata-only captures hash the `(sheet_id, title, row_count,
/// column_count)` tuple; when cells were captured the per-block content
/// digests are folded in as well, so a cell edit that leaves the dimensions
/// untouched still changes the sheet digest.
pub fn sheet_digest(
    sheet_id: SheetId,
    title: &str,
    row_count: u32,
    column_count: u32,
    block_digests: Option<&[Digest]>,
) -> Digest {
    digest_of(&(sheet_id, title, row_count, column_count, block_digests))
}

/// Snapshot-level digest over the ordered sheet metadata tuples.
///
/// Never includes cell content, so metadata-only snapshots remain comparable
/// to full snapshots for structural checks.
pub fn dataset_digest(sheets: &[SheetState]) -> Digest {
    let tuples: Vec<(SheetId, &str, u32, u32)> = sheets
        .iter()
        .map(|s| (s.sheet_id, s.title.as_str(), s.row_count, s.column_count))
        .collect();
    digest_of(&tuples)
}

/// One content digest per `block_size`-row window of a captured grid.
///
/// `block_digests[i]` covers rows `[i * block_size, (i + 1) * block_size)`;
/// the final block may be short.
pub fn block_digests(cells: &[Vec<CellValue>], block_size: u32) -> Vec<Digest> {
    cells
        .chunks(block_size.max(1) as usize)
        .map(|chunk| digest_of(&chunk))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn digests_are_deterministic() {
        let a = digest_of(&(SheetId(7), "Sheet1", 10u32, 4u32));
        let b = digest_of(&(SheetId(7), "Sheet1", 10u32, 4u32));
        assert_eq!(a, b);
        assert_ne!(a, digest_of(&(SheetId(7), "Sheet2", 10u32, 4u32)));
    }

    #[test]
    fn sheet_digest_tracks_content_when_present() {
        let rows_a = vec![vec![CellValue::from(1.0), CellValue::from(2.0)]];
        let rows_b = vec![vec![CellValue::from(1.0), CellValue::from(5.0)]];
        let blocks_a = block_digests(&rows_a, 1000);
        let blocks_b = block_digests(&rows_b, 1000);

        let meta_only = sheet_digest(SheetId(1), "Sheet1", 1, 2, None);
        let with_a = sheet_digest(SheetId(1), "Sheet1", 1, 2, Some(&blocks_a));
        let with_b = sheet_digest(SheetId(1), "Sheet1", 1, 2, Some(&blocks_b));

        assert_ne!(meta_only, with_a);
        assert_ne!(with_a, with_b);
        assert_eq!(with_a, sheet_digest(SheetId(1), "Sheet1", 1, 2, Some(&blocks_a)));
    }

    #[test]
    fn block_digests_split_on_block_boundaries() {
        let rows: Vec<Vec<CellValue>> = (0..25).map(|i| vec![CellValue::from(i)]).collect();
        let digests = block_digests(&rows, 10);
        assert_eq!(digests.len(), 3); // 10 + 10 + 5

        // A change inside one block leaves the other blocks' digests alone.
        let mut changed = rows.clone();
        changed[14][0] = CellValue::from("x");
        let changed_digests = block_digests(&changed, 10);
        assert_eq!(digests[0], changed_digests[0]);
        assert_ne!(digests[1], changed_digests[1]);
        assert_eq!(digests[2], changed_digests[2]);
    }
}
