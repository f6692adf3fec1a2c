//! Cheapest tier: structural comparison plus the sheet-change scan that runs
//! at every tier.

use std::collections::HashMap;

use griddelta_model::{
    DatasetState, MetadataReport, SheetChanges, SheetId, SheetRename, SheetState, SheetSummary,
};

use crate::error::{DiffError, Result};

/// Fraction of total cells reported as "estimated changed" when the dataset
/// digests differ but the sheet structure is unchanged.
///
/// This is a deliberately crude placeholder signaling "something changed,
/// magnitude unknown" — it has no stated derivation and callers must not
/// treat it as a measurement. Preserved as-is rather than replaced with an
/// inferred formula.
pub const ESTIMATED_CHANGED_FRACTION: f64 = 0.10;

/// Build the by-id lookup map for one snapshot.
///
/// Built once per diff call so every differ's per-sheet lookup is `O(1)`;
/// that bounds full-differ cost to `O(sheets)` rather than `O(sheets²)`.
/// A duplicate id is a programming error in the caller — state capture is
/// the only producer of snapshots — so it fails fast.
pub(crate) fn index_sheets(state: &DatasetState) -> Result<HashMap<SheetId, &SheetState>> {
    let mut map = HashMap::with_capacity(state.sheets.len());
    for sheet in &state.sheets {
        if map.insert(sheet.sheet_id, sheet).is_some() {
            return Err(DiffError::MalformedState(format!(
                "duplicate sheet id {} in snapshot of document {}",
                sheet.sheet_id, state.id
            )));
        }
    }
    Ok(map)
}

/// Sheet-level structural changes: added / removed by stable id, renamed
/// when the id survived with a different title.
pub(crate) fn sheet_changes(
    before: &DatasetState,
    after: &DatasetState,
    before_by_id: &HashMap<SheetId, &SheetState>,
    after_by_id: &HashMap<SheetId, &SheetState>,
) -> SheetChanges {
    let mut changes = SheetChanges::default();

    for sheet in &after.sheets {
        match before_by_id.get(&sheet.sheet_id) {
            None => changes.added.push(summary(sheet)),
            Some(prev) if prev.title != sheet.title => changes.renamed.push(SheetRename {
                sheet_id: sheet.sheet_id,
                old_title: prev.title.clone(),
                new_title: sheet.title.clone(),
            }),
            Some(_) => {}
        }
    }

    for sheet in &before.sheets {
        if !after_by_id.contains_key(&sheet.sheet_id) {
            changes.removed.push(summary(sheet));
        }
    }

    changes
}

fn summary(sheet: &SheetState) -> SheetSummary {
    SheetSummary {
        sheet_id: sheet.sheet_id,
        title: sheet.title.clone(),
        row_count: sheet.row_count,
        column_count: sheet.column_count,
    }
}

/// The METADATA-tier payload: count deltas plus the crude change-magnitude
/// heuristic.
pub(crate) fn metadata_diff(before: &DatasetState, after: &DatasetState) -> MetadataReport {
    let row_sum = |state: &DatasetState| -> i64 {
        state.sheets.iter().map(|s| i64::from(s.row_count)).sum()
    };
    let col_sum = |state: &DatasetState| -> i64 {
        state.sheets.iter().map(|s| i64::from(s.column_count)).sum()
    };

    let total_cells = before.total_cells().max(after.total_cells());
    let estimated_cells_changed = if before.digest == after.digest {
        0
    } else if before.sheets.len() != after.sheets.len() {
        total_cells
    } else {
        (total_cells as f64 * ESTIMATED_CHANGED_FRACTION).round() as u64
    };

    MetadataReport {
        row_delta: row_sum(after) - row_sum(before),
        column_delta: col_sum(after) - col_sum(before),
        estimated_cells_changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn meta_sheet(id: i64, title: &str, rows: u32, cols: u32) -> SheetState {
        SheetState {
            sheet_id: SheetId(id),
            title: title.to_string(),
            row_count: rows,
            column_count: cols,
            digest: hashing::sheet_digest(SheetId(id), title, rows, cols, None),
            block_digests: None,
            sample: None,
            cells: None,
        }
    }

    fn snapshot(sheets: Vec<SheetState>) -> DatasetState {
        let digest = hashing::dataset_digest(&sheets);
        DatasetState {
            id: "doc".to_string(),
            captured_at: Utc::now(),
            sheets,
            digest,
        }
    }

    #[test]
    fn rename_is_detected_by_stable_id() {
        let before = snapshot(vec![meta_sheet(1, "A", 5, 2)]);
        let after = snapshot(vec![meta_sheet(1, "B", 5, 2)]);
        let changes = sheet_changes(
            &before,
            &after,
            &index_sheets(&before).unwrap(),
            &index_sheets(&after).unwrap(),
        );
        assert_eq!(
            changes.renamed,
            vec![SheetRename {
                sheet_id: SheetId(1),
                old_title: "A".to_string(),
                new_title: "B".to_string(),
            }]
        );
        assert!(changes.added.is_empty());
        assert!(changes.removed.is_empty());
    }

    #[test]
    fn added_and_removed_sheets_are_split() {
        let before = snapshot(vec![meta_sheet(1, "Keep", 5, 2), meta_sheet(2, "Old", 3, 1)]);
        let after = snapshot(vec![meta_sheet(1, "Keep", 5, 2), meta_sheet(3, "New", 1, 1)]);
        let changes = sheet_changes(
            &before,
            &after,
            &index_sheets(&before).unwrap(),
            &index_sheets(&after).unwrap(),
        );
        assert_eq!(changes.added.len(), 1);
        assert_eq!(changes.added[0].sheet_id, SheetId(3));
        assert_eq!(changes.removed.len(), 1);
        assert_eq!(changes.removed[0].sheet_id, SheetId(2));
    }

    #[test]
    fn matching_digests_estimate_zero() {
        let before = snapshot(vec![meta_sheet(1, "A", 100, 10)]);
        let after = snapshot(vec![meta_sheet(1, "A", 100, 10)]);
        assert_eq!(metadata_diff(&before, &after).estimated_cells_changed, 0);
    }

    #[test]
    fn sheet_count_change_estimates_all_cells() {
        let before = snapshot(vec![meta_sheet(1, "A", 100, 10)]);
        let after = snapshot(vec![meta_sheet(1, "A", 100, 10), meta_sheet(2, "B", 50, 10)]);
        let report = metadata_diff(&before, &after);
        assert_eq!(report.estimated_cells_changed, 1_500);
        assert_eq!(report.row_delta, 50);
    }

    #[test]
    fn structural_change_estimates_flat_fraction() {
        let before = snapshot(vec![meta_sheet(1, "A", 100, 10)]);
        let after = snapshot(vec![meta_sheet(1, "A", 120, 10)]);
        // 10% of max(1000, 1200).
        assert_eq!(metadata_diff(&before, &after).estimated_cells_changed, 120);
    }

    #[test]
    fn duplicate_sheet_ids_fail_fast() {
        let state = snapshot(vec![meta_sheet(1, "A", 1, 1), meta_sheet(1, "B", 1, 1)]);
        assert!(matches!(
            index_sheets(&state),
            Err(DiffError::MalformedState(_))
        ));
    }
}
