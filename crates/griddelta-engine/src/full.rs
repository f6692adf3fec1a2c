//! Most expensive tier: exact cell-level diff, bounded by the cell budget.
//!
//! Sheets are diffed as independent async tasks over a bounded-concurrency
//! stream. The only shared mutable state is the running `cells_compared`
//! counter; each task owns its local accumulator and a final reduction
//! merges them in sheet iteration order, so output is deterministic for a
//! fixed pair of states.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{stream, StreamExt};
use griddelta_model::{
    qualify_cell, CellChange, CellRef, CellValue, ChangeKind, DatasetState, FullReport, SheetId,
    SheetState,
};

use crate::block::{block_changed, block_count, block_rows};
use crate::source::{range_values_or_empty, GridDataSource};
use crate::tier::DiffOptions;
use crate::EngineConfig;

#[derive(Debug, Default)]
struct SheetOutcome {
    changes: Vec<CellChange>,
    cells_added: u64,
    cells_removed: u64,
}

pub(crate) async fn full_diff(
    source: &dyn GridDataSource,
    config: &EngineConfig,
    before: &DatasetState,
    after: &DatasetState,
    before_by_id: &HashMap<SheetId, &SheetState>,
    after_by_id: &HashMap<SheetId, &SheetState>,
    options: &DiffOptions,
) -> FullReport {
    // Cooperative budget: checked before scheduling each sheet and each
    // block; in-flight block comparisons always complete.
    let compared = AtomicU64::new(0);

    let outcomes: Vec<SheetOutcome> = stream::iter(after.sheets.iter().map(|sheet| {
        diff_sheet(
            source,
            config,
            options,
            before,
            after,
            before_by_id.get(&sheet.sheet_id).copied(),
            sheet,
            &compared,
        )
    }))
    .buffered(config.max_concurrent_fetches.max(1))
    .collect()
    .await;

    let mut report = FullReport {
        cells_compared: compared.load(Ordering::Relaxed),
        ..FullReport::default()
    };
    for outcome in outcomes {
        report.changes.extend(outcome.changes);
        report.cells_added += outcome.cells_added;
        report.cells_removed += outcome.cells_removed;
    }

    // Sheets that disappeared contribute their whole extent as removed;
    // their cells are not fetched or compared.
    for sheet in &before.sheets {
        if !after_by_id.contains_key(&sheet.sheet_id) {
            report.cells_removed += sheet.cell_count();
        }
    }

    report
}

#[allow(clippy::too_many_arguments)]
async fn diff_sheet(
    source: &dyn GridDataSource,
    config: &EngineConfig,
    options: &DiffOptions,
    before: &DatasetState,
    after: &DatasetState,
    before_sheet: Option<&SheetState>,
    sheet: &SheetState,
    compared: &AtomicU64,
) -> SheetOutcome {
    let mut out = SheetOutcome::default();

    let Some(prev) = before_sheet else {
        // Whole sheet is new; count it without fetching anything.
        out.cells_added = sheet.cell_count();
        return out;
    };

    // Identity digest match (metadata + content blocks when captured):
    // nothing to do at zero comparison cost.
    if prev.digest == sheet.digest {
        return out;
    }

    if compared.load(Ordering::Relaxed) >= options.cell_budget {
        return out;
    }

    let before_cells = hydrate(source, &before.id, prev, options, compared).await;
    let after_cells = hydrate(source, &after.id, sheet, options, compared).await;

    let nominal_rows = prev.row_count.max(sheet.row_count);
    let nominal_cols = prev.column_count.max(sheet.column_count);
    let before_digests = prev.block_digests.as_deref();
    let after_digests = sheet.block_digests.as_deref();

    for index in 0..block_count(nominal_rows, config.block_size) {
        if compared.load(Ordering::Relaxed) >= options.cell_budget {
            break;
        }

        let (start, end) = block_rows(index, config.block_size, nominal_rows);
        let span = u64::from(end - start) * u64::from(nominal_cols);
        // Skipped blocks still count against the budget — the budget bounds
        // the extent of the scan, not just the per-cell work.
        compared.fetch_add(span, Ordering::Relaxed);

        if !block_changed(before_digests, after_digests, index) {
            continue;
        }

        for row in start..end {
            for col in 0..nominal_cols {
                let b = value_at(&before_cells, row, col);
                let a = value_at(&after_cells, row, col);
                match (b, a) {
                    (None, None) => {}
                    (Some(b), Some(a)) if b == a => {}
                    (Some(b), Some(a)) => out.changes.push(change(
                        sheet,
                        row,
                        col,
                        Some(b.clone()),
                        Some(a.clone()),
                        ChangeKind::Value,
                    )),
                    (None, Some(a)) => {
                        out.cells_added += 1;
                        out.changes.push(change(
                            sheet,
                            row,
                            col,
                            None,
                            Some(a.clone()),
                            ChangeKind::Added,
                        ));
                    }
                    (Some(b), None) => {
                        out.cells_removed += 1;
                        out.changes.push(change(
                            sheet,
                            row,
                            col,
                            Some(b.clone()),
                            None,
                            ChangeKind::Removed,
                        ));
                    }
                }
            }
        }
    }

    out
}

/// Produce a value source for one side of a sheet comparison.
///
/// A snapshot captured without `cells` is re-hydrated with a bounded fetch:
/// at most `remaining budget / columns` rows, so hydration can never pull
/// more cells than the diff is still allowed to inspect. A failed fetch
/// degrades to an empty grid, which compares as "everything changed".
async fn hydrate<'a>(
    source: &dyn GridDataSource,
    document_id: &str,
    sheet: &'a SheetState,
    options: &DiffOptions,
    compared: &AtomicU64,
) -> Cow<'a, [Vec<CellValue>]> {
    if let Some(cells) = &sheet.cells {
        return Cow::Borrowed(cells.as_slice());
    }

    let remaining = options
        .cell_budget
        .saturating_sub(compared.load(Ordering::Relaxed));
    let cols = u64::from(sheet.column_count.max(1));
    let row_cap = u64::from(sheet.row_count).min(remaining / cols) as u32;

    Cow::Owned(range_values_or_empty(source, document_id, &sheet.title, 0, row_cap).await)
}

fn value_at<'a>(cells: &'a [Vec<CellValue>], row: u32, col: u32) -> Option<&'a CellValue> {
    // A ragged or short grid means "absent": absent and explicit null
    // compare equal, and absent-vs-value is an add/remove, never a silent
    // skip.
    cells
        .get(row as usize)?
        .get(col as usize)
        .filter(|v| !v.is_null())
}

fn change(
    sheet: &SheetState,
    row: u32,
    col: u32,
    before: Option<CellValue>,
    after: Option<CellValue>,
    kind: ChangeKind,
) -> CellChange {
    CellChange {
        cell: qualify_cell(&sheet.title, CellRef::new(row, col)),
        before,
        after,
        kind,
    }
}
