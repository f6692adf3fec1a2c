//! Medium tier: head/tail row samples compared cell-by-cell.
//!
//! The output is a statistical change indicator, not an exact answer — only
//! the sampled windows are inspected.

use std::collections::{HashMap, HashSet};

use griddelta_model::{
    qualify_cell, CellRef, CellValue, DatasetState, RowSample, SampleChange, SampleRegion,
    SampleReport, SheetId, SheetState,
};

use crate::source::{range_values_or_empty, GridDataSource};
use crate::tier::DiffOptions;

/// Head and tail windows would overlap on short sheets; sampling the tail
/// then adds nothing. Skip it when `row_count <= sample_size * 2`.
pub(crate) fn tail_window(row_count: u32, sample_size: u32) -> Option<(u32, u32)> {
    if row_count <= sample_size.saturating_mul(2) {
        None
    } else {
        Some((row_count - sample_size, row_count))
    }
}

/// Fetch the head/tail sample for a sheet that was captured without one.
pub(crate) async fn fetch_sample(
    source: &dyn GridDataSource,
    document_id: &str,
    title: &str,
    row_count: u32,
    sample_size: u32,
) -> RowSample {
    let head_end = sample_size.min(row_count);
    let head = range_values_or_empty(source, document_id, title, 0, head_end).await;

    let (tail, tail_start) = match tail_window(row_count, sample_size) {
        Some((start, end)) => (
            range_values_or_empty(source, document_id, title, start, end).await,
            start,
        ),
        None => (Vec::new(), row_count),
    };

    RowSample {
        head,
        tail,
        tail_start,
    }
}

pub(crate) async fn sample_diff(
    source: &dyn GridDataSource,
    after: &DatasetState,
    before_by_id: &HashMap<SheetId, &SheetState>,
    options: &DiffOptions,
) -> SampleReport {
    let mut report = SampleReport::default();
    let mut rows_changed: HashSet<(SheetId, u32)> = HashSet::new();

    for sheet in &after.sheets {
        let owned;
        let sample = match &sheet.sample {
            Some(sample) => sample,
            None => {
                owned = fetch_sample(
                    source,
                    &after.id,
                    &sheet.title,
                    sheet.row_count,
                    options.sample_size,
                )
                .await;
                &owned
            }
        };

        let before_sheet = before_by_id.get(&sheet.sheet_id).copied();
        let windows = [
            (0u32, sample.head.as_slice()),
            (sample.tail_start, sample.tail.as_slice()),
        ];

        for (window_start, rows) in windows {
            for (offset, row) in rows.iter().enumerate() {
                let abs_row = window_start + offset as u32;
                let before_width = before_sheet
                    .map(|prev| before_row_width(prev, abs_row))
                    .unwrap_or(0);
                let width = row.len().max(before_width);
                report.cells_sampled += width as u64;

                for col in 0..width {
                    let after_value = present(row.get(col));
                    let before_value =
                        before_sheet.and_then(|prev| before_value_at(prev, abs_row, col));
                    if after_value == before_value {
                        continue;
                    }
                    rows_changed.insert((sheet.sheet_id, abs_row));
                    report.changes.push(SampleChange {
                        cell: qualify_cell(&sheet.title, CellRef::new(abs_row, col as u32)),
                        before: before_value.cloned(),
                        after: after_value.cloned(),
                        region: region_of(sample, abs_row),
                    });
                }
            }
        }
    }

    report.rows_changed = rows_changed.len() as u64;
    report
}

/// `None` for absent or null cells, so an explicit null and a missing
/// trailing cell compare equal.
fn present(value: Option<&CellValue>) -> Option<&CellValue> {
    value.filter(|v| !v.is_null())
}

/// Resolve a before-side value for an absolute row, from whatever the
/// snapshot carries: full cells if captured, sample windows otherwise.
/// `None` with no value information at all means "assume changed" — the
/// after value will be reported with an empty before side.
fn before_value_at(sheet: &SheetState, abs_row: u32, col: usize) -> Option<&CellValue> {
    before_row(sheet, abs_row).and_then(|row| present(row.get(col)))
}

fn before_row_width(sheet: &SheetState, abs_row: u32) -> usize {
    before_row(sheet, abs_row).map_or(0, Vec::len)
}

fn before_row(sheet: &SheetState, abs_row: u32) -> Option<&Vec<CellValue>> {
    if let Some(cells) = &sheet.cells {
        return cells.get(abs_row as usize);
    }
    let sample = sheet.sample.as_ref()?;
    if (abs_row as usize) < sample.head.len() {
        return sample.head.get(abs_row as usize);
    }
    if abs_row >= sample.tail_start {
        return sample.tail.get((abs_row - sample.tail_start) as usize);
    }
    None
}

fn region_of(sample: &RowSample, abs_row: u32) -> SampleRegion {
    if (abs_row as usize) < sample.head.len() {
        SampleRegion::Head
    } else if abs_row >= sample.tail_start
        && ((abs_row - sample.tail_start) as usize) < sample.tail.len()
    {
        SampleRegion::Tail
    } else {
        SampleRegion::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_window_skips_short_sheets() {
        // 15 <= 10 * 2: head and tail would overlap.
        assert_eq!(tail_window(15, 10), None);
        assert_eq!(tail_window(20, 10), None);
        assert_eq!(tail_window(21, 10), Some((11, 21)));
        assert_eq!(tail_window(10_000, 10), Some((9_990, 10_000)));
    }
}
