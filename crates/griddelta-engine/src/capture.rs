//! State capture: build immutable [`DatasetState`] snapshots.
//!
//! Two paths: query the backing source (with per-tier fetch depth and
//! bounded per-sheet concurrency), or reuse the data a prior mutation
//! already returned — a pure transformation with no fetch at all.

use chrono::Utc;
use futures_util::{stream, StreamExt};
use griddelta_model::{CellValue, DatasetState, DiffTier, RowSample, SheetId, SheetState};
use serde::{Deserialize, Serialize};

use crate::hashing;
use crate::sample::fetch_sample;
use crate::source::{range_values_or_empty, sheet_list_or_empty, GridDataSource, SheetInfo};
use crate::tier::DiffOptions;
use crate::EngineConfig;

/// Per-sheet payload of a prior write operation, as returned by the backing
/// source's mutation response (metadata plus, when the write asked for it,
/// the resulting values).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationSheet {
    pub sheet_id: SheetId,
    pub title: String,
    pub row_count: u32,
    pub column_count: u32,
    /// Values echoed back by the write, row-major from row 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Vec<CellValue>>>,
}

/// Everything a mutation response tells us about the document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationPayload {
    pub sheets: Vec<MutationSheet>,
}

pub(crate) async fn capture_state(
    source: &dyn GridDataSource,
    config: &EngineConfig,
    document_id: &str,
    options: &DiffOptions,
) -> DatasetState {
    let infos = sheet_list_or_empty(source, document_id).await;

    let sheets: Vec<SheetState> = stream::iter(
        infos
            .into_iter()
            .map(|info| capture_sheet(source, config, document_id, info, options)),
    )
    .buffered(config.max_concurrent_fetches.max(1))
    .collect()
    .await;

    assemble(document_id, sheets)
}

async fn capture_sheet(
    source: &dyn GridDataSource,
    config: &EngineConfig,
    document_id: &str,
    info: SheetInfo,
    options: &DiffOptions,
) -> SheetState {
    let mut sample = None;
    let mut cells = None;
    let mut block_digests = None;

    match options.tier {
        DiffTier::Metadata => {}
        DiffTier::Sample => {
            sample = Some(
                fetch_sample(
                    source,
                    document_id,
                    &info.title,
                    info.row_count,
                    options.sample_size,
                )
                .await,
            );
        }
        DiffTier::Full => {
            // Cap the fetched range so `rows × columns <= cell_budget`.
            let cols = u64::from(info.column_count.max(1));
            let row_cap = u64::from(info.row_count).min(options.cell_budget / cols) as u32;
            let values =
                range_values_or_empty(source, document_id, &info.title, 0, row_cap).await;
            block_digests = Some(hashing::block_digests(&values, config.block_size));
            cells = Some(values);
        }
    }

    let digest = hashing::sheet_digest(
        info.sheet_id,
        &info.title,
        info.row_count,
        info.column_count,
        block_digests.as_deref(),
    );

    SheetState {
        sheet_id: info.sheet_id,
        title: info.title,
        row_count: info.row_count,
        column_count: info.column_count,
        digest,
        block_digests,
        sample,
        cells,
    }
}

/// Reconstruct a snapshot from a mutation response. Pure and synchronous —
/// the whole point is avoiding a second read round-trip.
pub(crate) fn capture_from_mutation(
    config: &EngineConfig,
    document_id: &str,
    payload: &MutationPayload,
    options: &DiffOptions,
) -> DatasetState {
    let sheets = payload
        .sheets
        .iter()
        .map(|sheet| mutation_sheet_state(config, sheet, options))
        .collect();
    assemble(document_id, sheets)
}

fn mutation_sheet_state(
    config: &EngineConfig,
    sheet: &MutationSheet,
    options: &DiffOptions,
) -> SheetState {
    let mut sample = None;
    let mut cells = None;
    let mut block_digests = None;

    if let Some(values) = &sheet.values {
        match options.tier {
            DiffTier::Metadata => {}
            DiffTier::Sample => {
                sample = Some(derive_sample(values, sheet.row_count, options.sample_size));
            }
            DiffTier::Full => {
                block_digests = Some(hashing::block_digests(values, config.block_size));
                cells = Some(values.clone());
            }
        }
    }

    let digest = hashing::sheet_digest(
        sheet.sheet_id,
        &sheet.title,
        sheet.row_count,
        sheet.column_count,
        block_digests.as_deref(),
    );

    SheetState {
        sheet_id: sheet.sheet_id,
        title: sheet.title.clone(),
        row_count: sheet.row_count,
        column_count: sheet.column_count,
        digest,
        block_digests,
        sample,
        cells,
    }
}

/// Slice head/tail windows out of already-present values.
///
/// The tail window is only trustworthy when the echoed values cover the
/// whole sheet; a partial echo yields a head-only sample rather than a
/// fabricated tail.
fn derive_sample(values: &[Vec<CellValue>], row_count: u32, sample_size: u32) -> RowSample {
    let head_end = (sample_size as usize).min(values.len());
    let head = values[..head_end].to_vec();

    let full_echo = values.len() as u64 >= u64::from(row_count);
    match crate::sample::tail_window(row_count, sample_size) {
        Some((start, end)) if full_echo => RowSample {
            head,
            tail: values[start as usize..(end as usize).min(values.len())].to_vec(),
            tail_start: start,
        },
        _ => RowSample {
            head,
            tail: Vec::new(),
            tail_start: row_count,
        },
    }
}

fn assemble(document_id: &str, sheets: Vec<SheetState>) -> DatasetState {
    let digest = hashing::dataset_digest(&sheets);
    DatasetState {
        id: document_id.to_string(),
        captured_at: Utc::now(),
        sheets,
        digest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values(rows: u32, cols: u32) -> Vec<Vec<CellValue>> {
        (0..rows)
            .map(|r| (0..cols).map(|c| CellValue::from(f64::from(r * cols + c))).collect())
            .collect()
    }

    #[test]
    fn mutation_capture_full_tier_carries_cells_and_blocks() {
        let payload = MutationPayload {
            sheets: vec![MutationSheet {
                sheet_id: SheetId(1),
                title: "Sheet1".into(),
                row_count: 4,
                column_count: 2,
                values: Some(values(4, 2)),
            }],
        };
        let config = EngineConfig {
            block_size: 2,
            ..EngineConfig::default()
        };
        let state = capture_from_mutation(
            &config,
            "doc",
            &payload,
            &DiffOptions::tier(DiffTier::Full),
        );

        let sheet = &state.sheets[0];
        assert_eq!(sheet.cells.as_ref().unwrap().len(), 4);
        assert_eq!(sheet.block_digests.as_ref().unwrap().len(), 2);
        assert!(sheet.sample.is_none());
    }

    #[test]
    fn mutation_capture_metadata_tier_drops_values() {
        let payload = MutationPayload {
            sheets: vec![MutationSheet {
                sheet_id: SheetId(1),
                title: "Sheet1".into(),
                row_count: 4,
                column_count: 2,
                values: Some(values(4, 2)),
            }],
        };
        let state = capture_from_mutation(
            &EngineConfig::default(),
            "doc",
            &payload,
            &DiffOptions::default(),
        );

        let sheet = &state.sheets[0];
        assert!(sheet.cells.is_none());
        assert!(sheet.block_digests.is_none());
        assert!(sheet.sample.is_none());
    }

    #[test]
    fn partial_echo_yields_head_only_sample() {
        // 30-row sheet, but the write only echoed 12 rows: no tail window.
        let sample = derive_sample(&values(12, 1), 30, 5);
        assert_eq!(sample.head.len(), 5);
        assert!(sample.tail.is_empty());
        assert_eq!(sample.tail_start, 30);

        // Full echo: real tail.
        let sample = derive_sample(&values(30, 1), 30, 5);
        assert_eq!(sample.head.len(), 5);
        assert_eq!(sample.tail.len(), 5);
        assert_eq!(sample.tail_start, 25);
    }

    #[test]
    fn mutation_capture_digest_matches_fetched_metadata_digest() {
        // A mutation-built snapshot and a metadata fetch of the same
        // document must agree on the dataset digest, or every post-write
        // diff would see a phantom structural change.
        let payload = MutationPayload {
            sheets: vec![MutationSheet {
                sheet_id: SheetId(9),
                title: "Data".into(),
                row_count: 7,
                column_count: 3,
                values: None,
            }],
        };
        let from_mutation = capture_from_mutation(
            &EngineConfig::default(),
            "doc",
            &payload,
            &DiffOptions::default(),
        );

        let fetched_style = assemble(
            "doc",
            vec![SheetState {
                sheet_id: SheetId(9),
                title: "Data".into(),
                row_count: 7,
                column_count: 3,
                digest: hashing::sheet_digest(SheetId(9), "Data", 7, 3, None),
                block_digests: None,
                sample: None,
                cells: None,
            }],
        );

        assert_eq!(from_mutation.digest, fetched_style.digest);
    }
}
