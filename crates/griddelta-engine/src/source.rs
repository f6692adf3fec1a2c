use async_trait::async_trait;
use griddelta_model::{CellValue, SheetId};
use serde::{Deserialize, Serialize};

/// Sheet metadata as reported by the backing source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub sheet_id: SheetId,
    pub title: String,
    pub row_count: u32,
    pub column_count: u32,
}

/// The one capability the engine consumes: a slow, rate-limited grid source.
///
/// `range_values` must return raw typed values (`UNFORMATTED_VALUE`
/// semantics), not display strings. Rows are `[row_start, row_end)`,
/// 0-indexed; rows may be ragged (trailing empty cells omitted).
///
/// Implementations should catch backend failures and return an empty array
/// rather than erroring where they can; either way the engine recovers a
/// failed call as an empty result (logged, never surfaced to `diff` /
/// `capture_state` callers).
#[async_trait]
pub trait GridDataSource: Send + Sync {
    async fn sheet_list(&self, document_id: &str) -> anyhow::Result<Vec<SheetInfo>>;

    async fn range_values(
        &self,
        document_id: &str,
        sheet_title: &str,
        row_start: u32,
        row_end: u32,
    ) -> anyhow::Result<Vec<Vec<CellValue>>>;
}

/// Fetch the sheet list, degrading a failure to an empty list.
pub(crate) async fn sheet_list_or_empty(
    source: &dyn GridDataSource,
    document_id: &str,
) -> Vec<SheetInfo> {
    match source.sheet_list(document_id).await {
        Ok(sheets) => sheets,
        Err(err) => {
            log::warn!("sheet list fetch failed for document {document_id}: {err:#}");
            Vec::new()
        }
    }
}

/// Fetch a row range, degrading a failure to an empty grid.
///
/// An empty grid means "no information": downstream comparison treats it as
/// changed rather than unchanged, so a flaky fetch costs extra work, never a
/// silently wrong answer.
pub(crate) async fn range_values_or_empty(
    source: &dyn GridDataSource,
    document_id: &str,
    sheet_title: &str,
    row_start: u32,
    row_end: u32,
) -> Vec<Vec<CellValue>> {
    if row_start >= row_end {
        return Vec::new();
    }
    match source
        .range_values(document_id, sheet_title, row_start, row_end)
        .await
    {
        Ok(rows) => rows,
        Err(err) => {
            log::warn!(
                "range fetch failed for {document_id} '{sheet_title}' rows {row_start}..{row_end}: {err:#}"
            );
            Vec::new()
        }
    }
}
