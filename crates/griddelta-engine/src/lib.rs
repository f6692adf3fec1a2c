//! Tiered diff engine for grid-structured documents.
//!
//! The engine answers "what changed between two snapshots of this document"
//! at three fidelity tiers — METADATA (structural only), SAMPLE (bounded
//! head/tail row samples), FULL (exact cell-level, budget-bounded) — without
//! paying a full cell-by-cell comparison when the caller only needs a
//! coarse answer, and with as few round-trips to the slow, rate-limited
//! backing source as possible.
//!
//! The engine is a pure computation over two immutable [`DatasetState`]
//! snapshots plus an on-demand fetch capability ([`GridDataSource`]): it
//! never mutates data, never resolves conflicts, and never persists diff
//! results.

mod block;
pub mod capture;
mod error;
mod full;
pub mod hashing;
mod metadata;
mod sample;
mod source;
mod tier;

use std::sync::Arc;

use griddelta_model::{DatasetState, DiffResult, DiffTier, TierReport};

pub use capture::{MutationPayload, MutationSheet};
pub use error::{DiffError, Result};
pub use metadata::ESTIMATED_CHANGED_FRACTION;
pub use source::{GridDataSource, SheetInfo};
pub use tier::{
    effective_tier, DiffOptions, DEFAULT_CELL_BUDGET, DEFAULT_SAMPLE_SIZE, SAMPLE_HEADROOM,
};

/// Default number of rows per content-hash block.
pub const DEFAULT_BLOCK_SIZE: u32 = 1_000;

/// Default cap on simultaneous outstanding per-sheet fetches.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 10;

/// Per-engine configuration, fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Rows per block of the block index. Block digests are only comparable
    /// between snapshots captured with the same block size, which is why
    /// this is per-engine, not per-call.
    pub block_size: u32,
    /// Bound on concurrent per-sheet operations. The backing source is
    /// rate-limited; this caps outstanding fetches, it is not a parallelism
    /// dial.
    pub max_concurrent_fetches: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

/// The tiered diff engine.
///
/// Holds the fetch capability and the per-instance configuration; all state
/// flows through arguments and return values.
pub struct DiffEngine {
    source: Arc<dyn GridDataSource>,
    config: EngineConfig,
}

impl DiffEngine {
    pub fn new(source: Arc<dyn GridDataSource>) -> Self {
        Self::with_config(source, EngineConfig::default())
    }

    pub fn with_config(source: Arc<dyn GridDataSource>, config: EngineConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build a snapshot by querying the backing source.
    ///
    /// Fetch depth follows the requested tier: metadata only, head/tail
    /// samples, or full cell values capped by the cell budget. Per-sheet
    /// fetches run concurrently, bounded by
    /// [`EngineConfig::max_concurrent_fetches`]. Fetch failures degrade to
    /// empty data (logged), they never propagate.
    pub async fn capture_state(&self, document_id: &str, options: &DiffOptions) -> DatasetState {
        capture::capture_state(self.source.as_ref(), &self.config, document_id, options).await
    }

    /// Build a snapshot from data a prior write already returned — no fetch.
    pub fn capture_state_from_mutation(
        &self,
        document_id: &str,
        payload: &MutationPayload,
        options: &DiffOptions,
    ) -> DatasetState {
        capture::capture_from_mutation(&self.config, document_id, payload, options)
    }

    /// Diff two snapshots at the requested tier (downgraded when the
    /// dataset outgrew it; the result reports the tier that actually ran).
    ///
    /// Sheet-level structural changes are computed at every tier. The only
    /// error is a malformed snapshot, which is a bug in the producer and
    /// fails fast; fetch failures and budget exhaustion are absorbed into a
    /// best-effort, well-formed result.
    pub async fn diff(
        &self,
        before: &DatasetState,
        after: &DatasetState,
        options: &DiffOptions,
    ) -> Result<DiffResult> {
        let before_by_id = metadata::index_sheets(before)?;
        let after_by_id = metadata::index_sheets(after)?;

        let sheet_changes = metadata::sheet_changes(before, after, &before_by_id, &after_by_id);

        let tier = tier::effective_tier(
            options.tier,
            before.total_cells(),
            after.total_cells(),
            options.cell_budget,
        );

        let report = match tier {
            DiffTier::Metadata => TierReport::Metadata(metadata::metadata_diff(before, after)),
            DiffTier::Sample => TierReport::Sample(
                sample::sample_diff(self.source.as_ref(), after, &before_by_id, options).await,
            ),
            DiffTier::Full => TierReport::Full(
                full::full_diff(
                    self.source.as_ref(),
                    &self.config,
                    before,
                    after,
                    &before_by_id,
                    &after_by_id,
                    options,
                )
                .await,
            ),
        };

        Ok(DiffResult {
            sheet_changes,
            report,
        })
    }
}
