use griddelta_model::DiffTier;

/// Default head/tail window size for SAMPLE captures and diffs.
pub const DEFAULT_SAMPLE_SIZE: u32 = 10;

/// Default cell budget for a single capture or diff invocation.
pub const DEFAULT_CELL_BUDGET: u64 = 10_000;

/// A SAMPLE diff touches roughly an order of magnitude fewer cells than a
/// FULL scan, so it tolerates datasets up to this multiple of the budget
/// before degrading to METADATA.
pub const SAMPLE_HEADROOM: u64 = 10;

/// Per-call options for `capture_state` and `diff`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiffOptions {
    /// Requested fidelity tier. The selector may downgrade it; the tier that
    /// actually ran is reported on the result.
    pub tier: DiffTier,
    /// Rows per head/tail sample window.
    pub sample_size: u32,
    /// Maximum number of cells one invocation may inspect.
    pub cell_budget: u64,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            // The cheapest tier is the only safe default against a document
            // of unknown size.
            tier: DiffTier::Metadata,
            sample_size: DEFAULT_SAMPLE_SIZE,
            cell_budget: DEFAULT_CELL_BUDGET,
        }
    }
}

impl DiffOptions {
    pub fn tier(tier: DiffTier) -> Self {
        Self {
            tier,
            ..Self::default()
        }
    }
}

/// Decide the tier to actually run.
///
/// Protects callers from accidentally requesting expensive work on datasets
/// that have grown since the tier was last appropriate:
/// - FULL downgrades to SAMPLE when the larger snapshot exceeds the budget;
/// - SAMPLE downgrades to METADATA beyond `SAMPLE_HEADROOM ×` the budget.
pub fn effective_tier(
    requested: DiffTier,
    before_cells: u64,
    after_cells: u64,
    cell_budget: u64,
) -> DiffTier {
    let cells = before_cells.max(after_cells);
    let effective = match requested {
        DiffTier::Full if cells > cell_budget => DiffTier::Sample,
        DiffTier::Sample if cells > cell_budget.saturating_mul(SAMPLE_HEADROOM) => {
            DiffTier::Metadata
        }
        other => other,
    };
    if effective != requested {
        log::debug!(
            "downgrading {requested} diff to {effective}: {cells} cells vs budget {cell_budget}"
        );
    }
    effective
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_downgrades_to_sample_over_budget() {
        assert_eq!(
            effective_tier(DiffTier::Full, 5_000, 100, 1_000),
            DiffTier::Sample
        );
        assert_eq!(
            effective_tier(DiffTier::Full, 100, 5_000, 1_000),
            DiffTier::Sample
        );
    }

    #[test]
    fn full_runs_at_or_under_budget() {
        assert_eq!(
            effective_tier(DiffTier::Full, 1_000, 1_000, 1_000),
            DiffTier::Full
        );
    }

    #[test]
    fn sample_downgrades_to_metadata_past_headroom() {
        assert_eq!(
            effective_tier(DiffTier::Sample, 10_001, 0, 1_000),
            DiffTier::Metadata
        );
        assert_eq!(
            effective_tier(DiffTier::Sample, 10_000, 0, 1_000),
            DiffTier::Sample
        );
    }

    #[test]
    fn metadata_never_downgrades() {
        assert_eq!(
            effective_tier(DiffTier::Metadata, u64::MAX, u64::MAX, 1),
            DiffTier::Metadata
        );
    }
}
