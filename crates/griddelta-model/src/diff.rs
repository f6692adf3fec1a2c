use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{CellValue, SheetId};

/// Fidelity tier of a diff: increasing cost, increasing exactness.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiffTier {
    /// Structural comparison only (sheet add/remove/rename, count deltas).
    Metadata,
    /// Bounded head/tail row samples per sheet.
    Sample,
    /// Exact cell-level diff bounded by a cell budget.
    Full,
}

impl DiffTier {
    pub fn as_str(self) -> &'static str {
        match self {
            DiffTier::Metadata => "METADATA",
            DiffTier::Sample => "SAMPLE",
            DiffTier::Full => "FULL",
        }
    }
}

impl fmt::Display for DiffTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of a sheet that appeared or disappeared between two snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetSummary {
    pub sheet_id: SheetId,
    pub title: String,
    pub row_count: u32,
    pub column_count: u32,
}

/// A sheet whose stable id survived but whose title changed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetRename {
    pub sheet_id: SheetId,
    pub old_title: String,
    pub new_title: String,
}

/// Sheet-level structural changes. Populated at every tier — a removed
/// zero-row sheet is invisible to row-level output, so this block is the
/// only place it shows up.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetChanges {
    pub added: Vec<SheetSummary>,
    pub removed: Vec<SheetSummary>,
    pub renamed: Vec<SheetRename>,
}

impl SheetChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.renamed.is_empty()
    }
}

/// Classification of a single cell change in the FULL tier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Present on both sides with different values.
    Value,
    /// Present only in "after".
    Added,
    /// Present only in "before".
    Removed,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Value => "value",
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
        }
    }
}

/// One exact cell-level change record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellChange {
    /// Sheet-qualified A1 reference (e.g. `Sheet1!B1`).
    pub cell: String,
    pub before: Option<CellValue>,
    pub after: Option<CellValue>,
    pub kind: ChangeKind,
}

/// Payload of a METADATA-tier diff.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataReport {
    /// Total row-count delta summed across sheets (after − before).
    pub row_delta: i64,
    /// Total column-count delta summed across sheets (after − before).
    pub column_delta: i64,
    /// Crude magnitude heuristic; see the engine's
    /// `ESTIMATED_CHANGED_FRACTION` for the caveats.
    pub estimated_cells_changed: u64,
}

/// Which sample window a sampled change fell into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleRegion {
    Head,
    Tail,
    /// Outside both windows of the "after" sheet (possible when the sheets
    /// have different lengths and the windows shift).
    Other,
}

/// One change observed inside a sampled row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleChange {
    /// Sheet-qualified A1 reference.
    pub cell: String,
    pub before: Option<CellValue>,
    pub after: Option<CellValue>,
    pub region: SampleRegion,
}

/// Payload of a SAMPLE-tier diff: statistical change indicators over the
/// sampled rows, not an exact answer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleReport {
    pub changes: Vec<SampleChange>,
    /// Distinct absolute row indices with at least one sampled change.
    pub rows_changed: u64,
    /// Cell positions actually inspected.
    pub cells_sampled: u64,
}

/// Payload of a FULL-tier diff.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FullReport {
    pub changes: Vec<CellChange>,
    /// Cells accounted against the budget, including cells in unchanged
    /// blocks that were skipped without a per-cell comparison. May be less
    /// than the theoretical total when the budget ran out — that is normal
    /// termination, not an error.
    pub cells_compared: u64,
    pub cells_added: u64,
    pub cells_removed: u64,
}

/// Tier-specific diff payload, discriminated by the tier that actually ran.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "UPPERCASE")]
pub enum TierReport {
    Metadata(MetadataReport),
    Sample(SampleReport),
    Full(FullReport),
}

/// The result of one diff invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Structural sheet changes — always populated, whatever the tier.
    pub sheet_changes: SheetChanges,
    pub report: TierReport,
}

impl DiffResult {
    /// The tier that actually ran (after any downgrade).
    pub fn tier(&self) -> DiffTier {
        match self.report {
            TierReport::Metadata(_) => DiffTier::Metadata,
            TierReport::Sample(_) => DiffTier::Sample,
            TierReport::Full(_) => DiffTier::Full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tier_report_serializes_with_tier_tag() {
        let report = TierReport::Metadata(MetadataReport {
            row_delta: 2,
            column_delta: 0,
            estimated_cells_changed: 10,
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["tier"], "METADATA");
        assert_eq!(json["row_delta"], 2);
    }

    #[test]
    fn result_tier_tracks_payload() {
        let result = DiffResult {
            sheet_changes: SheetChanges::default(),
            report: TierReport::Full(FullReport::default()),
        };
        assert_eq!(result.tier(), DiffTier::Full);
        assert_eq!(result.tier().as_str(), "FULL");
    }
}
