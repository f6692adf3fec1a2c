//! `griddelta-model` defines the value objects shared by the diff engine and
//! its callers.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - the tiered diff engine (`griddelta-engine`)
//! - adapters that implement the grid data source against a real backend
//! - IPC boundaries via `serde` (JSON-safe schema)
//!
//! Everything here is an immutable in-process value: snapshots are built
//! once, compared, and discarded. No I/O lives in this crate.

mod address;
mod diff;
mod state;
mod value;

pub use address::{qualify_cell, A1ParseError, CellRef};
pub use diff::{
    CellChange, ChangeKind, DiffResult, DiffTier, FullReport, MetadataReport, SampleChange,
    SampleRegion, SampleReport, SheetChanges, SheetRename, SheetSummary, TierReport,
};
pub use state::{DatasetState, Digest, DigestParseError, RowSample, SheetId, SheetState};
pub use value::CellValue;
