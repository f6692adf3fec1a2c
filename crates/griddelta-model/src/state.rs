use core::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::CellValue;

/// Stable numeric identifier of a sheet within a document.
///
/// Sheet *titles* can change between snapshots; the id never does, so all
/// cross-snapshot matching is keyed by it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetId(pub i64);

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 256-bit content hash used for cheap equality comparison.
///
/// Not a cryptographic commitment — just collision-resistant enough for
/// change detection, and stable across process restarts for identical
/// serialized input. Serialized as a lowercase hex string.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a 64-character lowercase/uppercase hex string.
    pub fn parse_hex(s: &str) -> Result<Self, DigestParseError> {
        if s.len() != 64 {
            return Err(DigestParseError::Length(s.len()));
        }
        let mut out = [0u8; 32];
        for (i, byte) in out.iter_mut().enumerate() {
            let pair = &s[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16).map_err(|_| DigestParseError::NonHex)?;
        }
        Ok(Self(out))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full hex is noise in test output; eight nibbles identify a digest.
        write!(f, "Digest({:02x}{:02x}{:02x}{:02x}…)", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

/// Errors that can occur when parsing a hex digest.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestParseError {
    #[error("digest hex must be 64 characters, got {0}")]
    Length(usize),
    #[error("digest contains non-hex characters")]
    NonHex,
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HexVisitor;

        impl Visitor<'_> for HexVisitor {
            type Value = Digest;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 64-character hex string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Digest, E> {
                Digest::parse_hex(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}

/// Bounded row samples taken from the start and end of a sheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowSample {
    /// Rows `[0, head.len())`.
    pub head: Vec<Vec<CellValue>>,
    /// Rows `[tail_start, tail_start + tail.len())`. Empty when the sheet is
    /// short enough that head and tail windows would overlap.
    pub tail: Vec<Vec<CellValue>>,
    /// Absolute index of the first tail row.
    pub tail_start: u32,
}

/// One sheet within a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetState {
    pub sheet_id: SheetId,
    pub title: String,
    pub row_count: u32,
    pub column_count: u32,
    /// Hash of the sheet's identity: metadata plus, when cells were
    /// captured, the per-block content digests. Two metadata-only captures
    /// of an unchanged sheet hash identically; a metadata-only capture and a
    /// full capture of the same sheet do *not*, which only ever makes the
    /// full differ do more work, never less.
    pub digest: Digest,
    /// One content hash per `block_size`-row window, present only when full
    /// cell values were captured. `block_digests[i]` covers rows
    /// `[i * block_size, (i + 1) * block_size)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_digests: Option<Vec<Digest>>,
    /// Head/tail row samples, present for SAMPLE-tier captures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<RowSample>,
    /// Full cell values, present only for FULL-tier captures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cells: Option<Vec<Vec<CellValue>>>,
}

impl SheetState {
    /// Nominal cell count (`rows × columns`), independent of what was
    /// actually captured.
    pub fn cell_count(&self) -> u64 {
        u64::from(self.row_count) * u64::from(self.column_count)
    }
}

/// Immutable snapshot of a document at a point in time.
///
/// Never mutated after creation; differs take two references and produce a
/// fresh result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetState {
    /// Identifier of the document (caller-supplied, opaque to the engine).
    pub id: String,
    pub captured_at: DateTime<Utc>,
    /// Sheets in document order, keyed by stable [`SheetId`].
    pub sheets: Vec<SheetState>,
    /// Hash over the ordered `(sheet_id, title, row_count, column_count)`
    /// tuples — metadata only, so metadata-only snapshots stay comparable to
    /// full snapshots for the O(1) "nothing changed" structural check.
    pub digest: Digest,
}

impl DatasetState {
    /// Total nominal cell count across all sheets.
    pub fn total_cells(&self) -> u64 {
        self.sheets.iter().map(SheetState::cell_count).sum()
    }
}
