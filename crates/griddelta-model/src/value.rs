use serde::{Deserialize, Serialize};
use std::fmt;

/// A single grid cell value.
///
/// The backing source returns raw typed values (`UNFORMATTED_VALUE`
/// semantics), so one grid freely intermixes strings, numbers, booleans and
/// nulls. The enum is a closed sum type: comparison is a tagged-union
/// equality check, never a loose cross-type comparison.
///
/// Serde is `untagged` so JSON scalars coming off the wire deserialize
/// directly (`5`, `"x"`, `true`, `null`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Empty / unset cell value.
    Null,
    /// Boolean.
    Boolean(bool),
    /// IEEE-754 double precision number.
    Number(f64),
    /// Plain string.
    String(String),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Null
    }
}

impl CellValue {
    /// Returns true if the value is [`CellValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(f64::from(value))
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str(""),
            CellValue::Boolean(b) => write!(f, "{b}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::String(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn untagged_serde_matches_wire_scalars() {
        let row: Vec<CellValue> = serde_json::from_str(r#"[1, "x", true, null]"#).unwrap();
        assert_eq!(
            row,
            vec![
                CellValue::Number(1.0),
                CellValue::String("x".into()),
                CellValue::Boolean(true),
                CellValue::Null,
            ]
        );
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"[1.0,"x",true,null]"#);
    }

    #[test]
    fn equality_is_tagged() {
        // "1" (string) and 1 (number) are different values.
        assert_ne!(CellValue::from("1"), CellValue::from(1.0));
        assert_ne!(CellValue::from(true), CellValue::from(1.0));
        assert_eq!(CellValue::from(1.0), CellValue::Number(1.0));
    }
}
