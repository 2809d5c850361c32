//! Raw coded values used as keys of value-label mappings.

use std::cmp::Ordering;
use std::fmt;

use serde::{Serialize, Serializer};

/// A coded value exactly as it appears in a source file.
///
/// Statistical formats store categorical data as codes (`1`, `2`, `"M"`) and
/// attach human-readable labels to them. Integral floating point codes are
/// normalized to [`ValueCode::Int`] so that `1.0` from an SPSS file and `1`
/// from a Stata file key the same entry.
#[derive(Debug, Clone)]
pub enum ValueCode {
    /// Integer code.
    Int(i64),
    /// Non-integral numeric code.
    Float(f64),
    /// String code.
    Text(String),
}

impl ValueCode {
    /// Builds a code from a float, collapsing integral values to `Int`.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
            Self::Int(value as i64)
        } else {
            Self::Float(value)
        }
    }

    /// Builds a text code.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Returns the code as a float when it is numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Int(_) | Self::Float(_) => 0,
            Self::Text(_) => 1,
        }
    }
}

impl From<i64> for ValueCode {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ValueCode {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ValueCode {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl From<&str> for ValueCode {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ValueCode {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl PartialEq for ValueCode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ValueCode {}

impl PartialOrd for ValueCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ValueCode {
    // Numbers sort before text; numbers compare by value across variants.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Int(_) | Self::Float(_), Self::Int(_) | Self::Float(_)) => {
                let a = self.as_f64().unwrap_or(f64::NAN);
                let b = other.as_f64().unwrap_or(f64::NAN);
                a.total_cmp(&b)
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for ValueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl Serialize for ValueCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_floats_collapse_to_int() {
        assert_eq!(ValueCode::from_f64(1.0), ValueCode::Int(1));
        assert!(matches!(ValueCode::from_f64(1.5), ValueCode::Float(_)));
        assert!(matches!(ValueCode::from_f64(f64::NAN), ValueCode::Float(_)));
    }

    #[test]
    fn test_numbers_order_before_text() {
        let mut codes = vec![
            ValueCode::text("b"),
            ValueCode::Float(2.5),
            ValueCode::Int(3),
            ValueCode::Int(1),
        ];
        codes.sort();
        assert_eq!(
            codes,
            vec![
                ValueCode::Int(1),
                ValueCode::Float(2.5),
                ValueCode::Int(3),
                ValueCode::text("b"),
            ]
        );
    }

    #[test]
    fn test_display_matches_source_rendering() {
        assert_eq!(ValueCode::Int(7).to_string(), "7");
        assert_eq!(ValueCode::Float(0.5).to_string(), "0.5");
        assert_eq!(ValueCode::text("M").to_string(), "M");
    }
}
