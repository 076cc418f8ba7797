//! Cell value types

use num_complex::Complex64;
use std::fmt;

/// A resolved cell value
///
/// One case per concrete kind, so callers pattern-match rather than inspect.
/// With the `serde` feature values serialize untagged; numbers that JSON
/// cannot hold are written as `{"number": "NaN"}`, `"Infinity"` or
/// `"-Infinity"`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum CellValue {
    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Numeric value
    Number(#[cfg_attr(feature = "serde", serde(with = "number_repr"))] f64),

    /// Text value
    Text(String),

    /// Complex number (e.g. the result of `SQRT(-1)`)
    Complex(Complex64),
}

impl CellValue {
    /// Create a new text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        CellValue::Text(s.into())
    }

    /// Create a complex value from its parts
    pub fn complex(re: f64, im: f64) -> Self {
        CellValue::Complex(Complex64::new(re, im))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Boolean(true) => f.write_str("TRUE"),
            CellValue::Boolean(false) => f.write_str("FALSE"),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Complex(c) => write!(f, "{}", c),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<Complex64> for CellValue {
    fn from(c: Complex64) -> Self {
        CellValue::Complex(c)
    }
}

#[cfg(feature = "serde")]
mod number_repr {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Finite(f64),
        Special { number: String },
    }

    pub fn serialize<S: Serializer>(n: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = if n.is_finite() {
            Repr::Finite(*n)
        } else if n.is_nan() {
            Repr::Special { number: "NaN".to_string() }
        } else if n.is_sign_positive() {
            Repr::Special { number: "Infinity".to_string() }
        } else {
            Repr::Special { number: "-Infinity".to_string() }
        };
        repr.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Finite(n) => Ok(n),
            Repr::Special { number } => match number.as_str() {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => Err(de::Error::custom(format_args!("unknown number {:?}", other))),
            },
        }
    }
}
