//! Field types and values
//!
//! The set of column types is closed. Every consumer (parsing, ordering,
//! rendering, code generation) matches exhaustively, so adding a type is a
//! compile error everywhere it needs handling.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Declared or resolved type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl FieldType {
    /// Every type, in keyword order
    pub const ALL: [FieldType; 12] = [
        Self::String,
        Self::Bool,
        Self::Int8,
        Self::UInt8,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
    ];

    /// Header keyword for this type
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Look up a header keyword (exact, lowercase)
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.keyword() == keyword)
    }

    /// Integer or floating point
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::String | Self::Bool)
    }

    /// Signed or unsigned integer
    pub fn is_integer(&self) -> bool {
        self.is_numeric() && !matches!(self, Self::Float32 | Self::Float64)
    }

    /// Parse a raw cell into a value of this type.
    ///
    /// Conversion is exact: the whole string must be consumed and the value
    /// must fit the width. Booleans accept only `0` and `1`. A leading `+` is
    /// rejected so that every accepted literal has a single canonical form.
    pub fn parse(&self, raw: &str) -> Option<Field> {
        if self.is_numeric() && raw.starts_with('+') {
            return None;
        }

        match self {
            Self::String => Some(Field::String(raw.to_string())),
            Self::Bool => match raw {
                "0" => Some(Field::Bool(false)),
                "1" => Some(Field::Bool(true)),
                _ => None,
            },
            Self::Int8 => raw.parse().ok().map(Field::Int8),
            Self::Int16 => raw.parse().ok().map(Field::Int16),
            Self::Int32 => raw.parse().ok().map(Field::Int32),
            Self::Int64 => raw.parse().ok().map(Field::Int64),
            Self::UInt8 => raw.parse().ok().map(Field::UInt8),
            Self::UInt16 => raw.parse().ok().map(Field::UInt16),
            Self::UInt32 => raw.parse().ok().map(Field::UInt32),
            Self::UInt64 => raw.parse().ok().map(Field::UInt64),
            Self::Float32 => parse_float::<f32>(raw).map(Field::Float32),
            Self::Float64 => parse_float::<f64>(raw).map(Field::Float64),
        }
    }
}

/// Parse a float, rejecting finite literals that overflow the width.
/// Spelled-out infinities still parse.
fn parse_float<F>(raw: &str) -> Option<F>
where
    F: std::str::FromStr + Into<f64> + Copy,
{
    let value: F = raw.parse().ok()?;
    if value.into().is_infinite() && !is_infinity_literal(raw) {
        return None;
    }
    Some(value)
}

fn is_infinity_literal(raw: &str) -> bool {
    let unsigned = raw.strip_prefix('-').unwrap_or(raw);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A single typed cell value
///
/// Ordering is total: values of different types order by type, strings
/// compare bytewise, numbers numerically. Floats use IEEE-754 `totalOrder`,
/// so `-0 < 0` and a NaN equals only a NaN with the same bits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field {
    String(String),
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
}

impl Field {
    /// Type of this value
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::String(_) => FieldType::String,
            Self::Bool(_) => FieldType::Bool,
            Self::Int8(_) => FieldType::Int8,
            Self::Int16(_) => FieldType::Int16,
            Self::Int32(_) => FieldType::Int32,
            Self::Int64(_) => FieldType::Int64,
            Self::UInt8(_) => FieldType::UInt8,
            Self::UInt16(_) => FieldType::UInt16,
            Self::UInt32(_) => FieldType::UInt32,
            Self::UInt64(_) => FieldType::UInt64,
            Self::Float32(_) => FieldType::Float32,
            Self::Float64(_) => FieldType::Float64,
        }
    }

    /// Borrow the string payload, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// True if this is a number exactly equal to `index`
    pub fn is_index(&self, index: u64) -> bool {
        match *self {
            Self::String(_) | Self::Bool(_) => false,
            Self::Int8(v) => i128::from(v) == i128::from(index),
            Self::Int16(v) => i128::from(v) == i128::from(index),
            Self::Int32(v) => i128::from(v) == i128::from(index),
            Self::Int64(v) => i128::from(v) == i128::from(index),
            Self::UInt8(v) => u64::from(v) == index,
            Self::UInt16(v) => u64::from(v) == index,
            Self::UInt32(v) => u64::from(v) == index,
            Self::UInt64(v) => v == index,
            Self::Float32(v) => f64::from(v) == index as f64,
            Self::Float64(v) => v == index as f64,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::String(_) => 0,
            Self::Bool(_) => 1,
            Self::Int8(_) => 2,
            Self::Int16(_) => 3,
            Self::Int32(_) => 4,
            Self::Int64(_) => 5,
            Self::UInt8(_) => 6,
            Self::UInt16(_) => 7,
            Self::UInt32(_) => 8,
            Self::UInt64(_) => 9,
            Self::Float32(_) => 10,
            Self::Float64(_) => 11,
        }
    }
}

impl Ord for Field {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int8(a), Self::Int8(b)) => a.cmp(b),
            (Self::Int16(a), Self::Int16(b)) => a.cmp(b),
            (Self::Int32(a), Self::Int32(b)) => a.cmp(b),
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            (Self::UInt8(a), Self::UInt8(b)) => a.cmp(b),
            (Self::UInt16(a), Self::UInt16(b)) => a.cmp(b),
            (Self::UInt32(a), Self::UInt32(b)) => a.cmp(b),
            (Self::UInt64(a), Self::UInt64(b)) => a.cmp(b),
            (Self::Float32(a), Self::Float32(b)) => a.total_cmp(b),
            (Self::Float64(a), Self::Float64(b)) => a.total_cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Field {}

/// Canonical text: strings verbatim, `0`/`1` for booleans, shortest
/// round-trip text for numbers.
impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(v) => f.write_str(v),
            Self::Bool(v) => f.write_str(if *v { "1" } else { "0" }),
            Self::Int8(v) => write!(f, "{}", v),
            Self::Int16(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::UInt8(v) => write!(f, "{}", v),
            Self::UInt16(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::UInt64(v) => write!(f, "{}", v),
            Self::Float32(v) => write!(f, "{}", v),
            Self::Float64(v) => write!(f, "{}", v),
        }
    }
}
