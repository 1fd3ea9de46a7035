//! Dynamic column values and conversion into Rust scalars.
//!
//! A [`RowScanner`](crate::scan::RowScanner) hands each column of a row to its
//! destination as a [`Value`]. Scalar destinations turn that value into their
//! own type through [`FromValue`], following the assignment rules of a generic
//! SQL client: numbers are range-checked, text is parsed, and anything can be
//! rendered as text.

use std::fmt;
use std::str;

use bytes::Bytes;
use thiserror::Error;

/// A single column value as produced by a row scanner.
///
/// # Examples
///
/// ```
/// use rowmap::value::{FromValue, Value};
///
/// let value = Value::from("42");
/// assert_eq!(i32::from_value(&value).unwrap(), 42);
/// assert_eq!(value.kind(), "text");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Bytes),
}

impl Value {
    /// Short name of the value's variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Bytes(v) => write!(f, "{}", String::from_utf8_lossy(v)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Self::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// JSON fixtures: numbers keep their integer/float nature, arrays and objects
/// become their JSON text.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Text(other.to_string()),
        }
    }
}

/// Errors raised when a [`Value`] cannot be stored in a destination type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    #[error("cannot store NULL in `{target}`")]
    Null { target: &'static str },

    #[error("cannot convert {from} value to `{target}`")]
    Mismatch {
        from: &'static str,
        target: &'static str,
    },

    #[error("value {value} is out of range for `{target}`")]
    OutOfRange { value: String, target: &'static str },

    #[error("cannot parse {text:?} as `{target}`")]
    Parse { text: String, target: &'static str },

    #[error("bytes are not valid UTF-8 for `{target}`")]
    InvalidUtf8 { target: &'static str },
}

/// Conversion from a borrowed column value into an owned Rust scalar.
pub trait FromValue: Sized {
    /// Converts `value`, or explains why it does not fit.
    fn from_value(value: &Value) -> Result<Self, ConvertError>;
}

fn text_of<'v>(value: &'v Value, target: &'static str) -> Result<&'v str, ConvertError> {
    match value {
        Value::Text(s) => Ok(s),
        Value::Bytes(b) => str::from_utf8(b).map_err(|_| ConvertError::InvalidUtf8 { target }),
        other => Err(ConvertError::Mismatch {
            from: other.kind(),
            target,
        }),
    }
}

fn parse_text<T: str::FromStr>(text: &str, target: &'static str) -> Result<T, ConvertError> {
    text.trim().parse().map_err(|_| ConvertError::Parse {
        text: text.to_owned(),
        target,
    })
}

macro_rules! integer_from_value {
    ($($t:ty),* $(,)?) => {$(
        impl FromValue for $t {
            fn from_value(value: &Value) -> Result<Self, ConvertError> {
                const TARGET: &str = stringify!($t);
                match value {
                    Value::Null => Err(ConvertError::Null { target: TARGET }),
                    Value::Bool(b) => Ok(<$t>::from(*b)),
                    Value::Int(v) => <$t>::try_from(*v).map_err(|_| ConvertError::OutOfRange {
                        value: v.to_string(),
                        target: TARGET,
                    }),
                    Value::UInt(v) => <$t>::try_from(*v).map_err(|_| ConvertError::OutOfRange {
                        value: v.to_string(),
                        target: TARGET,
                    }),
                    Value::Float(_) => Err(ConvertError::Mismatch {
                        from: value.kind(),
                        target: TARGET,
                    }),
                    Value::Text(_) | Value::Bytes(_) => parse_text(text_of(value, TARGET)?, TARGET),
                }
            }
        }
    )*};
}

integer_from_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! float_from_value {
    ($($t:ty),* $(,)?) => {$(
        impl FromValue for $t {
            fn from_value(value: &Value) -> Result<Self, ConvertError> {
                const TARGET: &str = stringify!($t);
                match value {
                    Value::Null => Err(ConvertError::Null { target: TARGET }),
                    Value::Int(v) => Ok(*v as $t),
                    Value::UInt(v) => Ok(*v as $t),
                    Value::Float(v) => Ok(*v as $t),
                    Value::Bool(_) => Err(ConvertError::Mismatch {
                        from: value.kind(),
                        target: TARGET,
                    }),
                    Value::Text(_) | Value::Bytes(_) => parse_text(text_of(value, TARGET)?, TARGET),
                }
            }
        }
    )*};
}

float_from_value!(f32, f64);

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        const TARGET: &str = "bool";
        match value {
            Value::Null => Err(ConvertError::Null { target: TARGET }),
            Value::Bool(b) => Ok(*b),
            Value::Int(0) | Value::UInt(0) => Ok(false),
            Value::Int(1) | Value::UInt(1) => Ok(true),
            Value::Int(v) => Err(ConvertError::OutOfRange {
                value: v.to_string(),
                target: TARGET,
            }),
            Value::UInt(v) => Err(ConvertError::OutOfRange {
                value: v.to_string(),
                target: TARGET,
            }),
            Value::Float(_) => Err(ConvertError::Mismatch {
                from: value.kind(),
                target: TARGET,
            }),
            Value::Text(_) | Value::Bytes(_) => match text_of(value, TARGET)?.trim() {
                "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
                "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
                other => Err(ConvertError::Parse {
                    text: other.to_owned(),
                    target: TARGET,
                }),
            },
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        match value {
            Value::Null => Err(ConvertError::Null { target: "String" }),
            Value::Text(s) => Ok(s.clone()),
            Value::Bytes(_) => text_of(value, "String").map(str::to_owned),
            other => Ok(other.to_string()),
        }
    }
}

impl FromValue for Bytes {
    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        match value {
            Value::Null => Err(ConvertError::Null { target: "Bytes" }),
            Value::Bytes(b) => Ok(b.clone()),
            other => Ok(Bytes::from(other.to_string())),
        }
    }
}
