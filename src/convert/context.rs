//! Per-record field access over a loosely typed field bag
//!
//! Source tables are not consistent about representation: the same column may
//! hold reals in one dump, integers in another, and numeric text in a third.
//! The context coerces on read and reports anything else as absent.

use std::fmt;

use ahash::AHashMap;

/// One raw field value as read from the source store
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Float(f64),
    Int(i64),
    /// Fixed-point decimal: `units / 10^scale`
    Fixed { units: i64, scale: u32 },
    Text(String),
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// Numeric coercion; `None` for null, blobs, unparseable text, and
    /// non-finite results.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            FieldValue::Float(v) => *v,
            FieldValue::Int(v) => *v as f64,
            FieldValue::Fixed { units, scale } => *units as f64 / 10f64.powi(*scale as i32),
            FieldValue::Text(text) => text.trim().parse::<f64>().ok()?,
            FieldValue::Null | FieldValue::Bytes(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Fixed { .. } => match self.as_number() {
                Some(v) => write!(f, "{}", v),
                None => Ok(()),
            },
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Bytes(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Read-only view over one record's fields. Names match case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct WorkerContext {
    fields: AHashMap<String, FieldValue>,
}

impl WorkerContext {
    pub fn new<K, I>(fields: I) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, FieldValue)>,
    {
        let fields = fields
            .into_iter()
            .map(|(name, value)| (name.as_ref().to_ascii_lowercase(), value))
            .collect();
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(&field.to_ascii_lowercase())
    }

    pub fn try_get_number(&self, field: &str) -> Option<f64> {
        self.get(field)?.as_number()
    }

    /// Any non-null value rendered as text
    pub fn try_get_string(&self, field: &str) -> Option<String> {
        self.get(field)
            .filter(|value| !value.is_null())
            .map(ToString::to_string)
    }
}
