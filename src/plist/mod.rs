//! Property list wire codec.
//!
//! Every request and response body exchanged with the store backend is a
//! property list whose root is a dictionary. Requests are written in the XML
//! form; responses are accepted in either the XML or the binary (`bplist00`)
//! form.
//!
//! ```rust
//! use storenet::plist::{self, Dictionary};
//!
//! let mut dict = Dictionary::new();
//! dict.insert("guid", "A1B2C3D4E5F6");
//! dict.insert("salableAdamId", 284882215_i64);
//!
//! let body = plist::to_xml(&dict);
//! let decoded = plist::from_bytes(&body).unwrap();
//! assert_eq!(decoded, dict);
//! ```

pub mod binary;
pub mod reader;
pub mod writer;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use time::OffsetDateTime;

use crate::base::storeerror::StoreError;

pub use writer::to_xml;

/// Media type of request bodies.
pub const CONTENT_TYPE: &str = "application/x-apple-plist";

/// Decode a response body in either XML or binary form.
pub fn from_bytes(data: &[u8]) -> Result<Dictionary, StoreError> {
    if data.starts_with(binary::MAGIC) {
        binary::from_slice(data)
    } else {
        reader::from_slice(data)
    }
}

/// A single property list value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Data(Vec<u8>),
    Date(OffsetDateTime),
    Array(Vec<Value>),
    Dictionary(Dictionary),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Value::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Binary payload, accepting both raw data and base64 text.
    ///
    /// The backend sends some blobs as `<data>` and others as base64 inside a
    /// `<string>`; both normalize to the same bytes here. Returns `None` for
    /// any other type or for text that is not valid base64.
    pub fn data_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Value::Data(bytes) => Some(bytes.clone()),
            Value::String(text) => {
                let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                STANDARD.decode(compact).ok()
            }
            _ => None,
        }
    }

    /// Scalar rendered as text; failure codes arrive as either strings or integers.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Real(r) => Some(r.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Data(bytes)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(date: OffsetDateTime) -> Self {
        Value::Date(date)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Dictionary> for Value {
    fn from(dict: Dictionary) -> Self {
        Value::Dictionary(dict)
    }
}

/// Insertion-ordered string-keyed map.
///
/// Entries keep document order; lookups are linear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: Vec<(String, Value)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing an existing key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_dictionary(&self, key: &str) -> Option<&Dictionary> {
        self.get(key).and_then(Value::as_dictionary)
    }

    pub fn get_array(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_array)
    }

    /// Scalar at `key` rendered as text, ignoring empty strings.
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(Value::to_text)
            .filter(|text| !text.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Dictionary::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}
