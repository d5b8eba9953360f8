use super::error::BencodeError;
use super::value::Value;
use bytes::Bytes;
use std::collections::BTreeMap;
use tracing::trace;

/// Builds a dictionary value key by key.
#[derive(Debug, Clone, Default)]
pub struct DictBuilder {
    entries: BTreeMap<Bytes, Value>,
}

impl DictBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.entries
            .insert(Bytes::copy_from_slice(key.as_bytes()), value.into());
        self
    }

    /// Inserts the key only when `value` is `Some`.
    pub fn insert_opt<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.insert(key, value),
            None => self,
        }
    }

    /// Adds raw entries; keys already present are kept.
    pub fn extend<'a>(mut self, entries: impl IntoIterator<Item = (&'a Bytes, &'a Value)>) -> Self {
        for (key, value) in entries {
            self.entries
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }

    pub fn build(self) -> Value {
        Value::Dict(self.entries)
    }
}

/// Typed access to the keys of a dictionary value.
///
/// `required_*` lookups fail when the key is missing or has the wrong type.
/// `optional_*` lookups treat a mistyped value the same as a missing one.
#[derive(Debug, Clone, Copy)]
pub struct DictReader<'a> {
    dict: &'a BTreeMap<Bytes, Value>,
}

impl<'a> DictReader<'a> {
    pub fn new(value: &'a Value) -> Result<Self, BencodeError> {
        value
            .as_dict()
            .map(|dict| Self { dict })
            .ok_or(BencodeError::NotADict)
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.dict.get(key.as_bytes())
    }

    fn required<T>(
        &self,
        key: &str,
        expected: &'static str,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, BencodeError> {
        let value = self
            .get(key)
            .ok_or_else(|| BencodeError::MissingKey(key.into()))?;
        extract(value).ok_or_else(|| BencodeError::WrongType {
            key: key.into(),
            expected,
        })
    }

    fn optional<T>(&self, key: &str, extract: impl FnOnce(&'a Value) -> Option<T>) -> Option<T> {
        let value = self.get(key)?;
        let out = extract(value);
        if out.is_none() {
            trace!(key, kind = value.kind(), "ignoring mistyped optional key");
        }
        out
    }

    pub fn required_int(&self, key: &str) -> Result<i64, BencodeError> {
        self.required(key, "integer", Value::as_integer)
    }

    pub fn required_dict(&self, key: &str) -> Result<&'a BTreeMap<Bytes, Value>, BencodeError> {
        self.required(key, "dictionary", Value::as_dict)
    }

    pub fn optional_int(&self, key: &str) -> Option<i64> {
        self.optional(key, Value::as_integer)
    }

    pub fn optional_bytes(&self, key: &str) -> Option<&'a Bytes> {
        self.optional(key, Value::as_bytes)
    }

    pub fn optional_str(&self, key: &str) -> Option<&'a str> {
        self.optional(key, Value::as_str)
    }

    /// Entries whose key is not in `known`.
    pub fn unknown<'k>(
        &self,
        known: &'k [&'k str],
    ) -> impl Iterator<Item = (&'a Bytes, &'a Value)> + 'k
    where
        'a: 'k,
    {
        let dict = self.dict;
        dict.iter()
            .filter(move |(key, _)| !known.iter().any(|k| k.as_bytes() == &key[..]))
    }
}
