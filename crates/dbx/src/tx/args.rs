use crate::error::{DbxError, DbxResult};
use crate::value::{FromValue, Value};
use std::collections::HashMap;

/// Keyed arguments carried from one transaction step to the next.
///
/// Keys are unique; a later write replaces an earlier one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(HashMap<String, Value>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Args::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Copy every entry of `other` in, overwriting duplicates.
    pub fn merge(&mut self, other: &Args) {
        self.0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Typed read. A missing key is a configuration error.
    pub fn get_as<T: FromValue>(&self, key: &str) -> DbxResult<T> {
        let value = self
            .get(key)
            .ok_or_else(|| DbxError::config(format!("missing step argument '{key}'")))?;
        T::from_value(value).map_err(|e| match e {
            DbxError::Decode { message, .. } => DbxError::decode(key, message),
            other => other,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Args {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
