//! Ordered key/value storage used for header fields and matched request parameters.
//!
//! Entries keep their insertion order and duplicate keys are legal; lookups return
//! the first matching entry. Key and value lengths are bounded and an entry exceeding
//! a bound is rejected rather than truncated.

use std::fmt;

use crate::ensure;
use crate::protocol::KeyValueError;

/// Default upper bound for the length of a key, in bytes
pub const DEFAULT_MAX_KEY_LEN: usize = 64;

/// Default upper bound for the length of a value, in bytes
pub const DEFAULT_MAX_VALUE_LEN: usize = 256;

#[derive(Clone, PartialEq, Eq)]
pub struct KeyValue {
    key: String,
    value: String,
}

impl KeyValue {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

/// An insertion-ordered list of key/value entries.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyValueList {
    entries: Vec<KeyValue>,
    max_key_len: usize,
    max_value_len: usize,
}

impl KeyValueList {
    /// Creates an empty list with the default key/value bounds.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_KEY_LEN, DEFAULT_MAX_VALUE_LEN)
    }

    /// Creates an empty list with explicit key/value bounds.
    pub fn with_limits(max_key_len: usize, max_value_len: usize) -> Self {
        Self { entries: Vec::new(), max_key_len, max_value_len }
    }

    /// Appends an entry at the end of the list.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty or either side exceeds its bound.
    pub fn push<K, V>(&mut self, key: K, value: V) -> Result<(), KeyValueError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        let value = value.into();

        ensure!(!key.is_empty(), KeyValueError::EmptyKey);
        ensure!(key.len() <= self.max_key_len, KeyValueError::TooLongKey { len: key.len(), max_len: self.max_key_len });
        ensure!(
            value.len() <= self.max_value_len,
            KeyValueError::TooLongValue { len: value.len(), max_len: self.max_value_len }
        );

        self.entries.push(KeyValue { key, value });
        Ok(())
    }

    /// Returns the value of the first entry whose key equals `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|entry| entry.key == key).map(KeyValue::value)
    }

    /// Returns the value of the first entry whose key equals `key`, ignoring ASCII case.
    ///
    /// Header field names are case-insensitive, so header lookups go through here.
    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|entry| entry.key.eq_ignore_ascii_case(key)).map(KeyValue::value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Removes the first entry whose key equals `key` and returns its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|entry| entry.key == key)?;
        Some(self.entries.remove(index).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|entry| (entry.key.as_str(), entry.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Releases every entry, keeping the configured bounds.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for KeyValueList {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyValueList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a KeyValueList {
    type Item = &'a KeyValue;
    type IntoIter = std::slice::Iter<'a, KeyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let mut list = KeyValueList::new();
        list.push("Host", "x").unwrap();
        list.push("Accept", "*/*").unwrap();
        list.push("User-Agent", "curl").unwrap();

        let keys = list.iter().map(|(k, _)| k).collect::<Vec<_>>();
        assert_eq!(keys, vec!["Host", "Accept", "User-Agent"]);
    }

    #[test]
    fn duplicate_keys_return_first() {
        let mut list = KeyValueList::new();
        list.push("a", "1").unwrap();
        list.push("b", "2").unwrap();
        list.push("a", "3").unwrap();

        assert_eq!(list.len(), 3);
        assert_eq!(list.get("a"), Some("1"));

        assert_eq!(list.remove("a"), Some("1".to_owned()));
        assert_eq!(list.get("a"), Some("3"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn lookup_ignore_case() {
        let mut list = KeyValueList::new();
        list.push("Content-Length", "10").unwrap();

        assert_eq!(list.get("content-length"), None);
        assert_eq!(list.get_ignore_case("content-length"), Some("10"));
    }

    #[test]
    fn rejects_oversize_entries() {
        let mut list = KeyValueList::with_limits(4, 4);

        assert_eq!(list.push("12345", "v"), Err(KeyValueError::TooLongKey { len: 5, max_len: 4 }));
        assert_eq!(list.push("k", "12345"), Err(KeyValueError::TooLongValue { len: 5, max_len: 4 }));
        assert_eq!(list.push("", "v"), Err(KeyValueError::EmptyKey));
        assert!(list.is_empty());

        list.push("1234", "1234").unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn clear_releases_everything() {
        let mut list = KeyValueList::new();
        list.push("a", "1").unwrap();
        list.push("b", "2").unwrap();
        list.clear();

        assert!(list.is_empty());
        assert_eq!(list.get("a"), None);
    }
}
