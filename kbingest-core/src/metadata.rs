//! Metadata is a key-value store carried by every node
//!
//! The header extractor and the keyword generator write into it, the uploader reads from it.
//! Keys are kept sorted so debug output and prompts are stable.
use std::collections::BTreeMap;

use serde::Deserializer;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    inner: BTreeMap<String, serde_json::Value>,
}

impl Metadata {
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.inner.iter()
    }

    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.inner.insert(key.into(), value.into());
    }

    pub fn get(&self, key: impl AsRef<str>) -> Option<&serde_json::Value> {
        self.inner.get(key.as_ref())
    }

    /// Returns the value as a string slice if it is present and a JSON string.
    pub fn get_str(&self, key: impl AsRef<str>) -> Option<&str> {
        self.get(key).and_then(serde_json::Value::as_str)
    }

    /// Returns the string entries of a JSON array value.
    ///
    /// Missing keys, non-array values and non-string entries yield nothing.
    pub fn get_str_list(&self, key: impl AsRef<str>) -> Vec<String> {
        self.get(key)
            .and_then(serde_json::Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|value| value.as_str().map(ToString::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K, V> From<Vec<(K, V)>> for Metadata
where
    K: Into<String>,
    V: Into<serde_json::Value>,
{
    fn from(items: Vec<(K, V)>) -> Self {
        let inner = items
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Metadata { inner }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Metadata
where
    K: Into<String>,
    V: Into<serde_json::Value>,
{
    fn from(arr: [(K, V); N]) -> Self {
        let inner = arr.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Metadata { inner }
    }
}

impl<'de> serde::Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::deserialize(deserializer).map(|inner| Metadata { inner })
    }
}

impl serde::Serialize for Metadata {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_get() {
        let mut metadata = Metadata::default();
        metadata.insert("source_url", "http://x");

        assert_eq!(metadata.get_str("source_url"), Some("http://x"));
        assert_eq!(metadata.get_str("missing"), None);
    }

    #[test]
    fn test_iter_is_sorted() {
        let mut metadata = Metadata::default();
        metadata.insert("source_url", json!("http://x"));
        metadata.insert("priority_date", json!("2023-01-05"));

        let keys = metadata.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["priority_date", "source_url"]);
    }

    #[test]
    fn test_get_str_list_skips_non_strings() {
        let metadata = Metadata::from([("keywords", json!(["rent", 3, "deposit"]))]);

        assert_eq!(metadata.get_str_list("keywords"), vec!["rent", "deposit"]);
        assert!(metadata.get_str_list("missing").is_empty());
    }

    #[test]
    fn test_get_str_list_on_non_array() {
        let metadata = Metadata::from(vec![("keywords", json!("rent"))]);

        assert!(metadata.get_str_list("keywords").is_empty());
    }

    #[test]
    fn test_serde_roundtrip_is_a_plain_map() {
        let metadata = Metadata::from([("source_url", json!("http://x"))]);
        let value = serde_json::to_value(&metadata).unwrap();

        assert_eq!(value, json!({"source_url": "http://x"}));
        assert_eq!(serde_json::from_value::<Metadata>(value).unwrap(), metadata);
    }
}
