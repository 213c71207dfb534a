//! Tiered configuration resolution.
//!
//! Config values live in up to four levels: the item itself, the shared
//! main entry it references, the user defaults, and the built-in hard
//! defaults. Resolution walks an explicit ordered list of levels and
//! returns the first usable value, so no level ever holds a pointer into
//! another level's map. `${VAR}` references are expanded against the
//! process environment during resolution; a value that expands to empty
//! counts as unset and resolution continues to the next level.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// String-keyed option map with case-insensitive keys.
///
/// Keys are lower-cased on insertion, including when deserialized from
/// configuration, so lookups never have to worry about case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldMap(BTreeMap<String, String>);

impl FieldMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.0.get(&key.to_lowercase()).map_or("", String::as_str)
    }

    /// Sets `key` (lower-cased) to `value`.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_lowercase(), value.into());
    }

    /// Removes `key` from the map.
    pub fn remove(&mut self, key: &str) {
        self.0.remove(&key.to_lowercase());
    }

    /// Whether the map holds no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        let mut map = Self::new();
        for (key, value) in raw {
            map.set(&key, value);
        }
        Ok(map)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for FieldMap {
    fn from(entries: [(&str, &str); N]) -> Self {
        let mut map = Self::new();
        for (key, value) in entries {
            map.set(key, value);
        }
        map
    }
}

/// Expands `${VAR}` references in `value` against the process environment.
///
/// Unset variables expand to the empty string. Values without a `${`
/// marker are returned untouched, so already-empty values never go
/// through substitution.
pub fn expand_env(value: &str) -> String {
    if !value.contains("${") {
        return value.to_string();
    }
    ENV_VAR
        .replace_all(value, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

/// Resolves `key` through an ordered list of levels.
///
/// The first level holding a non-empty value for `key` (after environment
/// expansion) wins. A key present only at a lower level stays visible even
/// when the item defines other keys itself. Absence yields `""`.
pub fn resolve(levels: &[&FieldMap], key: &str) -> String {
    for level in levels {
        let raw = level.get(key);
        if raw.is_empty() {
            continue;
        }
        let expanded = expand_env(raw);
        if !expanded.is_empty() {
            return expanded;
        }
    }
    String::new()
}

/// Returns the first non-empty string (after environment expansion).
pub fn first_non_empty<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    for value in values {
        if value.is_empty() {
            continue;
        }
        let expanded = expand_env(value);
        if !expanded.is_empty() {
            return expanded;
        }
    }
    String::new()
}

/// Returns the first `Some` in a chain of typed option levels.
pub fn first_some<T: Copy>(values: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    values.into_iter().flatten().next()
}

/// Union of keys across levels, each resolved through the full chain.
pub fn resolve_all(levels: &[&FieldMap]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for level in levels {
        for (key, _) in level.iter() {
            if !out.contains_key(key) {
                let value = resolve(levels, key);
                out.insert(key.to_string(), value);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_lowercased_on_insertion() {
        let mut map = FieldMap::new();
        map.set("ToKeN", "abc");
        assert_eq!(map.get("token"), "abc");
        assert_eq!(map.get("TOKEN"), "abc");
    }

    #[test]
    fn resolve_prefers_lower_levels() {
        let item = FieldMap::from([("host", "item.example.com")]);
        let main = FieldMap::from([("host", "main.example.com"), ("port", "8080")]);
        let defaults = FieldMap::from([("host", "default.example.com"), ("token", "tok")]);

        let levels: [&FieldMap; 3] = [&item, &main, &defaults];
        assert_eq!(resolve(&levels, "host"), "item.example.com");
        assert_eq!(resolve(&levels, "port"), "8080");
        assert_eq!(resolve(&levels, "token"), "tok");
        assert_eq!(resolve(&levels, "missing"), "");
    }

    #[test]
    fn empty_value_does_not_mask_lower_level() {
        let item = FieldMap::from([("host", "")]);
        let defaults = FieldMap::from([("host", "fallback.example.com")]);
        assert_eq!(resolve(&[&item, &defaults], "host"), "fallback.example.com");
    }

    #[test]
    fn env_expansion_applies_to_winning_value() {
        std::env::set_var("VIGIL_TEST_CASCADE_HOST", "envhost");
        let item = FieldMap::from([("host", "${VIGIL_TEST_CASCADE_HOST}")]);
        assert_eq!(resolve(&[&item], "host"), "envhost");
    }

    #[test]
    fn empty_env_var_counts_as_unset() {
        std::env::remove_var("VIGIL_TEST_CASCADE_UNSET");
        let item = FieldMap::from([("host", "${VIGIL_TEST_CASCADE_UNSET}")]);
        let defaults = FieldMap::from([("host", "fallback")]);
        assert_eq!(resolve(&[&item, &defaults], "host"), "fallback");
    }

    #[test]
    fn partial_env_expansion() {
        std::env::set_var("VIGIL_TEST_CASCADE_PART", "bar");
        let item = FieldMap::from([("host", "foo-${VIGIL_TEST_CASCADE_PART}")]);
        assert_eq!(resolve(&[&item], "host"), "foo-bar");
    }

    #[test]
    fn first_some_walks_chain() {
        assert_eq!(first_some([None, Some(3_u8), Some(7)]), Some(3));
        assert_eq!(first_some([None::<u8>, None]), None);
    }

    #[test]
    fn resolve_all_merges_key_union() {
        let item = FieldMap::from([("a", "1")]);
        let defaults = FieldMap::from([("a", "x"), ("b", "2")]);
        let merged = resolve_all(&[&item, &defaults]);
        assert_eq!(merged.get("a").map(String::as_str), Some("1"));
        assert_eq!(merged.get("b").map(String::as_str), Some("2"));
    }
}
