//! # Layout Parameters
//!
//! Namespaced key/value storage attached to lines and tokens, plus the parser
//! for the comments that carry parameters.
//!
//! ## Comment Grammar
//! ```text
//! !NS1:NS2:key=value:key2=value2     local  (attaches to the next token in the spine)
//! !!NS1:NS2:key=value                global (attaches to the next data line)
//! ```
//! - A key without `=` is stored with the value `"true"`.
//! - `&colon;` inside a key or value stands for a literal `:`.
//! - Empty namespace segments (`!LO::key`) are stored as empty strings.
//! - No space or tab may appear before the second colon, so prose comments
//!   such as `! note: see bar 3` are not mistaken for parameters.
//!
//! ## Storage
//! [`ParameterStore`] maps `(ns1, ns2, key)` to a [`Parameter`]. The store
//! allocates nothing until the first write; most tokens never carry
//! parameters.
//!
//! ## Example
//! ```rust
//! use humdrum::parameters::{parse_parameter_comment, ParameterScope};
//!
//! let comment = parse_parameter_comment("!LO:N:vis=1:t").unwrap();
//! assert_eq!(comment.scope, ParameterScope::Local);
//! assert_eq!(comment.ns1, "LO");
//! assert_eq!(comment.entries[1], ("t".to_string(), "true".to_string()));
//! ```

use std::collections::BTreeMap;

use crate::rational::Rational;
use crate::token::TokenId;

/// A stored parameter value and the comment token that supplied it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub value: String,
    pub origin: Option<TokenId>,
}

type KeyMap = BTreeMap<String, Parameter>;
type Namespaces = BTreeMap<String, BTreeMap<String, KeyMap>>;

/// Three-level namespaced parameter map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterStore {
    entries: Option<Box<Namespaces>>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of stored keys across all namespaces.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |ns| {
            ns.values()
                .flat_map(|ns2| ns2.values())
                .map(|keys| keys.len())
                .sum()
        })
    }

    pub fn parameter(&self, ns1: &str, ns2: &str, key: &str) -> Option<&Parameter> {
        self.entries.as_ref()?.get(ns1)?.get(ns2)?.get(key)
    }

    pub fn get(&self, ns1: &str, ns2: &str, key: &str) -> Option<&str> {
        self.parameter(ns1, ns2, key).map(|p| p.value.as_str())
    }

    /// Look up a colon-separated path: `key`, `ns2:key` or `ns1:ns2:key`.
    pub fn get_path(&self, path: &str) -> Option<&str> {
        let (ns1, ns2, key) = split_path(path);
        self.get(ns1, ns2, key)
    }

    pub fn contains(&self, ns1: &str, ns2: &str, key: &str) -> bool {
        self.parameter(ns1, ns2, key).is_some()
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.get_path(path).is_some()
    }

    /// The comment token that supplied a parameter, if it was propagated.
    pub fn origin(&self, ns1: &str, ns2: &str, key: &str) -> Option<TokenId> {
        self.parameter(ns1, ns2, key).and_then(|p| p.origin)
    }

    /// Store a value, replacing any previous one.
    pub fn set(&mut self, ns1: &str, ns2: &str, key: &str, value: &str) {
        self.set_with_origin(ns1, ns2, key, value, None);
    }

    pub fn set_path(&mut self, path: &str, value: &str) {
        let (ns1, ns2, key) = split_path(path);
        self.set(ns1, ns2, key, value);
    }

    pub fn set_with_origin(
        &mut self,
        ns1: &str,
        ns2: &str,
        key: &str,
        value: &str,
        origin: Option<TokenId>,
    ) {
        self.key_map_mut(ns1, ns2).insert(
            key.to_string(),
            Parameter {
                value: value.to_string(),
                origin,
            },
        );
    }

    /// Store a value only if the key is not already present.
    ///
    /// Returns `false` when an earlier value was kept.
    pub fn insert_if_absent(
        &mut self,
        ns1: &str,
        ns2: &str,
        key: &str,
        value: &str,
        origin: Option<TokenId>,
    ) -> bool {
        if self.contains(ns1, ns2, key) {
            return false;
        }
        self.set_with_origin(ns1, ns2, key, value, origin);
        true
    }

    pub fn remove(&mut self, ns1: &str, ns2: &str, key: &str) -> Option<Parameter> {
        let entries = self.entries.as_mut()?;
        let inner = entries.get_mut(ns1)?;
        let keys = inner.get_mut(ns2)?;
        let removed = keys.remove(key);
        if keys.is_empty() {
            inner.remove(ns2);
        }
        if inner.is_empty() {
            entries.remove(ns1);
        }
        if entries.is_empty() {
            self.entries = None;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries = None;
    }

    /// Keys stored under one `(ns1, ns2)` namespace, in sorted order.
    pub fn keys(&self, ns1: &str, ns2: &str) -> Vec<&str> {
        self.entries
            .as_ref()
            .and_then(|ns| ns.get(ns1))
            .and_then(|ns| ns.get(ns2))
            .map(|keys| keys.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Every stored parameter as `(ns1, ns2, key, parameter)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str, &Parameter)> + '_ {
        self.entries.iter().flat_map(|ns| {
            ns.iter().flat_map(|(ns1, inner)| {
                inner.iter().flat_map(move |(ns2, keys)| {
                    keys.iter()
                        .map(move |(key, p)| (ns1.as_str(), ns2.as_str(), key.as_str(), p))
                })
            })
        })
    }

    pub fn get_int(&self, ns1: &str, ns2: &str, key: &str) -> Option<i64> {
        self.get(ns1, ns2, key)?.trim().parse().ok()
    }

    pub fn get_float(&self, ns1: &str, ns2: &str, key: &str) -> Option<f64> {
        self.get(ns1, ns2, key)?.trim().parse().ok()
    }

    /// Missing keys, `""`, `"0"` and `"false"` read as false.
    pub fn get_bool(&self, ns1: &str, ns2: &str, key: &str) -> bool {
        match self.get(ns1, ns2, key) {
            None => false,
            Some(value) => !matches!(value.trim(), "" | "0" | "false"),
        }
    }

    /// Parse a value written as `n` or `n/d`.
    pub fn get_rational(&self, ns1: &str, ns2: &str, key: &str) -> Option<Rational> {
        self.get(ns1, ns2, key)?.parse().ok()
    }

    fn key_map_mut(&mut self, ns1: &str, ns2: &str) -> &mut KeyMap {
        self.entries
            .get_or_insert_with(Default::default)
            .entry(ns1.to_string())
            .or_default()
            .entry(ns2.to_string())
            .or_default()
    }
}

/// Split `key`, `ns2:key` or `ns1:ns2:key` into its three parts.
pub fn split_path(path: &str) -> (&str, &str, &str) {
    let mut parts = path.splitn(3, ':');
    let first = parts.next().unwrap_or("");
    match (parts.next(), parts.next()) {
        (None, _) => ("", "", first),
        (Some(second), None) => ("", first, second),
        (Some(second), Some(third)) => (first, second, third),
    }
}

/// Anything that owns a [`ParameterStore`]: lines and tokens.
pub trait HasParameters {
    fn parameters(&self) -> &ParameterStore;
    fn parameters_mut(&mut self) -> &mut ParameterStore;

    fn get_parameter(&self, ns1: &str, ns2: &str, key: &str) -> Option<&str> {
        self.parameters().get(ns1, ns2, key)
    }

    fn has_parameter(&self, ns1: &str, ns2: &str, key: &str) -> bool {
        self.parameters().contains(ns1, ns2, key)
    }

    fn set_parameter(&mut self, ns1: &str, ns2: &str, key: &str, value: &str) {
        self.parameters_mut().set(ns1, ns2, key, value);
    }

    fn delete_parameter(&mut self, ns1: &str, ns2: &str, key: &str) -> Option<Parameter> {
        self.parameters_mut().remove(ns1, ns2, key)
    }
}

/// Whether a parameter comment was written with `!` or `!!`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterScope {
    Local,
    Global,
}

/// A parsed parameter comment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterComment {
    pub scope: ParameterScope,
    pub ns1: String,
    pub ns2: String,
    pub entries: Vec<(String, String)>,
    /// Keys given more than once; only their first value is in `entries`.
    pub repeated_keys: Vec<String>,
}

/// Parse a `!NS1:NS2:...` or `!!NS1:NS2:...` comment.
///
/// Returns `None` for text that is not a parameter comment, including
/// reference records (`!!!`) and universal comments.
pub fn parse_parameter_comment(text: &str) -> Option<ParameterComment> {
    let (scope, body) = if text.starts_with("!!!") {
        return None;
    } else if let Some(body) = text.strip_prefix("!!") {
        (ParameterScope::Global, body)
    } else if let Some(body) = text.strip_prefix('!') {
        (ParameterScope::Local, body)
    } else {
        return None;
    };

    let first = body.find(':')?;
    let second = first + 1 + body[first + 1..].find(':')?;
    if body[..second].contains(|c: char| c == ' ' || c == '\t') {
        return None;
    }

    let mut pieces = body.split(':');
    let ns1 = unescape(pieces.next().unwrap_or(""));
    let ns2 = unescape(pieces.next().unwrap_or(""));
    let mut entries: Vec<(String, String)> = Vec::new();
    let mut repeated_keys = Vec::new();
    for piece in pieces.filter(|piece| !piece.is_empty()) {
        let (key, value) = piece.split_once('=').unwrap_or((piece, "true"));
        if key.is_empty() {
            continue;
        }
        let key = unescape(key);
        if entries.iter().any(|(existing, _)| *existing == key) {
            repeated_keys.push(key);
        } else {
            entries.push((key, unescape(value)));
        }
    }

    Some(ParameterComment {
        scope,
        ns1,
        ns2,
        entries,
        repeated_keys,
    })
}

fn unescape(text: &str) -> String {
    text.replace("&colon;", ":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_allocates_lazily() {
        let mut store = ParameterStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("LO", "N", "vis"), None);
        store.set("LO", "N", "vis", "1");
        assert_eq!(store.get("LO", "N", "vis"), Some("1"));
        assert_eq!(store.len(), 1);
        store.remove("LO", "N", "vis");
        assert!(store.is_empty());
        assert_eq!(store, ParameterStore::new());
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("vis"), ("", "", "vis"));
        assert_eq!(split_path("N:vis"), ("", "N", "vis"));
        assert_eq!(split_path("LO:N:vis"), ("LO", "N", "vis"));
        assert_eq!(split_path("LO:N:a:b"), ("LO", "N", "a:b"));
    }

    #[test]
    fn test_path_access() {
        let mut store = ParameterStore::new();
        store.set_path("LO:N:vis", "1");
        store.set_path("auto", "yes");
        assert_eq!(store.get_path("LO:N:vis"), Some("1"));
        assert_eq!(store.get("", "", "auto"), Some("yes"));
        assert!(store.contains_path("auto"));
    }

    #[test]
    fn test_first_write_wins() {
        let mut store = ParameterStore::new();
        let first = TokenId::new(1, 0);
        let second = TokenId::new(2, 0);
        assert!(store.insert_if_absent("LO", "N", "vis", "1", Some(first)));
        assert!(!store.insert_if_absent("LO", "N", "vis", "2", Some(second)));
        assert_eq!(store.get("LO", "N", "vis"), Some("1"));
        assert_eq!(store.origin("LO", "N", "vis"), Some(first));
    }

    #[test]
    fn test_typed_getters() {
        let mut store = ParameterStore::new();
        store.set("LO", "N", "n", "12");
        store.set("LO", "N", "x", "1.5");
        store.set("LO", "N", "f", "false");
        store.set("LO", "N", "t", "true");
        store.set("LO", "N", "r", "3/4");
        assert_eq!(store.get_int("LO", "N", "n"), Some(12));
        assert_eq!(store.get_float("LO", "N", "x"), Some(1.5));
        assert!(!store.get_bool("LO", "N", "f"));
        assert!(store.get_bool("LO", "N", "t"));
        assert!(!store.get_bool("LO", "N", "missing"));
        assert_eq!(store.get_rational("LO", "N", "r"), Some(Rational::new(3, 4)));
    }

    #[test]
    fn test_keys_and_iter() {
        let mut store = ParameterStore::new();
        store.set("LO", "N", "b", "2");
        store.set("LO", "N", "a", "1");
        store.set("LO", "TX", "t", "x");
        assert_eq!(store.keys("LO", "N"), vec!["a", "b"]);
        assert_eq!(store.iter().count(), 3);
    }

    #[test]
    fn test_parse_local_comment() {
        let comment = parse_parameter_comment("!LO:N:vis=1").unwrap();
        assert_eq!(comment.scope, ParameterScope::Local);
        assert_eq!(comment.ns1, "LO");
        assert_eq!(comment.ns2, "N");
        assert_eq!(comment.entries, vec![("vis".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_parse_global_comment_with_escapes() {
        let comment = parse_parameter_comment("!!LO:TX:t=a&colon;b:above").unwrap();
        assert_eq!(comment.scope, ParameterScope::Global);
        assert_eq!(
            comment.entries,
            vec![
                ("t".to_string(), "a:b".to_string()),
                ("above".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_repeated_key_keeps_first_value() {
        let comment = parse_parameter_comment("!LO:N:vis=1:vis=2:t").unwrap();
        assert_eq!(
            comment.entries,
            vec![
                ("vis".to_string(), "1".to_string()),
                ("t".to_string(), "true".to_string()),
            ]
        );
        assert_eq!(comment.repeated_keys, vec!["vis".to_string()]);
    }

    #[test]
    fn test_empty_namespace_segment() {
        let comment = parse_parameter_comment("!LO::k=v").unwrap();
        assert_eq!(comment.ns2, "");
    }

    #[test]
    fn test_non_parameter_comments() {
        assert_eq!(parse_parameter_comment("! just a comment"), None);
        assert_eq!(parse_parameter_comment("! note: see: bar 3"), None);
        assert_eq!(parse_parameter_comment("!LO:N"), None);
        assert_eq!(parse_parameter_comment("!!!COM: Bach"), None);
        assert_eq!(parse_parameter_comment("4c"), None);
    }
}
