//! Cache key derivation.
//!
//! A [`CacheKey`] is the canonical identity of a logical request: collection,
//! operation kind, optional record id and optional query parameters. Keys are
//! laid out as
//!
//! ```text
//! <collection>::<operation>::<id>::<param digest>
//! ```
//!
//! so every key of a collection shares the `<collection>::` prefix. The
//! collection and id segments are escaped so they can never contain the
//! separator. Parameters are canonicalized (keys sorted at every depth) and
//! reduced to a SHA-256 digest to bound the key length.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::errors::{CacheError, CacheResult};

/// Query parameters attached to a request.
pub type Params = BTreeMap<String, Value>;

const SEPARATOR: &str = "::";

/// Number of digest bytes kept in the key (32 hex chars).
const PARAM_DIGEST_BYTES: usize = 16;

/// Kind of read a request performs against a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Read many records, usually filtered by params.
    List,
    /// Read a single record by id.
    Detail,
}

impl Operation {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Detail => "detail",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque, deterministic identifier of a cached request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a request.
    ///
    /// Two calls with the same logical inputs always yield the same key, no
    /// matter in which order the params were inserted. An empty params map
    /// is treated the same as no params.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidKey`] if `collection` is blank or `id` is
    /// present but empty.
    pub fn new(
        collection: &str,
        operation: Operation,
        id: Option<&str>,
        params: Option<&Params>,
    ) -> CacheResult<Self> {
        if collection.trim().is_empty() {
            return Err(CacheError::InvalidKey(
                "collection name cannot be empty".to_string(),
            ));
        }
        if id.is_some_and(str::is_empty) {
            return Err(CacheError::InvalidKey(format!(
                "record id for '{collection}' cannot be empty"
            )));
        }

        let digest = params
            .filter(|p| !p.is_empty())
            .map(param_digest)
            .unwrap_or_default();

        Ok(Self(format!(
            "{collection}{SEPARATOR}{operation}{SEPARATOR}{id}{SEPARATOR}{digest}",
            collection = escape(collection),
            operation = operation.as_str(),
            id = id.map(escape).unwrap_or_default(),
        )))
    }

    /// Prefix shared by every key belonging to `collection`.
    pub fn collection_prefix(collection: &str) -> String {
        format!("{}{SEPARATOR}", escape(collection))
    }

    /// Unescaped collection name this key belongs to.
    pub fn collection(&self) -> String {
        let raw = self
            .0
            .split_once(SEPARATOR)
            .map_or(self.0.as_str(), |(collection, _)| collection);
        unescape(raw)
    }

    /// Whether this key belongs to `collection`.
    pub fn belongs_to(&self, collection: &str) -> bool {
        self.0.starts_with(&Self::collection_prefix(collection))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn escape(segment: &str) -> String {
    segment.replace('%', "%25").replace(':', "%3A")
}

fn unescape(segment: &str) -> String {
    segment.replace("%3A", ":").replace("%25", "%")
}

fn param_digest(params: &Params) -> String {
    let mut canonical = String::new();
    write_canonical_object(params.iter(), &mut canonical);
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(&digest[..PARAM_DIGEST_BYTES])
}

/// Stable JSON rendering: object keys sorted at every depth, no whitespace.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            write_canonical_object(sorted.into_iter(), out);
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_canonical_object<'a, K, I>(entries: I, out: &mut String)
where
    K: AsRef<str> + 'a,
    I: Iterator<Item = (K, &'a Value)>,
{
    out.push('{');
    for (i, (key, value)) in entries.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(key.as_ref().to_string()).to_string());
        out.push(':');
        write_canonical(value, out);
    }
    out.push('}');
}
