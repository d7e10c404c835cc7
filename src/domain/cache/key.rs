//! Cache key derivation strategies

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::domain::DomainError;

/// Derives the cache key for one invocation of a memoized operation
///
/// Implemented by [`DefaultKeyDeriver`], [`HashedKeyDeriver`] and by any closure
/// with the signature `Fn(&str, &str, &[Value]) -> String`.
pub trait KeyDeriver: Send + Sync {
    /// Builds the key from the owner, the operation name and the argument list
    fn derive(&self, owner: &str, operation: &str, args: &[Value]) -> String;
}

impl<F> KeyDeriver for F
where
    F: Fn(&str, &str, &[Value]) -> String + Send + Sync,
{
    fn derive(&self, owner: &str, operation: &str, args: &[Value]) -> String {
        self(owner, operation, args)
    }
}

/// Default key format: `{owner}#{operation}({args as canonical JSON})`
///
/// Object keys are sorted recursively, so two structurally-equal arguments
/// always map to the same key regardless of field insertion order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultKeyDeriver;

impl DefaultKeyDeriver {
    /// Creates a new default key deriver
    pub fn new() -> Self {
        Self
    }
}

impl KeyDeriver for DefaultKeyDeriver {
    fn derive(&self, owner: &str, operation: &str, args: &[Value]) -> String {
        format!("{}#{}({})", owner, operation, canonical_args(args))
    }
}

/// Wraps another deriver and replaces the argument part with a SHA-256 digest
///
/// Produces `{owner}#{operation}:{64 hex chars}`, which keeps keys short for
/// remote stores while staying stable across processes.
#[derive(Debug, Clone, Default)]
pub struct HashedKeyDeriver<D = DefaultKeyDeriver> {
    inner: D,
}

impl HashedKeyDeriver {
    /// Creates a hashing deriver over the default key format
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: KeyDeriver> HashedKeyDeriver<D> {
    /// Creates a hashing deriver over a custom key format
    pub fn wrapping(inner: D) -> Self {
        Self { inner }
    }
}

impl<D: KeyDeriver> KeyDeriver for HashedKeyDeriver<D> {
    fn derive(&self, owner: &str, operation: &str, args: &[Value]) -> String {
        let full = self.inner.derive(owner, operation, args);
        let digest = Sha256::digest(full.as_bytes());

        format!("{}#{}:{}", owner, operation, hex::encode(digest))
    }
}

/// Converts call arguments into the argument list used for key derivation
///
/// Anything that serializes to a JSON array is read as the list itself: the
/// tuple `(1, "a")` becomes `[1, "a"]`, and so does a bare `Vec` or slice.
/// Anything that serializes to `null` (`()`, `None`, unit structs) is the
/// empty list. Any other value is a single argument. Pass a one-element tuple
/// such as `(vec,)` or `(None,)` to keep a sequence or a null as one argument.
pub fn encode_args<A>(args: &A) -> Result<Vec<Value>, DomainError>
where
    A: Serialize + ?Sized,
{
    let value = serde_json::to_value(args).map_err(|e| {
        DomainError::serialization(format!("Failed to encode cache key arguments: {}", e))
    })?;

    Ok(match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    })
}

/// Renders an argument list as compact JSON with recursively sorted object keys
pub fn canonical_args(args: &[Value]) -> String {
    let mut out = String::new();
    write_array(args, &mut out);
    out
}

/// Renders a JSON value as compact JSON with recursively sorted object keys
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => write_array(items, out),
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');

            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }

                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_value(item, out);
            }

            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_array(items: &[Value], out: &mut String) {
    out.push('[');

    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }

        write_value(item, out);
    }

    out.push(']');
}
