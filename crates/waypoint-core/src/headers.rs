//! Header mutation sets (add / remove).
//!
//! A `HeaderSet` is an ordered, multi-valued mapping. Names are matched
//! case-insensitively and stored in canonical form (`x-forwarded-for` becomes
//! `X-Forwarded-For`). Values keep their order and duplicates, since repeated
//! headers are order-significant on the wire.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{Result, WaypointError};
use crate::value::type_name;

/// Key holding headers to add to the proxied request.
pub const ADD_HEADERS_KEY: &str = "add-headers";
/// Key holding headers to remove from the proxied request.
pub const REMOVE_HEADERS_KEY: &str = "remove-headers";

/// Ordered multi-valued header collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` under `name`, keeping any values already present.
    pub fn add(&mut self, name: &str, value: impl Into<String>) {
        let key = canonical_name(name);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value.into()),
            None => self.entries.push((key, vec![value.into()])),
        }
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// All values for `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> &[String] {
        let key = canonical_name(name);
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.get_all(name).is_empty()
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Parse an untyped header mapping.
    ///
    /// A string value becomes a single-valued entry, an array of strings a
    /// multi-valued one. Anything else is rejected naming the key.
    pub fn from_value(v: &Value) -> Result<Self> {
        let obj = v.as_object().ok_or_else(|| {
            WaypointError::validation(format!(
                "headers should be a dictionary, got {}",
                type_name(v)
            ))
        })?;

        let mut headers = HeaderSet::new();
        for (name, value) in obj {
            match value {
                Value::String(s) => headers.add(name, s.as_str()),
                Value::Array(items) => {
                    for item in items {
                        let s = item.as_str().ok_or_else(|| {
                            WaypointError::validation(format!(
                                "header {name}: value should be a string, got {}",
                                type_name(item)
                            ))
                        })?;
                        headers.add(name, s);
                    }
                }
                other => {
                    return Err(WaypointError::validation(format!(
                        "header {name}: unsupported value type {}",
                        type_name(other)
                    )))
                }
            }
        }
        Ok(headers)
    }
}

impl fmt::Display for HeaderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, values) in self.iter() {
            for value in values {
                if !first {
                    f.write_str(", ")?;
                }
                write!(f, "{name}: {value}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Extract the `add-headers` / `remove-headers` pair from a directive or
/// upstream mapping. Each key is optional and defaults to an empty set.
pub fn add_remove_headers(obj: &Map<String, Value>) -> Result<(HeaderSet, HeaderSet)> {
    let add = match obj.get(ADD_HEADERS_KEY) {
        Some(v) => HeaderSet::from_value(v)?,
        None => HeaderSet::new(),
    };
    let remove = match obj.get(REMOVE_HEADERS_KEY) {
        Some(v) => HeaderSet::from_value(v)?,
        None => HeaderSet::new(),
    };
    Ok((add, remove))
}

/// Canonical header name: ASCII title case on `-`-separated words.
/// Names containing characters outside the HTTP token set are kept verbatim.
fn canonical_name(name: &str) -> String {
    if !name.bytes().all(is_token_byte) {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
