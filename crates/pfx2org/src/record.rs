//! Record model for rows of the prefix→organization table
//!
//! A [`PrefixRecord`] carries the two columns the core understands — the
//! prefix string and the organization owner — plus every other column of the
//! source table as an opaque, ordered list of named [`AttrValue`]s. The core
//! never depends on which extra attributes exist or what types they have.

use pfx2org_ip_trie::AddressFamily;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// A single attribute value carried through from the source table.
///
/// Covers the types a Parquet column produces; anything else is rendered to
/// its display string at load time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// UTF-8 string
    String(String),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    Uint(u64),
    /// Floating point
    Double(f64),
    /// Boolean
    Bool(bool),
    /// Null cell
    Null,
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::String(s) => write!(f, "{}", s),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Uint(v) => write!(f, "{}", v),
            AttrValue::Double(v) => write!(f, "{}", v),
            AttrValue::Bool(v) => write!(f, "{}", v),
            AttrValue::Null => write!(f, "null"),
        }
    }
}

/// One row of the source table: a CIDR prefix, its organization owner, and
/// all remaining columns in table order. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixRecord {
    /// Network prefix in CIDR notation, exactly as stored in the source table
    pub prefix: String,
    /// Organization owner, `None` when the cell is null or the column absent
    pub owner: Option<String>,
    /// Remaining columns as (name, value) pairs, preserving column order
    pub attrs: Vec<(String, AttrValue)>,
}

impl PrefixRecord {
    /// Create a record with no extra attributes.
    pub fn new(prefix: impl Into<String>, owner: Option<&str>) -> Self {
        Self {
            prefix: prefix.into(),
            owner: owner.map(str::to_string),
            attrs: Vec::new(),
        }
    }

    /// Append an extra attribute, preserving insertion order.
    pub fn with_attr(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.attrs.push((name.into(), value));
        self
    }

    /// Address family derived from the textual form of the prefix.
    pub fn family(&self) -> AddressFamily {
        AddressFamily::of_text(&self.prefix)
    }

    /// Look up an extra attribute by column name.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs
            .iter()
            .find(|(attr_name, _)| attr_name == name)
            .map(|(_, value)| value)
    }
}

impl Serialize for PrefixRecord {
    /// Serializes as one flat JSON object: `prefix`, `owner`, then every
    /// extra attribute under its original column name.
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + self.attrs.len()))?;
        map.serialize_entry("prefix", &self.prefix)?;
        map.serialize_entry("owner", &self.owner)?;
        for (name, value) in &self.attrs {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
