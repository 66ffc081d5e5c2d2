//! Address parsing.
//!
//! An address is a dot-separated list of segments. A segment written as a
//! canonical non-negative integer (`0`, `7`, `12`, but not `07`) is an array
//! index; anything else is an object key. This module is the only place
//! that splits address strings.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use crate::error::{CodecError, Result};

/// One address segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

impl<'a> Segment<'a> {
    pub fn parse(raw: &'a str) -> Self {
        match parse_index(raw) {
            Some(index) => Segment::Index(index),
            None => Segment::Key(raw),
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }
}

impl fmt::Display for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Canonical decimal only, so that `"007"` stays an object key.
fn parse_index(raw: &str) -> Option<usize> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if raw.len() > 1 && raw.starts_with('0') {
        return None;
    }
    raw.parse().ok()
}

/// A validated address string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Parse and validate an address; empty segments are rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(CodecError::invalid(raw, "address is empty"));
        }
        if raw.split('.').any(str::is_empty) {
            return Err(CodecError::invalid(raw, "address has an empty segment"));
        }
        Ok(Self(raw.to_string()))
    }

    /// Single-segment address for a record key.
    pub fn key(key: &str) -> Result<Self> {
        check_key(key)?;
        Ok(Self(key.to_string()))
    }

    pub fn index(index: usize) -> Self {
        Self(index.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment<'_>> {
        self.0.split('.').map(Segment::parse)
    }

    pub fn segment_count(&self) -> usize {
        self.0.split('.').count()
    }

    pub fn first(&self) -> Segment<'_> {
        Segment::parse(self.0.split('.').next().unwrap_or_default())
    }

    pub fn last(&self) -> Segment<'_> {
        Segment::parse(self.0.rsplit('.').next().unwrap_or_default())
    }

    /// Append a record key; the key itself must be a single segment.
    pub fn child_key(&self, key: &str) -> Result<Self> {
        check_key(key)?;
        Ok(Self(format!("{}.{key}", self.0)))
    }

    pub fn child_index(&self, index: usize) -> Self {
        Self(format!("{}.{index}", self.0))
    }

    /// Append a (possibly multi-segment) relative path.
    pub fn join(&self, path: &str) -> Result<Self> {
        Self::parse(&format!("{}.{path}", self.0))
    }

    /// Segment-wise prefix test: `lots.1` is a prefix of `lots.1.name` but
    /// not of `lots.10.name`.
    pub fn starts_with(&self, prefix: &Address) -> bool {
        self.0 == prefix.0
            || (self.0.starts_with(&prefix.0)
                && self.0.as_bytes().get(prefix.0.len()) == Some(&b'.'))
    }

    /// Remainder after `prefix`, or `None` when `prefix` is not a proper
    /// prefix of this address.
    pub fn strip_prefix(&self, prefix: &Address) -> Option<Address> {
        self.0
            .strip_prefix(&prefix.0)
            .and_then(|rest| rest.strip_prefix('.'))
            .map(|rest| Self(rest.to_string()))
    }

    /// Remainder after the first `count` segments, or `None` when nothing
    /// is left.
    pub fn skip(&self, count: usize) -> Option<Address> {
        let rest: Vec<&str> = self.0.split('.').skip(count).collect();
        (!rest.is_empty()).then(|| Self(rest.join(".")))
    }

    /// Address with `prefix` swapped for `replacement`.
    pub fn replace_prefix(&self, prefix: &Address, replacement: &Address) -> Option<Address> {
        if self == prefix {
            return Some(replacement.clone());
        }
        self.strip_prefix(prefix)
            .map(|rest| Self(format!("{}.{}", replacement.0, rest.0)))
    }

    /// The address with its index segments removed; `items.2.name` becomes
    /// `items.name`. Used to find the field schema an address belongs to.
    pub fn template(&self) -> String {
        self.segments()
            .filter_map(|segment| match segment {
                Segment::Key(key) => Some(key),
                Segment::Index(_) => None,
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CodecError::invalid(key, "record key is empty"));
    }
    if key.contains('.') {
        return Err(CodecError::invalid(key, "record key contains '.'"));
    }
    if parse_index(key).is_some() {
        return Err(CodecError::invalid(key, "record key would be read back as an array index"));
    }
    Ok(())
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Borrow<str> for Address {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
