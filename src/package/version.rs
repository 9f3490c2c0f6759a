//! Version comparison and version constraints.
//!
//! Versions are dotted, loosely semver-like strings ("5.2.0", "1.0rc1",
//! "2.1-beta.3"). They are compared segment by segment after canonicalization,
//! with pre-release tags ranking below plain numbers.

use std::cmp::Ordering;

use anyhow::{Result, anyhow, bail};
use serde_json::Value;

use crate::error::Bound;

/// Rank used for a numeric segment when compared against a tag.
const NUMBER_RANK: i8 = 4;

/// Ranked pre-release/post-release tags, matched by prefix in this order.
const SPECIAL_FORMS: &[(&str, i8)] = &[
    ("dev", 0),
    ("alpha", 1),
    ("a", 1),
    ("beta", 2),
    ("b", 2),
    ("RC", 3),
    ("rc", 3),
    ("#", NUMBER_RANK),
    ("pl", 5),
    ("p", 5),
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Number(u64),
    Tag(String),
}

impl Segment {
    fn rank(&self) -> i8 {
        match self {
            Segment::Number(_) => NUMBER_RANK,
            Segment::Tag(tag) => SPECIAL_FORMS
                .iter()
                .find(|(name, _)| tag.starts_with(name))
                .map(|(_, rank)| *rank)
                .unwrap_or(-6),
        }
    }
}

/// Split a version into segments.
///
/// `-`, `_` and `+` act as separators, and a boundary is inserted wherever
/// digits and non-digits meet ("1.0rc1" -> ["1", "0", "rc", "1"]).
fn segments(version: &str) -> Vec<Segment> {
    let version = match version.strip_prefix('v') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => version,
    };

    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut last_digit: Option<bool> = None;

    for c in version.trim().chars() {
        if matches!(c, '.' | '-' | '_' | '+') {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            last_digit = None;
            continue;
        }
        let is_digit = c.is_ascii_digit();
        if last_digit.is_some_and(|d| d != is_digit) && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        current.push(c);
        last_digit = Some(is_digit);
    }
    if !current.is_empty() {
        parts.push(current);
    }

    parts
        .into_iter()
        .map(|p| {
            if p.chars().all(|c| c.is_ascii_digit()) {
                Segment::Number(p.parse().unwrap_or(u64::MAX))
            } else {
                Segment::Tag(p)
            }
        })
        .collect()
}

fn compare_segments(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Number(x), Segment::Number(y)) => x.cmp(y),
        _ => a.rank().cmp(&b.rank()),
    }
}

/// Three-way comparison of two version strings.
///
/// When one version runs out of segments, a remaining number on the other
/// side makes that side greater ("1.0" < "1.0.1"), while a remaining tag is
/// ranked against an implicit number ("1.0rc1" < "1.0" < "1.0pl1").
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = segments(a);
    let right = segments(b);

    for (x, y) in left.iter().zip(right.iter()) {
        let ord = compare_segments(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    let implicit_number = Segment::Number(0);
    match left.len().cmp(&right.len()) {
        Ordering::Equal => Ordering::Equal,
        Ordering::Greater => match &left[right.len()] {
            Segment::Number(_) => Ordering::Greater,
            tag => tag.rank().cmp(&implicit_number.rank()),
        },
        Ordering::Less => match &right[left.len()] {
            Segment::Number(_) => Ordering::Less,
            tag => implicit_number.rank().cmp(&tag.rank()),
        },
    }
}

/// A version constraint as declared in a requirement block.
///
/// An exact `version` takes precedence: when it is set, `min_version` and
/// `max_version` are not consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionConstraint {
    pub version: Option<String>,
    pub min_version: Option<String>,
    pub max_version: Option<String>,
}

impl VersionConstraint {
    /// Build a constraint from a requirement value.
    ///
    /// `null` means "no constraint". Anything other than a mapping of string
    /// (or integer) bounds is rejected.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => bail!("expected a mapping of version bounds, found {}", kind_of(other)),
        };

        let bound = |key: &str| -> Result<Option<String>> {
            match map.get(key) {
                None => Ok(None),
                Some(value) => version_text(value).map_err(|e| anyhow!("'{}' {}", key, e)),
            }
        };

        Ok(Self {
            version: bound("version")?,
            min_version: bound("min-version")?,
            max_version: bound("max-version")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.version.is_none() && self.min_version.is_none() && self.max_version.is_none()
    }

    /// Check `found` against this constraint.
    ///
    /// Returns the violated bound and the required value, or `None` if satisfied.
    pub fn check(&self, found: &str) -> Option<(Bound, String)> {
        if let Some(exact) = &self.version {
            if compare_versions(found, exact) != Ordering::Equal {
                return Some((Bound::Exact, exact.clone()));
            }
            return None;
        }
        if let Some(min) = &self.min_version
            && compare_versions(found, min) == Ordering::Less
        {
            return Some((Bound::Min, min.clone()));
        }
        if let Some(max) = &self.max_version
            && compare_versions(found, max) == Ordering::Greater
        {
            return Some((Bound::Max, max.clone()));
        }
        None
    }
}

/// Read a version written in YAML or JSON.
///
/// Strings and integers are taken as written. A fractional number is refused:
/// the parser has already turned `1.10` into `1.1`, so the author must quote it.
pub(crate) fn version_text(value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) if !n.is_f64() => Ok(Some(n.to_string())),
        Value::Number(n) => bail!(
            "must be a quoted version string; {} was read as a number (write '{}')",
            n,
            n
        ),
        other => bail!("must be a version string, found {}", kind_of(other)),
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
