// Configuration Override Set
//
// Dotted keys mapped to scalar values, rendered as `key=value` arguments for
// the training entry point. Keys are unique; insertion order is kept.

use std::fmt;
use std::path::PathBuf;

use super::error::{DomainError, Result};

/// Dotted configuration key, e.g. `worker.rollout.n`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OverrideKey(String);

impl OverrideKey {
    /// Parse and validate a dotted key
    ///
    /// Every dot-separated segment must be non-empty and made of ASCII
    /// alphanumerics, `_` or `-`.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let valid = !key.is_empty()
            && key.split('.').all(|segment| {
                !segment.is_empty()
                    && segment
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            });

        if valid {
            Ok(Self(key))
        } else {
            Err(DomainError::InvalidKey(key))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OverrideKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scalar override value
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Path(PathBuf),
}

impl OverrideValue {
    /// Build a float value, rejecting NaN and infinities
    pub fn float(key: &OverrideKey, value: f64) -> Result<Self> {
        if value.is_finite() {
            Ok(Self::Float(value))
        } else {
            Err(DomainError::InvalidValue {
                key: key.to_string(),
                reason: format!("{} is not a finite number", value),
            })
        }
    }

    /// Infer a value from raw command-line text
    ///
    /// Order: integer, float, boolean, string.
    pub fn infer(raw: &str) -> Self {
        if let Ok(i) = raw.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return Self::Float(f);
            }
        }
        match raw {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => Self::Str(raw.to_string()),
        }
    }
}

impl fmt::Display for OverrideValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideValue::Int(i) => write!(f, "{}", i),
            // Always keep a fractional part so `1.0` stays a float downstream
            OverrideValue::Float(x) if x.fract() == 0.0 => write!(f, "{:.1}", x),
            OverrideValue::Float(x) => write!(f, "{}", x),
            OverrideValue::Bool(b) => write!(f, "{}", b),
            OverrideValue::Str(s) => f.write_str(s),
            OverrideValue::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

impl From<i64> for OverrideValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for OverrideValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<bool> for OverrideValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for OverrideValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for OverrideValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<PathBuf> for OverrideValue {
    fn from(v: PathBuf) -> Self {
        Self::Path(v)
    }
}

/// Ordered set of unique overrides
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideSet {
    entries: Vec<(OverrideKey, OverrideValue)>,
}

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &OverrideKey) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Insert a new key; fails if it is already present
    pub fn insert(&mut self, key: OverrideKey, value: impl Into<OverrideValue>) -> Result<()> {
        if self.position(&key).is_some() {
            return Err(DomainError::DuplicateKey(key.to_string()));
        }
        self.entries.push((key, value.into()));
        Ok(())
    }

    /// Insert or replace; a replaced key keeps its original position
    pub fn set(&mut self, key: OverrideKey, value: impl Into<OverrideValue>) {
        let value = value.into();
        match self.position(&key) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Apply every entry of `other` with `set` semantics
    pub fn merge(&mut self, other: OverrideSet) {
        for (key, value) in other.entries {
            self.set(key, value);
        }
    }

    /// Parse a `KEY=VALUE` assignment, splitting on the first `=`
    pub fn parse_assignment(raw: &str) -> Result<(OverrideKey, OverrideValue)> {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| DomainError::MalformedAssignment(raw.to_string()))?;
        Ok((OverrideKey::new(key.trim())?, OverrideValue::infer(value)))
    }

    /// Build a set from `KEY=VALUE` strings; later assignments win
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for raw in assignments {
            let (key, value) = Self::parse_assignment(raw.as_ref())?;
            set.set(key, value);
        }
        Ok(set)
    }

    pub fn get(&self, key: &str) -> Option<&OverrideValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OverrideKey, &OverrideValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Render as `key=value` arguments in insertion order
    pub fn to_args(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }
}
