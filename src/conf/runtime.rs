use crate::core::{ProvisionError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::Write;

lazy_static! {
    static ref PARAMETER_NAME: Regex = Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap();
}

/// Value of one `postgresql.conf` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfValue {
    Integer(i64),
    /// Written single-quoted with embedded quotes doubled.
    Text(String),
}

impl ConfValue {
    pub fn text(value: impl Into<String>) -> Self {
        ConfValue::Text(value.into())
    }

    fn render(&self) -> String {
        match self {
            ConfValue::Integer(n) => n.to_string(),
            ConfValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<i64> for ConfValue {
    fn from(n: i64) -> Self {
        ConfValue::Integer(n)
    }
}

impl From<u32> for ConfValue {
    fn from(n: u32) -> Self {
        ConfValue::Integer(n as i64)
    }
}

impl From<u16> for ConfValue {
    fn from(n: u16) -> Self {
        ConfValue::Integer(n as i64)
    }
}

/// Ordered block of runtime parameters appended to `postgresql.conf`.
///
/// Keys are unique within a fragment; rendering happens only once the block is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfFragment {
    entries: Vec<(String, ConfValue)>,
}

impl RuntimeConfFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, rejecting malformed or repeated names.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfValue>) -> Result<()> {
        let key = key.into();
        if !PARAMETER_NAME.is_match(&key) {
            return Err(ProvisionError::Config(format!(
                "invalid configuration parameter name '{}'",
                key
            )));
        }
        if self.get(&key).is_some() {
            return Err(ProvisionError::Config(format!(
                "configuration parameter '{}' set twice",
                key
            )));
        }
        self.entries.push((key, value.into()));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&ConfValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One `key = value` line per parameter.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            let _ = writeln!(out, "{} = {}", key, value.render());
        }
        out
    }
}
