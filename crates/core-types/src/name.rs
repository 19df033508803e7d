use crate::enums::InstanceKind;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A full instance name of the form `[kind]label`.
///
/// Names double as document file names, so labels may not contain path
/// separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceName(String);

impl InstanceName {
    /// Builds the full name for a `kind` (as typed by the user) and a label.
    pub fn new(kind: &str, label: &str) -> Result<Self, CoreError> {
        let kind: InstanceKind = kind.parse()?;
        if label.is_empty() || label.contains(['/', '\\']) || label == "." || label == ".." {
            return Err(CoreError::InvalidLabel(label.to_string()));
        }
        Ok(Self(format!("[{kind}]{label}")))
    }

    /// Splits a create query `kind:label` into its two fields.
    pub fn split_query(query: &str) -> Result<(&str, &str), CoreError> {
        let fields: Vec<&str> = query.split(':').collect();
        match fields.as_slice() {
            [kind, label] => Ok((kind, label)),
            _ => Err(CoreError::InvalidQuery(query.to_string())),
        }
    }

    /// Parses a create query `kind:label` straight into a full name.
    pub fn from_query(query: &str) -> Result<Self, CoreError> {
        let (kind, label) = Self::split_query(query)?;
        Self::new(kind, label)
    }

    /// The kind encoded in the `[kind]` prefix, if the name carries one.
    pub fn kind_of(name: &str) -> Option<InstanceKind> {
        let rest = name.strip_prefix('[')?;
        let (kind, _) = rest.split_once(']')?;
        kind.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for InstanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for InstanceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
