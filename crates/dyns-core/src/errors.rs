//! Structured error types shared across dyns crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`DynError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, counts, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for dynamic nested sampling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum DynError {
    /// Caller supplied options or settings the orchestrator does not accept.
    #[error("usage error: {0}")]
    Usage(ErrorInfo),
    /// Budget or configuration preconditions that cannot be satisfied.
    #[error("precondition error: {0}")]
    Precondition(ErrorInfo),
    /// Two runs that should share a checkpoint boundary disagree.
    #[error("consistency error: {0}")]
    Consistency(ErrorInfo),
    /// Filesystem errors (missing outputs, failed copies).
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and parse errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// Failures reported by a sampler adapter.
    #[error("sampler error: {0}")]
    Sampler(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl DynError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            DynError::Usage(info)
            | DynError::Precondition(info)
            | DynError::Consistency(info)
            | DynError::Io(info)
            | DynError::Serde(info)
            | DynError::Sampler(info) => info,
        }
    }

    /// Wraps a filesystem error, recording the offending path.
    pub fn io(code: &str, err: impl Display, path: &Path) -> Self {
        DynError::Io(
            ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
        )
    }

    /// Wraps a (de)serialization error, recording the offending path.
    pub fn serde(code: &str, err: impl Display, path: &Path) -> Self {
        DynError::Serde(
            ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
        )
    }
}
