//! Validation results and error severities.
//!
//! # Invariants
//!
//! 1. `ErrorLevel` is totally ordered: `Info < Warning < Error < Critical`.
//! 2. Only `Error` and `Critical` are blocking; informational results are
//!    shown but never make a binding or binder invalid.
//! 3. An ok result has neither a level nor a message.

use std::fmt;

/// Severity of a validation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ErrorLevel {
    /// Informational message; never blocks.
    Info,
    /// Warning; never blocks.
    Warning,
    /// Regular validation error; blocks writes.
    Error,
    /// Severe validation error; blocks writes.
    Critical,
}

impl ErrorLevel {
    /// Whether results at this level make a value invalid.
    #[must_use]
    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }

    /// Lowercase name, used as a severity hint by field displays.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single validator invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationResult {
    message: Option<String>,
    level: Option<ErrorLevel>,
}

impl ValidationResult {
    /// A passing result.
    #[must_use]
    pub fn ok() -> Self {
        Self::default()
    }

    /// A failing result at [`ErrorLevel::Error`].
    pub fn error(message: impl Into<String>) -> Self {
        Self::create(message, ErrorLevel::Error)
    }

    /// A result with an explicit severity.
    pub fn create(message: impl Into<String>, level: ErrorLevel) -> Self {
        Self {
            message: Some(message.into()),
            level: Some(level),
        }
    }

    /// Whether this result blocks (level `Error` or `Critical`).
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level.is_some_and(ErrorLevel::is_blocking)
    }

    /// Whether this result carries any severity at all (including `Info`).
    #[must_use]
    pub fn has_level(&self) -> bool {
        self.level.is_some()
    }

    /// The message, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The severity, if any.
    #[must_use]
    pub fn error_level(&self) -> Option<ErrorLevel> {
        self.level
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.level, &self.message) {
            (Some(level), Some(message)) => write!(f, "{level}: {message}"),
            _ => f.write_str("ok"),
        }
    }
}
