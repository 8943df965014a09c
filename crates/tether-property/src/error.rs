//! Property lookup and access errors.

/// Errors raised while resolving or accessing a property.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// No property with this path resolves within the nesting depth.
    #[error("no property '{path}' on {bean}")]
    NotFound {
        /// Bean type name.
        bean: &'static str,
        /// Requested dotted path.
        path: String,
    },
    /// The property holds a different value type than requested.
    #[error("property '{path}' has type {actual}, not {expected}")]
    TypeMismatch {
        /// Dotted path.
        path: String,
        /// Requested type name.
        expected: &'static str,
        /// Declared type name.
        actual: &'static str,
    },
    /// The property has no setter.
    #[error("property '{path}' is read-only")]
    ReadOnly {
        /// Dotted path.
        path: String,
    },
    /// A nested path could not be written because an intermediate bean is absent.
    #[error("intermediate property '{path}' is absent")]
    MissingIntermediate {
        /// Path of the absent intermediate.
        path: String,
    },
}
