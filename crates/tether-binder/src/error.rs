//! Binder and binding errors.
//!
//! | Error | Raised by | Recoverable |
//! |-------|-----------|-------------|
//! | [`BindingError`] | misuse, unknown properties, failing user code | no: a bug to fix |
//! | [`ValidationFailure`] | `write_bean`, `write_record` and friends | yes: show and correct |

use std::fmt;

use tether_core::{FieldIdentity, UserError, ValidationResult};
use tether_property::PropertyError;

/// Structural, state and user-code errors.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    /// The binding was unbound and cannot be used.
    #[error("binding has been unbound")]
    Unbound,
    /// A property path could not be resolved or has another value type.
    #[error(transparent)]
    Property(#[from] PropertyError),
    /// A binding without a setter cannot be made writable.
    #[error("binding for {field} has no setter and must stay read-only")]
    MissingSetter {
        /// The bound field.
        field: String,
    },
    /// `set_as_required_enabled` on a binding that never called `as_required`.
    #[error("binding for {field} was not configured with as_required")]
    RequiredNotConfigured {
        /// The bound field.
        field: String,
    },
    /// A record write found a binding not bound by property name.
    #[error("binding for {field} is not bound by property name")]
    UnnamedBinding {
        /// The bound field.
        field: String,
    },
    /// User code (getter, setter, converter, field) failed.
    #[error("{message}")]
    UserCode {
        /// Description including the field identity.
        message: String,
        /// The field involved, when known.
        field: Option<FieldIdentity>,
        /// The original error.
        #[source]
        source: UserError,
    },
    /// A binding from another binder was passed in.
    #[error("binding does not belong to this binder")]
    ForeignBinding,
    /// Builders created from this binder were never bound.
    #[error("{count} binding builder(s) created from this binder were never bound")]
    IncompleteBindings {
        /// Number of unfinished builders.
        count: usize,
    },
}

/// One failing binding in a [`ValidationFailure`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValidationError {
    /// The field.
    pub field: FieldIdentity,
    /// Property path, for property bindings.
    pub property: Option<String>,
    /// The reported result.
    pub result: ValidationResult,
}

/// Binding-level and bean-level errors from a failed write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationFailure {
    /// Failing bindings, in binding order.
    pub field_errors: Vec<FieldValidationError>,
    /// Failing bean-level results.
    pub bean_errors: Vec<ValidationResult>,
}

impl ValidationFailure {
    /// All blocking messages, field errors first.
    pub fn messages(&self) -> impl Iterator<Item = &str> + '_ {
        self.field_errors
            .iter()
            .filter_map(|e| e.result.error_message())
            .chain(self.bean_errors.iter().filter_map(ValidationResult::error_message))
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "validation failed: {} field error(s), {} bean error(s)",
            self.field_errors.len(),
            self.bean_errors.len()
        )?;
        if let Some(first) = self.messages().next() {
            write!(f, ": {first}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

/// Error returned by binder bean operations.
#[derive(Debug, thiserror::Error)]
pub enum BinderError {
    /// Structural or user-code failure.
    #[error(transparent)]
    Binding(#[from] BindingError),
    /// Values failed validation; nothing failing was written.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
}

impl BinderError {
    /// The validation failure, if that is what this is.
    #[must_use]
    pub fn as_validation(&self) -> Option<&ValidationFailure> {
        match self {
            Self::Validation(failure) => Some(failure),
            Self::Binding(_) => None,
        }
    }
}

impl From<PropertyError> for BinderError {
    fn from(err: PropertyError) -> Self {
        Self::Binding(BindingError::Property(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{FieldKey, MessageError};

    #[test]
    fn failure_display_includes_first_message() {
        let failure = ValidationFailure {
            field_errors: vec![FieldValidationError {
                field: FieldIdentity::new(FieldKey::next(), "TextField"),
                property: Some("name".into()),
                result: ValidationResult::error("size must be between 3 and 16"),
            }],
            bean_errors: vec![ValidationResult::error("dates out of order")],
        };
        assert_eq!(
            failure.to_string(),
            "validation failed: 1 field error(s), 1 bean error(s): size must be between 3 and 16"
        );
        assert_eq!(failure.messages().count(), 2);
    }

    #[test]
    fn user_code_error_keeps_source() {
        let err = BindingError::UserCode {
            message: "setter failed".into(),
            field: None,
            source: MessageError::boxed("disk full"),
        };
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("disk full"));
    }
}
