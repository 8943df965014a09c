//! Pluggable error display, exception translation and bean constraints.

use tether_core::{ErrorLevel, FieldIdentity, UserError, ValidationResult, ValueContext};

use crate::error::BindingError;
use crate::field::FieldDisplay;

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Shows and clears validation results on fields.
pub trait ValidationErrorHandler {
    /// Show `result` on `field`. Called for blocking and informational
    /// results alike.
    fn handle_error(&self, field: &dyn FieldDisplay, result: &ValidationResult);

    /// Remove any result shown on `field`.
    fn clear_error(&self, field: &dyn FieldDisplay);
}

/// Marks the field invalid for blocking results and shows the message with a
/// severity hint. Informational results leave the field valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValidationErrorHandler;

impl ValidationErrorHandler for DefaultValidationErrorHandler {
    fn handle_error(&self, field: &dyn FieldDisplay, result: &ValidationResult) {
        field.set_error_message(result.error_message().map(str::to_owned));
        field.set_severity(result.error_level());
        field.set_invalid(result.is_error());
    }

    fn clear_error(&self, field: &dyn FieldDisplay) {
        field.set_error_message(None);
        field.set_severity(None);
        field.set_invalid(false);
    }
}

// ---------------------------------------------------------------------------
// Exception translation
// ---------------------------------------------------------------------------

/// Translates failures raised by user code (getters, setters, presentation
/// converters, field rejections) into [`BindingError`]s.
pub trait BindingExceptionHandler {
    /// Wrap `error`, raised while processing `field`.
    fn handle_exception(&self, field: &FieldIdentity, error: UserError) -> BindingError;

    /// Called with errors that have no caller to return to, i.e. those raised
    /// while reacting to a field value change.
    fn report(&self, error: &BindingError) {
        tracing::error!(error = %error, "binding failed while handling a field change");
    }
}

/// Keeps the cause and names the field in the message.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBindingExceptionHandler;

impl BindingExceptionHandler for DefaultBindingExceptionHandler {
    fn handle_exception(&self, field: &FieldIdentity, error: UserError) -> BindingError {
        BindingError::UserCode {
            message: format!("An error occurred inside binding logic for the field {field}"),
            field: Some(field.clone()),
            source: error,
        }
    }
}

// ---------------------------------------------------------------------------
// Bean constraints
// ---------------------------------------------------------------------------

/// One violated bean constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    /// User-visible message.
    pub message: String,
    /// Severity.
    pub level: ErrorLevel,
    /// Dotted path of the offending property, if the constraint targets one.
    pub property_path: Option<String>,
}

impl ConstraintViolation {
    /// A violation at [`ErrorLevel::Error`] not tied to a property.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: ErrorLevel::Error,
            property_path: None,
        }
    }

    /// Attach the offending property path.
    #[must_use]
    pub fn at(mut self, property_path: impl Into<String>) -> Self {
        self.property_path = Some(property_path.into());
        self
    }

    /// Override the severity.
    #[must_use]
    pub fn with_level(mut self, level: ErrorLevel) -> Self {
        self.level = level;
        self
    }

    /// This violation as a bean-level result.
    #[must_use]
    pub fn to_result(&self) -> ValidationResult {
        ValidationResult::create(self.message.clone(), self.level)
    }
}

/// A declarative constraint checker run as a bean-level validator.
pub trait ConstraintValidator<B> {
    /// All constraints `bean` violates.
    fn validate_bean(&self, bean: &B, ctx: &ValueContext<'_>) -> Vec<ConstraintViolation>;
}

impl<B, F> ConstraintValidator<B> for F
where
    F: Fn(&B) -> Vec<ConstraintViolation>,
{
    fn validate_bean(&self, bean: &B, _ctx: &ValueContext<'_>) -> Vec<ConstraintViolation> {
        self(bean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ValueField;
    use tether_core::{FieldKey, MessageError};

    #[test]
    fn default_handler_marks_blocking_results_invalid() {
        let field = ValueField::text();
        let handler = DefaultValidationErrorHandler;
        handler.handle_error(&field, &ValidationResult::error("required"));
        assert!(field.is_invalid());
        assert_eq!(field.error_message().as_deref(), Some("required"));
        assert_eq!(field.severity(), Some(ErrorLevel::Error));

        handler.handle_error(&field, &ValidationResult::create("looks odd", ErrorLevel::Warning));
        assert!(!field.is_invalid());
        assert_eq!(field.severity(), Some(ErrorLevel::Warning));

        handler.clear_error(&field);
        assert!(!field.is_invalid());
        assert_eq!(field.error_message(), None);
        assert_eq!(field.severity(), None);
    }

    #[test]
    fn default_exception_handler_names_the_field() {
        let identity = FieldIdentity::new(FieldKey::next(), "TextField")
            .with_id("age")
            .with_label("Age");
        let err = DefaultBindingExceptionHandler
            .handle_exception(&identity, MessageError::boxed("boom"));
        assert_eq!(
            err.to_string(),
            "An error occurred inside binding logic for the field TextField [id='age', label='Age']"
        );
        assert!(matches!(err, BindingError::UserCode { field: Some(ref f), .. } if *f == identity));
    }

    #[test]
    fn closures_are_constraint_validators() {
        let check = |n: &i32| {
            if *n < 0 {
                vec![ConstraintViolation::new("negative").at("value")]
            } else {
                Vec::new()
            }
        };
        let ctx = ValueContext::default();
        assert!(check.validate_bean(&1, &ctx).is_empty());
        let violations = check.validate_bean(&-1, &ctx);
        assert_eq!(violations[0].property_path.as_deref(), Some("value"));
        assert!(violations[0].to_result().is_error());
    }
}
