//! Validation status snapshots and binder events.

use tether_core::{BinderId, FieldIdentity, ValidationResult};

use crate::binding::BindingRef;
use crate::error::{FieldValidationError, ValidationFailure};

/// Outcome of validating one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BindingStatus {
    /// Conversion and all validators passed (informational results allowed).
    Ok,
    /// Conversion failed or a validator returned a blocking result.
    Error,
    /// Not evaluated, e.g. after the bean was removed.
    Unresolved,
}

/// Validation status of one binding.
pub struct BindingValidationStatus<B> {
    binding: BindingRef<B>,
    status: BindingStatus,
    conversion_error: Option<ValidationResult>,
    results: Vec<ValidationResult>,
}

impl<B> Clone for BindingValidationStatus<B> {
    fn clone(&self) -> Self {
        Self {
            binding: self.binding.clone(),
            status: self.status,
            conversion_error: self.conversion_error.clone(),
            results: self.results.clone(),
        }
    }
}

impl<B: 'static> BindingValidationStatus<B> {
    pub(crate) fn new(
        binding: BindingRef<B>,
        conversion_error: Option<ValidationResult>,
        results: Vec<ValidationResult>,
    ) -> Self {
        let status = if results.iter().any(ValidationResult::is_error) {
            BindingStatus::Error
        } else {
            BindingStatus::Ok
        };
        Self {
            binding,
            status,
            conversion_error,
            results,
        }
    }

    pub(crate) fn unresolved(binding: BindingRef<B>) -> Self {
        Self {
            binding,
            status: BindingStatus::Unresolved,
            conversion_error: None,
            results: Vec::new(),
        }
    }

    /// The status.
    #[must_use]
    pub fn status(&self) -> BindingStatus {
        self.status
    }

    /// Whether this binding failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == BindingStatus::Error
    }

    /// The conversion error, when a converter rejected the value.
    #[must_use]
    pub fn conversion_error(&self) -> Option<&ValidationResult> {
        self.conversion_error.as_ref()
    }

    /// Every result in evaluation order: required check, field default
    /// validator, then the chain (a conversion error is last).
    #[must_use]
    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    /// The reported result: the first blocking one, otherwise the first
    /// informational one.
    #[must_use]
    pub fn result(&self) -> Option<&ValidationResult> {
        self.results
            .iter()
            .find(|r| r.is_error())
            .or_else(|| self.results.iter().find(|r| r.has_level()))
    }

    /// Message of the reported result.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.result().and_then(ValidationResult::error_message)
    }

    /// The binding this status belongs to.
    #[must_use]
    pub fn binding(&self) -> &BindingRef<B> {
        &self.binding
    }

    /// Identity of the bound field, if still bound.
    #[must_use]
    pub fn field(&self) -> Option<FieldIdentity> {
        self.binding.field_identity()
    }
}

impl<B> std::fmt::Debug for BindingValidationStatus<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingValidationStatus")
            .field("binding", &self.binding.id())
            .field("status", &self.status)
            .field("results", &self.results)
            .finish()
    }
}

/// Aggregate status of one binder validation pass.
pub struct BinderValidationStatus<B> {
    binder: BinderId,
    field_statuses: Vec<BindingValidationStatus<B>>,
    bean_results: Vec<ValidationResult>,
}

impl<B> Clone for BinderValidationStatus<B> {
    fn clone(&self) -> Self {
        Self {
            binder: self.binder,
            field_statuses: self.field_statuses.clone(),
            bean_results: self.bean_results.clone(),
        }
    }
}

impl<B: 'static> BinderValidationStatus<B> {
    pub(crate) fn new(
        binder: BinderId,
        field_statuses: Vec<BindingValidationStatus<B>>,
        bean_results: Vec<ValidationResult>,
    ) -> Self {
        Self {
            binder,
            field_statuses,
            bean_results,
        }
    }

    /// The binder that produced this status.
    #[must_use]
    pub fn binder(&self) -> BinderId {
        self.binder
    }

    /// Whether nothing blocking was found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !self.has_errors()
    }

    /// Whether any binding or bean-level result is blocking.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.field_statuses.iter().any(BindingValidationStatus::is_error)
            || self.bean_results.iter().any(ValidationResult::is_error)
    }

    /// Per-binding statuses in binding order.
    #[must_use]
    pub fn field_statuses(&self) -> &[BindingValidationStatus<B>] {
        &self.field_statuses
    }

    /// Bean-level results, including passing ones.
    #[must_use]
    pub fn bean_results(&self) -> &[ValidationResult] {
        &self.bean_results
    }

    /// Failing binding statuses.
    pub fn field_validation_errors(
        &self,
    ) -> impl Iterator<Item = &BindingValidationStatus<B>> + '_ {
        self.field_statuses.iter().filter(|s| s.is_error())
    }

    /// Failing bean-level results.
    pub fn bean_validation_errors(&self) -> impl Iterator<Item = &ValidationResult> + '_ {
        self.bean_results.iter().filter(|r| r.is_error())
    }

    /// Every blocking result, field errors first.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<ValidationResult> {
        self.field_validation_errors()
            .filter_map(|s| s.result().cloned())
            .chain(self.bean_validation_errors().cloned())
            .collect()
    }

    /// Hand each binding status to its binding's status handler.
    pub fn notify_binding_handlers(&self) {
        for status in &self.field_statuses {
            status.binding.handle_status(status);
        }
    }

    pub(crate) fn to_failure(&self) -> ValidationFailure {
        ValidationFailure {
            field_errors: self
                .field_validation_errors()
                .filter_map(|s| {
                    Some(FieldValidationError {
                        field: s.field()?,
                        property: s.binding.property_name(),
                        result: s.result()?.clone(),
                    })
                })
                .collect(),
            bean_errors: self.bean_validation_errors().cloned().collect(),
        }
    }
}

impl<B> std::fmt::Debug for BinderValidationStatus<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinderValidationStatus")
            .field("binder", &self.binder)
            .field("field_statuses", &self.field_statuses)
            .field("bean_results", &self.bean_results)
            .finish()
    }
}

/// Fired once per externally triggered binder operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChangeEvent {
    /// The binder.
    pub binder: BinderId,
    /// Whether the pass found blocking errors.
    pub has_validation_errors: bool,
}

/// Fired after a bound field's value changed and the binder processed it.
#[derive(Debug, Clone, PartialEq)]
pub struct BinderValueChangeEvent {
    /// The binder.
    pub binder: BinderId,
    /// The field that changed.
    pub field: FieldIdentity,
    /// Whether the change came from user input.
    pub from_client: bool,
}
