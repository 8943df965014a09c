//! Typed converter/validator pipeline of one binding.
//!
//! Every `with_converter` / `with_validator` call on a builder wraps the
//! previous pipeline in one more stage, so the stage list is encoded in the
//! type until it is erased behind `Rc<dyn Chain<F, T>>`.
//!
//! # Invariants
//!
//! 1. Presentation→model runs stages in registration order; model→presentation
//!    runs converters in reverse order.
//! 2. A converter error stops the pipeline; later stages never see a value.
//! 3. Validators never stop the pipeline: every validator reached runs and its
//!    result is recorded.

use std::rc::Rc;

use tether_core::{Converter, Outcome, UserError, ValidationResult, Validator, ValueContext};

pub(crate) trait Chain<F, T> {
    /// Convert and (when `validate` is set) validate `value`.
    ///
    /// Validator results are appended to `results`. A converter error is
    /// returned as `Err` and is not appended.
    fn to_model(
        &self,
        value: F,
        ctx: &ValueContext<'_>,
        validate: bool,
        results: &mut Vec<ValidationResult>,
    ) -> Result<T, ValidationResult>;

    /// Convert a model value back to the field type.
    fn to_presentation(&self, value: T, ctx: &ValueContext<'_>) -> Result<F, UserError>;
}

/// The empty pipeline.
pub(crate) struct Identity;

impl<F> Chain<F, F> for Identity {
    fn to_model(
        &self,
        value: F,
        _ctx: &ValueContext<'_>,
        _validate: bool,
        _results: &mut Vec<ValidationResult>,
    ) -> Result<F, ValidationResult> {
        Ok(value)
    }

    fn to_presentation(&self, value: F, _ctx: &ValueContext<'_>) -> Result<F, UserError> {
        Ok(value)
    }
}

pub(crate) struct Converted<F, M, N> {
    pub(crate) prev: Rc<dyn Chain<F, M>>,
    pub(crate) converter: Box<dyn Converter<M, N>>,
}

impl<F, M, N> Chain<F, N> for Converted<F, M, N> {
    fn to_model(
        &self,
        value: F,
        ctx: &ValueContext<'_>,
        validate: bool,
        results: &mut Vec<ValidationResult>,
    ) -> Result<N, ValidationResult> {
        let mid = self.prev.to_model(value, ctx, validate, results)?;
        match self.converter.convert_to_model(mid, ctx) {
            Outcome::Ok(model) => Ok(model),
            Outcome::Error(message) => {
                tracing::trace!(%message, "conversion rejected value");
                Err(ValidationResult::error(message))
            }
        }
    }

    fn to_presentation(&self, value: N, ctx: &ValueContext<'_>) -> Result<F, UserError> {
        let mid = self.converter.convert_to_presentation(value, ctx)?;
        self.prev.to_presentation(mid, ctx)
    }
}

pub(crate) struct Validated<F, T> {
    pub(crate) prev: Rc<dyn Chain<F, T>>,
    pub(crate) validator: Rc<dyn Validator<T>>,
}

impl<F, T> Chain<F, T> for Validated<F, T> {
    fn to_model(
        &self,
        value: F,
        ctx: &ValueContext<'_>,
        validate: bool,
        results: &mut Vec<ValidationResult>,
    ) -> Result<T, ValidationResult> {
        let value = self.prev.to_model(value, ctx, validate, results)?;
        if validate {
            results.push(self.validator.apply(&value, ctx));
        }
        Ok(value)
    }

    fn to_presentation(&self, value: T, ctx: &ValueContext<'_>) -> Result<F, UserError> {
        self.prev.to_presentation(value, ctx)
    }
}
