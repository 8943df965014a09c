//! Value validators.
//!
//! A [`Validator<T>`] inspects a model value and returns a
//! [`ValidationResult`]. Validators never mutate the value and never fail
//! with an error of their own: every outcome, including user mistakes, is a
//! result with a message and a level.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Invalid pattern | Bad regex given to [`RegexpValidator::new`] | `Err(regex::Error)` |
//! | Unknown message token | `{name}` not supplied | Token left as-is in the message |

use std::fmt::Display;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::context::ValueContext;
use crate::messages::ErrorMessage;
use crate::validation::{ErrorLevel, ValidationResult};

/// A check applied to a model value.
pub trait Validator<T: ?Sized> {
    /// Validate `value` in `ctx`.
    fn apply(&self, value: &T, ctx: &ValueContext<'_>) -> ValidationResult;
}

impl<T: ?Sized, V: Validator<T> + ?Sized> Validator<T> for Rc<V> {
    fn apply(&self, value: &T, ctx: &ValueContext<'_>) -> ValidationResult {
        (**self).apply(value, ctx)
    }
}

impl<T: ?Sized, V: Validator<T> + ?Sized> Validator<T> for Box<V> {
    fn apply(&self, value: &T, ctx: &ValueContext<'_>) -> ValidationResult {
        (**self).apply(value, ctx)
    }
}

// ---------------------------------------------------------------------------
// Closure validators
// ---------------------------------------------------------------------------

/// Validator backed by a closure returning a full result.
pub struct FnValidator<T: ?Sized> {
    check: Box<dyn Fn(&T, &ValueContext<'_>) -> ValidationResult>,
}

/// Wrap a closure as a validator.
pub fn from_fn<T: ?Sized + 'static>(
    check: impl Fn(&T, &ValueContext<'_>) -> ValidationResult + 'static,
) -> FnValidator<T> {
    FnValidator {
        check: Box::new(check),
    }
}

impl<T: ?Sized> Validator<T> for FnValidator<T> {
    fn apply(&self, value: &T, ctx: &ValueContext<'_>) -> ValidationResult {
        (self.check)(value, ctx)
    }
}

/// Validator that fails with a message when a predicate returns `false`.
pub struct PredicateValidator<T: ?Sized> {
    predicate: Box<dyn Fn(&T, &ValueContext<'_>) -> bool>,
    message: ErrorMessage,
    level: ErrorLevel,
}

/// Validator passing when `predicate` holds.
///
/// ```
/// use tether_core::validator::{self, Validator};
/// use tether_core::ValueContext;
///
/// let positive = validator::from_predicate(|n: &i32| *n > 0, "must be positive");
/// let ctx = ValueContext::default();
/// assert!(!positive.apply(&5, &ctx).is_error());
/// assert_eq!(positive.apply(&-1, &ctx).error_message(), Some("must be positive"));
/// ```
pub fn from_predicate<T: ?Sized + 'static>(
    predicate: impl Fn(&T) -> bool + 'static,
    message: impl Into<ErrorMessage>,
) -> PredicateValidator<T> {
    PredicateValidator {
        predicate: Box::new(move |value: &T, _: &ValueContext<'_>| predicate(value)),
        message: message.into(),
        level: ErrorLevel::Error,
    }
}

/// Like [`from_predicate`], with the context available to the predicate.
pub fn from_context_predicate<T: ?Sized + 'static>(
    predicate: impl Fn(&T, &ValueContext<'_>) -> bool + 'static,
    message: impl Into<ErrorMessage>,
) -> PredicateValidator<T> {
    PredicateValidator {
        predicate: Box::new(predicate),
        message: message.into(),
        level: ErrorLevel::Error,
    }
}

impl<T: ?Sized> PredicateValidator<T> {
    /// Report failures at `level` instead of [`ErrorLevel::Error`].
    #[must_use]
    pub fn with_level(mut self, level: ErrorLevel) -> Self {
        self.level = level;
        self
    }
}

impl<T: ?Sized> Validator<T> for PredicateValidator<T> {
    fn apply(&self, value: &T, ctx: &ValueContext<'_>) -> ValidationResult {
        if (self.predicate)(value, ctx) {
            ValidationResult::ok()
        } else {
            ValidationResult::create(self.message.resolve(ctx, &[]), self.level)
        }
    }
}

// ---------------------------------------------------------------------------
// Stock validators
// ---------------------------------------------------------------------------

/// Checks the length of a string in grapheme clusters.
///
/// Messages may use `{min}`, `{max}`, `{length}` and `{value}`.
#[derive(Debug, Clone)]
pub struct StringLengthValidator {
    message: ErrorMessage,
    min: Option<usize>,
    max: Option<usize>,
}

impl StringLengthValidator {
    /// Length must be within `min..=max`; `None` leaves a side open.
    pub fn new(message: impl Into<ErrorMessage>, min: Option<usize>, max: Option<usize>) -> Self {
        Self {
            message: message.into(),
            min,
            max,
        }
    }

    /// Length must be within `min..=max`.
    pub fn between(message: impl Into<ErrorMessage>, min: usize, max: usize) -> Self {
        Self::new(message, Some(min), Some(max))
    }

    /// Lower bound, if any.
    #[must_use]
    pub fn min(&self) -> Option<usize> {
        self.min
    }

    /// Upper bound, if any.
    #[must_use]
    pub fn max(&self) -> Option<usize> {
        self.max
    }
}

impl Validator<str> for StringLengthValidator {
    fn apply(&self, value: &str, ctx: &ValueContext<'_>) -> ValidationResult {
        let length = value.graphemes(true).count();
        let too_short = self.min.is_some_and(|min| length < min);
        let too_long = self.max.is_some_and(|max| length > max);
        if !too_short && !too_long {
            return ValidationResult::ok();
        }
        let min = self.min.map(|m| m.to_string()).unwrap_or_default();
        let max = self.max.map(|m| m.to_string()).unwrap_or_default();
        let length = length.to_string();
        let message = self.message.resolve(
            ctx,
            &[
                ("min", min.as_str()),
                ("max", max.as_str()),
                ("length", length.as_str()),
                ("value", value),
            ],
        );
        ValidationResult::error(message)
    }
}

impl Validator<String> for StringLengthValidator {
    fn apply(&self, value: &String, ctx: &ValueContext<'_>) -> ValidationResult {
        Validator::<str>::apply(self, value.as_str(), ctx)
    }
}

/// Checks that a value lies within a range.
///
/// Messages may use `{min}`, `{max}` and `{value}`.
#[derive(Debug, Clone)]
pub struct RangeValidator<T> {
    message: ErrorMessage,
    min: Option<T>,
    max: Option<T>,
    min_inclusive: bool,
    max_inclusive: bool,
}

impl<T: PartialOrd + Display> RangeValidator<T> {
    /// Inclusive range `min..=max`.
    pub fn between(message: impl Into<ErrorMessage>, min: T, max: T) -> Self {
        Self {
            message: message.into(),
            min: Some(min),
            max: Some(max),
            min_inclusive: true,
            max_inclusive: true,
        }
    }

    /// Inclusive lower bound only.
    pub fn at_least(message: impl Into<ErrorMessage>, min: T) -> Self {
        Self {
            message: message.into(),
            min: Some(min),
            max: None,
            min_inclusive: true,
            max_inclusive: true,
        }
    }

    /// Inclusive upper bound only.
    pub fn at_most(message: impl Into<ErrorMessage>, max: T) -> Self {
        Self {
            message: message.into(),
            min: None,
            max: Some(max),
            min_inclusive: true,
            max_inclusive: true,
        }
    }

    /// Set whether the lower bound itself is accepted.
    #[must_use]
    pub fn min_inclusive(mut self, inclusive: bool) -> Self {
        self.min_inclusive = inclusive;
        self
    }

    /// Set whether the upper bound itself is accepted.
    #[must_use]
    pub fn max_inclusive(mut self, inclusive: bool) -> Self {
        self.max_inclusive = inclusive;
        self
    }

    fn in_range(&self, value: &T) -> bool {
        let above_min = match &self.min {
            Some(min) if self.min_inclusive => value >= min,
            Some(min) => value > min,
            None => true,
        };
        let below_max = match &self.max {
            Some(max) if self.max_inclusive => value <= max,
            Some(max) => value < max,
            None => true,
        };
        above_min && below_max
    }
}

impl<T: PartialOrd + Display> Validator<T> for RangeValidator<T> {
    fn apply(&self, value: &T, ctx: &ValueContext<'_>) -> ValidationResult {
        if self.in_range(value) {
            return ValidationResult::ok();
        }
        let min = self.min.as_ref().map(ToString::to_string).unwrap_or_default();
        let max = self.max.as_ref().map(ToString::to_string).unwrap_or_default();
        let shown = value.to_string();
        let args = [
            ("min", min.as_str()),
            ("max", max.as_str()),
            ("value", shown.as_str()),
        ];
        ValidationResult::error(self.message.resolve(ctx, &args))
    }
}

/// Checks a string against a regular expression.
///
/// By default the whole string must match; [`RegexpValidator::partial`]
/// accepts any match inside the string.
#[derive(Debug, Clone)]
pub struct RegexpValidator {
    message: ErrorMessage,
    pattern: Regex,
    complete: bool,
    allow_empty: bool,
}

impl RegexpValidator {
    /// Compile `pattern`; the whole value must match.
    pub fn new(message: impl Into<ErrorMessage>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::from_regex(message, Regex::new(pattern)?))
    }

    /// Use an already compiled expression.
    pub fn from_regex(message: impl Into<ErrorMessage>, pattern: Regex) -> Self {
        Self {
            message: message.into(),
            pattern,
            complete: true,
            allow_empty: false,
        }
    }

    /// Accept a match anywhere in the value.
    #[must_use]
    pub fn partial(mut self) -> Self {
        self.complete = false;
        self
    }

    /// Accept the empty string without matching.
    #[must_use]
    pub fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = allow;
        self
    }

    fn matches(&self, value: &str) -> bool {
        if self.complete {
            self.pattern
                .find(value)
                .is_some_and(|m| m.start() == 0 && m.end() == value.len())
        } else {
            self.pattern.is_match(value)
        }
    }
}

impl Validator<str> for RegexpValidator {
    fn apply(&self, value: &str, ctx: &ValueContext<'_>) -> ValidationResult {
        if (self.allow_empty && value.is_empty()) || self.matches(value) {
            ValidationResult::ok()
        } else {
            ValidationResult::error(self.message.resolve(ctx, &[("value", value)]))
        }
    }
}

impl Validator<String> for RegexpValidator {
    fn apply(&self, value: &String, ctx: &ValueContext<'_>) -> ValidationResult {
        Validator::<str>::apply(self, value.as_str(), ctx)
    }
}

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.+\-]+@[a-zA-Z0-9\-]+(\.[a-zA-Z0-9\-]+)*\.[a-zA-Z0-9\-]{2,}$")
        .expect("email pattern is valid")
});

/// Checks that a string looks like an email address. Empty input passes;
/// combine with a required check to reject it.
#[derive(Debug, Clone)]
pub struct EmailValidator {
    inner: RegexpValidator,
}

impl EmailValidator {
    /// Validator reporting malformed addresses with `message`.
    pub fn new(message: impl Into<ErrorMessage>) -> Self {
        Self {
            inner: RegexpValidator::from_regex(message, EMAIL_PATTERN.clone()).allow_empty(true),
        }
    }
}

impl Validator<str> for EmailValidator {
    fn apply(&self, value: &str, ctx: &ValueContext<'_>) -> ValidationResult {
        Validator::<str>::apply(&self.inner, value, ctx)
    }
}

impl Validator<String> for EmailValidator {
    fn apply(&self, value: &String, ctx: &ValueContext<'_>) -> ValidationResult {
        Validator::<str>::apply(&self.inner, value.as_str(), ctx)
    }
}

/// Rejects empty strings and `None`.
#[derive(Debug, Clone)]
pub struct NotEmptyValidator {
    message: ErrorMessage,
}

impl NotEmptyValidator {
    /// Validator reporting empty values with `message`.
    pub fn new(message: impl Into<ErrorMessage>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn verdict(&self, empty: bool, ctx: &ValueContext<'_>) -> ValidationResult {
        if empty {
            ValidationResult::error(self.message.resolve(ctx, &[]))
        } else {
            ValidationResult::ok()
        }
    }
}

impl Validator<String> for NotEmptyValidator {
    fn apply(&self, value: &String, ctx: &ValueContext<'_>) -> ValidationResult {
        self.verdict(value.is_empty(), ctx)
    }
}

impl<T> Validator<Option<T>> for NotEmptyValidator {
    fn apply(&self, value: &Option<T>, ctx: &ValueContext<'_>) -> ValidationResult {
        self.verdict(value.is_none(), ctx)
    }
}

impl<T> Validator<Vec<T>> for NotEmptyValidator {
    fn apply(&self, value: &Vec<T>, ctx: &ValueContext<'_>) -> ValidationResult {
        self.verdict(value.is_empty(), ctx)
    }
}
