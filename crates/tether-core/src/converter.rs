//! Bidirectional presentation ↔ model conversion.
//!
//! A [`Converter<P, M>`] maps a field's presentation value `P` to a model
//! value `M` (fallibly, producing an [`Outcome`]) and back (infallible from
//! the user's point of view; an `Err` here is a programming error in user code
//! and is surfaced as a binding error by the binder).
//!
//! # Invariants
//!
//! 1. A chain `a.chain(b)` converts to model through `a` then `b` and back
//!    through `b` then `a`.
//! 2. An error outcome from any step short-circuits the remaining steps.
//! 3. Symmetric converters round-trip: `to_presentation(to_model(p)) == p`.
//!    [`TrimConverter`] is the named exception.

use std::fmt::Display;
use std::marker::PhantomData;
use std::rc::Rc;
use std::str::FromStr;

use tracing::trace;

use crate::context::ValueContext;
use crate::error::{MessageError, UserError};
use crate::messages::ErrorMessage;
use crate::outcome::Outcome;

/// Bidirectional conversion between a presentation type `P` and a model type `M`.
pub trait Converter<P, M> {
    /// Convert a presentation value to the model type.
    fn convert_to_model(&self, value: P, ctx: &ValueContext<'_>) -> Outcome<M>;

    /// Convert a model value back to the presentation type.
    fn convert_to_presentation(&self, value: M, ctx: &ValueContext<'_>) -> Result<P, UserError>;

    /// Compose with `next`, converting through `self` first.
    fn chain<N, C>(self, next: C) -> Chained<Self, C, M>
    where
        Self: Sized,
        C: Converter<M, N>,
    {
        Chained {
            first: self,
            second: next,
            _mid: PhantomData,
        }
    }
}

impl<P, M, C: Converter<P, M> + ?Sized> Converter<P, M> for Rc<C> {
    fn convert_to_model(&self, value: P, ctx: &ValueContext<'_>) -> Outcome<M> {
        (**self).convert_to_model(value, ctx)
    }

    fn convert_to_presentation(&self, value: M, ctx: &ValueContext<'_>) -> Result<P, UserError> {
        (**self).convert_to_presentation(value, ctx)
    }
}

impl<P, M, C: Converter<P, M> + ?Sized> Converter<P, M> for Box<C> {
    fn convert_to_model(&self, value: P, ctx: &ValueContext<'_>) -> Outcome<M> {
        (**self).convert_to_model(value, ctx)
    }

    fn convert_to_presentation(&self, value: M, ctx: &ValueContext<'_>) -> Result<P, UserError> {
        (**self).convert_to_presentation(value, ctx)
    }
}

/// Two converters applied in sequence.
pub struct Chained<A, B, M> {
    first: A,
    second: B,
    _mid: PhantomData<fn() -> M>,
}

impl<P, M, N, A, B> Converter<P, N> for Chained<A, B, M>
where
    A: Converter<P, M>,
    B: Converter<M, N>,
{
    fn convert_to_model(&self, value: P, ctx: &ValueContext<'_>) -> Outcome<N> {
        self.first
            .convert_to_model(value, ctx)
            .and_then(|mid| self.second.convert_to_model(mid, ctx))
    }

    fn convert_to_presentation(&self, value: N, ctx: &ValueContext<'_>) -> Result<P, UserError> {
        let mid = self.second.convert_to_presentation(value, ctx)?;
        self.first.convert_to_presentation(mid, ctx)
    }
}

/// Identity conversion.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T> Converter<T, T> for Identity {
    fn convert_to_model(&self, value: T, _ctx: &ValueContext<'_>) -> Outcome<T> {
        Outcome::ok(value)
    }

    fn convert_to_presentation(&self, value: T, _ctx: &ValueContext<'_>) -> Result<T, UserError> {
        Ok(value)
    }
}

/// The identity converter.
#[must_use]
pub fn identity() -> Identity {
    Identity
}

/// A converter with its directions swapped.
///
/// Presentation conversion failures of the inner converter become error
/// outcomes; model conversion errors become [`MessageError`]s.
pub struct Reversed<C>(C);

/// Swap the directions of `converter`.
pub fn reverse<C>(converter: C) -> Reversed<C> {
    Reversed(converter)
}

impl<P, M, C: Converter<P, M>> Converter<M, P> for Reversed<C> {
    fn convert_to_model(&self, value: M, ctx: &ValueContext<'_>) -> Outcome<P> {
        match self.0.convert_to_presentation(value, ctx) {
            Ok(presentation) => Outcome::ok(presentation),
            Err(err) => Outcome::error(err.to_string()),
        }
    }

    fn convert_to_presentation(&self, value: P, ctx: &ValueContext<'_>) -> Result<M, UserError> {
        self.0
            .convert_to_model(value, ctx)
            .into_result()
            .map_err(MessageError::boxed)
    }
}

/// Converter built from a pair of closures.
pub struct FnConverter<P, M> {
    to_model: Box<dyn Fn(P, &ValueContext<'_>) -> Outcome<M>>,
    to_presentation: Box<dyn Fn(M, &ValueContext<'_>) -> P>,
}

/// Build a converter from closures.
///
/// ```
/// use tether_core::converter::{self, Converter};
/// use tether_core::{Outcome, ValueContext};
///
/// let cents = converter::from_fn(
///     |euros: f64| Outcome::ok((euros * 100.0).round() as i64),
///     |cents: i64| cents as f64 / 100.0,
/// );
/// let ctx = ValueContext::default();
/// assert_eq!(cents.convert_to_model(1.25, &ctx), Outcome::ok(125));
/// assert_eq!(cents.convert_to_presentation(250, &ctx).unwrap(), 2.5);
/// ```
pub fn from_fn<P: 'static, M: 'static>(
    to_model: impl Fn(P) -> Outcome<M> + 'static,
    to_presentation: impl Fn(M) -> P + 'static,
) -> FnConverter<P, M> {
    FnConverter {
        to_model: Box::new(move |value: P, _: &ValueContext<'_>| to_model(value)),
        to_presentation: Box::new(move |value: M, _: &ValueContext<'_>| to_presentation(value)),
    }
}

/// Build a converter from a fallible parse function; parse errors are
/// reported with `message`.
pub fn from_fallible<P: 'static, M: 'static, E>(
    to_model: impl Fn(P) -> Result<M, E> + 'static,
    to_presentation: impl Fn(M) -> P + 'static,
    message: impl Into<ErrorMessage>,
) -> FnConverter<P, M> {
    let message = message.into();
    FnConverter {
        to_model: Box::new(move |value: P, ctx: &ValueContext<'_>| match to_model(value) {
            Ok(model) => Outcome::ok(model),
            Err(_) => Outcome::error(message.resolve(ctx, &[])),
        }),
        to_presentation: Box::new(move |value: M, _: &ValueContext<'_>| to_presentation(value)),
    }
}

impl<P, M> Converter<P, M> for FnConverter<P, M> {
    fn convert_to_model(&self, value: P, ctx: &ValueContext<'_>) -> Outcome<M> {
        (self.to_model)(value, ctx)
    }

    fn convert_to_presentation(&self, value: M, ctx: &ValueContext<'_>) -> Result<P, UserError> {
        Ok((self.to_presentation)(value, ctx))
    }
}

/// Parses strings into numbers of type `N`.
///
/// Surrounding whitespace is ignored. An empty string converts to the
/// configured empty value, or fails when none is configured.
#[derive(Debug, Clone)]
pub struct StringToNumberConverter<N> {
    message: ErrorMessage,
    empty_value: Option<N>,
}

/// String ↔ `i32`.
pub type StringToIntConverter = StringToNumberConverter<i32>;

/// String ↔ `i64`.
pub type StringToLongConverter = StringToNumberConverter<i64>;

/// String ↔ `f64`.
pub type StringToFloatConverter = StringToNumberConverter<f64>;

impl<N> StringToNumberConverter<N> {
    /// Converter reporting parse failures with `message`.
    pub fn new(message: impl Into<ErrorMessage>) -> Self {
        Self {
            message: message.into(),
            empty_value: None,
        }
    }

    /// Value produced for empty input instead of an error.
    #[must_use]
    pub fn with_empty_value(mut self, value: N) -> Self {
        self.empty_value = Some(value);
        self
    }
}

impl<N: FromStr + Display + Clone> Converter<String, N> for StringToNumberConverter<N> {
    fn convert_to_model(&self, value: String, ctx: &ValueContext<'_>) -> Outcome<N> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            if let Some(empty) = &self.empty_value {
                return Outcome::ok(empty.clone());
            }
        }
        match trimmed.parse::<N>() {
            Ok(number) => Outcome::ok(number),
            Err(_) => {
                trace!(input = trimmed, "number parse failed");
                Outcome::error(self.message.resolve(ctx, &[("value", trimmed)]))
            }
        }
    }

    fn convert_to_presentation(
        &self,
        value: N,
        _ctx: &ValueContext<'_>,
    ) -> Result<String, UserError> {
        Ok(value.to_string())
    }
}

/// Parses `"true"`/`"false"` (case-insensitive) into `bool`.
#[derive(Debug, Clone)]
pub struct StringToBoolConverter {
    message: ErrorMessage,
    true_text: String,
    false_text: String,
}

impl StringToBoolConverter {
    /// Converter reporting unknown input with `message`.
    pub fn new(message: impl Into<ErrorMessage>) -> Self {
        Self {
            message: message.into(),
            true_text: "true".into(),
            false_text: "false".into(),
        }
    }

    /// Use custom presentation strings.
    #[must_use]
    pub fn with_texts(
        mut self,
        true_text: impl Into<String>,
        false_text: impl Into<String>,
    ) -> Self {
        self.true_text = true_text.into();
        self.false_text = false_text.into();
        self
    }
}

impl Converter<String, bool> for StringToBoolConverter {
    fn convert_to_model(&self, value: String, ctx: &ValueContext<'_>) -> Outcome<bool> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case(&self.true_text) {
            Outcome::ok(true)
        } else if trimmed.eq_ignore_ascii_case(&self.false_text) {
            Outcome::ok(false)
        } else {
            Outcome::error(self.message.resolve(ctx, &[("value", trimmed)]))
        }
    }

    fn convert_to_presentation(
        &self,
        value: bool,
        _ctx: &ValueContext<'_>,
    ) -> Result<String, UserError> {
        Ok(if value {
            self.true_text.clone()
        } else {
            self.false_text.clone()
        })
    }
}

/// Trims surrounding whitespace on the way to the model.
///
/// Deliberately asymmetric: `"  a "` becomes `"a"` and is presented as `"a"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimConverter;

impl Converter<String, String> for TrimConverter {
    fn convert_to_model(&self, value: String, _ctx: &ValueContext<'_>) -> Outcome<String> {
        Outcome::ok(value.trim().to_string())
    }

    fn convert_to_presentation(
        &self,
        value: String,
        _ctx: &ValueContext<'_>,
    ) -> Result<String, UserError> {
        Ok(value)
    }
}

/// Two-way mapping between a sentinel presentation value and `None`.
#[derive(Debug, Clone)]
pub struct NullRepresentation<V> {
    sentinel: V,
}

impl<V> NullRepresentation<V> {
    /// Map `sentinel` ↔ `None`.
    pub fn new(sentinel: V) -> Self {
        Self { sentinel }
    }

    /// The sentinel value.
    pub fn sentinel(&self) -> &V {
        &self.sentinel
    }
}

impl<V: PartialEq + Clone> Converter<V, Option<V>> for NullRepresentation<V> {
    fn convert_to_model(&self, value: V, _ctx: &ValueContext<'_>) -> Outcome<Option<V>> {
        if value == self.sentinel {
            Outcome::ok(None)
        } else {
            Outcome::ok(Some(value))
        }
    }

    fn convert_to_presentation(
        &self,
        value: Option<V>,
        _ctx: &ValueContext<'_>,
    ) -> Result<V, UserError> {
        Ok(value.unwrap_or_else(|| self.sentinel.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ctx() -> ValueContext<'static> {
        ValueContext::new("en")
    }

    #[test]
    fn string_to_int_reports_configured_message() {
        let conv = StringToIntConverter::new("Value must be a number");
        assert_eq!(conv.convert_to_model("42".into(), &ctx()), Outcome::ok(42));
        assert_eq!(conv.convert_to_model(" 7 ".into(), &ctx()), Outcome::ok(7));
        assert_eq!(
            conv.convert_to_model("abc".into(), &ctx()),
            Outcome::error("Value must be a number")
        );
    }

    #[test]
    fn string_to_int_empty_value() {
        let strict = StringToIntConverter::new("NaN");
        assert!(strict.convert_to_model(String::new(), &ctx()).is_error());
        let lenient = StringToIntConverter::new("NaN").with_empty_value(0);
        assert_eq!(lenient.convert_to_model("  ".into(), &ctx()), Outcome::ok(0));
    }

    #[test]
    fn message_can_quote_value() {
        let conv = StringToFloatConverter::new("'{value}' is not a number");
        assert_eq!(
            conv.convert_to_model("x1".into(), &ctx()),
            Outcome::error("'x1' is not a number")
        );
    }

    #[test]
    fn bool_converter_custom_texts() {
        let conv = StringToBoolConverter::new("yes or no").with_texts("yes", "no");
        assert_eq!(conv.convert_to_model("YES".into(), &ctx()), Outcome::ok(true));
        assert_eq!(conv.convert_to_presentation(false, &ctx()).unwrap(), "no");
        assert!(conv.convert_to_model("maybe".into(), &ctx()).is_error());
    }

    #[test]
    fn chain_converts_forward_and_reverses_back() {
        let conv = TrimConverter.chain(StringToIntConverter::new("NaN"));
        assert_eq!(conv.convert_to_model("  12 ".into(), &ctx()), Outcome::ok(12));
        assert_eq!(conv.convert_to_presentation(12, &ctx()).unwrap(), "12");
    }

    #[test]
    fn chain_short_circuits_on_error() {
        let second_called = Rc::new(std::cell::Cell::new(false));
        let flag = Rc::clone(&second_called);
        let second = from_fn(
            move |v: i32| {
                flag.set(true);
                Outcome::ok(v)
            },
            |v: i32| v,
        );
        let conv = StringToIntConverter::new("NaN").chain(second);
        assert!(conv.convert_to_model("z".into(), &ctx()).is_error());
        assert!(!second_called.get());
    }

    #[test]
    fn reversed_swaps_directions() {
        let conv = reverse(StringToIntConverter::new("NaN"));
        assert_eq!(conv.convert_to_model(5, &ctx()), Outcome::ok("5".to_string()));
        assert_eq!(conv.convert_to_presentation("9".into(), &ctx()).unwrap(), 9);
        let err = conv.convert_to_presentation("x".into(), &ctx()).unwrap_err();
        assert_eq!(err.to_string(), "NaN");
    }

    #[test]
    fn identity_passes_through() {
        let conv = identity();
        assert_eq!(Converter::<u8, u8>::convert_to_model(&conv, 3, &ctx()), Outcome::ok(3));
    }

    #[test]
    fn null_representation_two_way() {
        let conv = NullRepresentation::new(String::new());
        assert_eq!(conv.convert_to_model(String::new(), &ctx()), Outcome::ok(None));
        assert_eq!(
            conv.convert_to_model("a".into(), &ctx()),
            Outcome::ok(Some("a".to_string()))
        );
        assert_eq!(conv.convert_to_presentation(None, &ctx()).unwrap(), "");
    }

    #[test]
    fn trim_is_not_a_round_trip() {
        let conv = TrimConverter;
        let model = conv.convert_to_model("  padded ".into(), &ctx()).into_result().unwrap();
        let back = conv.convert_to_presentation(model, &ctx()).unwrap();
        assert_ne!(back, "  padded ");
        assert_eq!(back, "padded");
    }

    #[test]
    fn fallible_uses_message() {
        let conv = from_fallible(|s: String| s.parse::<u8>(), |n: u8| n.to_string(), "0-255");
        assert_eq!(conv.convert_to_model("300".into(), &ctx()), Outcome::error("0-255"));
    }

    proptest! {
        #[test]
        fn int_converter_round_trips(n in any::<i64>()) {
            let conv = StringToLongConverter::new("NaN");
            let text = conv.convert_to_presentation(n, &ctx()).unwrap();
            prop_assert_eq!(conv.convert_to_model(text, &ctx()), Outcome::ok(n));
        }

        #[test]
        fn null_representation_round_trips(s in "[a-z]{0,8}") {
            let conv = NullRepresentation::new(String::new());
            let model = conv.convert_to_model(s.clone(), &ctx()).into_result().unwrap();
            prop_assert_eq!(conv.convert_to_presentation(model, &ctx()).unwrap(), s);
        }
    }
}
