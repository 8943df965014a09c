//! Conversion outcome: either a value or an error message.
//!
//! # Invariants
//!
//! 1. Exactly one of value / error message is present.
//! 2. `map` and `and_then` pass errors through unchanged and never invoke
//!    the mapping function on an error.
//! 3. Outcomes are immutable once created.

use std::fmt;

/// The result of converting a presentation value into a model value.
///
/// Converter chains short-circuit on the first [`Outcome::Error`]; the error
/// message is what the bound field displays.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Outcome<T> {
    /// Conversion succeeded with a value.
    Ok(T),
    /// Conversion failed with a user-visible message.
    Error(String),
}

impl<T> Outcome<T> {
    /// Successful outcome carrying `value`.
    pub fn ok(value: T) -> Self {
        Self::Ok(value)
    }

    /// Failed outcome carrying `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Fold a standard `Result` into an outcome, using the error's `Display`
    /// text as the message.
    pub fn of<E: fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(err) => Self::Error(err.to_string()),
        }
    }

    /// Fold a standard `Result` into an outcome with a custom message.
    pub fn of_with<E>(result: Result<T, E>, message: impl FnOnce(E) -> String) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(err) => Self::Error(message(err)),
        }
    }

    /// Whether this outcome is an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Whether this outcome carries a value.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Run `f` with the value if this outcome is ok.
    pub fn if_ok(&self, f: impl FnOnce(&T)) {
        if let Self::Ok(value) = self {
            f(value);
        }
    }

    /// Run `f` with the message if this outcome is an error.
    pub fn if_error(&self, f: impl FnOnce(&str)) {
        if let Self::Error(message) = self {
            f(message);
        }
    }

    /// Transform the value, passing errors through.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Ok(value) => Outcome::Ok(f(value)),
            Self::Error(message) => Outcome::Error(message),
        }
    }

    /// Chain another fallible step, passing errors through.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Outcome<U>) -> Outcome<U> {
        match self {
            Self::Ok(value) => f(value),
            Self::Error(message) => Outcome::Error(message),
        }
    }

    /// Borrow the value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    /// Borrow the error message, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Error(message) => Some(message),
        }
    }

    /// Convert into a standard `Result`.
    pub fn into_result(self) -> Result<T, String> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Error(message) => Err(message),
        }
    }

    /// Discard the error message.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Error(_) => None,
        }
    }
}

impl<T> From<Result<T, String>> for Outcome<T> {
    fn from(result: Result<T, String>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(message) => Self::Error(message),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok(value) => write!(f, "ok({value})"),
            Self::Error(message) => write!(f, "error({message})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn ok_and_error_are_exclusive() {
        let ok = Outcome::ok(3);
        assert!(ok.is_ok());
        assert!(!ok.is_error());
        assert_eq!(ok.value(), Some(&3));
        assert_eq!(ok.error_message(), None);

        let err: Outcome<i32> = Outcome::error("bad");
        assert!(err.is_error());
        assert_eq!(err.value(), None);
        assert_eq!(err.error_message(), Some("bad"));
    }

    #[test]
    fn map_skips_errors() {
        let called = Cell::new(false);
        let err: Outcome<i32> = Outcome::error("bad");
        let mapped = err.map(|v| {
            called.set(true);
            v * 2
        });
        assert!(!called.get());
        assert_eq!(mapped, Outcome::error("bad"));
        assert_eq!(Outcome::ok(4).map(|v| v * 2), Outcome::ok(8));
    }

    #[test]
    fn and_then_short_circuits() {
        let out = Outcome::ok("12")
            .and_then(|s| Outcome::of(s.parse::<i32>()))
            .and_then(|n| {
                if n > 10 {
                    Outcome::error("too big")
                } else {
                    Outcome::ok(n)
                }
            });
        assert_eq!(out, Outcome::error("too big"));
    }

    #[test]
    fn of_uses_display_text() {
        let out: Outcome<i32> = Outcome::of("abc".parse::<i32>());
        assert_eq!(out.error_message(), Some("invalid digit found in string"));
        let out: Outcome<i32> = Outcome::of_with("abc".parse::<i32>(), |_| "NaN".into());
        assert_eq!(out.error_message(), Some("NaN"));
    }

    #[test]
    fn if_ok_and_if_error_dispatch() {
        let hits = Cell::new(0);
        Outcome::ok(1).if_ok(|_| hits.set(hits.get() + 1));
        Outcome::ok(1).if_error(|_| hits.set(hits.get() + 10));
        Outcome::<i32>::error("x").if_error(|_| hits.set(hits.get() + 100));
        assert_eq!(hits.get(), 101);
    }

    #[test]
    fn equality_covers_value_and_message() {
        assert_eq!(Outcome::ok(1), Outcome::ok(1));
        assert_ne!(Outcome::ok(1), Outcome::ok(2));
        assert_eq!(Outcome::<i32>::error("a"), Outcome::<i32>::error("a"));
        assert_ne!(Outcome::<i32>::error("a"), Outcome::<i32>::error("b"));
    }

    #[test]
    fn conversions_to_std() {
        assert_eq!(Outcome::ok(1).into_result(), Ok(1));
        assert_eq!(Outcome::<i32>::error("e").into_option(), None);
        let from: Outcome<i32> = Err::<i32, String>("e".into()).into();
        assert!(from.is_error());
    }
}
