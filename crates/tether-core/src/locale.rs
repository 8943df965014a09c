//! The locale messages are resolved in.
//!
//! Each binder owns one [`LocaleContext`]. Bindings read
//! [`current_locale`](LocaleContext::current_locale) when they build a
//! [`ValueContext`](crate::ValueContext), so a change takes effect at the next
//! conversion or validation. Nothing is process-wide.
//!
//! # Invariants
//!
//! 1. Overrides nest: the innermost live [`LocaleOverride`] wins, and
//!    dropping it exposes the one below (or the base locale).
//! 2. Stored tags are normalized: `fi_FI.UTF-8` becomes `fi-FI`, `C` and
//!    `POSIX` become `en`, and blank tags become `en`.

use std::cell::RefCell;
use std::env;
use std::rc::Rc;

/// Locale tag such as `"en"`, `"en-US"` or `"fi"`.
pub type Locale = String;

const FALLBACK_LOCALE: &str = "en";

/// Base locale plus a stack of scoped overrides.
#[derive(Debug)]
pub struct LocaleContext {
    base: RefCell<Locale>,
    overrides: Rc<RefCell<Vec<Locale>>>,
}

impl Default for LocaleContext {
    fn default() -> Self {
        Self::system()
    }
}

impl LocaleContext {
    /// A context whose base locale is `locale`.
    #[must_use]
    pub fn new(locale: impl AsRef<str>) -> Self {
        Self {
            base: RefCell::new(normalize_locale(locale.as_ref())),
            overrides: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A context initialized from the process environment.
    #[must_use]
    pub fn system() -> Self {
        Self::new(detect_system_locale())
    }

    /// The innermost override, or the base locale.
    #[must_use]
    pub fn current_locale(&self) -> Locale {
        match self.overrides.borrow().last() {
            Some(locale) => locale.clone(),
            None => self.base.borrow().clone(),
        }
    }

    /// Replace the base locale. Live overrides still take precedence.
    pub fn set_locale(&self, locale: impl AsRef<str>) {
        *self.base.borrow_mut() = normalize_locale(locale.as_ref());
    }

    /// Resolve messages in `locale` until the guard is dropped.
    #[must_use = "dropping this guard ends the override"]
    pub fn push_override(&self, locale: impl AsRef<str>) -> LocaleOverride {
        self.overrides
            .borrow_mut()
            .push(normalize_locale(locale.as_ref()));
        LocaleOverride {
            stack: Rc::clone(&self.overrides),
        }
    }
}

/// Ends a locale override when dropped.
#[must_use = "dropping this guard ends the override"]
#[derive(Debug)]
pub struct LocaleOverride {
    stack: Rc<RefCell<Vec<Locale>>>,
}

impl Drop for LocaleOverride {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

/// The locale messages should use, from `LC_ALL`, `LC_MESSAGES` or `LANG`
/// (first set and non-blank wins), else `"en"`.
#[must_use]
pub fn detect_system_locale() -> Locale {
    let vars = ["LC_ALL", "LC_MESSAGES", "LANG"].map(|name| env::var(name).ok());
    locale_from_env(vars.iter().map(Option::as_deref))
}

/// Normalize a raw tag such as `de_DE.UTF-8@euro` to `de-DE`.
#[must_use]
pub fn normalize_locale(raw: &str) -> Locale {
    parse_tag(raw).unwrap_or_else(|| FALLBACK_LOCALE.to_string())
}

/// The language part of a locale tag (`"fi-FI"` → `"fi"`).
#[must_use]
pub fn language_of(locale: &str) -> &str {
    locale.split('-').next().unwrap_or(locale)
}

fn locale_from_env<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Locale {
    values
        .flatten()
        .find_map(parse_tag)
        .unwrap_or_else(|| FALLBACK_LOCALE.to_string())
}

fn parse_tag(raw: &str) -> Option<Locale> {
    let tag = raw
        .split(['.', '@'])
        .next()
        .map(str::trim)
        .filter(|tag| !tag.is_empty())?;
    if tag.eq_ignore_ascii_case("c") || tag.eq_ignore_ascii_case("posix") {
        return Some(FALLBACK_LOCALE.to_string());
    }
    Some(tag.replace('_', "-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_precedence() {
        let pick = |vars: [Option<&str>; 3]| locale_from_env(vars.into_iter());
        assert_eq!(pick([Some("fi_FI.UTF-8"), Some("sv_SE"), Some("en_US")]), "fi-FI");
        assert_eq!(pick([None, Some("sv_SE.UTF-8"), Some("en_US")]), "sv-SE");
        assert_eq!(pick([Some("  "), None, Some("de_DE@euro")]), "de-DE");
        assert_eq!(pick([None, None, None]), "en");
    }

    #[test]
    fn posix_and_blank_tags_fall_back_to_english() {
        assert_eq!(normalize_locale("C"), "en");
        assert_eq!(normalize_locale("POSIX.UTF-8"), "en");
        assert_eq!(normalize_locale(""), "en");
    }

    #[test]
    fn overrides_nest_over_the_base_locale() {
        let ctx = LocaleContext::new("en_GB");
        let outer = ctx.push_override("fr");
        {
            let _inner = ctx.push_override("es");
            assert_eq!(ctx.current_locale(), "es");
        }
        assert_eq!(ctx.current_locale(), "fr");
        ctx.set_locale("de_DE");
        assert_eq!(ctx.current_locale(), "fr");
        drop(outer);
        assert_eq!(ctx.current_locale(), "de-DE");
    }

    #[test]
    fn language_of_strips_region() {
        assert_eq!(language_of("fi-FI"), "fi");
        assert_eq!(language_of("en"), "en");
    }
}
