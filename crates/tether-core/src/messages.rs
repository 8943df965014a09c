//! Localized validation and conversion messages.
//!
//! [`MessageCatalog`] maps `(locale, key)` to message templates with locale
//! fallback; [`ErrorMessage`] is what validators and converters hold and
//! resolve against a [`ValueContext`] at evaluation time.
//!
//! # Invariants
//!
//! 1. **Fallback terminates**: a lookup tries the exact locale, its language
//!    (`fi-FI` → `fi`), then each fallback locale once; otherwise `None`.
//! 2. **Single-pass interpolation**: `{name}` tokens are replaced once;
//!    substituted text is never re-scanned.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing key | Key not in any locale | Catalog message resolves to the key itself |
//! | Bad interpolation arg | `{name}` but no `name` arg | Token left as-is |

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::context::ValueContext;
use crate::locale::{Locale, language_of};

/// Message templates for a single locale.
#[derive(Debug, Clone, Default)]
pub struct LocaleMessages {
    messages: HashMap<String, String>,
}

impl LocaleMessages {
    /// Create an empty message set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a template.
    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.messages.insert(key.into(), template.into());
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.insert(key, template);
        self
    }

    /// Look up a template by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Message catalog with locale fallback.
///
/// ```
/// use tether_core::messages::{LocaleMessages, MessageCatalog};
///
/// let mut catalog = MessageCatalog::new();
/// catalog.add_locale("en", LocaleMessages::new().with("required", "{label} is required"));
/// catalog.add_locale("fi", LocaleMessages::new().with("required", "{label} on pakollinen"));
/// catalog.set_fallback_chain(vec!["en".into()]);
///
/// assert_eq!(
///     catalog.format("fi-FI", "required", &[("label", "Nimi")]),
///     Some("Nimi on pakollinen".into())
/// );
/// assert_eq!(
///     catalog.format("de", "required", &[("label", "Name")]),
///     Some("Name is required".into())
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    locales: HashMap<Locale, LocaleMessages>,
    fallback_chain: Vec<Locale>,
}

impl MessageCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add templates for a locale, replacing any previous set.
    pub fn add_locale(&mut self, locale: impl Into<Locale>, messages: LocaleMessages) {
        self.locales.insert(locale.into(), messages);
    }

    /// Set the fallback chain (tried in order when a key is missing).
    pub fn set_fallback_chain(&mut self, chain: Vec<Locale>) {
        self.fallback_chain = chain;
    }

    /// Look up a template, walking the fallback chain.
    #[must_use]
    pub fn get(&self, locale: &str, key: &str) -> Option<&str> {
        let language = language_of(locale);
        let direct = [locale, language];
        direct
            .into_iter()
            .chain(
                self.fallback_chain
                    .iter()
                    .map(String::as_str)
                    .filter(|fallback| *fallback != locale && *fallback != language),
            )
            .find_map(|candidate| self.locales.get(candidate).and_then(|m| m.get(key)))
    }

    /// Look up a template and interpolate `{name}` tokens.
    #[must_use]
    pub fn format(&self, locale: &str, key: &str, args: &[(&str, &str)]) -> Option<String> {
        self.get(locale, key).map(|template| interpolate(template, args))
    }

    /// All registered locale tags.
    #[must_use]
    pub fn locales(&self) -> Vec<&str> {
        self.locales.keys().map(String::as_str).collect()
    }
}

/// A message held by a validator or converter, resolved lazily.
#[derive(Clone)]
pub enum ErrorMessage {
    /// Fixed text; `{value}` and other known tokens are interpolated.
    Text(String),
    /// Computed from the context on each evaluation.
    Provider(Rc<dyn Fn(&ValueContext<'_>) -> String>),
    /// Looked up in a catalog by the context locale.
    Catalog {
        /// Shared catalog.
        catalog: Rc<MessageCatalog>,
        /// Template key.
        key: String,
    },
}

impl ErrorMessage {
    /// Message computed by `provider` on each evaluation.
    pub fn provider(provider: impl Fn(&ValueContext<'_>) -> String + 'static) -> Self {
        Self::Provider(Rc::new(provider))
    }

    /// Message looked up in `catalog` under `key`.
    pub fn catalog(catalog: Rc<MessageCatalog>, key: impl Into<String>) -> Self {
        Self::Catalog {
            catalog,
            key: key.into(),
        }
    }

    /// Resolve the message for `ctx`, interpolating `args`.
    ///
    /// A `{label}` argument is supplied automatically from the context field
    /// label when the caller does not pass one.
    #[must_use]
    pub fn resolve(&self, ctx: &ValueContext<'_>, args: &[(&str, &str)]) -> String {
        let label = ctx.field().and_then(|f| f.label.clone()).unwrap_or_default();
        let mut all_args: Vec<(&str, &str)> = args.to_vec();
        if !all_args.iter().any(|(name, _)| *name == "label") {
            all_args.push(("label", label.as_str()));
        }
        match self {
            Self::Text(template) => interpolate(template, &all_args),
            Self::Provider(provider) => provider(ctx),
            Self::Catalog { catalog, key } => catalog
                .format(ctx.locale(), key, &all_args)
                .unwrap_or_else(|| key.clone()),
        }
    }
}

impl From<&str> for ErrorMessage {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ErrorMessage {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl fmt::Debug for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Provider(_) => f.write_str("Provider(..)"),
            Self::Catalog { key, .. } => f.debug_struct("Catalog").field("key", key).finish(),
        }
    }
}

/// Single-pass `{name}` interpolation. Unmatched tokens left as-is.
pub(crate) fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars();

    while let Some(ch) = chars.next() {
        if ch != '{' {
            result.push(ch);
            continue;
        }
        let mut token = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            token.push(c);
        }
        match args.iter().find(|(name, _)| closed && *name == token) {
            Some((_, value)) => result.push_str(value),
            None => {
                result.push('{');
                result.push_str(&token);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FieldIdentity, FieldKey};

    fn catalog() -> MessageCatalog {
        let mut catalog = MessageCatalog::new();
        catalog.add_locale(
            "en",
            LocaleMessages::new()
                .with("length", "size must be between {min} and {max}")
                .with("nan", "Value must be a number"),
        );
        catalog.add_locale(
            "fi",
            LocaleMessages::new().with("length", "pituuden on oltava {min}-{max}"),
        );
        catalog.set_fallback_chain(vec!["en".into()]);
        catalog
    }

    #[test]
    fn exact_then_language_then_fallback() {
        let catalog = catalog();
        assert_eq!(
            catalog.get("fi-FI", "length"),
            Some("pituuden on oltava {min}-{max}")
        );
        assert_eq!(catalog.get("fi", "nan"), Some("Value must be a number"));
        assert_eq!(catalog.get("fi", "missing"), None);
    }

    #[test]
    fn format_interpolates_args() {
        let catalog = catalog();
        assert_eq!(
            catalog.format("en", "length", &[("min", "3"), ("max", "16")]),
            Some("size must be between 3 and 16".into())
        );
    }

    #[test]
    fn interpolation_edge_cases() {
        assert_eq!(interpolate("Hello {world", &[]), "Hello {world");
        assert_eq!(interpolate("Hello {}", &[]), "Hello {}");
        assert_eq!(interpolate("{x} and {x}", &[("x", "A")]), "A and A");
        assert_eq!(interpolate("{x}", &[("x", "{x}")]), "{x}");
    }

    #[test]
    fn text_message_gets_label_from_context() {
        let field = FieldIdentity::new(FieldKey::next(), "TextField").with_label("Email");
        let ctx = ValueContext::new("en").with_field(field);
        let message = ErrorMessage::from("{label} is required");
        assert_eq!(message.resolve(&ctx, &[]), "Email is required");
    }

    #[test]
    fn catalog_message_follows_context_locale() {
        let message = ErrorMessage::catalog(Rc::new(catalog()), "length");
        let args = [("min", "1"), ("max", "5")];
        assert_eq!(
            message.resolve(&ValueContext::new("fi"), &args),
            "pituuden on oltava 1-5"
        );
        assert_eq!(
            message.resolve(&ValueContext::new("en-GB"), &args),
            "size must be between 1 and 5"
        );
    }

    #[test]
    fn missing_catalog_key_resolves_to_key() {
        let message = ErrorMessage::catalog(Rc::new(catalog()), "nope");
        assert_eq!(message.resolve(&ValueContext::new("en"), &[]), "nope");
    }

    #[test]
    fn provider_sees_context() {
        let message = ErrorMessage::provider(|ctx| format!("locale={}", ctx.locale()));
        assert_eq!(message.resolve(&ValueContext::new("sv"), &[]), "locale=sv");
    }
}
