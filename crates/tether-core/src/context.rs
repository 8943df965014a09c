//! Explicit evaluation context for converters and validators.
//!
//! Every conversion and validation call receives a [`ValueContext`] carrying
//! the resolved locale, the identity of the field being processed, the id of
//! the owning binder and, when one is available, a reference to the bean the
//! value belongs to. Nothing is looked up from ambient global state.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::locale::Locale;

/// Global counter for unique field keys.
static FIELD_KEY_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Global counter for unique binder ids.
static BINDER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of one field endpoint instance.
///
/// Two bindings refer to "the same field" exactly when their keys are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey(u64);

impl FieldKey {
    /// Allocate a new unique key.
    #[must_use]
    pub fn next() -> Self {
        Self(FIELD_KEY_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw key value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Identity of a binder instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BinderId(u64);

impl BinderId {
    /// Allocate a new unique binder id.
    #[must_use]
    pub fn next() -> Self {
        Self(BINDER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Human-meaningful description of a field, used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldIdentity {
    /// Unique key of the field instance.
    pub key: FieldKey,
    /// Field kind (e.g. `"TextField"`).
    pub kind: &'static str,
    /// Optional element id.
    pub id: Option<String>,
    /// Optional visible label.
    pub label: Option<String>,
}

impl FieldIdentity {
    /// Identity with only a key and kind.
    #[must_use]
    pub fn new(key: FieldKey, kind: &'static str) -> Self {
        Self {
            key,
            kind,
            id: None,
            label: None,
        }
    }

    /// Set the element id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl fmt::Display for FieldIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        let mut parts = Vec::new();
        if let Some(id) = &self.id {
            parts.push(format!("id='{id}'"));
        }
        if let Some(label) = &self.label {
            parts.push(format!("label='{label}'"));
        }
        if !parts.is_empty() {
            write!(f, " [{}]", parts.join(", "))?;
        }
        Ok(())
    }
}

/// Context passed to every converter and validator call.
#[derive(Clone)]
pub struct ValueContext<'a> {
    locale: Locale,
    field: Option<FieldIdentity>,
    binder: Option<BinderId>,
    bean: Option<&'a dyn Any>,
}

impl Default for ValueContext<'_> {
    fn default() -> Self {
        Self::new("en")
    }
}

impl<'a> ValueContext<'a> {
    /// A context with only a locale.
    #[must_use]
    pub fn new(locale: impl Into<Locale>) -> Self {
        Self {
            locale: locale.into(),
            field: None,
            binder: None,
            bean: None,
        }
    }

    /// Attach the identity of the field being processed.
    #[must_use]
    pub fn with_field(mut self, field: FieldIdentity) -> Self {
        self.field = Some(field);
        self
    }

    /// Attach the id of the owning binder.
    #[must_use]
    pub fn with_binder(mut self, binder: BinderId) -> Self {
        self.binder = Some(binder);
        self
    }

    /// Attach the bean the value belongs to.
    #[must_use]
    pub fn with_bean(mut self, bean: &'a dyn Any) -> Self {
        self.bean = Some(bean);
        self
    }

    /// The resolved locale.
    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// The field being processed, if known.
    #[must_use]
    pub fn field(&self) -> Option<&FieldIdentity> {
        self.field.as_ref()
    }

    /// The owning binder, if known.
    #[must_use]
    pub fn binder(&self) -> Option<BinderId> {
        self.binder
    }

    /// The bean, if one is available and of type `B`.
    #[must_use]
    pub fn bean<B: 'static>(&self) -> Option<&'a B> {
        self.bean.and_then(|bean| bean.downcast_ref::<B>())
    }

    /// Whether any bean is attached.
    #[must_use]
    pub fn has_bean(&self) -> bool {
        self.bean.is_some()
    }
}

impl fmt::Debug for ValueContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueContext")
            .field("locale", &self.locale)
            .field("field", &self.field)
            .field("binder", &self.binder)
            .field("has_bean", &self.bean.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person {
        name: String,
    }

    #[test]
    fn field_keys_are_unique() {
        let a = FieldKey::next();
        let b = FieldKey::next();
        assert_ne!(a, b);
        assert!(b.id() > a.id());
    }

    #[test]
    fn identity_display_lists_id_and_label() {
        let identity = FieldIdentity::new(FieldKey::next(), "TextField")
            .with_id("first-name")
            .with_label("First name");
        assert_eq!(
            identity.to_string(),
            "TextField [id='first-name', label='First name']"
        );
        let bare = FieldIdentity::new(FieldKey::next(), "Checkbox");
        assert_eq!(bare.to_string(), "Checkbox");
    }

    #[test]
    fn bean_downcasts_by_type() {
        let person = Person {
            name: "Ada".into(),
        };
        let ctx = ValueContext::new("en").with_bean(&person);
        assert!(ctx.has_bean());
        assert_eq!(ctx.bean::<Person>().map(|p| p.name.as_str()), Some("Ada"));
        assert!(ctx.bean::<String>().is_none());
    }

    #[test]
    fn default_context_is_english_without_bean() {
        let ctx = ValueContext::default();
        assert_eq!(ctx.locale(), "en");
        assert!(ctx.field().is_none());
        assert!(ctx.binder().is_none());
        assert!(!ctx.has_bean());
    }
}
