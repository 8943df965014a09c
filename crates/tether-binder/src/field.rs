//! Field endpoint contracts and in-memory field implementations.
//!
//! Binders talk to UI components only through these traits:
//!
//! - [`FieldDisplay`]: identity, visibility and the error display slot.
//! - [`HasValue<V>`]: a value-holding field with change notification.
//! - [`HasText`]: a text sink such as a status label.
//!
//! [`ValueField`] and [`TextLabel`] implement them without any rendering,
//! which makes binders usable headlessly and in tests.
//!
//! # Invariants
//!
//! 1. Setting a value equal to the current one is a no-op (no event).
//! 2. Value-change events are fired after the new value is stored, with no
//!    internal borrow held.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use tether_core::{ErrorLevel, FieldIdentity, FieldKey, Validator};

use crate::listeners::{ListenerSet, Registration};

/// A field refused a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field rejected value: {message}")]
pub struct FieldRejection {
    message: String,
}

impl FieldRejection {
    /// Rejection with a reason.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The reason.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Value change notification from a field.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChangeEvent<V> {
    /// Key of the field that changed.
    pub field: FieldKey,
    /// Value before the change.
    pub old_value: V,
    /// Value after the change.
    pub value: V,
    /// Whether the change came from user input rather than code.
    pub from_client: bool,
}

/// Identity, visibility and error display of a field.
pub trait FieldDisplay {
    /// Identity used in diagnostics and for field equality.
    fn identity(&self) -> FieldIdentity;

    /// Mark the field invalid or valid.
    fn set_invalid(&self, invalid: bool);

    /// Whether the field is marked invalid.
    fn is_invalid(&self) -> bool;

    /// Show or clear an error message.
    fn set_error_message(&self, message: Option<String>);

    /// The message currently shown.
    fn error_message(&self) -> Option<String>;

    /// Severity hint used to style the message.
    fn set_severity(&self, level: Option<ErrorLevel>);

    /// The current severity hint.
    fn severity(&self) -> Option<ErrorLevel>;

    /// Whether the field is shown.
    fn is_visible(&self) -> bool {
        true
    }

    /// Whether the field accepts interaction.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Key of this field.
    fn field_key(&self) -> FieldKey {
        self.identity().key
    }
}

/// A field holding a value of type `V`.
pub trait HasValue<V>: FieldDisplay {
    /// The current value.
    fn value(&self) -> V;

    /// Replace the value programmatically.
    fn set_value(&self, value: V) -> Result<(), FieldRejection>;

    /// The value representing "nothing entered".
    fn empty_value(&self) -> V;

    /// Whether the current value equals the empty value.
    fn is_empty(&self) -> bool
    where
        V: PartialEq,
    {
        self.value() == self.empty_value()
    }

    /// Reset to the empty value.
    fn clear(&self) -> Result<(), FieldRejection> {
        self.set_value(self.empty_value())
    }

    /// Observe value changes.
    fn add_value_change_listener(
        &self,
        listener: Box<dyn Fn(&ValueChangeEvent<V>)>,
    ) -> Registration;

    /// Make the field read-only or editable.
    fn set_read_only(&self, read_only: bool);

    /// Whether user edits are blocked.
    fn is_read_only(&self) -> bool;

    /// Show or hide the required indicator.
    fn set_required_indicator_visible(&self, visible: bool);

    /// Whether the required indicator is shown.
    fn is_required_indicator_visible(&self) -> bool;

    /// An intrinsic validator the field applies to its own values.
    fn default_validator(&self) -> Option<Rc<dyn Validator<V>>> {
        None
    }

    /// This field as a display, for error handlers.
    fn as_display(&self) -> &dyn FieldDisplay;
}

/// A component showing text, e.g. a shared status label.
pub trait HasText {
    /// Replace the text.
    fn set_text(&self, text: &str);

    /// The current text.
    fn text(&self) -> String;

    /// Show or hide the component.
    fn set_visible(&self, visible: bool);

    /// Whether the component is shown.
    fn is_visible(&self) -> bool;
}

bitflags! {
    /// Boolean state of a [`ValueField`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldFlags: u8 {
        /// User edits are blocked.
        const READ_ONLY = 1 << 0;
        /// Required indicator shown.
        const REQUIRED_INDICATOR = 1 << 1;
        /// Marked invalid.
        const INVALID = 1 << 2;
        /// Shown.
        const VISIBLE = 1 << 3;
        /// Accepts interaction.
        const ENABLED = 1 << 4;
    }
}

impl Default for FieldFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::ENABLED
    }
}

/// In-memory field.
///
/// ```
/// use tether_binder::field::{HasValue, ValueField};
///
/// let name = ValueField::text().with_label("Name");
/// name.input("Ada").unwrap();
/// assert_eq!(name.value(), "Ada");
/// assert!(!name.is_empty());
/// ```
pub struct ValueField<V> {
    identity: RefCell<FieldIdentity>,
    value: RefCell<V>,
    empty: V,
    flags: Cell<FieldFlags>,
    error_message: RefCell<Option<String>>,
    severity: Cell<Option<ErrorLevel>>,
    listeners: ListenerSet<ValueChangeEvent<V>>,
    accepts: Option<Box<dyn Fn(&V) -> Result<(), FieldRejection>>>,
    default_validator: Option<Rc<dyn Validator<V>>>,
}

impl ValueField<String> {
    /// A text field whose empty value is `""`.
    #[must_use]
    pub fn text() -> Self {
        Self::new("TextField", String::new())
    }
}

impl ValueField<bool> {
    /// A checkbox whose empty value is `false`.
    #[must_use]
    pub fn checkbox() -> Self {
        Self::new("Checkbox", false)
    }
}

impl<V: Clone + PartialEq + 'static> ValueField<V> {
    /// A field of `kind` initialized to `empty`.
    pub fn new(kind: &'static str, empty: V) -> Self {
        Self {
            identity: RefCell::new(FieldIdentity::new(FieldKey::next(), kind)),
            value: RefCell::new(empty.clone()),
            empty,
            flags: Cell::new(FieldFlags::default()),
            error_message: RefCell::new(None),
            severity: Cell::new(None),
            listeners: ListenerSet::new(),
            accepts: None,
            default_validator: None,
        }
    }

    /// Set the element id.
    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Self {
        let identity = self.identity.borrow().clone().with_id(id);
        *self.identity.borrow_mut() = identity;
        self
    }

    /// Set the label.
    #[must_use]
    pub fn with_label(self, label: impl Into<String>) -> Self {
        let identity = self.identity.borrow().clone().with_label(label);
        *self.identity.borrow_mut() = identity;
        self
    }

    /// Reject values for which `check` fails.
    #[must_use]
    pub fn accepting(mut self, check: impl Fn(&V) -> Result<(), FieldRejection> + 'static) -> Self {
        self.accepts = Some(Box::new(check));
        self
    }

    /// Install an intrinsic validator.
    #[must_use]
    pub fn with_default_validator(mut self, validator: impl Validator<V> + 'static) -> Self {
        self.default_validator = Some(Rc::new(validator));
        self
    }

    /// Simulate user input.
    ///
    /// Fails when the field is read-only or rejects the value.
    pub fn input(&self, value: impl Into<V>) -> Result<(), FieldRejection> {
        if self.flags.get().contains(FieldFlags::READ_ONLY) {
            return Err(FieldRejection::new("field is read-only"));
        }
        self.store(value.into(), true)
    }

    /// Show or hide the field.
    pub fn set_visible(&self, visible: bool) {
        self.set_flag(FieldFlags::VISIBLE, visible);
    }

    /// Enable or disable the field.
    pub fn set_enabled(&self, enabled: bool) {
        self.set_flag(FieldFlags::ENABLED, enabled);
    }

    /// Current flag set.
    #[must_use]
    pub fn flags(&self) -> FieldFlags {
        self.flags.get()
    }

    fn set_flag(&self, flag: FieldFlags, on: bool) {
        let mut flags = self.flags.get();
        flags.set(flag, on);
        self.flags.set(flags);
    }

    fn store(&self, value: V, from_client: bool) -> Result<(), FieldRejection> {
        if let Some(accepts) = &self.accepts {
            accepts(&value)?;
        }
        let old_value = {
            let mut current = self.value.borrow_mut();
            if *current == value {
                return Ok(());
            }
            std::mem::replace(&mut *current, value.clone())
        };
        let event = ValueChangeEvent {
            field: self.identity.borrow().key,
            old_value,
            value,
            from_client,
        };
        self.listeners.fire(&event);
        Ok(())
    }
}

impl<V: Clone + PartialEq + 'static> FieldDisplay for ValueField<V> {
    fn identity(&self) -> FieldIdentity {
        self.identity.borrow().clone()
    }

    fn set_invalid(&self, invalid: bool) {
        self.set_flag(FieldFlags::INVALID, invalid);
    }

    fn is_invalid(&self) -> bool {
        self.flags.get().contains(FieldFlags::INVALID)
    }

    fn set_error_message(&self, message: Option<String>) {
        *self.error_message.borrow_mut() = message;
    }

    fn error_message(&self) -> Option<String> {
        self.error_message.borrow().clone()
    }

    fn set_severity(&self, level: Option<ErrorLevel>) {
        self.severity.set(level);
    }

    fn severity(&self) -> Option<ErrorLevel> {
        self.severity.get()
    }

    fn is_visible(&self) -> bool {
        self.flags.get().contains(FieldFlags::VISIBLE)
    }

    fn is_enabled(&self) -> bool {
        self.flags.get().contains(FieldFlags::ENABLED)
    }
}

impl<V: Clone + PartialEq + 'static> HasValue<V> for ValueField<V> {
    fn value(&self) -> V {
        self.value.borrow().clone()
    }

    fn set_value(&self, value: V) -> Result<(), FieldRejection> {
        self.store(value, false)
    }

    fn empty_value(&self) -> V {
        self.empty.clone()
    }

    fn add_value_change_listener(
        &self,
        listener: Box<dyn Fn(&ValueChangeEvent<V>)>,
    ) -> Registration {
        self.listeners.add(listener)
    }

    fn set_read_only(&self, read_only: bool) {
        self.set_flag(FieldFlags::READ_ONLY, read_only);
    }

    fn is_read_only(&self) -> bool {
        self.flags.get().contains(FieldFlags::READ_ONLY)
    }

    fn set_required_indicator_visible(&self, visible: bool) {
        self.set_flag(FieldFlags::REQUIRED_INDICATOR, visible);
    }

    fn is_required_indicator_visible(&self) -> bool {
        self.flags.get().contains(FieldFlags::REQUIRED_INDICATOR)
    }

    fn default_validator(&self) -> Option<Rc<dyn Validator<V>>> {
        self.default_validator.clone()
    }

    fn as_display(&self) -> &dyn FieldDisplay {
        self
    }
}

impl<V: fmt::Debug> fmt::Debug for ValueField<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueField")
            .field("identity", &*self.identity.borrow())
            .field("value", &*self.value.borrow())
            .field("flags", &self.flags.get())
            .field("error_message", &*self.error_message.borrow())
            .finish()
    }
}

/// In-memory text label.
#[derive(Debug)]
pub struct TextLabel {
    text: RefCell<String>,
    visible: Cell<bool>,
}

impl Default for TextLabel {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLabel {
    /// An empty, visible label.
    #[must_use]
    pub fn new() -> Self {
        Self {
            text: RefCell::new(String::new()),
            visible: Cell::new(true),
        }
    }
}

impl HasText for TextLabel {
    fn set_text(&self, text: &str) {
        let mut current = self.text.borrow_mut();
        current.clear();
        current.push_str(text);
    }

    fn text(&self) -> String {
        self.text.borrow().clone()
    }

    fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }

    fn is_visible(&self) -> bool {
        self.visible.get()
    }
}
