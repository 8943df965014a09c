//! Bindings between one field and one bean property.
//!
//! A binding is created in two phases. [`Binder::for_field`] returns a
//! [`BindingBuilder`] that accumulates converters, validators and display
//! options; one of the `bind*` methods consumes it and yields a [`Binding`]
//! handle registered with the binder. Configuration methods only exist on the
//! builder, so configuring a bound binding does not compile.
//!
//! The binder stores bindings type-erased as [`BindingRef`]s. Values cross
//! the erased boundary boxed as `dyn Any` and are downcast back by the binding
//! that produced them.
//!
//! # Invariants
//!
//! 1. A field is bound at most once per binder; binding it again unbinds the
//!    earlier binding first.
//! 2. Field writes made by the binding itself (reads, convert-back, clearing)
//!    never re-enter the binding's change handling.
//! 3. Unbinding is idempotent. After it, state-changing operations return
//!    [`BindingError::Unbound`] and metadata reads return `None`.
//! 4. A binding is writable only while bound, with a setter, and neither it
//!    nor its binder is read-only. The field's read-only flag mirrors this.
//!
//! # Failure Modes
//!
//! - Getter, setter, presentation converter or field rejection fails: the
//!   error goes through the binder's [`BindingExceptionHandler`] and is
//!   returned to the caller, or reported when there is none (field events).
//! - Binder dropped while a [`Binding`] handle is alive: operations that need
//!   the binder return [`BindingError::Unbound`]; field events are ignored.
//!
//! [`Binder::for_field`]: crate::Binder::for_field
//! [`BindingExceptionHandler`]: crate::handler::BindingExceptionHandler

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tether_core::converter::{self, NullRepresentation};
use tether_core::{
    Converter, ErrorMessage, FieldIdentity, FieldKey, Outcome, UserError, ValidationResult,
    Validator, ValueContext, validator,
};
use tether_property::{Bean, PropertySet};

use crate::binder::BinderInner;
use crate::chain::{Chain, Converted, Identity, Validated};
use crate::error::BindingError;
use crate::field::{FieldDisplay, HasText, HasValue, ValueChangeEvent};
use crate::listeners::Registration;
use crate::status::{BinderValidationStatus, BindingStatus, BindingValidationStatus};

static BINDING_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    fn next() -> Self {
        Self(BINDING_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

type Getter<B, T> = Rc<dyn Fn(&B) -> Result<Option<T>, UserError>>;
type Setter<B, T> = Rc<dyn Fn(&mut B, T) -> Result<(), UserError>>;
type Equality<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Decides whether a binding takes part in validation and writes.
pub type AppliedPredicate = Rc<dyn Fn(&dyn FieldDisplay) -> bool>;

/// Where a binding's validation status is shown.
enum StatusSink<B> {
    /// The binder's [`ValidationErrorHandler`](crate::handler::ValidationErrorHandler).
    Field,
    Handler(Rc<dyn Fn(&BindingValidationStatus<B>)>),
    Label(Rc<dyn HasText>),
}

struct Required {
    message: ErrorMessage,
    enabled: Cell<bool>,
}

/// Counts a builder as unfinished for as long as it is alive.
struct PendingGuard(Rc<Cell<usize>>);

impl PendingGuard {
    fn new(counter: &Rc<Cell<usize>>) -> Self {
        counter.set(counter.get() + 1);
        Self(Rc::clone(counter))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

struct Options<B> {
    status: StatusSink<B>,
    required: Option<ErrorMessage>,
    default_validator: Option<bool>,
    convert_back: bool,
}

/// First phase of a binding: configuration.
///
/// `F` is the field value type, `T` the model type produced by the converters
/// added so far.
#[must_use = "a builder does nothing until one of its bind methods is called"]
pub struct BindingBuilder<B, F, T> {
    binder: Rc<BinderInner<B>>,
    field: Rc<dyn HasValue<F>>,
    chain: Rc<dyn Chain<F, T>>,
    options: Options<B>,
    equality: Option<Equality<T>>,
    pending: PendingGuard,
}

impl<B: 'static, F: Clone + PartialEq + 'static> BindingBuilder<B, F, F> {
    pub(crate) fn new(binder: Rc<BinderInner<B>>, field: Rc<dyn HasValue<F>>) -> Self {
        let pending = PendingGuard::new(binder.pending_builders());
        Self {
            binder,
            field,
            chain: Rc::new(Identity),
            options: Options {
                status: StatusSink::Field,
                required: None,
                default_validator: None,
                convert_back: true,
            },
            equality: None,
            pending,
        }
    }
}

impl<B: 'static, F: Clone + PartialEq + 'static, T: 'static> BindingBuilder<B, F, T> {
    /// Append a converter to the model type `N`.
    ///
    /// Validators added later see `N` values. An equality predicate set
    /// before this call is dropped because it compared `T` values.
    pub fn with_converter<N: 'static>(
        self,
        converter: impl Converter<T, N> + 'static,
    ) -> BindingBuilder<B, F, N> {
        let chain: Rc<dyn Chain<F, N>> = Rc::new(Converted {
            prev: self.chain,
            converter: Box::new(converter),
        });
        BindingBuilder {
            binder: self.binder,
            field: self.field,
            chain,
            options: self.options,
            equality: None,
            pending: self.pending,
        }
    }

    /// Append a converter built from two closures.
    pub fn with_converter_fn<N: 'static>(
        self,
        to_model: impl Fn(T) -> Outcome<N> + 'static,
        to_presentation: impl Fn(N) -> T + 'static,
    ) -> BindingBuilder<B, F, N> {
        self.with_converter(converter::from_fn(to_model, to_presentation))
    }

    /// Append a validator for the current model type.
    pub fn with_validator(mut self, validator: impl Validator<T> + 'static) -> Self {
        self.chain = Rc::new(Validated {
            prev: self.chain,
            validator: Rc::new(validator),
        });
        self
    }

    /// Append a validator failing with `message` when `predicate` is false.
    pub fn with_validator_fn(
        self,
        predicate: impl Fn(&T) -> bool + 'static,
        message: impl Into<ErrorMessage>,
    ) -> Self {
        self.with_validator(validator::from_predicate(predicate, message))
    }

    /// Send this binding's statuses to `handler` instead of the field.
    pub fn with_validation_status_handler(
        mut self,
        handler: impl Fn(&BindingValidationStatus<B>) + 'static,
    ) -> Self {
        self.options.status = StatusSink::Handler(Rc::new(handler));
        self
    }

    /// Show this binding's messages in `label` instead of the field.
    pub fn with_status_label<L: HasText + 'static>(mut self, label: &Rc<L>) -> Self {
        let label: Rc<dyn HasText> = Rc::clone(label) as Rc<dyn HasText>;
        self.options.status = StatusSink::Label(label);
        self
    }

    /// Run (or skip) the field's own default validator regardless of the
    /// binder setting.
    pub fn with_default_validator(mut self, enabled: bool) -> Self {
        self.options.default_validator = Some(enabled);
        self
    }

    /// Fail with `message` while the field holds its empty value.
    pub fn as_required(mut self, message: impl Into<ErrorMessage>) -> Self {
        self.options.required = Some(message.into());
        self
    }

    /// Compare model values with `equal` when detecting reverted edits.
    pub fn with_equality_predicate(mut self, equal: impl Fn(&T, &T) -> bool + 'static) -> Self {
        self.equality = Some(Rc::new(equal));
        self
    }

    /// Whether written values are converted back and shown in the field.
    pub fn with_convert_back_to_presentation(mut self, enabled: bool) -> Self {
        self.options.convert_back = enabled;
        self
    }
}

impl<B: 'static, F: Clone + PartialEq + 'static, T: Clone + PartialEq + 'static>
    BindingBuilder<B, F, T>
{
    /// Map `sentinel` to `None` in the model and back.
    pub fn with_null_representation(self, sentinel: T) -> BindingBuilder<B, F, Option<T>> {
        self.with_converter(NullRepresentation::new(sentinel))
    }

    /// Bind to a getter/setter pair.
    pub fn bind(
        self,
        getter: impl Fn(&B) -> T + 'static,
        setter: impl Fn(&mut B, T) + 'static,
    ) -> Result<Binding<B, F, T>, BindingError> {
        let getter: Getter<B, T> = Rc::new(move |bean: &B| Ok(Some(getter(bean))));
        let setter: Setter<B, T> = Rc::new(move |bean: &mut B, value: T| {
            setter(bean, value);
            Ok(())
        });
        self.finish(getter, Some(setter), None)
    }

    /// Bind to fallible accessors. A getter returning `Ok(None)` clears the
    /// field; errors pass through the binder's exception handler.
    pub fn try_bind<E: std::error::Error + 'static>(
        self,
        getter: impl Fn(&B) -> Result<Option<T>, E> + 'static,
        setter: impl Fn(&mut B, T) -> Result<(), E> + 'static,
    ) -> Result<Binding<B, F, T>, BindingError> {
        let getter: Getter<B, T> =
            Rc::new(move |bean: &B| getter(bean).map_err(|err| Box::new(err) as UserError));
        let setter: Setter<B, T> = Rc::new(move |bean: &mut B, value: T| {
            setter(bean, value).map_err(|err| Box::new(err) as UserError)
        });
        self.finish(getter, Some(setter), None)
    }

    /// Bind to a getter only; the binding stays read-only.
    pub fn bind_read_only(
        self,
        getter: impl Fn(&B) -> T + 'static,
    ) -> Result<Binding<B, F, T>, BindingError> {
        let getter: Getter<B, T> = Rc::new(move |bean: &B| Ok(Some(getter(bean))));
        self.finish(getter, None, None)
    }

    fn finish(
        self,
        getter: Getter<B, T>,
        setter: Option<Setter<B, T>>,
        property: Option<String>,
    ) -> Result<Binding<B, F, T>, BindingError> {
        let Self {
            binder,
            field,
            chain,
            options,
            equality,
            pending,
        } = self;
        drop(pending);

        let identity = field.identity();
        let has_required = options.required.is_some();
        let core = Rc::new(BindingCore {
            id: BindingId::next(),
            binder: Rc::downgrade(&binder),
            field: RefCell::new(Some(Rc::clone(&field))),
            identity: identity.clone(),
            property,
            chain,
            getter,
            setter,
            status: options.status,
            required: options.required.map(|message| Required {
                message,
                enabled: Cell::new(true),
            }),
            default_validator: Cell::new(options.default_validator),
            validators_disabled: Cell::new(false),
            read_only: Cell::new(false),
            applied: RefCell::new(None),
            equality,
            baseline: RefCell::new(None),
            convert_back: Cell::new(options.convert_back),
            suppress: Cell::new(false),
            registration: RefCell::new(None),
        });

        let this = BindingRef(Rc::clone(&core) as Rc<dyn AnyBinding<B>>);
        binder.attach(this.clone());

        let weak: Weak<BindingCore<B, F, T>> = Rc::downgrade(&core);
        let registration = field.add_value_change_listener(Box::new(
            move |event: &ValueChangeEvent<F>| {
                if let Some(core) = weak.upgrade() {
                    core.on_field_change(event.from_client);
                }
            },
        ));
        *core.registration.borrow_mut() = Some(registration);

        if has_required {
            field.set_required_indicator_visible(true);
        }
        core.sync_read_only(&binder);
        tracing::debug!(
            binder = binder.id().id(),
            field = %identity,
            property = core.property.as_deref(),
            "bound field"
        );

        if let Some(bean) = binder.live_bean() {
            binder.read_live(&[this], &bean)?;
        }
        Ok(Binding { core })
    }
}

impl<B: Bean, F: Clone + PartialEq + 'static, T: Clone + PartialEq + 'static>
    BindingBuilder<B, F, T>
{
    /// Bind to the property at the dotted `path`.
    ///
    /// The path must be discovered within the binder's nesting depth and hold
    /// values of type `T`. Read-only properties give a read-only binding.
    pub fn bind_property(self, path: &str) -> Result<Binding<B, F, T>, BindingError> {
        self.bind_property_with(path, true)
    }

    /// Like [`bind_property`](Self::bind_property), ignoring any setter.
    pub fn bind_property_read_only(self, path: &str) -> Result<Binding<B, F, T>, BindingError> {
        self.bind_property_with(path, false)
    }

    fn bind_property_with(
        self,
        path: &str,
        writable: bool,
    ) -> Result<Binding<B, F, T>, BindingError> {
        let set = PropertySet::<B>::with_max_depth(self.binder.max_depth());
        let property = set.lookup(path)?.typed::<T>()?;

        let read = property.clone();
        let getter: Getter<B, T> = Rc::new(move |bean: &B| Ok(read.get(bean)));
        let setter = (writable && property.has_setter()).then(|| {
            let setter: Setter<B, T> = Rc::new(move |bean: &mut B, value: T| {
                property
                    .set(bean, value)
                    .map_err(|err| Box::new(err) as UserError)
            });
            setter
        });
        self.finish(getter, setter, Some(path.to_string()))
    }
}

impl<B, F, T> fmt::Debug for BindingBuilder<B, F, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingBuilder")
            .field("field", &self.field.identity())
            .field("required", &self.options.required.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Core
// ---------------------------------------------------------------------------

struct Fetched<F, T> {
    model: Option<T>,
    presentation: F,
}

pub(crate) struct Evaluation<B, T> {
    pub(crate) status: BindingValidationStatus<B>,
    /// The converted value; present whenever conversion succeeded, even if a
    /// validator failed.
    pub(crate) value: Option<T>,
}

struct BindingCore<B, F, T> {
    id: BindingId,
    binder: Weak<BinderInner<B>>,
    field: RefCell<Option<Rc<dyn HasValue<F>>>>,
    identity: FieldIdentity,
    property: Option<String>,
    chain: Rc<dyn Chain<F, T>>,
    getter: Getter<B, T>,
    setter: Option<Setter<B, T>>,
    status: StatusSink<B>,
    required: Option<Required>,
    default_validator: Cell<Option<bool>>,
    validators_disabled: Cell<bool>,
    read_only: Cell<bool>,
    applied: RefCell<Option<AppliedPredicate>>,
    equality: Option<Equality<T>>,
    baseline: RefCell<Option<T>>,
    convert_back: Cell<bool>,
    suppress: Cell<bool>,
    registration: RefCell<Option<Registration>>,
}

impl<B: 'static, F: Clone + PartialEq + 'static, T: Clone + PartialEq + 'static>
    BindingCore<B, F, T>
{
    fn field(&self) -> Result<Rc<dyn HasValue<F>>, BindingError> {
        self.field.borrow().clone().ok_or(BindingError::Unbound)
    }

    fn binder(&self) -> Result<Rc<BinderInner<B>>, BindingError> {
        self.binder.upgrade().ok_or(BindingError::Unbound)
    }

    fn is_bound(&self) -> bool {
        self.field.borrow().is_some()
    }

    fn context<'a>(&self, binder: &BinderInner<B>, bean: Option<&'a B>) -> ValueContext<'a> {
        let ctx = ValueContext::new(binder.locale())
            .with_field(self.identity.clone())
            .with_binder(binder.id());
        match bean {
            Some(bean) => ctx.with_bean(bean),
            None => ctx,
        }
    }

    fn user_error(&self, binder: &BinderInner<B>, error: UserError) -> BindingError {
        binder.exception(&self.identity, error)
    }

    /// Write `value` to the field without reacting to the resulting event.
    fn show(
        &self,
        binder: &BinderInner<B>,
        field: &Rc<dyn HasValue<F>>,
        value: F,
    ) -> Result<(), BindingError> {
        let previous = self.suppress.replace(true);
        let result = field.set_value(value);
        self.suppress.set(previous);
        result.map_err(|rejection| self.user_error(binder, Box::new(rejection)))
    }

    fn effective_read_only(&self, binder: &BinderInner<B>) -> bool {
        self.read_only.get() || self.setter.is_none() || binder.is_read_only()
    }

    fn sync_read_only(&self, binder: &BinderInner<B>) {
        if let Ok(field) = self.field() {
            field.set_read_only(self.effective_read_only(binder));
        }
    }

    fn is_applied(&self, field: &dyn FieldDisplay) -> bool {
        let predicate = self.applied.borrow().clone();
        match predicate {
            Some(predicate) => predicate(field),
            None => field.is_visible() && field.is_enabled(),
        }
    }

    /// Model value from `bean` and its presentation, without touching the field.
    fn fetch(
        &self,
        binder: &BinderInner<B>,
        bean: Option<&B>,
    ) -> Result<Fetched<F, T>, BindingError> {
        let field = self.field()?;
        let model = match bean {
            Some(bean) => (self.getter)(bean).map_err(|err| self.user_error(binder, err))?,
            None => None,
        };
        let presentation = match model.clone() {
            Some(value) => {
                let ctx = self.context(binder, bean);
                self.chain
                    .to_presentation(value, &ctx)
                    .map_err(|err| self.user_error(binder, err))?
            }
            None => field.empty_value(),
        };
        Ok(Fetched {
            model,
            presentation,
        })
    }

    /// Show a fetched value and make its model value the change baseline.
    fn present(&self, binder: &BinderInner<B>, fetched: Fetched<F, T>) -> Result<(), BindingError> {
        let field = self.field()?;
        self.show(binder, &field, fetched.presentation)?;
        *self.baseline.borrow_mut() = fetched.model;
        tracing::trace!(field = %self.identity, "read field value");
        Ok(())
    }

    fn evaluate(
        &self,
        this: &BindingRef<B>,
        binder: &BinderInner<B>,
        bean: Option<&B>,
    ) -> Evaluation<B, T> {
        let Ok(field) = self.field() else {
            return Evaluation {
                status: BindingValidationStatus::unresolved(this.clone()),
                value: None,
            };
        };
        if !self.is_applied(field.as_display()) {
            return Evaluation {
                status: BindingValidationStatus::new(this.clone(), None, Vec::new()),
                value: None,
            };
        }

        let ctx = self.context(binder, bean);
        let validate = !self.validators_disabled.get() && !binder.validators_disabled();
        let value = field.value();
        let mut results = Vec::new();
        if validate {
            if let Some(required) = self.required.as_ref().filter(|r| r.enabled.get()) {
                results.push(if field.is_empty() {
                    ValidationResult::error(required.message.resolve(&ctx, &[]))
                } else {
                    ValidationResult::ok()
                });
            }
            let run_default = self
                .default_validator
                .get()
                .unwrap_or_else(|| binder.default_validators_enabled());
            if run_default {
                if let Some(default) = field.default_validator() {
                    results.push(default.apply(&value, &ctx));
                }
            }
        }

        let (value, conversion_error) =
            match self.chain.to_model(value, &ctx, validate, &mut results) {
                Ok(model) => (Some(model), None),
                Err(error) => {
                    results.push(error.clone());
                    (None, Some(error))
                }
            };
        let status = BindingValidationStatus::new(this.clone(), conversion_error, results);
        tracing::trace!(
            field = %self.identity,
            status = ?status.status(),
            message = status.message(),
            "evaluated binding"
        );
        Evaluation { status, value }
    }

    fn write(&self, binder: &BinderInner<B>, bean: &mut B, value: T) -> Result<(), BindingError> {
        match &self.setter {
            Some(setter) => setter(bean, value).map_err(|err| self.user_error(binder, err)),
            None => Ok(()),
        }
    }

    fn convert_back(&self, binder: &BinderInner<B>, value: T) -> Result<(), BindingError> {
        if !self.convert_back.get() {
            return Ok(());
        }
        let field = self.field()?;
        let ctx = self.context(binder, None);
        let presentation = self
            .chain
            .to_presentation(value, &ctx)
            .map_err(|err| self.user_error(binder, err))?;
        if field.value() != presentation {
            self.show(binder, &field, presentation)?;
        }
        Ok(())
    }

    fn current_model(&self, binder: &BinderInner<B>) -> Option<T> {
        let field = self.field().ok()?;
        let ctx = self.context(binder, None);
        let mut discarded = Vec::new();
        self.chain
            .to_model(field.value(), &ctx, false, &mut discarded)
            .ok()
    }

    fn is_reverted(&self, binder: &BinderInner<B>) -> bool {
        if !binder.change_detection_enabled() && self.equality.is_none() {
            return false;
        }
        let Ok(field) = self.field() else {
            return false;
        };
        let baseline = self.baseline.borrow().clone();
        match baseline {
            None => field.is_empty(),
            Some(baseline) => match self.current_model(binder) {
                Some(current) => match &self.equality {
                    Some(equal) => equal(&current, &baseline),
                    None => current == baseline,
                },
                None => false,
            },
        }
    }

    fn handle_status(&self, status: &BindingValidationStatus<B>) {
        match &self.status {
            StatusSink::Handler(handler) => handler(status),
            StatusSink::Label(label) => {
                let message = match status.status() {
                    BindingStatus::Unresolved => "",
                    _ => status.message().unwrap_or(""),
                };
                label.set_text(message);
                label.set_visible(!message.is_empty());
            }
            StatusSink::Field => {
                let (Ok(field), Ok(binder)) = (self.field(), self.binder()) else {
                    return;
                };
                let handler = binder.error_handler();
                match status.result() {
                    Some(result) if status.status() != BindingStatus::Unresolved => {
                        handler.handle_error(field.as_display(), result);
                    }
                    _ => handler.clear_error(field.as_display()),
                }
            }
        }
    }

    fn clear_error(&self) {
        if let (Ok(field), Ok(binder)) = (self.field(), self.binder()) {
            binder.error_handler().clear_error(field.as_display());
        }
    }

    fn unbind(&self) {
        let Some(field) = self.field.borrow_mut().take() else {
            return;
        };
        let registration = self.registration.borrow_mut().take();
        drop(registration);
        if let Some(binder) = self.binder.upgrade() {
            binder.error_handler().clear_error(field.as_display());
            binder.detach(self.id);
            tracing::debug!(binder = binder.id().id(), field = %self.identity, "unbound field");
        }
    }

    fn on_field_change(self: Rc<Self>, from_client: bool) {
        if self.suppress.get() || !self.is_bound() {
            return;
        }
        let Some(binder) = self.binder.upgrade() else {
            return;
        };
        let this = BindingRef(self as Rc<dyn AnyBinding<B>>);
        binder.handle_field_change(&this, from_client);
    }
}

// ---------------------------------------------------------------------------
// Erased view
// ---------------------------------------------------------------------------

pub(crate) struct ErasedEvaluation<B> {
    pub(crate) status: BindingValidationStatus<B>,
    pub(crate) value: Option<Box<dyn Any>>,
}

/// What the binder needs from a binding without knowing `F` and `T`.
pub(crate) trait AnyBinding<B> {
    fn id(&self) -> BindingId;
    fn identity(&self) -> &FieldIdentity;
    fn is_bound(&self) -> bool;
    fn property(&self) -> Option<&str>;
    fn is_writable(&self, binder: &BinderInner<B>) -> bool;
    /// Read from `bean` without showing anything; the result goes to
    /// [`present`](AnyBinding::present) once the bean is no longer borrowed.
    fn fetch(
        &self,
        binder: &BinderInner<B>,
        bean: Option<&B>,
    ) -> Result<Box<dyn Any>, BindingError>;
    fn present(&self, binder: &BinderInner<B>, fetched: Box<dyn Any>) -> Result<(), BindingError>;
    fn evaluate(
        &self,
        this: &BindingRef<B>,
        binder: &BinderInner<B>,
        bean: Option<&B>,
    ) -> ErasedEvaluation<B>;
    fn snapshot(
        &self,
        binder: &BinderInner<B>,
        bean: &B,
    ) -> Result<Option<Box<dyn Any>>, BindingError>;
    fn write(
        &self,
        binder: &BinderInner<B>,
        bean: &mut B,
        value: &dyn Any,
    ) -> Result<(), BindingError>;
    fn convert_back(&self, binder: &BinderInner<B>, value: &dyn Any) -> Result<(), BindingError>;
    fn set_baseline(&self, value: Option<&dyn Any>);
    fn is_reverted(&self, binder: &BinderInner<B>) -> bool;
    fn handle_status(&self, status: &BindingValidationStatus<B>);
    fn clear_error(&self);
    fn sync_read_only(&self, binder: &BinderInner<B>);
    fn unbind(&self);
}

impl<B: 'static, F: Clone + PartialEq + 'static, T: Clone + PartialEq + 'static> AnyBinding<B>
    for BindingCore<B, F, T>
{
    fn id(&self) -> BindingId {
        self.id
    }

    fn identity(&self) -> &FieldIdentity {
        &self.identity
    }

    fn is_bound(&self) -> bool {
        BindingCore::is_bound(self)
    }

    fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    fn is_writable(&self, binder: &BinderInner<B>) -> bool {
        self.is_bound() && !self.effective_read_only(binder)
    }

    fn fetch(
        &self,
        binder: &BinderInner<B>,
        bean: Option<&B>,
    ) -> Result<Box<dyn Any>, BindingError> {
        let fetched = BindingCore::fetch(self, binder, bean)?;
        Ok(Box::new(fetched))
    }

    fn present(&self, binder: &BinderInner<B>, fetched: Box<dyn Any>) -> Result<(), BindingError> {
        match fetched.downcast::<Fetched<F, T>>() {
            Ok(fetched) => BindingCore::present(self, binder, *fetched),
            Err(_) => Ok(()),
        }
    }

    fn evaluate(
        &self,
        this: &BindingRef<B>,
        binder: &BinderInner<B>,
        bean: Option<&B>,
    ) -> ErasedEvaluation<B> {
        let evaluation = BindingCore::evaluate(self, this, binder, bean);
        ErasedEvaluation {
            status: evaluation.status,
            value: evaluation.value.map(|value| Box::new(value) as Box<dyn Any>),
        }
    }

    fn snapshot(
        &self,
        binder: &BinderInner<B>,
        bean: &B,
    ) -> Result<Option<Box<dyn Any>>, BindingError> {
        let value = (self.getter)(bean).map_err(|err| self.user_error(binder, err))?;
        Ok(value.map(|value| Box::new(value) as Box<dyn Any>))
    }

    fn write(
        &self,
        binder: &BinderInner<B>,
        bean: &mut B,
        value: &dyn Any,
    ) -> Result<(), BindingError> {
        match value.downcast_ref::<T>() {
            Some(value) => BindingCore::write(self, binder, bean, value.clone()),
            None => Ok(()),
        }
    }

    fn convert_back(&self, binder: &BinderInner<B>, value: &dyn Any) -> Result<(), BindingError> {
        match value.downcast_ref::<T>() {
            Some(value) => BindingCore::convert_back(self, binder, value.clone()),
            None => Ok(()),
        }
    }

    fn set_baseline(&self, value: Option<&dyn Any>) {
        *self.baseline.borrow_mut() = value.and_then(|value| value.downcast_ref::<T>()).cloned();
    }

    fn is_reverted(&self, binder: &BinderInner<B>) -> bool {
        BindingCore::is_reverted(self, binder)
    }

    fn handle_status(&self, status: &BindingValidationStatus<B>) {
        BindingCore::handle_status(self, status);
    }

    fn clear_error(&self) {
        BindingCore::clear_error(self);
    }

    fn sync_read_only(&self, binder: &BinderInner<B>) {
        BindingCore::sync_read_only(self, binder);
    }

    fn unbind(&self) {
        BindingCore::unbind(self);
    }
}

/// Type-erased handle to a binding, as listed by its binder.
///
/// Handles compare equal when they refer to the same binding.
pub struct BindingRef<B>(Rc<dyn AnyBinding<B>>);

impl<B> BindingRef<B> {
    /// The binding's id.
    #[must_use]
    pub fn id(&self) -> BindingId {
        self.0.id()
    }

    /// Whether the binding is still bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.0.is_bound()
    }

    /// Identity of the bound field; `None` once unbound.
    #[must_use]
    pub fn field_identity(&self) -> Option<FieldIdentity> {
        self.is_bound().then(|| self.0.identity().clone())
    }

    /// Key of the bound field; `None` once unbound.
    #[must_use]
    pub fn field_key(&self) -> Option<FieldKey> {
        self.is_bound().then(|| self.0.identity().key)
    }

    /// Property path for property bindings; `None` otherwise or once unbound.
    #[must_use]
    pub fn property_name(&self) -> Option<String> {
        if self.is_bound() {
            self.0.property().map(str::to_owned)
        } else {
            None
        }
    }

    /// Detach the binding from its field and binder. Idempotent.
    pub fn unbind(&self) {
        self.0.unbind();
    }

    pub(crate) fn identity(&self) -> &FieldIdentity {
        self.0.identity()
    }

    pub(crate) fn erased(&self) -> &dyn AnyBinding<B> {
        &*self.0
    }

    pub(crate) fn evaluate(
        &self,
        binder: &BinderInner<B>,
        bean: Option<&B>,
    ) -> ErasedEvaluation<B> {
        self.0.evaluate(self, binder, bean)
    }

    pub(crate) fn handle_status(&self, status: &BindingValidationStatus<B>) {
        self.0.handle_status(status);
    }
}

impl<B> Clone for BindingRef<B> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<B> PartialEq for BindingRef<B> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<B> Eq for BindingRef<B> {}

impl<B> fmt::Debug for BindingRef<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingRef")
            .field("id", &self.id())
            .field("field", &self.0.identity().to_string())
            .field("property", &self.0.property())
            .field("bound", &self.is_bound())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Typed handle
// ---------------------------------------------------------------------------

/// A bound binding.
pub struct Binding<B, F, T> {
    core: Rc<BindingCore<B, F, T>>,
}

impl<B, F, T> Clone for Binding<B, F, T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<B: 'static, F: Clone + PartialEq + 'static, T: Clone + PartialEq + 'static> Binding<B, F, T> {
    /// The binding's id.
    #[must_use]
    pub fn id(&self) -> BindingId {
        self.core.id
    }

    /// Type-erased handle, as used by the binder.
    #[must_use]
    pub fn to_ref(&self) -> BindingRef<B> {
        BindingRef(Rc::clone(&self.core) as Rc<dyn AnyBinding<B>>)
    }

    /// Whether the binding is still bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.core.is_bound()
    }

    /// The bound field; `None` once unbound.
    #[must_use]
    pub fn field(&self) -> Option<Rc<dyn HasValue<F>>> {
        self.core.field.borrow().clone()
    }

    /// Identity of the bound field; `None` once unbound.
    #[must_use]
    pub fn field_identity(&self) -> Option<FieldIdentity> {
        self.is_bound().then(|| self.core.identity.clone())
    }

    /// Property path for property bindings; `None` otherwise or once unbound.
    #[must_use]
    pub fn property_name(&self) -> Option<&str> {
        if self.is_bound() {
            self.core.property.as_deref()
        } else {
            None
        }
    }

    /// Show `bean`'s value in the field and make it the change baseline.
    /// Does not validate.
    pub fn read(&self, bean: &B) -> Result<(), BindingError> {
        self.core.field()?;
        let binder = self.core.binder()?;
        binder.read_bindings(&[self.to_ref()], Some(bean))
    }

    /// Validate the field's current value.
    ///
    /// With `fire_event`, the binder's status handler receives a status for
    /// this binding alone and one status-change event fires.
    pub fn validate(&self, fire_event: bool) -> Result<BindingValidationStatus<B>, BindingError> {
        self.core.field()?;
        let binder = self.core.binder()?;
        let this = self.to_ref();
        let bean = binder.live_bean();
        let status = {
            let guard = bean.as_ref().map(|bean| bean.borrow());
            self.core.evaluate(&this, &binder, guard.as_deref()).status
        };
        if fire_event {
            let aggregate =
                BinderValidationStatus::new(binder.id(), vec![status.clone()], Vec::new());
            binder.dispatch(&aggregate);
        }
        Ok(status)
    }

    /// The field's value converted to the model type, without validation.
    /// `None` when conversion fails.
    pub fn value(&self) -> Result<Option<T>, BindingError> {
        self.core.field()?;
        let binder = self.core.binder()?;
        Ok(self.core.current_model(&binder))
    }

    /// Whether the field changed since the last read or successful write.
    pub fn has_changes(&self) -> Result<bool, BindingError> {
        self.core.field()?;
        let binder = self.core.binder()?;
        Ok(binder.has_changes_for(self.core.id))
    }

    /// Make the binding read-only or writable.
    ///
    /// A binding without a setter cannot be made writable.
    pub fn set_read_only(&self, read_only: bool) -> Result<(), BindingError> {
        self.core.field()?;
        let binder = self.core.binder()?;
        if !read_only && self.core.setter.is_none() {
            return Err(BindingError::MissingSetter {
                field: self.core.identity.to_string(),
            });
        }
        self.core.read_only.set(read_only);
        self.core.sync_read_only(&binder);
        Ok(())
    }

    /// Whether the binding is effectively read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        match self.core.binder.upgrade() {
            Some(binder) => self.core.effective_read_only(&binder),
            None => true,
        }
    }

    /// Toggle the check configured with
    /// [`BindingBuilder::as_required`], mirrored as the required indicator.
    pub fn set_as_required_enabled(&self, enabled: bool) -> Result<(), BindingError> {
        let field = self.core.field()?;
        let Some(required) = &self.core.required else {
            return Err(BindingError::RequiredNotConfigured {
                field: self.core.identity.to_string(),
            });
        };
        required.enabled.set(enabled);
        field.set_required_indicator_visible(enabled);
        Ok(())
    }

    /// Whether the required check is active.
    #[must_use]
    pub fn is_as_required_enabled(&self) -> bool {
        self.core
            .required
            .as_ref()
            .is_some_and(|required| required.enabled.get())
    }

    /// Skip every validator of this binding; converters still run.
    pub fn set_validators_disabled(&self, disabled: bool) {
        self.core.validators_disabled.set(disabled);
    }

    /// Whether this binding's validators are skipped.
    #[must_use]
    pub fn is_validators_disabled(&self) -> bool {
        self.core.validators_disabled.get()
    }

    /// Override the binder setting for the field's default validator.
    pub fn set_default_validator_enabled(&self, enabled: bool) {
        self.core.default_validator.set(Some(enabled));
    }

    /// The explicit default-validator setting, if any.
    #[must_use]
    pub fn default_validator_enabled(&self) -> Option<bool> {
        self.core.default_validator.get()
    }

    /// Replace the predicate deciding whether this binding is validated and
    /// written. The default requires a visible, enabled field.
    pub fn set_is_applied_predicate(
        &self,
        predicate: impl Fn(&dyn FieldDisplay) -> bool + 'static,
    ) {
        *self.core.applied.borrow_mut() = Some(Rc::new(predicate));
    }

    /// Whether written values are converted back and shown in the field.
    pub fn set_convert_back_to_presentation(&self, enabled: bool) {
        self.core.convert_back.set(enabled);
    }

    /// See [`set_convert_back_to_presentation`](Self::set_convert_back_to_presentation).
    #[must_use]
    pub fn is_convert_back_to_presentation(&self) -> bool {
        self.core.convert_back.get()
    }

    /// Detach from the field and binder. Idempotent.
    pub fn unbind(&self) {
        self.core.unbind();
    }
}

impl<B: 'static, F: Clone + PartialEq + 'static, T: Clone + PartialEq + 'static>
    From<&Binding<B, F, T>> for BindingRef<B>
{
    fn from(binding: &Binding<B, F, T>) -> Self {
        binding.to_ref()
    }
}

impl<B, F, T> fmt::Debug for Binding<B, F, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.core.id)
            .field("field", &self.core.identity.to_string())
            .field("property", &self.core.property)
            .finish_non_exhaustive()
    }
}
