//! The binder: an ordered set of bindings for one bean type.
//!
//! # Write policies
//!
//! Two write policies coexist and are kept apart on purpose:
//!
//! - **Bulk writes** (`write_bean` and friends) are all-or-nothing. Every
//!   applied binding is converted and validated before the first setter runs;
//!   bean-level validators run on the written bean and a failure restores the
//!   previous property values.
//! - **Live writes** (after [`Binder::set_bean`]) are per binding. A field
//!   change writes that binding alone as soon as it is valid, whatever state
//!   other bindings are in. Bean-level failures are reported, not reverted.
//!
//! # Invariants
//!
//! 1. At most one live bean.
//! 2. Every externally triggered operation (field change, `set_bean`,
//!    `read_bean`, `write_bean*`, `write_record`, `validate`) that passes its
//!    up-front checks dispatches exactly one status to the status handler and
//!    fires exactly one [`StatusChangeEvent`], also when user code fails
//!    midway. Up-front rejections dispatch nothing.
//! 3. Bean-level validators never run without a bean, and only when every
//!    binding-level result passed.
//! 4. Bindings are kept in bind order; statuses list them in that order.
//! 5. Fields are shown only after the live bean's borrow is released, so a
//!    field listener may set other bound fields. Field changes caused by a
//!    read are not written back and dispatch no status of their own.
//!
//! # Failure Modes
//!
//! | Condition | Result |
//! |-----------|--------|
//! | Validation fails during a bulk write | `BinderError::Validation`, bean unchanged |
//! | Getter, setter or field fails | `BindingError::UserCode` via the exception handler |
//! | Builder alive but not bound | `IncompleteBindings`, nothing dispatched |
//! | Foreign or unnamed binding in a write | `ForeignBinding` / `UnnamedBinding`, no dispatch |
//! | User code fails in a field event | [`BindingExceptionHandler::report`], then its status |

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, debug_span, trace, warn};

use tether_core::{
    BinderId, ErrorMessage, FieldIdentity, FieldKey, Locale, LocaleContext, UserError,
    ValidationResult, Validator, ValueContext, validator,
};
use tether_property::{Bean, PropertySet};

use crate::binding::{Binding, BindingBuilder, BindingId, BindingRef, ErasedEvaluation};
use crate::config::BinderConfig;
use crate::error::{BinderError, BindingError};
use crate::field::{HasText, HasValue};
use crate::handler::{
    BindingExceptionHandler, ConstraintValidator, DefaultBindingExceptionHandler,
    DefaultValidationErrorHandler, ValidationErrorHandler,
};
use crate::listeners::{ListenerSet, Registration};
use crate::status::{
    BinderValidationStatus, BinderValueChangeEvent, BindingValidationStatus, StatusChangeEvent,
};

type BeanCheck<B> = Rc<dyn Fn(&B, &ValueContext<'_>) -> Vec<ValidationResult>>;
type StatusHandler<B> = Rc<dyn Fn(&BinderValidationStatus<B>)>;
type Write<B> = (BindingRef<B>, Box<dyn Any>);
type Fetched<B> = (BindingRef<B>, Box<dyn Any>);

/// Marks the binder as reading while alive.
struct ReadingGuard<'a>(&'a Cell<usize>);

impl<'a> ReadingGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for ReadingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub(crate) struct BinderInner<B> {
    id: BinderId,
    bindings: RefCell<Vec<BindingRef<B>>>,
    bean: RefCell<Option<Rc<RefCell<B>>>>,
    bean_checks: RefCell<Vec<BeanCheck<B>>>,
    changed: RefCell<Vec<BindingId>>,
    status_listeners: ListenerSet<StatusChangeEvent>,
    value_listeners: ListenerSet<BinderValueChangeEvent>,
    status_handler: RefCell<Option<StatusHandler<B>>>,
    error_handler: RefCell<Rc<dyn ValidationErrorHandler>>,
    exception_handler: RefCell<Rc<dyn BindingExceptionHandler>>,
    status_label: RefCell<Option<Rc<dyn HasText>>>,
    read_only: Cell<bool>,
    validators_disabled: Cell<bool>,
    default_validators: Cell<bool>,
    change_detection: Cell<bool>,
    reading: Cell<usize>,
    locale: LocaleContext,
    max_depth: usize,
    pending_builders: Rc<Cell<usize>>,
}

impl<B: 'static> BinderInner<B> {
    fn new(config: BinderConfig) -> Self {
        let locale = match config.locale {
            Some(locale) => LocaleContext::new(locale),
            None => LocaleContext::system(),
        };
        Self {
            id: BinderId::next(),
            bindings: RefCell::new(Vec::new()),
            bean: RefCell::new(None),
            bean_checks: RefCell::new(Vec::new()),
            changed: RefCell::new(Vec::new()),
            status_listeners: ListenerSet::new(),
            value_listeners: ListenerSet::new(),
            status_handler: RefCell::new(None),
            error_handler: RefCell::new(Rc::new(DefaultValidationErrorHandler)),
            exception_handler: RefCell::new(Rc::new(DefaultBindingExceptionHandler)),
            status_label: RefCell::new(None),
            read_only: Cell::new(config.read_only),
            validators_disabled: Cell::new(config.validators_disabled),
            default_validators: Cell::new(config.default_validators),
            change_detection: Cell::new(config.change_detection),
            reading: Cell::new(0),
            locale,
            max_depth: config.max_nesting_depth,
            pending_builders: Rc::new(Cell::new(0)),
        }
    }

    pub(crate) fn id(&self) -> BinderId {
        self.id
    }

    pub(crate) fn locale(&self) -> Locale {
        self.locale.current_locale()
    }

    pub(crate) fn is_read_only(&self) -> bool {
        self.read_only.get()
    }

    pub(crate) fn validators_disabled(&self) -> bool {
        self.validators_disabled.get()
    }

    pub(crate) fn default_validators_enabled(&self) -> bool {
        self.default_validators.get()
    }

    pub(crate) fn change_detection_enabled(&self) -> bool {
        self.change_detection.get()
    }

    pub(crate) fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub(crate) fn pending_builders(&self) -> &Rc<Cell<usize>> {
        &self.pending_builders
    }

    pub(crate) fn error_handler(&self) -> Rc<dyn ValidationErrorHandler> {
        Rc::clone(&self.error_handler.borrow())
    }

    fn exception_handler(&self) -> Rc<dyn BindingExceptionHandler> {
        Rc::clone(&self.exception_handler.borrow())
    }

    pub(crate) fn exception(&self, field: &FieldIdentity, error: UserError) -> BindingError {
        self.exception_handler().handle_exception(field, error)
    }

    pub(crate) fn live_bean(&self) -> Option<Rc<RefCell<B>>> {
        self.bean.borrow().clone()
    }

    fn bindings(&self) -> Vec<BindingRef<B>> {
        self.bindings.borrow().clone()
    }

    fn contains(&self, id: BindingId) -> bool {
        self.bindings.borrow().iter().any(|binding| binding.id() == id)
    }

    fn check_complete(&self) -> Result<(), BindingError> {
        match self.pending_builders.get() {
            0 => Ok(()),
            count => Err(BindingError::IncompleteBindings { count }),
        }
    }

    // -- membership ---------------------------------------------------------

    /// Register a new binding, unbinding any earlier binding of its field.
    pub(crate) fn attach(&self, binding: BindingRef<B>) {
        let key = binding.identity().key;
        let previous: Vec<BindingRef<B>> = self
            .bindings
            .borrow()
            .iter()
            .filter(|existing| existing.field_key() == Some(key))
            .cloned()
            .collect();
        for existing in previous {
            debug!(field = %existing.identity(), "replacing earlier binding of field");
            existing.unbind();
        }
        self.bindings.borrow_mut().push(binding);
    }

    pub(crate) fn detach(&self, id: BindingId) {
        self.bindings.borrow_mut().retain(|binding| binding.id() != id);
        self.changed.borrow_mut().retain(|changed| *changed != id);
    }

    // -- change tracking ----------------------------------------------------

    pub(crate) fn has_changes_for(&self, id: BindingId) -> bool {
        self.changed.borrow().contains(&id)
    }

    fn mark_changed(&self, id: BindingId) {
        let mut changed = self.changed.borrow_mut();
        if !changed.contains(&id) {
            changed.push(id);
        }
    }

    fn changed_bindings(&self) -> Vec<BindingRef<B>> {
        let changed = self.changed.borrow().clone();
        self.bindings()
            .into_iter()
            .filter(|binding| changed.contains(&binding.id()))
            .collect()
    }

    fn remove_reverted(&self) {
        for binding in self.changed_bindings() {
            if binding.erased().is_reverted(self) {
                trace!(field = %binding.identity(), "field reverted to its baseline");
                self.changed.borrow_mut().retain(|id| *id != binding.id());
            }
        }
    }

    // -- evaluation ---------------------------------------------------------

    fn evaluate(&self, bindings: &[BindingRef<B>], bean: Option<&B>) -> Vec<ErasedEvaluation<B>> {
        bindings
            .iter()
            .map(|binding| binding.evaluate(self, bean))
            .collect()
    }

    fn run_bean_checks(&self, bean: &B) -> Vec<ValidationResult> {
        let checks = self.bean_checks.borrow().clone();
        let ctx = ValueContext::new(self.locale())
            .with_binder(self.id)
            .with_bean(bean);
        checks.iter().flat_map(|check| check(bean, &ctx)).collect()
    }

    fn field_statuses(&self, bean: Option<&B>) -> Vec<BindingValidationStatus<B>> {
        self.evaluate(&self.bindings(), bean)
            .into_iter()
            .map(|evaluation| evaluation.status)
            .collect()
    }

    /// Binding-level pass only.
    fn status_of_fields(&self, bean: Option<&B>) -> BinderValidationStatus<B> {
        BinderValidationStatus::new(self.id, self.field_statuses(bean), Vec::new())
    }

    fn status_of(&self, bean: Option<&B>) -> BinderValidationStatus<B> {
        let field_statuses = self.field_statuses(bean);
        let field_errors = field_statuses.iter().any(BindingValidationStatus::is_error);
        let bean_results = match bean {
            Some(bean) if !field_errors => self.run_bean_checks(bean),
            None if !self.bean_checks.borrow().is_empty() => {
                warn!(binder = self.id.id(), "no bean to run bean-level validators against");
                Vec::new()
            }
            _ => Vec::new(),
        };
        BinderValidationStatus::new(self.id, field_statuses, bean_results)
    }

    fn live_status(&self) -> BinderValidationStatus<B> {
        let live = self.live_bean();
        let guard = live.as_ref().map(|bean| bean.borrow());
        self.status_of(guard.as_deref())
    }

    fn unresolved_status(&self) -> BinderValidationStatus<B> {
        let statuses = self
            .bindings()
            .into_iter()
            .map(BindingValidationStatus::unresolved)
            .collect();
        BinderValidationStatus::new(self.id, statuses, Vec::new())
    }

    // -- notification -------------------------------------------------------

    /// Hand `status` to the status handler and fire one status event.
    pub(crate) fn dispatch(&self, status: &BinderValidationStatus<B>) {
        let handler = self.status_handler.borrow().clone();
        match handler {
            Some(handler) => handler(status),
            None => self.default_status_handling(status),
        }
        let event = StatusChangeEvent {
            binder: self.id,
            has_validation_errors: status.has_errors(),
        };
        trace!(binder = self.id.id(), has_errors = event.has_validation_errors, "status changed");
        self.status_listeners.fire(&event);
    }

    fn default_status_handling(&self, status: &BinderValidationStatus<B>) {
        status.notify_binding_handlers();
        let label = self.status_label.borrow().clone();
        if let Some(label) = label {
            let message = status
                .bean_validation_errors()
                .next()
                .and_then(ValidationResult::error_message)
                .unwrap_or("");
            label.set_text(message);
            label.set_visible(!message.is_empty());
        }
    }

    // -- reading ------------------------------------------------------------

    fn fetch_all(
        &self,
        bindings: &[BindingRef<B>],
        bean: Option<&B>,
    ) -> Result<Vec<Fetched<B>>, BindingError> {
        bindings
            .iter()
            .map(|binding| Ok((binding.clone(), binding.erased().fetch(self, bean)?)))
            .collect()
    }

    fn present_all(&self, fetched: Vec<Fetched<B>>) -> Result<(), BindingError> {
        let _reading = ReadingGuard::enter(&self.reading);
        for (binding, value) in fetched {
            binding.erased().present(self, value)?;
        }
        Ok(())
    }

    /// Read `bindings` from the live bean, showing them once it is released.
    pub(crate) fn read_live(
        &self,
        bindings: &[BindingRef<B>],
        bean: &Rc<RefCell<B>>,
    ) -> Result<(), BindingError> {
        let fetched = {
            let guard = bean.borrow();
            self.fetch_all(bindings, Some(&*guard))?
        };
        self.present_all(fetched)
    }

    /// Read `bindings` from a bean the binder does not own.
    pub(crate) fn read_bindings(
        &self,
        bindings: &[BindingRef<B>],
        bean: Option<&B>,
    ) -> Result<(), BindingError> {
        let fetched = self.fetch_all(bindings, bean)?;
        self.present_all(fetched)
    }

    fn read_all(&self, bean: Option<&B>) -> Result<(), BindingError> {
        self.read_bindings(&self.bindings(), bean)?;
        self.changed.borrow_mut().clear();
        Ok(())
    }

    fn read_all_live(&self, bean: &Rc<RefCell<B>>) -> Result<(), BindingError> {
        self.read_live(&self.bindings(), bean)?;
        self.changed.borrow_mut().clear();
        Ok(())
    }

    fn clear_all(&self) -> Result<(), BindingError> {
        self.read_all(None)?;
        for binding in self.bindings() {
            binding.erased().clear_error();
        }
        Ok(())
    }

    // -- writing ------------------------------------------------------------

    fn writes_of(
        &self,
        evaluations: Vec<ErasedEvaluation<B>>,
        include: impl Fn(&BindingValidationStatus<B>) -> bool,
    ) -> Vec<Write<B>> {
        evaluations
            .into_iter()
            .filter(|evaluation| include(&evaluation.status))
            .filter_map(|evaluation| {
                let binding = evaluation.status.binding().clone();
                let value = evaluation.value?;
                binding.erased().is_writable(self).then_some((binding, value))
            })
            .collect()
    }

    fn apply_writes(&self, bean: &mut B, writes: &[Write<B>]) -> Result<(), BindingError> {
        for (binding, value) in writes {
            binding.erased().write(self, bean, &**value)?;
        }
        Ok(())
    }

    /// Put `snapshots` back, newest write first. Failures are reported and
    /// skipped so every other property still gets restored.
    fn restore(&self, bean: &mut B, writes: &[Write<B>], snapshots: &[Option<Box<dyn Any>>]) {
        for ((binding, _), previous) in writes.iter().zip(snapshots).rev() {
            if let Some(previous) = previous {
                if let Err(err) = binding.erased().write(self, bean, &**previous) {
                    self.exception_handler().report(&err);
                }
            }
        }
    }

    /// Bookkeeping after values were written to `bean`.
    fn after_write(&self, bean: &B, writes: &[Write<B>]) -> Result<(), BindingError> {
        let shows_bean = match self.live_bean() {
            None => true,
            Some(live) => std::ptr::eq(live.as_ptr().cast_const(), bean),
        };
        self.changed
            .borrow_mut()
            .retain(|id| !writes.iter().any(|(binding, _)| binding.id() == *id));
        for (binding, value) in writes {
            if shows_bean {
                binding.erased().set_baseline(Some(&**value));
            }
            binding.erased().convert_back(self, &**value)?;
        }
        Ok(())
    }

    /// All-or-nothing write of `bindings` to `bean`.
    fn write_bindings(
        &self,
        bean: &mut B,
        bindings: &[BindingRef<B>],
        bean_level: bool,
    ) -> Result<(), BinderError> {
        self.check_complete()?;
        let _span =
            debug_span!("write_bean", binder = self.id.id(), bindings = bindings.len()).entered();
        let (status, outcome) = self.try_write_bindings(bean, bindings, bean_level);
        self.dispatch(&status);
        outcome
    }

    /// The write itself, paired with the status to dispatch whatever happened.
    fn try_write_bindings(
        &self,
        bean: &mut B,
        bindings: &[BindingRef<B>],
        bean_level: bool,
    ) -> (BinderValidationStatus<B>, Result<(), BinderError>) {
        let evaluations = self.evaluate(bindings, Some(&*bean));
        let field_statuses: Vec<BindingValidationStatus<B>> =
            evaluations.iter().map(|evaluation| evaluation.status.clone()).collect();
        let fields_only = BinderValidationStatus::new(self.id, field_statuses.clone(), Vec::new());
        if fields_only.has_errors() {
            debug!("bindings invalid, nothing written");
            let failure = fields_only.to_failure().into();
            return (fields_only, Err(failure));
        }

        let writes = self.writes_of(evaluations, |_| true);
        let mut snapshots = Vec::with_capacity(writes.len());
        for (binding, _) in &writes {
            match binding.erased().snapshot(self, bean) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(err) => return (fields_only, Err(err.into())),
            }
        }
        for (index, (binding, value)) in writes.iter().enumerate() {
            if let Err(err) = binding.erased().write(self, bean, &**value) {
                self.restore(bean, &writes[..index], &snapshots[..index]);
                debug!(field = %binding.identity(), "setter failed, previous values restored");
                return (fields_only, Err(err.into()));
            }
        }

        let bean_results = if bean_level {
            self.run_bean_checks(bean)
        } else {
            Vec::new()
        };
        let status = BinderValidationStatus::new(self.id, field_statuses, bean_results);
        if status.has_errors() {
            self.restore(bean, &writes, &snapshots);
            debug!("bean-level validation failed, previous values restored");
            let failure = status.to_failure().into();
            return (status, Err(failure));
        }

        let outcome = self.after_write(bean, &writes).map_err(BinderError::from);
        if outcome.is_ok() {
            debug!(written = writes.len(), "bean written");
        }
        (status, outcome)
    }

    // -- live cycle ---------------------------------------------------------

    pub(crate) fn handle_field_change(&self, binding: &BindingRef<B>, from_client: bool) {
        if !self.contains(binding.id()) {
            return;
        }
        let field = binding.identity().clone();
        if self.reading.get() > 0 {
            trace!(field = %field, "field changed while reading, not written");
        } else if let Err(err) = self.process_field_change(binding) {
            self.exception_handler().report(&err);
            let status = self.status_of_binding(binding);
            self.dispatch(&status);
        }
        self.value_listeners.fire(&BinderValueChangeEvent {
            binder: self.id,
            field,
            from_client,
        });
    }

    /// Binding-level status of `binding` alone, against the live bean.
    fn status_of_binding(&self, binding: &BindingRef<B>) -> BinderValidationStatus<B> {
        let live = self.live_bean();
        let guard = live.as_ref().map(|bean| bean.borrow());
        let evaluation = binding.evaluate(self, guard.as_deref());
        BinderValidationStatus::new(self.id, vec![evaluation.status], Vec::new())
    }

    fn process_field_change(&self, binding: &BindingRef<B>) -> Result<(), BindingError> {
        let _span =
            debug_span!("field_change", binder = self.id.id(), field = %binding.identity())
                .entered();
        self.mark_changed(binding.id());
        let status = match self.live_bean() {
            None => {
                let evaluation = binding.evaluate(self, None);
                BinderValidationStatus::new(self.id, vec![evaluation.status], Vec::new())
            }
            Some(bean) => self.write_through(binding, &bean)?,
        };
        self.remove_reverted();
        self.dispatch(&status);
        Ok(())
    }

    /// Write the changed binding to the live bean, then re-validate.
    fn write_through(
        &self,
        trigger: &BindingRef<B>,
        bean: &Rc<RefCell<B>>,
    ) -> Result<BinderValidationStatus<B>, BindingError> {
        let evaluation = {
            let guard = bean.borrow();
            trigger.evaluate(self, Some(&*guard))
        };
        let mut trigger_write = None;
        if !evaluation.status.is_error() && trigger.erased().is_writable(self) {
            if let Some(value) = evaluation.value {
                trigger.erased().write(self, &mut bean.borrow_mut(), &*value)?;
                trigger.erased().convert_back(self, &*value)?;
                trace!(field = %trigger.identity(), "wrote field value to live bean");
                trigger_write = Some((trigger.clone(), value));
            }
        }

        let changed = self.changed_bindings();
        let others: Vec<BindingRef<B>> = changed
            .iter()
            .filter(|binding| *binding != trigger)
            .cloned()
            .collect();
        let other_evaluations = {
            let guard = bean.borrow();
            self.evaluate(&others, Some(&*guard))
        };
        let field_statuses: Vec<BindingValidationStatus<B>> = changed
            .iter()
            .map(|binding| {
                if binding == trigger {
                    evaluation.status.clone()
                } else {
                    other_evaluations
                        .iter()
                        .find(|other| other.status.binding() == binding)
                        .map_or_else(
                            || BindingValidationStatus::unresolved(binding.clone()),
                            |other| other.status.clone(),
                        )
                }
            })
            .collect();
        if field_statuses.iter().any(BindingValidationStatus::is_error) {
            return Ok(BinderValidationStatus::new(self.id, field_statuses, Vec::new()));
        }

        let mut writes = self.writes_of(other_evaluations, |_| true);
        if !writes.is_empty() {
            self.apply_writes(&mut bean.borrow_mut(), &writes)?;
            for (binding, value) in &writes {
                binding.erased().convert_back(self, &**value)?;
            }
        }
        writes.extend(trigger_write);

        let bean_results = {
            let guard = bean.borrow();
            self.run_bean_checks(&guard)
        };
        let status = BinderValidationStatus::new(self.id, field_statuses, bean_results);
        if status.is_ok() {
            for (binding, value) in &writes {
                binding.erased().set_baseline(Some(&**value));
            }
            self.changed.borrow_mut().clear();
        }
        Ok(status)
    }
}

// ---------------------------------------------------------------------------
// Record values
// ---------------------------------------------------------------------------

/// Converted values handed to a record constructor, keyed by property path.
#[derive(Default)]
pub struct RecordValues {
    values: Vec<(String, Box<dyn Any>)>,
}

impl RecordValues {
    /// The value for `property`, if present and of type `T`.
    #[must_use]
    pub fn get<T: Clone + 'static>(&self, property: &str) -> Option<T> {
        self.values
            .iter()
            .find(|(name, _)| name == property)
            .and_then(|(_, value)| value.downcast_ref::<T>())
            .cloned()
    }

    /// Whether a value for `property` is present.
    #[must_use]
    pub fn contains(&self, property: &str) -> bool {
        self.values.iter().any(|(name, _)| name == property)
    }

    /// Property paths in binding order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for RecordValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// ---------------------------------------------------------------------------
// Binder
// ---------------------------------------------------------------------------

/// Connects fields to the properties of beans of type `B`.
///
/// Cloning yields another handle to the same binder.
///
/// # Example
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use tether_binder::Binder;
/// use tether_binder::field::{HasValue, ValueField};
///
/// #[derive(Default)]
/// struct Person {
///     first_name: String,
/// }
///
/// let binder = Binder::<Person>::new();
/// let first_name = Rc::new(ValueField::text());
/// binder
///     .for_field(&first_name)
///     .bind(|p: &Person| p.first_name.clone(), |p, v| p.first_name = v)
///     .unwrap();
///
/// let person = Rc::new(RefCell::new(Person { first_name: "Johannes".into() }));
/// binder.set_bean(Some(Rc::clone(&person))).unwrap();
/// assert_eq!(first_name.value(), "Johannes");
///
/// first_name.input("Henri").unwrap();
/// assert_eq!(person.borrow().first_name, "Henri");
/// ```
pub struct Binder<B> {
    inner: Rc<BinderInner<B>>,
}

impl<B> Clone for Binder<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<B: 'static> Default for Binder<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: 'static> Binder<B> {
    /// A binder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BinderConfig::default())
    }

    /// A binder configured by `config`.
    #[must_use]
    pub fn with_config(config: BinderConfig) -> Self {
        Self {
            inner: Rc::new(BinderInner::new(config)),
        }
    }

    /// The binder's id.
    #[must_use]
    pub fn id(&self) -> BinderId {
        self.inner.id
    }

    // -- binding ------------------------------------------------------------

    /// Start a binding for `field`.
    pub fn for_field<F, Fld>(&self, field: &Rc<Fld>) -> BindingBuilder<B, F, F>
    where
        F: Clone + PartialEq + 'static,
        Fld: HasValue<F> + 'static,
    {
        let field: Rc<dyn HasValue<F>> = Rc::clone(field) as Rc<dyn HasValue<F>>;
        BindingBuilder::new(Rc::clone(&self.inner), field)
    }

    /// Bind `field` to a getter/setter pair without converters.
    pub fn bind<F, Fld>(
        &self,
        field: &Rc<Fld>,
        getter: impl Fn(&B) -> F + 'static,
        setter: impl Fn(&mut B, F) + 'static,
    ) -> Result<Binding<B, F, F>, BindingError>
    where
        F: Clone + PartialEq + 'static,
        Fld: HasValue<F> + 'static,
    {
        self.for_field(field).bind(getter, setter)
    }

    /// Bind `field` to a getter only.
    pub fn bind_read_only<F, Fld>(
        &self,
        field: &Rc<Fld>,
        getter: impl Fn(&B) -> F + 'static,
    ) -> Result<Binding<B, F, F>, BindingError>
    where
        F: Clone + PartialEq + 'static,
        Fld: HasValue<F> + 'static,
    {
        self.for_field(field).bind_read_only(getter)
    }

    // -- bean association ---------------------------------------------------

    /// Make `bean` the live bean, or clear the fields with `None`.
    ///
    /// With a bean: every field is read, change tracking resets, one
    /// validation pass (including bean-level validators) is dispatched.
    /// Without: fields are cleared to their empty values, shown errors are
    /// removed and an unresolved status is dispatched.
    pub fn set_bean(&self, bean: Option<Rc<RefCell<B>>>) -> Result<(), BindingError> {
        let inner = &*self.inner;
        inner.check_complete()?;
        let Some(bean) = bean else {
            return self.remove_bean();
        };
        let _span = debug_span!("set_bean", binder = inner.id.id()).entered();
        *inner.bean.borrow_mut() = Some(Rc::clone(&bean));
        let read = inner.read_all_live(&bean);
        let status = inner.live_status();
        debug!(has_errors = status.has_errors(), "live bean set");
        inner.dispatch(&status);
        read
    }

    /// Drop the live bean and clear every field.
    pub fn remove_bean(&self) -> Result<(), BindingError> {
        let inner = &*self.inner;
        inner.check_complete()?;
        let removed = inner.bean.borrow_mut().take();
        let cleared = inner.clear_all();
        debug!(binder = inner.id.id(), had_bean = removed.is_some(), "live bean removed");
        inner.dispatch(&inner.unresolved_status());
        cleared
    }

    /// The live bean.
    #[must_use]
    pub fn bean(&self) -> Option<Rc<RefCell<B>>> {
        self.inner.live_bean()
    }

    /// Show `bean`'s values without making it live.
    ///
    /// Later field edits are not written anywhere until a write call. Runs a
    /// binding-level validation pass; `None` clears the fields.
    pub fn read_bean(&self, bean: Option<&B>) -> Result<(), BindingError> {
        let inner = &*self.inner;
        inner.check_complete()?;
        let _span = debug_span!("read_bean", binder = inner.id.id()).entered();
        match bean {
            Some(bean) => {
                let read = inner.read_all(Some(bean));
                let status = inner.status_of_fields(Some(bean));
                inner.dispatch(&status);
                read
            }
            None => {
                let cleared = inner.clear_all();
                inner.dispatch(&inner.unresolved_status());
                cleared
            }
        }
    }

    /// Re-read the live bean into the fields, or clear them without one.
    /// Dispatches nothing.
    pub fn refresh_fields(&self) -> Result<(), BindingError> {
        let inner = &*self.inner;
        inner.check_complete()?;
        match inner.live_bean() {
            Some(bean) => inner.read_all_live(&bean),
            None => inner.read_all(None),
        }
    }

    // -- writing ------------------------------------------------------------

    /// Write every applied binding to `bean`, all or nothing.
    ///
    /// Bean-level validators run on the written bean; if they fail the
    /// previous values are restored.
    pub fn write_bean(&self, bean: &mut B) -> Result<(), BinderError> {
        let bindings = self.inner.bindings();
        self.inner.write_bindings(bean, &bindings, true)
    }

    /// Like [`write_bean`](Self::write_bean), reporting validation failure as
    /// `Ok(false)`.
    pub fn write_bean_if_valid(&self, bean: &mut B) -> Result<bool, BindingError> {
        match self.write_bean(bean) {
            Ok(()) => Ok(true),
            Err(BinderError::Validation(_)) => Ok(false),
            Err(BinderError::Binding(err)) => Err(err),
        }
    }

    /// Write the bindings that currently pass, or every convertible binding
    /// when `forced`. Bean-level validators are skipped.
    pub fn write_bean_as_draft(&self, bean: &mut B, forced: bool) -> Result<(), BindingError> {
        let inner = &*self.inner;
        inner.check_complete()?;
        let _span =
            debug_span!("write_bean_as_draft", binder = inner.id.id(), forced).entered();
        let evaluations = inner.evaluate(&inner.bindings(), Some(&*bean));
        let field_statuses: Vec<BindingValidationStatus<B>> =
            evaluations.iter().map(|evaluation| evaluation.status.clone()).collect();
        let writes = inner.writes_of(evaluations, |status| forced || !status.is_error());
        let outcome = inner
            .apply_writes(bean, &writes)
            .and_then(|()| inner.after_write(bean, &writes));
        if outcome.is_ok() {
            debug!(written = writes.len(), "draft written");
        }
        inner.dispatch(&BinderValidationStatus::new(inner.id, field_statuses, Vec::new()));
        outcome
    }

    /// All-or-nothing write of the changed bindings only.
    pub fn write_changed_bindings_to_bean(&self, bean: &mut B) -> Result<(), BinderError> {
        let changed = self.inner.changed_bindings();
        self.inner.write_bindings(bean, &changed, true)
    }

    /// All-or-nothing write of `bindings`, which must belong to this binder.
    pub fn write_bean_bindings(
        &self,
        bean: &mut B,
        bindings: &[BindingRef<B>],
    ) -> Result<(), BinderError> {
        if bindings.iter().any(|binding| !self.inner.contains(binding.id())) {
            return Err(BindingError::ForeignBinding.into());
        }
        self.inner.write_bindings(bean, bindings, true)
    }

    /// Build a new value from the converted field values.
    ///
    /// Every binding must be bound by property path. `build` receives the
    /// values keyed by path; bean-level validators run on its result.
    pub fn write_record(
        &self,
        build: impl FnOnce(&RecordValues) -> Result<B, UserError>,
    ) -> Result<B, BinderError> {
        let inner = &*self.inner;
        inner.check_complete()?;
        let _span = debug_span!("write_record", binder = inner.id.id()).entered();
        let bindings = inner.bindings();
        if let Some(unnamed) = bindings.iter().find(|binding| binding.property_name().is_none()) {
            return Err(BindingError::UnnamedBinding {
                field: unnamed.identity().to_string(),
            }
            .into());
        }

        let evaluations = inner.evaluate(&bindings, None);
        let field_statuses: Vec<BindingValidationStatus<B>> =
            evaluations.iter().map(|evaluation| evaluation.status.clone()).collect();
        if field_statuses.iter().any(BindingValidationStatus::is_error) {
            let status = BinderValidationStatus::new(inner.id, field_statuses, Vec::new());
            inner.dispatch(&status);
            return Err(status.to_failure().into());
        }

        let mut values = RecordValues::default();
        for evaluation in evaluations {
            let name = evaluation.status.binding().property_name();
            if let (Some(name), Some(value)) = (name, evaluation.value) {
                values.values.push((name, value));
            }
        }
        let record = match build(&values) {
            Ok(record) => record,
            Err(source) => {
                inner.dispatch(&BinderValidationStatus::new(inner.id, field_statuses, Vec::new()));
                return Err(BindingError::UserCode {
                    message: format!(
                        "record constructor for {} failed",
                        std::any::type_name::<B>()
                    ),
                    field: None,
                    source,
                }
                .into());
            }
        };

        let bean_results = inner.run_bean_checks(&record);
        let status = BinderValidationStatus::new(inner.id, field_statuses, bean_results);
        inner.dispatch(&status);
        if status.has_errors() {
            return Err(status.to_failure().into());
        }
        inner.changed.borrow_mut().clear();
        Ok(record)
    }

    // -- validation ---------------------------------------------------------

    /// Validate every binding and, with a live bean and no binding errors,
    /// the bean-level validators. Dispatches the status.
    pub fn validate(&self) -> BinderValidationStatus<B> {
        let _span = debug_span!("validate", binder = self.inner.id.id()).entered();
        let status = self.inner.live_status();
        self.inner.dispatch(&status);
        status
    }

    /// Whether [`validate`](Self::validate) would pass. Dispatches nothing.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.inner.live_status().is_ok()
    }

    /// Add a bean-level validator.
    pub fn with_validator(&self, validator: impl Validator<B> + 'static) -> &Self {
        let check: BeanCheck<B> =
            Rc::new(move |bean: &B, ctx: &ValueContext<'_>| vec![validator.apply(bean, ctx)]);
        self.inner.bean_checks.borrow_mut().push(check);
        self
    }

    /// Add a bean-level validator failing with `message` when `predicate`
    /// is false.
    pub fn with_validator_fn(
        &self,
        predicate: impl Fn(&B) -> bool + 'static,
        message: impl Into<ErrorMessage>,
    ) -> &Self {
        self.with_validator(validator::from_predicate(predicate, message))
    }

    /// Add a declarative constraint checker; each violation becomes a
    /// bean-level result.
    pub fn with_constraint_validator(
        &self,
        constraints: impl ConstraintValidator<B> + 'static,
    ) -> &Self {
        let check: BeanCheck<B> = Rc::new(move |bean: &B, ctx: &ValueContext<'_>| {
            constraints
                .validate_bean(bean, ctx)
                .iter()
                .map(|violation| violation.to_result())
                .collect()
        });
        self.inner.bean_checks.borrow_mut().push(check);
        self
    }

    // -- change tracking ----------------------------------------------------

    /// Bindings whose fields changed since the last read or successful write,
    /// in binding order.
    #[must_use]
    pub fn changed_bindings(&self) -> Vec<BindingRef<B>> {
        self.inner.changed_bindings()
    }

    /// Whether any binding has changes.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.inner.changed.borrow().is_empty()
    }

    /// Whether `binding` has changes.
    #[must_use]
    pub fn has_changes_for(&self, binding: &BindingRef<B>) -> bool {
        self.inner.has_changes_for(binding.id())
    }

    // -- listeners and handlers ---------------------------------------------

    /// Observe status changes. Listeners added while an event is being
    /// delivered receive events from the next one on.
    pub fn add_status_change_listener(
        &self,
        listener: impl Fn(&StatusChangeEvent) + 'static,
    ) -> Registration {
        self.inner.status_listeners.add(listener)
    }

    /// Observe value changes of bound fields, after the binder processed them.
    pub fn add_value_change_listener(
        &self,
        listener: impl Fn(&BinderValueChangeEvent) + 'static,
    ) -> Registration {
        self.inner.value_listeners.add(listener)
    }

    /// Replace the default status handling.
    pub fn set_validation_status_handler(
        &self,
        handler: impl Fn(&BinderValidationStatus<B>) + 'static,
    ) {
        *self.inner.status_handler.borrow_mut() = Some(Rc::new(handler));
    }

    /// Replace how results are shown on fields.
    pub fn set_validation_error_handler(&self, handler: impl ValidationErrorHandler + 'static) {
        *self.inner.error_handler.borrow_mut() = Rc::new(handler);
    }

    /// Replace how user-code failures are wrapped.
    pub fn set_binding_exception_handler(&self, handler: impl BindingExceptionHandler + 'static) {
        *self.inner.exception_handler.borrow_mut() = Rc::new(handler);
    }

    /// Show the first bean-level error in `label` under default status
    /// handling.
    pub fn set_status_label<L: HasText + 'static>(&self, label: &Rc<L>) {
        let label: Rc<dyn HasText> = Rc::clone(label) as Rc<dyn HasText>;
        *self.inner.status_label.borrow_mut() = Some(label);
    }

    // -- flags --------------------------------------------------------------

    /// Make every binding read-only, or restore each binding's own setting.
    pub fn set_read_only(&self, read_only: bool) {
        self.inner.read_only.set(read_only);
        for binding in self.inner.bindings() {
            binding.erased().sync_read_only(&self.inner);
        }
    }

    /// Whether the binder is read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.inner.read_only.get()
    }

    /// Skip every validator; converters still run.
    pub fn set_validators_disabled(&self, disabled: bool) {
        self.inner.validators_disabled.set(disabled);
    }

    /// Whether validators are skipped.
    #[must_use]
    pub fn is_validators_disabled(&self) -> bool {
        self.inner.validators_disabled.get()
    }

    /// Run field default validators unless a binding overrides it.
    pub fn set_default_validators_enabled(&self, enabled: bool) {
        self.inner.default_validators.set(enabled);
    }

    /// Whether field default validators run by default.
    #[must_use]
    pub fn is_default_validators_enabled(&self) -> bool {
        self.inner.default_validators.get()
    }

    /// Compare field values with their baselines to forget reverted edits.
    pub fn set_change_detection_enabled(&self, enabled: bool) {
        self.inner.change_detection.set(enabled);
    }

    /// Whether change detection is enabled.
    #[must_use]
    pub fn is_change_detection_enabled(&self) -> bool {
        self.inner.change_detection.get()
    }

    /// The locale used for messages.
    #[must_use]
    pub fn locale(&self) -> &LocaleContext {
        &self.inner.locale
    }

    // -- lookup and removal -------------------------------------------------

    /// The binding bound to property `path`.
    #[must_use]
    pub fn binding(&self, path: &str) -> Option<BindingRef<B>> {
        self.inner
            .bindings()
            .into_iter()
            .find(|binding| binding.property_name().as_deref() == Some(path))
    }

    /// All bindings in bind order.
    #[must_use]
    pub fn bindings(&self) -> Vec<BindingRef<B>> {
        self.inner.bindings()
    }

    /// Identities of all bound fields in bind order.
    #[must_use]
    pub fn fields(&self) -> Vec<FieldIdentity> {
        self.inner
            .bindings()
            .iter()
            .map(|binding| binding.identity().clone())
            .collect()
    }

    /// Unbind `binding` if it belongs to this binder.
    pub fn remove_binding(&self, binding: &BindingRef<B>) {
        if self.inner.contains(binding.id()) {
            binding.unbind();
        }
    }

    /// Unbind whatever is bound to the field with `key`.
    pub fn remove_binding_for_field(&self, key: FieldKey) {
        let found = self
            .inner
            .bindings()
            .into_iter()
            .find(|binding| binding.field_key() == Some(key));
        if let Some(binding) = found {
            binding.unbind();
        }
    }

    /// Unbind whatever is bound to property `path`.
    pub fn remove_binding_by_name(&self, path: &str) {
        if let Some(binding) = self.binding(path) {
            binding.unbind();
        }
    }
}

impl<B: Bean> Binder<B> {
    /// Bind `field` to the property at `path` without converters.
    pub fn bind_property<F, Fld>(
        &self,
        field: &Rc<Fld>,
        path: &str,
    ) -> Result<Binding<B, F, F>, BindingError>
    where
        F: Clone + PartialEq + 'static,
        Fld: HasValue<F> + 'static,
    {
        self.for_field(field).bind_property(path)
    }

    /// The property set used by `bind_property`.
    #[must_use]
    pub fn property_set(&self) -> Rc<PropertySet<B>> {
        PropertySet::with_max_depth(self.inner.max_depth)
    }
}

impl<B> fmt::Debug for Binder<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("id", &self.inner.id)
            .field("bindings", &self.inner.bindings.borrow().len())
            .field("has_bean", &self.inner.bean.borrow().is_some())
            .field("read_only", &self.inner.read_only.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDisplay, TextLabel, ValueField};
    use tether_core::converter::StringToIntConverter;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Booking {
        guest: String,
        nights: i32,
    }

    fn guest_binder() -> (Binder<Booking>, Rc<ValueField<String>>, Rc<ValueField<String>>) {
        let binder = Binder::<Booking>::new();
        let guest = Rc::new(ValueField::text().with_id("guest"));
        let nights = Rc::new(ValueField::text().with_id("nights"));
        binder
            .bind(&guest, |b: &Booking| b.guest.clone(), |b, v| b.guest = v)
            .unwrap();
        binder
            .for_field(&nights)
            .with_converter(StringToIntConverter::new("Value must be a number"))
            .with_validator_fn(|n: &i32| *n > 0, "at least one night")
            .bind(|b: &Booking| b.nights, |b, v| b.nights = v)
            .unwrap();
        (binder, guest, nights)
    }

    #[test]
    fn unfinished_builder_blocks_bean_operations() {
        let binder = Binder::<Booking>::new();
        let field = Rc::new(ValueField::text());
        let builder = binder.for_field(&field);
        let err = binder.set_bean(None).unwrap_err();
        assert!(matches!(err, BindingError::IncompleteBindings { count: 1 }));
        drop(builder);
        assert!(binder.set_bean(None).is_ok());
    }

    #[test]
    fn binding_a_field_again_replaces_the_earlier_binding() {
        let binder = Binder::<Booking>::new();
        let field = Rc::new(ValueField::text());
        let first = binder
            .bind(&field, |b: &Booking| b.guest.clone(), |b, v| b.guest = v)
            .unwrap();
        let second = binder
            .bind(&field, |b: &Booking| b.nights.to_string(), |_, _| {})
            .unwrap();
        assert!(!first.is_bound());
        assert!(second.is_bound());
        assert_eq!(binder.bindings().len(), 1);
    }

    #[test]
    fn unbinding_removes_from_binder_and_change_tracking() {
        let (binder, guest, _) = guest_binder();
        guest.input("Ada").unwrap();
        assert!(binder.has_changes());
        let handle = binder.bindings().remove(0);
        binder.remove_binding(&handle);
        binder.remove_binding(&handle);
        assert!(!binder.has_changes());
        assert_eq!(binder.bindings().len(), 1);
        assert_eq!(handle.field_identity(), None);
    }

    #[test]
    fn read_only_binder_marks_every_field_read_only() {
        let (binder, guest, nights) = guest_binder();
        binder.set_read_only(true);
        assert!(guest.is_read_only());
        assert!(nights.is_read_only());
        binder.set_read_only(false);
        assert!(!guest.is_read_only());
    }

    #[test]
    fn status_label_shows_first_bean_level_error() {
        let (binder, guest, nights) = guest_binder();
        let label = Rc::new(TextLabel::new());
        binder.set_status_label(&label);
        binder.with_validator_fn(|b: &Booking| b.guest != "nobody", "guest required");

        guest.input("nobody").unwrap();
        nights.input("2").unwrap();
        let mut booking = Booking::default();
        assert!(binder.write_bean(&mut booking).is_err());
        assert_eq!(label.text(), "guest required");
        assert!(label.is_visible());
        assert_eq!(booking, Booking::default());

        guest.input("Ada").unwrap();
        binder.write_bean(&mut booking).unwrap();
        assert_eq!(label.text(), "");
        assert!(!label.is_visible());
    }

    #[test]
    fn validate_without_bean_skips_bean_level_validators() {
        let (binder, guest, nights) = guest_binder();
        binder.with_validator_fn(|_: &Booking| false, "never valid");
        guest.input("Ada").unwrap();
        nights.input("3").unwrap();
        let status = binder.validate();
        assert!(status.is_ok());
        assert!(status.bean_results().is_empty());
    }

    #[test]
    fn record_values_are_keyed_and_typed() {
        let mut values = RecordValues::default();
        values.values.push(("nights".into(), Box::new(3_i32)));
        assert_eq!(values.get::<i32>("nights"), Some(3));
        assert_eq!(values.get::<String>("nights"), None);
        assert!(values.contains("nights"));
        assert_eq!(values.names().collect::<Vec<_>>(), ["nights"]);
        assert_eq!(format!("{values:?}"), r#"["nights"]"#);
    }

    #[test]
    fn live_write_updates_only_the_changed_binding() {
        let (binder, guest, nights) = guest_binder();
        let booking = Rc::new(RefCell::new(Booking {
            guest: "Ada".into(),
            nights: 2,
        }));
        binder.set_bean(Some(Rc::clone(&booking))).unwrap();
        assert_eq!(nights.value(), "2");

        nights.input("zero").unwrap();
        guest.input("Grace").unwrap();
        assert_eq!(booking.borrow().guest, "Grace");
        assert_eq!(booking.borrow().nights, 2);
        assert!(nights.is_invalid());
    }
}
