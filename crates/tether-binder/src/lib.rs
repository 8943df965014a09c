#![forbid(unsafe_code)]

//! Two-way binding between UI fields and bean properties.
//!
//! A [`Binder`] owns an ordered list of [`Binding`]s. Each binding connects
//! one field (anything implementing [`field::HasValue`]) to one bean
//! property through a typed pipeline of converters and validators built with
//! [`BindingBuilder`]:
//!
//! ```text
//! field value ──▶ required ──▶ default validator ──▶ converters/validators ──▶ setter
//!      ▲                                                                      │
//!      └──────────────── converters in reverse ◀────────────── getter ◀───────┘
//! ```
//!
//! Beans are attached either live with [`Binder::set_bean`] (every valid
//! field edit is written through immediately) or buffered with
//! [`Binder::read_bean`] followed by an explicit [`Binder::write_bean`].
//!
//! # Threading
//!
//! Binders, bindings and fields are single-threaded (`Rc`/`RefCell`).
//! Fields, listeners and handlers may call back into the binder; no internal
//! borrow is held while user code runs.

pub mod binder;
pub mod binding;
mod chain;
pub mod config;
pub mod error;
pub mod field;
pub mod handler;
pub mod listeners;
pub mod status;

pub use binder::{Binder, RecordValues};
pub use binding::{AppliedPredicate, Binding, BindingBuilder, BindingId, BindingRef};
pub use config::BinderConfig;
pub use error::{BinderError, BindingError, FieldValidationError, ValidationFailure};
pub use field::{
    FieldDisplay, FieldRejection, HasText, HasValue, TextLabel, ValueChangeEvent, ValueField,
};
pub use handler::{
    BindingExceptionHandler, ConstraintValidator, ConstraintViolation,
    DefaultBindingExceptionHandler, DefaultValidationErrorHandler, ValidationErrorHandler,
};
pub use listeners::{ListenerSet, Registration};
pub use status::{
    BinderValidationStatus, BinderValueChangeEvent, BindingStatus, BindingValidationStatus,
    StatusChangeEvent,
};

pub use tether_core::{
    ErrorLevel, ErrorMessage, FieldIdentity, LocaleContext, Outcome, ValidationResult,
    ValueContext, converter, validator,
};
pub use tether_property::{Bean, PropertySet, PropertyTable};
