#![forbid(unsafe_code)]

//! Tether public facade.
//!
//! Re-exports the binding engine ([`binder`]), its value types ([`core`]),
//! bean property tables ([`property`]) and, with the default `transfer`
//! feature, the transfer-progress subsystem ([`transfer`]).
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tether::prelude::*;
//!
//! #[derive(Default)]
//! struct Account {
//!     owner: String,
//!     balance: i64,
//! }
//!
//! impl Bean for Account {
//!     fn properties(table: &mut PropertyTable<Self>) {
//!         table
//!             .property("owner", |a| a.owner.clone(), |a, v| a.owner = v)
//!             .property("balance", |a| a.balance, |a, v| a.balance = v);
//!     }
//! }
//!
//! let binder = Binder::<Account>::new();
//! let owner = Rc::new(ValueField::text());
//! let balance = Rc::new(ValueField::text());
//! binder.bind_property(&owner, "owner").unwrap();
//! binder
//!     .for_field(&balance)
//!     .with_converter(StringToLongConverter::new("Value must be a number"))
//!     .bind_property("balance")
//!     .unwrap();
//!
//! let account = Rc::new(RefCell::new(Account::default()));
//! binder.set_bean(Some(Rc::clone(&account))).unwrap();
//! balance.input("120").unwrap();
//! assert_eq!(account.borrow().balance, 120);
//! ```

pub use tether_binder as binder;
pub use tether_core as core;
pub use tether_property as property;
#[cfg(feature = "transfer")]
pub use tether_transfer as transfer;

pub use tether_binder::{
    Binder, BinderConfig, BinderError, Binding, BindingBuilder, BindingError, BindingRef,
};

/// Everything a form needs in scope.
pub mod prelude {
    pub use tether_binder::{
        Binder, BinderConfig, BinderError, BinderValidationStatus, Binding, BindingError,
        BindingRef, BindingStatus, BindingValidationStatus, ConstraintValidator,
        ConstraintViolation, FieldDisplay, HasText, HasValue, Registration, StatusChangeEvent,
        TextLabel, ValidationErrorHandler, ValueField,
    };
    pub use tether_core::converter::{
        NullRepresentation, StringToBoolConverter, StringToFloatConverter, StringToIntConverter,
        StringToLongConverter, TrimConverter,
    };
    pub use tether_core::validator::{
        EmailValidator, RangeValidator, RegexpValidator, StringLengthValidator,
    };
    pub use tether_core::{
        Converter, ErrorLevel, ErrorMessage, Outcome, ValidationResult, Validator, ValueContext,
    };
    pub use tether_property::{Bean, PropertySet, PropertyTable};

    #[cfg(feature = "transfer")]
    pub use tether_transfer::{
        InMemoryUploadHandler, TransferContext, TransferOutcome, TransferProgressHandlers,
        TransferProgressListener,
    };
}
