#![forbid(unsafe_code)]

//! Value types shared by the tether binding engine.
//!
//! - [`Outcome`]: success-with-value or failure-with-message, produced by
//!   converters.
//! - [`ValidationResult`] / [`ErrorLevel`]: the outcome of one validator.
//! - [`ValueContext`]: explicit context handed to every converter and
//!   validator call (locale, field identity, binder id, current bean).
//! - [`Converter`] / [`Validator`]: composable presentation↔model mapping and
//!   value checks, plus the stock implementations in [`converter`] and
//!   [`validator`].
//! - [`LocaleContext`] / [`MessageCatalog`]: locale resolution and localized
//!   error messages.

pub mod context;
pub mod converter;
pub mod error;
pub mod locale;
pub mod messages;
pub mod outcome;
pub mod validation;
pub mod validator;

pub use context::{BinderId, FieldIdentity, FieldKey, ValueContext};
pub use converter::Converter;
pub use error::{MessageError, UserError};
pub use locale::{Locale, LocaleContext, LocaleOverride};
pub use messages::{ErrorMessage, LocaleMessages, MessageCatalog};
pub use outcome::Outcome;
pub use validation::{ErrorLevel, ValidationResult};
pub use validator::Validator;
