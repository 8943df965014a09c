#![forbid(unsafe_code)]

//! Statically registered property tables for bean types.
//!
//! A bean type implements [`Bean`] and registers its properties into a
//! [`PropertyTable`]: plain properties with a getter and optional setter, and
//! nested beans reached through a lens. [`PropertySet::get`] resolves dotted
//! paths (`"address.street"`) through that table on lookup, bounded by a
//! maximum nesting depth, and caches sets per `(type, depth)`.
//!
//! ```
//! use tether_property::{Bean, PropertySet, PropertyTable};
//!
//! #[derive(Clone, Default)]
//! struct Address {
//!     street: String,
//! }
//!
//! impl Bean for Address {
//!     fn properties(table: &mut PropertyTable<Self>) {
//!         table.property("street", |a| a.street.clone(), |a, v| a.street = v);
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Person {
//!     name: String,
//!     address: Address,
//! }
//!
//! impl Bean for Person {
//!     fn properties(table: &mut PropertyTable<Self>) {
//!         table
//!             .property("name", |p| p.name.clone(), |p, v| p.name = v)
//!             .nested("address", |p| Some(&p.address), |p| Some(&mut p.address));
//!     }
//! }
//!
//! let set = PropertySet::<Person>::get();
//! let street = set.property("address.street").unwrap().typed::<String>().unwrap();
//! let mut person = Person::default();
//! street.set(&mut person, "Main St".into()).unwrap();
//! assert_eq!(street.get(&person).as_deref(), Some("Main St"));
//! ```

pub mod definition;
pub mod error;
pub mod set;
pub mod table;

pub use definition::{PropertyDefinition, TypedProperty};
pub use error::PropertyError;
pub use set::{DEFAULT_MAX_NESTING_DEPTH, PropertySet};
pub use table::PropertyTable;

/// A type whose properties can be bound by name.
pub trait Bean: Sized + 'static {
    /// Register this type's properties.
    fn properties(table: &mut PropertyTable<Self>);

    /// Name used in diagnostics.
    fn bean_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}
