//! Type-erased and typed property accessors.
//!
//! # Invariants
//!
//! 1. A definition's value type is fixed at registration; typed access with
//!    another type fails with [`PropertyError::TypeMismatch`] instead of
//!    returning a wrong value.
//! 2. Reading a nested path whose intermediate bean is absent yields `None`;
//!    writing it yields [`PropertyError::MissingIntermediate`].

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use crate::error::PropertyError;

pub(crate) type ErasedGetter<B> = Rc<dyn Fn(&B) -> Option<Box<dyn Any>>>;
pub(crate) type ErasedSetter<B> = Rc<dyn Fn(&mut B, Box<dyn Any>) -> Result<(), PropertyError>>;
pub(crate) type Lens<P, C> = Rc<dyn Fn(&P) -> Option<&C>>;
pub(crate) type LensMut<P, C> = Rc<dyn Fn(&mut P) -> Option<&mut C>>;

/// One resolved property of bean type `B`.
pub struct PropertyDefinition<B> {
    path: String,
    depth: usize,
    value_type: TypeId,
    value_type_name: &'static str,
    getter: ErasedGetter<B>,
    setter: Option<ErasedSetter<B>>,
}

impl<B> Clone for PropertyDefinition<B> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            depth: self.depth,
            value_type: self.value_type,
            value_type_name: self.value_type_name,
            getter: Rc::clone(&self.getter),
            setter: self.setter.clone(),
        }
    }
}

impl<B: 'static> PropertyDefinition<B> {
    pub(crate) fn new<V: 'static>(
        path: String,
        getter: ErasedGetter<B>,
        setter: Option<ErasedSetter<B>>,
    ) -> Self {
        Self {
            path,
            depth: 0,
            value_type: TypeId::of::<V>(),
            value_type_name: std::any::type_name::<V>(),
            getter,
            setter,
        }
    }

    /// Full dotted path (`"address.street"`).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment (`"street"`).
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    /// First path segment (`"address"`).
    #[must_use]
    pub fn top_level_name(&self) -> &str {
        self.path.split('.').next().unwrap_or(&self.path)
    }

    /// Path of the parent property, `None` for top-level properties.
    #[must_use]
    pub fn parent_path(&self) -> Option<&str> {
        self.path.rsplit_once('.').map(|(parent, _)| parent)
    }

    /// Nesting depth: `0` for top-level properties.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Declared value type.
    #[must_use]
    pub fn value_type(&self) -> TypeId {
        self.value_type
    }

    /// Declared value type name.
    #[must_use]
    pub fn value_type_name(&self) -> &'static str {
        self.value_type_name
    }

    /// Whether the value type is `V`.
    #[must_use]
    pub fn is_of<V: 'static>(&self) -> bool {
        self.value_type == TypeId::of::<V>()
    }

    /// Whether the property can be written.
    #[must_use]
    pub fn has_setter(&self) -> bool {
        self.setter.is_some()
    }

    /// Read the value as `dyn Any`.
    #[must_use]
    pub fn get_any(&self, bean: &B) -> Option<Box<dyn Any>> {
        (self.getter)(bean)
    }

    /// Write a value passed as `dyn Any`.
    pub fn set_any(&self, bean: &mut B, value: Box<dyn Any>) -> Result<(), PropertyError> {
        match &self.setter {
            Some(setter) => setter(bean, value),
            None => Err(PropertyError::ReadOnly {
                path: self.path.clone(),
            }),
        }
    }

    /// Read the value as `V`.
    pub fn get<V: 'static>(&self, bean: &B) -> Result<Option<V>, PropertyError> {
        self.check_type::<V>()?;
        Ok(self.get_any(bean).and_then(|value| value.downcast::<V>().ok()).map(|value| *value))
    }

    /// Write a value of type `V`.
    pub fn set<V: 'static>(&self, bean: &mut B, value: V) -> Result<(), PropertyError> {
        self.check_type::<V>()?;
        self.set_any(bean, Box::new(value))
    }

    /// Typed accessors for this property.
    pub fn typed<V: 'static>(&self) -> Result<TypedProperty<B, V>, PropertyError> {
        self.check_type::<V>()?;
        let getter = Rc::clone(&self.getter);
        let get: Rc<dyn Fn(&B) -> Option<V>> = Rc::new(move |bean: &B| {
            getter(bean)
                .and_then(|value| value.downcast::<V>().ok())
                .map(|value| *value)
        });
        let set = self.setter.clone().map(|setter| {
            let set: Rc<dyn Fn(&mut B, V) -> Result<(), PropertyError>> =
                Rc::new(move |bean: &mut B, value: V| setter(bean, Box::new(value)));
            set
        });
        Ok(TypedProperty {
            path: self.path.clone(),
            get,
            set,
        })
    }

    fn check_type<V: 'static>(&self) -> Result<(), PropertyError> {
        if self.is_of::<V>() {
            Ok(())
        } else {
            Err(PropertyError::TypeMismatch {
                path: self.path.clone(),
                expected: std::any::type_name::<V>(),
                actual: self.value_type_name,
            })
        }
    }

    /// Re-root this definition under `prefix` on parent type `P`.
    pub(crate) fn nest<P: 'static>(
        &self,
        prefix: &str,
        lens: &Lens<P, B>,
        lens_mut: &LensMut<P, B>,
    ) -> PropertyDefinition<P> {
        let getter = Rc::clone(&self.getter);
        let lens = Rc::clone(lens);
        let nested_getter: ErasedGetter<P> =
            Rc::new(move |parent: &P| lens(parent).and_then(|child| getter(child)));

        let nested_setter = self.setter.clone().map(|setter| {
            let lens_mut = Rc::clone(lens_mut);
            let intermediate = prefix.to_string();
            let nested: ErasedSetter<P> = Rc::new(move |parent: &mut P, value: Box<dyn Any>| {
                match lens_mut(parent) {
                    Some(child) => setter(child, value),
                    None => Err(PropertyError::MissingIntermediate {
                        path: intermediate.clone(),
                    }),
                }
            });
            nested
        });

        PropertyDefinition {
            path: format!("{prefix}.{}", self.path),
            depth: self.depth + 1,
            value_type: self.value_type,
            value_type_name: self.value_type_name,
            getter: nested_getter,
            setter: nested_setter,
        }
    }
}

impl<B> fmt::Debug for PropertyDefinition<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDefinition")
            .field("path", &self.path)
            .field("depth", &self.depth)
            .field("value_type", &self.value_type_name)
            .field("has_setter", &self.setter.is_some())
            .finish()
    }
}

/// Typed view of a [`PropertyDefinition`].
pub struct TypedProperty<B, V> {
    path: String,
    get: Rc<dyn Fn(&B) -> Option<V>>,
    set: Option<Rc<dyn Fn(&mut B, V) -> Result<(), PropertyError>>>,
}

impl<B, V> Clone for TypedProperty<B, V> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            get: Rc::clone(&self.get),
            set: self.set.clone(),
        }
    }
}

impl<B, V> TypedProperty<B, V> {
    /// Full dotted path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Read the value; `None` when an intermediate bean is absent.
    pub fn get(&self, bean: &B) -> Option<V> {
        (self.get)(bean)
    }

    /// Write the value.
    pub fn set(&self, bean: &mut B, value: V) -> Result<(), PropertyError> {
        match &self.set {
            Some(set) => set(bean, value),
            None => Err(PropertyError::ReadOnly {
                path: self.path.clone(),
            }),
        }
    }

    /// Whether the property can be written.
    #[must_use]
    pub fn has_setter(&self) -> bool {
        self.set.is_some()
    }
}

impl<B, V> fmt::Debug for TypedProperty<B, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedProperty")
            .field("path", &self.path)
            .field("has_setter", &self.set.is_some())
            .finish()
    }
}
