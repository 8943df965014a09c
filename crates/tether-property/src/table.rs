//! Builder that a [`Bean`] fills with its properties.

use std::any::Any;
use std::rc::Rc;

use crate::Bean;
use crate::definition::{ErasedGetter, ErasedSetter, Lens, LensMut, PropertyDefinition};
use crate::error::PropertyError;
use crate::set::PropertySet;

/// Resolves a dotted path below a nested bean, given the nesting levels left.
pub(crate) type ChildResolver<B> = Rc<dyn Fn(&str, usize) -> Option<PropertyDefinition<B>>>;

pub(crate) struct TableEntry<B> {
    pub(crate) definition: PropertyDefinition<B>,
    pub(crate) child: Option<ChildResolver<B>>,
}

/// Property registrations for bean type `B`.
///
/// Registering a name twice replaces the earlier registration.
pub struct PropertyTable<B> {
    entries: Vec<TableEntry<B>>,
}

impl<B: Bean> PropertyTable<B> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn into_entries(self) -> Vec<TableEntry<B>> {
        self.entries
    }

    /// Register a readable and writable property.
    pub fn property<V: 'static>(
        &mut self,
        name: &str,
        getter: impl Fn(&B) -> V + 'static,
        setter: impl Fn(&mut B, V) + 'static,
    ) -> &mut Self {
        let erased_setter = erase_setter(name, setter);
        let getter = erase_getter(getter);
        self.push(
            PropertyDefinition::new::<V>(name.to_string(), getter, Some(erased_setter)),
            None,
        )
    }

    /// Register a property without a setter.
    pub fn read_only<V: 'static>(
        &mut self,
        name: &str,
        getter: impl Fn(&B) -> V + 'static,
    ) -> &mut Self {
        self.push(
            PropertyDefinition::new::<V>(name.to_string(), erase_getter(getter), None),
            None,
        )
    }

    /// Register a nested bean reached through `lens` / `lens_mut`.
    ///
    /// The nested bean is itself a property of type `C`; its own properties
    /// resolve as `name.child` paths, on first lookup, up to the set's
    /// nesting depth.
    /// A lens returning `None` models an absent intermediate bean.
    pub fn nested<C: Bean + Clone>(
        &mut self,
        name: &str,
        lens: impl Fn(&B) -> Option<&C> + 'static,
        lens_mut: impl Fn(&mut B) -> Option<&mut C> + 'static,
    ) -> &mut Self {
        let lens: Lens<B, C> = Rc::new(lens);
        let lens_mut: LensMut<B, C> = Rc::new(lens_mut);

        let read = Rc::clone(&lens);
        let getter: ErasedGetter<B> = Rc::new(move |bean: &B| {
            read(bean).map(|child| Box::new(child.clone()) as Box<dyn Any>)
        });

        let write = Rc::clone(&lens_mut);
        let path = name.to_string();
        let setter: ErasedSetter<B> = Rc::new(move |bean: &mut B, value: Box<dyn Any>| {
            let value = downcast_value::<C>(&path, value)?;
            match write(bean) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(PropertyError::MissingIntermediate { path: path.clone() }),
            }
        });

        let prefix = name.to_string();
        let child: ChildResolver<B> = Rc::new(move |rest: &str, remaining: usize| {
            PropertySet::<C>::with_max_depth(remaining)
                .property(rest)
                .map(|definition| definition.nest(&prefix, &lens, &lens_mut))
        });

        self.push(
            PropertyDefinition::new::<C>(name.to_string(), getter, Some(setter)),
            Some(child),
        )
    }

    fn push(
        &mut self,
        definition: PropertyDefinition<B>,
        child: Option<ChildResolver<B>>,
    ) -> &mut Self {
        let entry = TableEntry { definition, child };
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.definition.path() == entry.definition.path())
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }

    /// Number of registered top-level properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn erase_getter<B: 'static, V: 'static>(getter: impl Fn(&B) -> V + 'static) -> ErasedGetter<B> {
    Rc::new(move |bean: &B| Some(Box::new(getter(bean)) as Box<dyn Any>))
}

fn erase_setter<B: 'static, V: 'static>(
    name: &str,
    setter: impl Fn(&mut B, V) + 'static,
) -> ErasedSetter<B> {
    let path = name.to_string();
    Rc::new(move |bean: &mut B, value: Box<dyn Any>| {
        let value = downcast_value::<V>(&path, value)?;
        setter(bean, value);
        Ok(())
    })
}

fn downcast_value<V: 'static>(path: &str, value: Box<dyn Any>) -> Result<V, PropertyError> {
    value
        .downcast::<V>()
        .map(|value| *value)
        .map_err(|_| PropertyError::TypeMismatch {
            path: path.to_string(),
            expected: std::any::type_name::<V>(),
            actual: "a value of another type",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Point {
        x: i32,
        label: String,
    }

    impl Bean for Point {
        fn properties(table: &mut PropertyTable<Self>) {
            table
                .property("x", |p| p.x, |p, v| p.x = v)
                .read_only("label", |p| p.label.clone());
        }
    }

    #[test]
    fn registrations_are_recorded_in_order() {
        let mut table = PropertyTable::<Point>::new();
        Point::properties(&mut table);
        let entries = table.into_entries();
        let paths: Vec<_> = entries.iter().map(|e| e.definition.path().to_string()).collect();
        assert_eq!(paths, ["x", "label"]);
        assert!(entries[0].definition.has_setter());
        assert!(!entries[1].definition.has_setter());
    }

    #[test]
    fn duplicate_name_replaces_earlier_registration() {
        let mut table = PropertyTable::<Point>::new();
        table
            .read_only("x", |p: &Point| p.x)
            .property("x", |p: &Point| p.x, |p: &mut Point, v| p.x = v);
        assert_eq!(table.len(), 1);
        assert!(table.into_entries()[0].definition.has_setter());
    }

    #[test]
    fn erased_setter_rejects_wrong_type() {
        let mut table = PropertyTable::<Point>::new();
        Point::properties(&mut table);
        let entries = table.into_entries();
        let mut point = Point::default();
        let err = entries[0]
            .definition
            .set_any(&mut point, Box::new("seven".to_string()))
            .unwrap_err();
        assert!(matches!(err, PropertyError::TypeMismatch { .. }));
        entries[0].definition.set_any(&mut point, Box::new(7)).unwrap();
        assert_eq!(point.x, 7);
    }
}
