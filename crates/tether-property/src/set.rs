//! Property sets, cached per bean type and nesting depth.
//!
//! A set holds the top-level registrations of its bean type. Dotted paths
//! are resolved on first lookup by asking the nested bean's own set (one
//! level shallower) for the rest of the path, then cached. Lookup cost grows
//! with the path length, not with the size of the bean graph.
//!
//! # Invariants
//!
//! 1. **Bounded resolution**: a path with `n` dots resolves iff every segment
//!    is registered and `n <= max_depth`. Self-referential bean graphs
//!    therefore stay finite.
//! 2. **Registration order**: [`PropertySet::properties`] yields the
//!    top-level definitions in registration order.
//! 3. **Stable cache**: repeated calls with the same `(type, depth)` return
//!    the same `Rc`, and repeated lookups of a path return the same
//!    definition.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unknown path | Unregistered, or deeper than `max_depth` | `None`; `lookup` gives `NotFound` |
//! | Cyclic bean graph | `A → B → A → ...` | Resolved one shallower set per level |

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use tracing::{debug, trace};

use crate::Bean;
use crate::definition::PropertyDefinition;
use crate::error::PropertyError;
use crate::table::{ChildResolver, PropertyTable};

/// Default maximum number of nesting levels below a bean.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 10;

thread_local! {
    static PROPERTY_SETS: RefCell<AHashMap<(TypeId, usize), Rc<dyn Any>>> =
        RefCell::new(AHashMap::new());
}

struct TopLevel<B> {
    definition: Rc<PropertyDefinition<B>>,
    child: Option<ChildResolver<B>>,
}

/// The properties of bean type `B` reachable within a nesting depth.
pub struct PropertySet<B> {
    bean_name: &'static str,
    max_depth: usize,
    top_level: Vec<TopLevel<B>>,
    by_name: AHashMap<String, usize>,
    nested: RefCell<AHashMap<String, Rc<PropertyDefinition<B>>>>,
}

impl<B: Bean> PropertySet<B> {
    /// The property set with the default nesting depth.
    #[must_use]
    pub fn get() -> Rc<Self> {
        Self::with_max_depth(DEFAULT_MAX_NESTING_DEPTH)
    }

    /// The property set resolving at most `max_depth` nesting levels.
    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Rc<Self> {
        let key = (TypeId::of::<B>(), max_depth);
        let cached = PROPERTY_SETS.with(|sets| sets.borrow().get(&key).cloned());
        if let Some(set) = cached.and_then(|set| set.downcast::<Self>().ok()) {
            return set;
        }

        let set = Rc::new(Self::build(max_depth));
        PROPERTY_SETS.with(|sets| {
            sets.borrow_mut()
                .insert(key, Rc::clone(&set) as Rc<dyn Any>);
        });
        set
    }

    fn build(max_depth: usize) -> Self {
        let mut table = PropertyTable::new();
        B::properties(&mut table);

        let entries = table.into_entries();
        let mut top_level = Vec::with_capacity(entries.len());
        let mut by_name = AHashMap::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            by_name.insert(entry.definition.path().to_string(), index);
            top_level.push(TopLevel {
                definition: Rc::new(entry.definition),
                child: entry.child,
            });
        }
        debug!(
            bean = B::bean_name(),
            max_depth,
            properties = top_level.len(),
            "registered property set"
        );

        Self {
            bean_name: B::bean_name(),
            max_depth,
            top_level,
            by_name,
            nested: RefCell::new(AHashMap::new()),
        }
    }

    /// The definition at `path`, if it resolves within the nesting depth.
    #[must_use]
    pub fn property(&self, path: &str) -> Option<Rc<PropertyDefinition<B>>> {
        let Some((head, rest)) = path.split_once('.') else {
            return self.top(path).map(|top| Rc::clone(&top.definition));
        };

        let depth = path.matches('.').count();
        if depth > self.max_depth {
            trace!(
                bean = self.bean_name,
                path,
                max_depth = self.max_depth,
                "path exceeds nesting depth"
            );
            return None;
        }
        if let Some(definition) = self.nested.borrow().get(path) {
            return Some(Rc::clone(definition));
        }

        let resolve = self.top(head)?.child.as_ref()?;
        let definition = Rc::new(resolve(rest, self.max_depth - 1)?);
        self.nested
            .borrow_mut()
            .insert(path.to_string(), Rc::clone(&definition));
        Some(definition)
    }

    /// Like [`property`](Self::property), as an error when absent.
    pub fn lookup(&self, path: &str) -> Result<Rc<PropertyDefinition<B>>, PropertyError> {
        self.property(path).ok_or_else(|| PropertyError::NotFound {
            bean: self.bean_name,
            path: path.to_string(),
        })
    }

    /// Top-level definitions in registration order.
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDefinition<B>> + '_ {
        self.top_level.iter().map(|top| top.definition.as_ref())
    }

    /// Number of top-level properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.top_level.len()
    }

    /// Whether the bean has no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.top_level.is_empty()
    }

    /// Number of nested paths resolved so far.
    #[must_use]
    pub fn resolved_nested(&self) -> usize {
        self.nested.borrow().len()
    }

    /// Maximum nesting depth of this set.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Bean type name.
    #[must_use]
    pub fn bean_name(&self) -> &'static str {
        self.bean_name
    }

    fn top(&self, name: &str) -> Option<&TopLevel<B>> {
        self.by_name.get(name).map(|&index| &self.top_level[index])
    }
}

impl<B> fmt::Debug for PropertySet<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySet")
            .field("bean", &self.bean_name)
            .field("max_depth", &self.max_depth)
            .field("properties", &self.top_level.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Leaf {
        value: u32,
    }

    impl Bean for Leaf {
        fn properties(table: &mut PropertyTable<Self>) {
            table.property("value", |l| l.value, |l, v| l.value = v);
        }
    }

    #[derive(Default)]
    struct Root {
        id: u64,
        leaf: Leaf,
        spare: Option<Leaf>,
    }

    impl Bean for Root {
        fn properties(table: &mut PropertyTable<Self>) {
            table
                .read_only("id", |r| r.id)
                .nested("leaf", |r| Some(&r.leaf), |r| Some(&mut r.leaf))
                .nested("spare", |r| r.spare.as_ref(), |r| r.spare.as_mut());
        }
    }

    #[test]
    fn nested_paths_resolve_on_lookup() {
        let set = PropertySet::<Root>::with_max_depth(3);
        let paths: Vec<_> = set.properties().map(|d| d.path().to_string()).collect();
        assert_eq!(paths, ["id", "leaf", "spare"]);
        assert_eq!(set.resolved_nested(), 0);

        let nested = set.property("leaf.value").unwrap();
        assert_eq!(nested.name(), "value");
        assert_eq!(nested.top_level_name(), "leaf");
        assert_eq!(nested.parent_path(), Some("leaf"));
        assert_eq!(nested.depth(), 1);
        assert_eq!(set.resolved_nested(), 1);

        let again = set.property("leaf.value").unwrap();
        assert!(Rc::ptr_eq(&nested, &again));
        assert!(set.property("id.value").is_none());
        assert!(set.property("leaf.nope").is_none());
        assert_eq!(set.resolved_nested(), 1);
    }

    #[test]
    fn cache_returns_same_instance_per_depth() {
        let a = PropertySet::<Root>::get();
        let b = PropertySet::<Root>::get();
        assert!(Rc::ptr_eq(&a, &b));
        let shallow = PropertySet::<Root>::with_max_depth(0);
        assert!(!Rc::ptr_eq(&a, &shallow));
        assert!(shallow.property("leaf.value").is_none());
        assert!(shallow.property("leaf").is_some());
    }

    #[test]
    fn absent_intermediate_reads_none_and_rejects_writes() {
        let set = PropertySet::<Root>::get();
        let spare = set.property("spare.value").unwrap();
        let mut root = Root::default();
        assert_eq!(spare.get::<u32>(&root), Ok(None));
        assert_eq!(
            spare.set(&mut root, 4u32),
            Err(PropertyError::MissingIntermediate {
                path: "spare".into()
            })
        );
        root.spare = Some(Leaf::default());
        spare.set(&mut root, 4u32).unwrap();
        assert_eq!(spare.get::<u32>(&root), Ok(Some(4)));
    }

    #[test]
    fn typed_access_checks_value_type() {
        let set = PropertySet::<Root>::get();
        let id = set.property("id").unwrap();
        assert!(matches!(
            id.typed::<String>(),
            Err(PropertyError::TypeMismatch { .. })
        ));
        let typed = id.typed::<u64>().unwrap();
        assert!(!typed.has_setter());
        let mut root = Root { id: 9, ..Root::default() };
        assert_eq!(typed.get(&root), Some(9));
        assert_eq!(
            typed.set(&mut root, 1),
            Err(PropertyError::ReadOnly { path: "id".into() })
        );
    }

    #[test]
    fn lookup_reports_missing_path() {
        let set = PropertySet::<Root>::get();
        let err = set.lookup("leaf.nope").unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("no property 'leaf.nope' on {}", Root::bean_name())
        );
    }
}
