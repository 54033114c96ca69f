//! Immutable, identifier-keyed algorithm registries
//!
//! Lookups are case-insensitive and iteration follows registration order. A registry
//! layered over another with [`Registry::with_overrides`] checks the caller's entries
//! first, so they shadow built-ins that share an identifier.

use crate::error::{JoseError, JoseResult};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Anything registered under a string identifier
pub trait Identifiable {
    /// Registry identifier, e.g. `HS256` or `sha-256`
    fn id(&self) -> &str;
}

/// Ordered, case-insensitive registry of shared algorithm instances
pub struct Registry<A: ?Sized> {
    name: &'static str,
    entries: IndexMap<String, Arc<A>>,
}

impl<A: ?Sized + Identifiable> Registry<A> {
    /// Build a registry from `entries`
    ///
    /// # Errors
    /// Returns `JoseError::Configuration` if two entries share an identifier
    pub fn new(name: &'static str, entries: impl IntoIterator<Item = Arc<A>>) -> JoseResult<Self> {
        let mut map = IndexMap::new();
        for entry in entries {
            let key = entry.id().to_ascii_lowercase();
            if map.contains_key(&key) {
                return Err(JoseError::configuration(format!(
                    "{name} '{}' registered more than once",
                    entry.id()
                )));
            }
            map.insert(key, entry);
        }
        Ok(Self { name, entries: map })
    }

    /// Registry over fixed built-in entries, verified unique by unit tests
    pub(crate) fn from_unique(name: &'static str, entries: Vec<Arc<A>>) -> Self {
        let count = entries.len();
        let entries: IndexMap<String, Arc<A>> = entries
            .into_iter()
            .map(|entry| (entry.id().to_ascii_lowercase(), entry))
            .collect();
        debug_assert_eq!(entries.len(), count, "duplicate {name} identifier");
        Self { name, entries }
    }

    /// Layer `overrides` over `base`; overrides take precedence on identifier collision
    ///
    /// Iteration yields the overrides in their given order, followed by the base
    /// entries they do not shadow.
    ///
    /// # Errors
    /// Returns `JoseError::Configuration` if `overrides` repeats an identifier
    pub fn with_overrides(
        base: &Self,
        overrides: impl IntoIterator<Item = Arc<A>>,
    ) -> JoseResult<Self> {
        let mut layer = Self::new(base.name, overrides)?;
        for (key, entry) in &base.entries {
            if !layer.entries.contains_key(key) {
                layer.entries.insert(key.clone(), Arc::clone(entry));
            }
        }
        Ok(layer)
    }

    /// Copy of this registry with `entry` checked first, replacing any entry it shadows
    #[must_use]
    pub fn with_entry(&self, entry: Arc<A>) -> Self {
        let key = entry.id().to_ascii_lowercase();
        let mut entries = IndexMap::with_capacity(self.entries.len() + 1);
        entries.insert(key, entry);
        for (key, existing) in &self.entries {
            if !entries.contains_key(key) {
                entries.insert(key.clone(), Arc::clone(existing));
            }
        }
        Self {
            name: self.name,
            entries,
        }
    }

    /// Look up an entry, failing with an explicit unsupported-algorithm error
    ///
    /// # Errors
    /// Returns `JoseError::UnsupportedAlgorithm` if no entry has this identifier
    pub fn find(&self, id: &str) -> JoseResult<&Arc<A>> {
        self.get(id).ok_or_else(|| {
            JoseError::unsupported_algorithm(format!("unrecognized {} '{id}'", self.name))
        })
    }

    /// Look up an entry
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<A>> {
        self.entries.get(&id.to_ascii_lowercase())
    }

    /// Whether an entry has this identifier
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(&id.to_ascii_lowercase())
    }

    /// Entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<A>> {
        self.entries.values()
    }

    /// Identifiers in registration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|e| e.id())
    }

    /// Registry name, e.g. `JWS signature algorithm`
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A: ?Sized> Clone for Registry<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            entries: self.entries.clone(),
        }
    }
}

impl<A: ?Sized + Identifiable> fmt::Debug for Registry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.name)
            .field("ids", &self.ids().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Named(&'static str, u8);

    impl Identifiable for Named {
        fn id(&self) -> &str {
            self.0
        }
    }

    fn base() -> Registry<Named> {
        Registry::new(
            "test algorithm",
            [Arc::new(Named("A1", 1)), Arc::new(Named("b2", 2))],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = base();
        assert_eq!(registry.find("a1").unwrap().1, 1);
        assert_eq!(registry.find("B2").unwrap().1, 2);
    }

    #[test]
    fn test_miss_is_explicit_error() {
        let err = base().find("c3").unwrap_err();
        assert!(matches!(err, JoseError::UnsupportedAlgorithm(ref m) if m.contains("c3")));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = Registry::new("dup", [Arc::new(Named("x", 1)), Arc::new(Named("X", 2))]);
        assert!(matches!(result, Err(JoseError::Configuration(_))));
    }

    #[test]
    fn test_overrides_take_precedence_and_order() {
        let layered =
            Registry::with_overrides(&base(), [Arc::new(Named("B2", 20)), Arc::new(Named("c3", 3))])
                .unwrap();
        assert_eq!(layered.find("b2").unwrap().1, 20);
        assert_eq!(layered.ids().collect::<Vec<_>>(), vec!["B2", "c3", "A1"]);
    }

    #[test]
    fn test_single_entry_layer() {
        let layered = base().with_entry(Arc::new(Named("a1", 10)));
        assert_eq!(layered.len(), 2);
        assert_eq!(layered.find("A1").unwrap().1, 10);
        assert_eq!(layered.ids().collect::<Vec<_>>(), vec!["a1", "b2"]);
    }

    #[test]
    fn test_iteration_agrees_with_lookup() {
        let layered = Registry::with_overrides(&base(), [Arc::new(Named("C3", 3))]).unwrap();
        assert_eq!(layered.len(), 3);
        for entry in layered.iter() {
            assert!(Arc::ptr_eq(entry, layered.find(entry.id()).unwrap()));
        }
        let unchanged = Registry::with_overrides(&base(), []).unwrap();
        assert_eq!(unchanged.ids().collect::<Vec<_>>(), vec!["A1", "b2"]);
    }
}
