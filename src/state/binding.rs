//! Binding Table - two-way input bindings.
//!
//! A binding ties a bindable element to a prop of the instance that rendered
//! it. Keys are `instance:ordinal`, with ordinals assigned depth-first over
//! the instance's own elements at attach time. The same markup shape always
//! yields the same keys, which is what lets focus find a bound input again
//! after a re-render.

use std::collections::BTreeMap;

use crate::types::{BindingKey, InstanceId};

/// One live binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub instance: InstanceId,
    pub prop: String,
}

/// All live bindings, ordered by key.
#[derive(Debug, Default)]
pub struct BindingTable {
    entries: BTreeMap<BindingKey, Binding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: BindingKey, binding: Binding) {
        self.entries.insert(key, binding);
    }

    pub fn remove(&mut self, key: &BindingKey) -> Option<Binding> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &BindingKey) -> Option<&Binding> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BindingKey, &Binding)> {
        self.entries.iter()
    }

    /// Keys owned by `instance`, in ordinal order.
    pub fn keys_for(&self, instance: InstanceId) -> Vec<BindingKey> {
        self.entries
            .range(BindingKey::new(instance, 0)..=BindingKey::new(instance, usize::MAX))
            .map(|(key, _)| *key)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(instance: InstanceId, prop: &str) -> Binding {
        Binding {
            instance,
            prop: prop.to_string(),
        }
    }

    #[test]
    fn test_keys_for_instance() {
        let mut table = BindingTable::new();
        table.insert(BindingKey::new(1, 0), binding(1, "first"));
        table.insert(BindingKey::new(1, 1), binding(1, "last"));
        table.insert(BindingKey::new(2, 0), binding(2, "query"));

        assert_eq!(
            table.keys_for(1),
            vec![BindingKey::new(1, 0), BindingKey::new(1, 1)]
        );
        assert_eq!(table.keys_for(3), Vec::new());
    }

    #[test]
    fn test_remove() {
        let mut table = BindingTable::new();
        table.insert(BindingKey::new(0, 0), binding(0, "name"));
        assert_eq!(table.remove(&BindingKey::new(0, 0)), Some(binding(0, "name")));
        assert!(table.is_empty());
    }
}
