//! Instance Registry - the context object owning all instance state.
//!
//! Manages:
//! - Declared components by name (last declaration wins)
//! - Instance records keyed by id, iterated in id order
//! - The id allocator (monotonic, reset on re-render)
//! - Parent context stack for nested instantiation
//!
//! Ids are consumed eagerly: every instantiation takes the next id even when
//! an instance already occupies it. Re-rendering instance `n` resets the
//! allocator to `n + 1`, so nested instances get the same ids as last time.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::types::{InstanceId, Props};

use super::component::{Component, ComponentDescriptor};

// =============================================================================
// Instance
// =============================================================================

/// A live occurrence of a component.
#[derive(Debug)]
pub struct Instance {
    id: InstanceId,
    component: Component,
    props: Props,
    previous: Props,
    children: Vec<InstanceId>,
}

impl Instance {
    pub(crate) fn new(id: InstanceId, component: Component, props: Props) -> Self {
        Self {
            id,
            component,
            previous: props.clone(),
            props,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut Props {
        &mut self.props
    }

    /// Child instances created during this instance's last render, in call order.
    pub fn children(&self) -> &[InstanceId] {
        &self.children
    }

    pub(crate) fn previous(&self) -> &Props {
        &self.previous
    }

    /// Overwrite the snapshot with a shallow copy of the current props.
    pub(crate) fn snapshot(&mut self) {
        self.previous = self.props.clone();
    }

    pub(crate) fn clear_children(&mut self) {
        self.children.clear();
    }

    pub(crate) fn push_child(&mut self, child: InstanceId) {
        self.children.push(child);
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Instance table, id allocator and component table.
#[derive(Debug, Default)]
pub struct Registry {
    components: HashMap<String, Component>,
    instances: BTreeMap<InstanceId, Instance>,
    next_id: InstanceId,
    parent_stack: Vec<InstanceId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Components
    // -------------------------------------------------------------------------

    /// Declare a component. A later declaration with the same name replaces
    /// the earlier one in the name table.
    pub fn declare(&mut self, descriptor: ComponentDescriptor) -> Component {
        let component = Component::from_descriptor(descriptor);
        debug!(
            component = component.name(),
            memoized = component.is_memoized(),
            "component declared"
        );
        self.components
            .insert(component.name().to_string(), component.clone());
        component
    }

    /// Look up a declared component by name.
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    // -------------------------------------------------------------------------
    // Id Allocation
    // -------------------------------------------------------------------------

    /// Take the next id.
    pub(crate) fn allocate_id(&mut self) -> InstanceId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// The id the next instantiation will take.
    pub fn next_id(&self) -> InstanceId {
        self.next_id
    }

    /// Point the allocator at `id`.
    pub(crate) fn reset_next_id(&mut self, id: InstanceId) {
        self.next_id = id;
    }

    // -------------------------------------------------------------------------
    // Parent Context Stack
    // -------------------------------------------------------------------------

    /// Instance whose render function is currently running.
    pub fn current_parent(&self) -> Option<InstanceId> {
        self.parent_stack.last().copied()
    }

    pub(crate) fn push_parent(&mut self, id: InstanceId) {
        self.parent_stack.push(id);
    }

    pub(crate) fn pop_parent(&mut self) {
        self.parent_stack.pop();
    }

    // -------------------------------------------------------------------------
    // Instances
    // -------------------------------------------------------------------------

    pub(crate) fn insert(&mut self, instance: Instance) {
        self.instances.insert(instance.id, instance);
    }

    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(&id)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.instances.get_mut(&id)
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances.contains_key(&id)
    }

    /// Current props of an instance.
    pub fn props(&self, id: InstanceId) -> Option<&Props> {
        self.instances.get(&id).map(Instance::props)
    }

    pub fn props_mut(&mut self, id: InstanceId) -> Option<&mut Props> {
        self.instances.get_mut(&id).map(Instance::props_mut)
    }

    /// All instance ids in ascending order.
    pub fn ids(&self) -> Vec<InstanceId> {
        self.instances.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Instance> {
        self.instances.values_mut()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// `id` followed by its descendants, depth-first in render order.
    ///
    /// Children always have larger ids than their parent, so the walk
    /// terminates.
    pub fn subtree(&self, id: InstanceId) -> Vec<InstanceId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(instance) = self.instances.get(&current) else {
                continue;
            };
            out.push(current);
            stack.extend(instance.children.iter().rev().copied());
        }
        out
    }

    /// Reset everything (for testing).
    pub fn reset(&mut self) {
        self.components.clear();
        self.instances.clear();
        self.next_id = 0;
        self.parent_stack.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn leaf(name: &str) -> ComponentDescriptor {
        ComponentDescriptor::new(name, |_, _| Ok("<span></span>".into()))
    }

    #[test]
    fn test_allocate_and_reset() {
        let mut registry = Registry::new();
        assert_eq!(registry.allocate_id(), 0);
        assert_eq!(registry.allocate_id(), 1);
        registry.reset_next_id(1);
        assert_eq!(registry.allocate_id(), 1);
        assert_eq!(registry.next_id(), 2);
    }

    #[test]
    fn test_last_declaration_wins() {
        let mut registry = Registry::new();
        let first = registry.declare(leaf("cell"));
        let second = registry.declare(leaf("cell"));

        let found = registry.component("cell").unwrap();
        assert!(found.ptr_eq(&second));
        assert!(!found.ptr_eq(&first));
    }

    #[test]
    fn test_parent_context() {
        let mut registry = Registry::new();
        assert_eq!(registry.current_parent(), None);

        registry.push_parent(5);
        assert_eq!(registry.current_parent(), Some(5));
        registry.push_parent(10);
        assert_eq!(registry.current_parent(), Some(10));

        registry.pop_parent();
        assert_eq!(registry.current_parent(), Some(5));
        registry.pop_parent();
        assert_eq!(registry.current_parent(), None);
    }

    #[test]
    fn test_subtree_order() {
        let mut registry = Registry::new();
        let component = registry.declare(leaf("node"));
        for id in 0..5 {
            registry.insert(Instance::new(id, component.clone(), Props::new()));
        }
        // 0 -> [1, 3], 1 -> [2], 3 -> [4]
        registry.get_mut(0).unwrap().push_child(1);
        registry.get_mut(0).unwrap().push_child(3);
        registry.get_mut(1).unwrap().push_child(2);
        registry.get_mut(3).unwrap().push_child(4);

        assert_eq!(registry.subtree(0), vec![0, 1, 2, 3, 4]);
        assert_eq!(registry.subtree(3), vec![3, 4]);
        assert_eq!(registry.subtree(9), Vec::<InstanceId>::new());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut registry = Registry::new();
        let component = registry.declare(leaf("node"));
        component.instantiate(&mut registry, Props::new()).unwrap();
        registry.push_parent(0);

        registry.reset();

        assert!(registry.is_empty());
        assert!(registry.component("node").is_none());
        assert_eq!(registry.next_id(), 0);
        assert_eq!(registry.current_parent(), None);
    }

    #[test]
    fn test_snapshot_is_shallow() {
        let mut registry = Registry::new();
        let component = registry.declare(leaf("node"));
        let mut instance = Instance::new(0, component, Props::new().with("n", 1));

        instance.props_mut().set("n", 2);
        assert_eq!(instance.previous().get("n"), &Value::from(1));

        instance.snapshot();
        assert_eq!(instance.previous().get("n"), &Value::from(2));
    }
}
