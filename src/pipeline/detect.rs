//! Change detection - the polling scheduler's tick.
//!
//! Props are plain data, so nothing announces a write. Each tick compares
//! every instance's props against the snapshot taken on the previous tick:
//!
//! ```text
//! for each instance (id order):
//!     diff(props, snapshot) → propChange(name, new, old) per change
//!     snapshot := props
//! deliver queued custom events
//! 1 changed instance  → rerender it
//! 2+ changed          → rerender the mounted root
//! write every bound prop back into its element
//! ```

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::state::Emitter;
use crate::types::{BINDING_ATTR, BindingKey, InstanceId, Props, Value};

use super::host::Host;
use super::mount::Runtime;

// =============================================================================
// Diff
// =============================================================================

/// One prop that differs from its snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct PropChange {
    pub name: String,
    pub new: Value,
    pub old: Value,
}

/// Props of `current` whose value differs from `previous`, in `current`'s
/// key order.
///
/// Comparison is shallow: lists and objects compare by identity, so
/// mutating one in place is not a change. Keys present only in `previous`
/// are not reported.
pub fn diff(current: &Props, previous: &Props) -> Vec<PropChange> {
    current
        .iter()
        .filter_map(|(name, new)| {
            let old = previous.get(name);
            (new != old).then(|| PropChange {
                name: name.to_string(),
                new: new.clone(),
                old: old.clone(),
            })
        })
        .collect()
}

// =============================================================================
// Tick
// =============================================================================

/// What one detection pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Instances with at least one changed prop, ascending.
    pub changed: Vec<InstanceId>,
    /// Instance that was re-rendered, if any.
    pub reconciled: Option<InstanceId>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.changed.is_empty()
    }
}

impl<H: Host> Runtime<H> {
    /// Run one change-detection pass.
    pub fn tick(&mut self) -> Result<TickReport> {
        let mut outbox = Emitter::new();
        let mut changed = Vec::new();

        for instance in self.registry.iter_mut() {
            let changes = diff(instance.props(), instance.previous());
            if changes.is_empty() {
                continue;
            }

            if let Some(handler) = instance.component().prop_change_handler() {
                for change in &changes {
                    trace!(id = instance.id(), prop = %change.name, "propChange");
                    handler(&change.name, &change.new, &change.old, &mut outbox);
                }
            }
            instance.snapshot();
            changed.push(instance.id());
        }

        self.deliver(outbox);

        let target = match changed.as_slice() {
            [] => None,
            [only] => Some(*only),
            _ => {
                if self.root.is_none() {
                    warn!(changed = changed.len(), "several instances changed but nothing is mounted");
                }
                self.root
            }
        };

        let mut reconciled = None;
        if let Some(id) = target {
            if self.rerender(id)? {
                reconciled = Some(id);
            }
        }

        self.sync_bindings();

        if !changed.is_empty() {
            debug!(?changed, ?reconciled, "tick");
        }
        Ok(TickReport { changed, reconciled })
    }

    /// Copy every bound prop's value into its element.
    fn sync_bindings(&mut self) {
        if self.bindings.is_empty() {
            return;
        }
        let elements = self.bound_elements();
        for (key, binding) in self.bindings.iter() {
            let Some(element) = elements.get(key) else {
                trace!(%key, "bound element missing");
                continue;
            };
            let text = self
                .registry
                .props(binding.instance)
                .map(|props| props.get(&binding.prop).to_input_text())
                .unwrap_or_default();
            self.host.set_value(element, &text);
        }
    }

    /// Elements carrying a binding tag, collected in one pass over the
    /// mounted tree. Without a mounted root each key is looked up on its own.
    fn bound_elements(&self) -> BTreeMap<BindingKey, H::Node> {
        let Some(root) = self.root.and_then(|id| self.host.instance_root(id)) else {
            return self
                .bindings
                .iter()
                .filter_map(|(key, _)| Some((*key, self.host.binding_element(key)?)))
                .collect();
        };
        self.host
            .descendants(&root)
            .into_iter()
            .filter_map(|node| {
                let key = BindingKey::parse(&self.host.attribute(&node, BINDING_ATTR)?)?;
                Some((key, node))
            })
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_reports_changed_props_only() {
        let previous = Props::new().with("a", 1).with("b", "x").with("c", true);
        let current = Props::new().with("a", 2).with("b", "x").with("c", false);

        let changes = diff(&current, &previous);

        assert_eq!(
            changes,
            vec![
                PropChange { name: "a".into(), new: Value::from(2), old: Value::from(1) },
                PropChange { name: "c".into(), new: Value::from(false), old: Value::from(true) },
            ]
        );
    }

    #[test]
    fn test_diff_new_key_against_undefined() {
        let previous = Props::new();
        let current = Props::new().with("fresh", Value::Null).with("ghost", Value::Undefined);

        let changes = diff(&current, &previous);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].name, "fresh");
        assert_eq!(changes[0].old, Value::Undefined);
    }

    #[test]
    fn test_diff_lists_by_identity() {
        let list = Value::list([Value::from(1)]);
        let previous = Props::new().with("items", list.clone());
        let current = previous.clone();

        if let Some(items) = list.as_list() {
            items.borrow_mut().push(Value::from(2));
        }
        assert!(diff(&current, &previous).is_empty());

        let replaced = Props::new().with("items", Value::list([Value::from(1)]));
        assert_eq!(diff(&replaced, &previous).len(), 1);
    }

    #[test]
    fn test_diff_ignores_removed_keys() {
        let previous = Props::new().with("gone", 1);
        assert!(diff(&Props::new(), &previous).is_empty());
    }

    #[test]
    fn test_tick_report_idle() {
        assert!(TickReport::default().is_idle());
    }

    #[test]
    fn test_tick_writes_bound_props_into_elements() {
        use crate::dom::Document;
        use crate::engine::ComponentDescriptor;

        let mut runtime = Runtime::new(Document::with_mount_point());
        let field = runtime.declare(ComponentDescriptor::new("field", |_, _| {
            Ok(r#"<label><input data-spark-bind="text"></label>"#.into())
        }));
        let form = runtime.declare(ComponentDescriptor::new("form", move |_, scope| {
            let nested = field.of(scope, Props::new().with("text", "x"))?;
            Ok(format!(
                r#"<form><input data-spark-bind="title"><div><input data-spark-bind="body"></div>{nested}</form>"#
            ))
        }));
        runtime
            .mount(&form, Props::new().with("title", "a").with("body", 3))
            .unwrap();

        let keys: Vec<_> = runtime.bound_elements().into_keys().collect();
        assert_eq!(
            keys,
            vec![BindingKey::new(0, 0), BindingKey::new(0, 1), BindingKey::new(1, 0)]
        );

        runtime.registry_mut().props_mut(0).unwrap().set("title", "b");
        let report = runtime.tick().unwrap();
        assert_eq!(report.changed, vec![0]);

        let value = |runtime: &Runtime<Document>, key| {
            let element = runtime.host().binding_element(&key).unwrap();
            runtime.host().value(&element)
        };
        assert_eq!(value(&runtime, BindingKey::new(0, 0)), "b");
        assert_eq!(value(&runtime, BindingKey::new(0, 1)), "3");
        assert_eq!(value(&runtime, BindingKey::new(1, 0)), "x");
    }
}
