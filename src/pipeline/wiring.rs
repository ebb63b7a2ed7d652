//! Event wiring - native listeners and two-way bindings.
//!
//! Wiring is per instance. The bind scan covers every descendant element of
//! the instance root up to and including the roots of nested instances, but
//! never below them. A nested component whose root is itself a bound input
//! therefore binds to the props of the component that placed it.

use tracing::{debug, trace};

use crate::state::{Binding, Listener};
use crate::types::{BIND_ATTR, BINDING_ATTR, BindingKey, INPUT_EVENT, INSTANCE_ATTR, InstanceId};

use super::host::Host;
use super::mount::Runtime;

impl<H: Host> Runtime<H> {
    /// Wire `id` and every descendant instance.
    pub(crate) fn attach_tree(&mut self, id: InstanceId) {
        for instance in self.registry.subtree(id) {
            self.attach(instance);
        }
    }

    /// Unwire `id` and every descendant instance.
    pub(crate) fn detach_tree(&mut self, id: InstanceId) {
        for instance in self.registry.subtree(id) {
            self.detach(instance);
        }
    }

    /// Register native handlers on the instance root and bind marked inputs.
    pub(crate) fn attach(&mut self, id: InstanceId) {
        let Some(root) = self.host.instance_root(id) else {
            debug!(id, "attach skipped, root not in document");
            return;
        };
        let Some(component) = self.registry.get(id).map(|i| i.component().clone()) else {
            return;
        };

        for event in component.native_events() {
            let listener = Listener::Native {
                instance: id,
                event: event.to_string(),
            };
            self.host.add_listener(&root, event, listener);
        }

        let mut ordinal = 0;
        for element in bind_candidates(&self.host, &root) {
            let Some(prop) = self.host.attribute(&element, BIND_ATTR) else {
                continue;
            };
            let key = BindingKey::new(id, ordinal);
            ordinal += 1;

            trace!(%key, prop = %prop, "binding attached");
            self.bindings.insert(key, Binding { instance: id, prop });
            self.host.set_attribute(&element, BINDING_ATTR, &key.to_string());
            self.host.add_listener(&element, INPUT_EVENT, Listener::Binding(key));
        }
    }

    /// Mirror of [`attach`](Self::attach). Binding records are dropped even
    /// when their element has already left the document.
    pub(crate) fn detach(&mut self, id: InstanceId) {
        let root = self.host.instance_root(id);

        if let (Some(root), Some(instance)) = (&root, self.registry.get(id)) {
            for event in instance.component().native_events() {
                let listener = Listener::Native {
                    instance: id,
                    event: event.to_string(),
                };
                self.host.remove_listener(root, event, &listener);
            }
        }

        for key in self.bindings.keys_for(id) {
            if let Some(element) = self.host.binding_element(&key) {
                self.host.remove_attribute(&element, BINDING_ATTR);
                self.host.remove_listener(&element, INPUT_EVENT, &Listener::Binding(key));
            }
            self.bindings.remove(&key);
        }
    }
}

/// Descendant elements of `root` in document order. Nested instance roots
/// are included but not descended into.
fn bind_candidates<H: Host>(host: &H, root: &H::Node) -> Vec<H::Node> {
    let mut out = Vec::new();
    let mut stack: Vec<H::Node> = host.children(root).into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        if host.attribute(&node, INSTANCE_ATTR).is_none() {
            stack.extend(host.children(&node).into_iter().rev());
        }
        out.push(node);
    }
    out
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::dom::Document;
    use crate::engine::ComponentDescriptor;
    use crate::pipeline::{Host, Runtime};
    use crate::state::Listener;
    use crate::types::{BINDING_ATTR, BindingKey, Props, Value};

    fn form_runtime() -> Runtime<Document> {
        let mut runtime = Runtime::new(Document::with_mount_point());
        let field = runtime.declare(ComponentDescriptor::new("field", |_, _| {
            Ok(r#"<label><input data-spark-bind="text"></label>"#.into())
        }));
        let form = runtime.declare(
            ComponentDescriptor::new("form", move |_, scope| {
                let nested = field.of(scope, Props::new())?;
                Ok(format!(
                    r#"<form><input data-spark-bind="first"><div><input data-spark-bind="last"></div>{nested}</form>"#
                ))
            })
            .on("submit", |_, _, _| {}),
        );
        runtime.mount(&form, Props::new()).unwrap();
        runtime
    }

    #[test]
    fn test_attach_assigns_ordinals_per_instance() {
        let runtime = form_runtime();
        let bindings = runtime.bindings();

        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings.get(&BindingKey::new(0, 0)).unwrap().prop, "first");
        assert_eq!(bindings.get(&BindingKey::new(0, 1)).unwrap().prop, "last");
        assert_eq!(bindings.get(&BindingKey::new(1, 0)).unwrap().prop, "text");

        let nested = runtime.host().binding_element(&BindingKey::new(1, 0)).unwrap();
        assert_eq!(runtime.host().attribute(&nested, BINDING_ATTR), Some("1:0".into()));
    }

    #[test]
    fn test_attach_registers_native_listener_on_root() {
        let runtime = form_runtime();
        let root = runtime.host().instance_root(0).unwrap();
        assert_eq!(
            runtime.host().listeners(&root, "submit"),
            vec![Listener::Native { instance: 0, event: "submit".into() }]
        );
    }

    #[test]
    fn test_nested_root_input_binds_to_parent() {
        let mut runtime = Runtime::new(Document::with_mount_point());
        let field = runtime.declare(ComponentDescriptor::new("field", |_, _| {
            Ok(r#"<input data-spark-bind="name">"#.into())
        }));
        let form = runtime.declare(ComponentDescriptor::new("form", move |_, scope| {
            let nested = field.of(scope, Props::new())?;
            Ok(format!("<form>{nested}</form>"))
        }));
        runtime.mount(&form, Props::new().with("name", "")).unwrap();

        let bindings = runtime.bindings();
        assert_eq!(bindings.len(), 1);
        let binding = bindings.get(&BindingKey::new(0, 0)).unwrap();
        assert_eq!((binding.instance, binding.prop.as_str()), (0, "name"));

        let input = runtime.host().instance_root(1).unwrap();
        assert_eq!(runtime.host().attribute(&input, BINDING_ATTR), Some("0:0".into()));

        runtime.input(&input, "typed");
        assert_eq!(runtime.registry().props(0).unwrap().get("name"), &Value::from("typed"));
        assert_eq!(runtime.registry().props(1).unwrap().get("name"), &Value::Undefined);
    }

    #[test]
    fn test_detach_tree_clears_everything() {
        let mut runtime = form_runtime();
        runtime.detach_tree(0);

        assert!(runtime.bindings().is_empty());
        let root = runtime.host().instance_root(0).unwrap();
        assert!(runtime.host().listeners(&root, "submit").is_empty());
        assert!(!runtime.host().html().contains(BINDING_ATTR));
    }
}
