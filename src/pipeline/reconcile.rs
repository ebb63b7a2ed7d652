//! Reconciliation - re-render one instance subtree in place.
//!
//! ```text
//! capture focus key → allocator := id + 1 → detach subtree
//!   → render → replace root node → attach subtree → restore focus
//! ```
//!
//! Resetting the allocator makes the re-render hand out the same ids to the
//! same child positions, so child instances keep their records and props.
//!
//! A root that is itself a bound input belongs to the parent's binding. The
//! parent is not re-attached, so the binding tag and listener are carried
//! over to the new root by hand.

use tracing::debug;

use crate::error::Result;
use crate::state::Listener;
use crate::types::{BIND_ATTR, BINDING_ATTR, BindingKey, INPUT_EVENT, InstanceId};

use super::host::Host;
use super::mount::Runtime;

impl<H: Host> Runtime<H> {
    /// Re-render instance `id` and swap it into the document.
    ///
    /// Returns `Ok(false)` when the instance's root is not in the document
    /// (typically because an ancestor re-render dropped it).
    pub fn rerender(&mut self, id: InstanceId) -> Result<bool> {
        let Some(root) = self.host.instance_root(id) else {
            debug!(id, "rerender skipped, root not in document");
            return Ok(false);
        };

        let focus = self.host.capture_focus_key(&root);
        let inherited = self
            .host
            .attribute(&root, BINDING_ATTR)
            .and_then(|raw| BindingKey::parse(&raw))
            .filter(|key| key.instance != id);

        self.registry.reset_next_id(id + 1);
        self.detach_tree(id);

        let markup = self.registry.render(id)?;
        let fresh = self.host.replace(&root, &markup)?;
        self.attach_tree(id);

        if let Some(key) = inherited {
            self.carry_binding(key, &fresh);
        }

        if let Some(key) = focus {
            let restored = self.host.restore_focus(&key);
            debug!(id, ?key, restored, "focus restored");
        }

        debug!(id, instances = self.registry.len(), "rerendered");
        Ok(true)
    }

    /// Re-tag a replaced root with the parent binding it carried. The binding
    /// is dropped when the new root no longer has the bind marker.
    fn carry_binding(&mut self, key: BindingKey, root: &H::Node) {
        if self.bindings.get(&key).is_none() {
            return;
        }
        if self.host.attribute(root, BIND_ATTR).is_none() {
            debug!(%key, "bind marker gone from re-rendered root");
            self.bindings.remove(&key);
            return;
        }
        self.host.set_attribute(root, BINDING_ATTR, &key.to_string());
        self.host.add_listener(root, INPUT_EVENT, Listener::Binding(key));
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::dom::Document;
    use crate::engine::ComponentDescriptor;
    use crate::pipeline::{Host, Runtime};
    use crate::types::{BINDING_ATTR, BindingKey, Props, Value};

    fn counter_runtime() -> Runtime<Document> {
        let mut runtime = Runtime::new(Document::with_mount_point());
        let label = runtime.declare(ComponentDescriptor::new("label", |props, _| {
            Ok(format!("<span>{}</span>", props.get("text")))
        }));
        let counter = runtime.declare(ComponentDescriptor::new("counter", move |props, scope| {
            let text = label.of(scope, Props::new().with("text", "count"))?;
            Ok(format!(
                r#"<div>{text}<b>{}</b><input data-spark-bind="note"></div>"#,
                props.get("count")
            ))
        }));
        runtime
            .mount(&counter, Props::new().with("count", 0).with("note", ""))
            .unwrap();
        runtime
    }

    #[test]
    fn test_rerender_updates_markup_and_keeps_ids() {
        let mut runtime = counter_runtime();
        runtime.registry_mut().props_mut(0).unwrap().set("count", 5);

        assert!(runtime.rerender(0).unwrap());

        let html = runtime.host().html();
        assert!(html.contains("<b>5</b>"), "{html}");
        assert!(html.contains(r#"<span data-spark-id="1">count</span>"#), "{html}");
        assert_eq!(runtime.registry().len(), 2);
        assert_eq!(runtime.registry().next_id(), 2);
    }

    #[test]
    fn test_rerender_keeps_child_props() {
        let mut runtime = counter_runtime();
        runtime.registry_mut().props_mut(1).unwrap().set("text", "edited");

        runtime.rerender(0).unwrap();

        assert!(runtime.host().html().contains(">edited</span>"));
    }

    #[test]
    fn test_rerender_restores_focus_on_bound_input() {
        let mut runtime = counter_runtime();
        let input = runtime.host().binding_element(&BindingKey::new(0, 0)).unwrap();
        assert!(runtime.host_mut().focus(&input));

        runtime.registry_mut().props_mut(0).unwrap().set("count", Value::from(1));
        runtime.rerender(0).unwrap();

        let focused = runtime.host().focused().unwrap();
        assert_ne!(focused, input);
        assert_eq!(
            runtime.host().binding_element(&BindingKey::new(0, 0)),
            Some(focused)
        );
    }

    #[test]
    fn test_rerender_child_keeps_parent_binding_on_root() {
        let mut runtime = Runtime::new(Document::with_mount_point());
        let field = runtime.declare(ComponentDescriptor::new("field", |props, _| {
            Ok(format!(r#"<input data-spark-bind="name" placeholder="{}">"#, props.get("hint")))
        }));
        let form = runtime.declare(ComponentDescriptor::new("form", move |_, scope| {
            let nested = field.of(scope, Props::new().with("hint", "name"))?;
            Ok(format!("<form>{nested}</form>"))
        }));
        runtime.mount(&form, Props::new().with("name", "")).unwrap();
        let before = runtime.host().instance_root(1).unwrap();

        runtime.registry_mut().props_mut(1).unwrap().set("hint", "who");
        assert!(runtime.rerender(1).unwrap());

        let input = runtime.host().instance_root(1).unwrap();
        assert_ne!(input, before);
        assert!(runtime.host().html().contains(r#"placeholder="who""#));
        assert_eq!(runtime.host().attribute(&input, BINDING_ATTR), Some("0:0".into()));
        assert_eq!(runtime.bindings().len(), 1);

        runtime.input(&input, "ada");
        assert_eq!(runtime.registry().props(0).unwrap().get("name"), &Value::from("ada"));
    }

    #[test]
    fn test_rerender_skips_missing_root() {
        let mut runtime = counter_runtime();
        assert!(!runtime.rerender(42).unwrap());
    }
}
