//! Dispatch - native events from the host and the custom event bus.
//!
//! Native events bubble: the target node first, then each ancestor. Every
//! listener registered on a visited node for the event name runs.
//!
//! Custom events go to every instance whose component declares a handler
//! for the name, in id order. Handlers get an [`Emitter`]; what they emit is
//! queued behind the event being delivered.

use tracing::trace;

use crate::state::{Emitter, Listener};
use crate::types::{INPUT_EVENT, Value};

use super::host::Host;
use super::mount::Runtime;

impl<H: Host> Runtime<H> {
    // -------------------------------------------------------------------------
    // Custom Events
    // -------------------------------------------------------------------------

    /// Broadcast a custom event. Instances without a handler for `name` are
    /// skipped.
    pub fn emit(&mut self, name: &str, payload: impl Into<Value>) {
        let mut outbox = Emitter::new();
        outbox.emit(name, payload);
        self.deliver(outbox);
    }

    /// Deliver queued events until the outbox is drained.
    pub(crate) fn deliver(&mut self, mut outbox: Emitter) {
        while let Some(event) = outbox.pop() {
            let mut handled = 0;
            for instance in self.registry.iter_mut() {
                let Some(handler) = instance.component().custom_handler(&event.name) else {
                    continue;
                };
                let mut raised = Emitter::new();
                handler(instance.props_mut(), &event.payload, &mut raised);
                outbox.absorb(raised);
                handled += 1;
            }
            trace!(event = %event.name, handled, "custom event delivered");
        }
    }

    // -------------------------------------------------------------------------
    // Native Events
    // -------------------------------------------------------------------------

    /// Fire `event` at `node` and bubble it through the ancestors.
    ///
    /// Returns how many listeners ran. Prop writes made by handlers are seen
    /// by the next [`tick`](Self::tick).
    pub fn dispatch(&mut self, node: &H::Node, event: &str, payload: impl Into<Value>) -> usize {
        let payload = payload.into();
        let mut outbox = Emitter::new();
        let mut ran = 0;

        for target in self.host.event_path(node) {
            for listener in self.host.listeners(&target, event) {
                match listener {
                    Listener::Native { instance, event } => {
                        let Some(record) = self.registry.get_mut(instance) else {
                            continue;
                        };
                        let Some(handler) = record.component().native_handler(&event) else {
                            continue;
                        };
                        handler(record.props_mut(), &payload, &mut outbox);
                    }
                    Listener::Binding(key) => {
                        let Some(binding) = self.bindings.get(&key) else {
                            continue;
                        };
                        let text = self.host.value(&target);
                        if let Some(props) = self.registry.props_mut(binding.instance) {
                            trace!(%key, prop = %binding.prop, "binding updated");
                            props.set(binding.prop.clone(), text);
                        }
                    }
                }
                ran += 1;
            }
        }

        self.deliver(outbox);
        ran
    }

    /// Type into a form element: set its value, then fire `input` at it.
    pub fn input(&mut self, node: &H::Node, text: &str) -> usize {
        self.host.set_value(node, text);
        self.dispatch(node, INPUT_EVENT, text)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::dom::Document;
    use crate::engine::ComponentDescriptor;
    use crate::pipeline::{Host, Runtime};
    use crate::types::{BindingKey, Props, Value};

    #[test]
    fn test_emit_reaches_every_handler_in_id_order() {
        let mut runtime = Runtime::new(Document::with_mount_point());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = seen.clone();
        let listener = runtime.declare(
            ComponentDescriptor::new("listener", |_, _| Ok("<i></i>".into())).on(
                "@ping",
                move |props, payload, _| {
                    log.borrow_mut().push((props.get("tag").to_string(), payload.clone()));
                },
            ),
        );
        let deaf = runtime.declare(ComponentDescriptor::new("deaf", |_, _| Ok("<i></i>".into())));

        runtime.instantiate(&listener, Props::new().with("tag", "a")).unwrap();
        runtime.instantiate(&deaf, Props::new()).unwrap();
        runtime.instantiate(&listener, Props::new().with("tag", "b")).unwrap();

        runtime.emit("ping", 7);
        runtime.emit("nobody-listens", Value::Undefined);

        assert_eq!(
            *seen.borrow(),
            vec![("a".to_string(), Value::from(7)), ("b".to_string(), Value::from(7))]
        );
    }

    #[test]
    fn test_handler_emits_are_queued() {
        let mut runtime = Runtime::new(Document::with_mount_point());
        let relay = runtime.declare(
            ComponentDescriptor::new("relay", |_, _| Ok("<i></i>".into()))
                .on("@first", |props, _, emitter| {
                    props.set("order", "first");
                    emitter.emit("second", Value::Undefined);
                })
                .on("@second", |props, _, _| {
                    let order = format!("{},second", props.get("order"));
                    props.set("order", order);
                }),
        );
        runtime.instantiate(&relay, Props::new()).unwrap();

        runtime.emit("first", Value::Undefined);

        assert_eq!(runtime.registry().props(0).unwrap().get("order"), &Value::from("first,second"));
    }

    #[test]
    fn test_dispatch_bubbles_to_instance_root() {
        let mut runtime = Runtime::new(Document::with_mount_point());
        let button = runtime.declare(
            ComponentDescriptor::new("button", |props, _| {
                Ok(format!("<button><span>{}</span></button>", props.get("clicks")))
            })
            .on("click", |props, _, _| {
                let clicks = props.get("clicks").as_f64().unwrap_or(0.0);
                props.set("clicks", clicks + 1.0);
            }),
        );
        runtime.mount(&button, Props::new().with("clicks", 0)).unwrap();

        let span = runtime.host().elements_by_tag("span")[0];
        assert_eq!(runtime.dispatch(&span, "click", Value::Undefined), 1);
        assert_eq!(runtime.dispatch(&span, "mouseenter", Value::Undefined), 0);

        assert_eq!(runtime.registry().props(0).unwrap().get("clicks"), &Value::from(1));
    }

    #[test]
    fn test_input_updates_bound_prop() {
        let mut runtime = Runtime::new(Document::with_mount_point());
        let search = runtime.declare(ComponentDescriptor::new("search", |_, _| {
            Ok(r#"<div><input data-spark-bind="query"></div>"#.into())
        }));
        runtime.mount(&search, Props::new().with("query", "")).unwrap();

        let input = runtime.host().binding_element(&BindingKey::new(0, 0)).unwrap();
        runtime.input(&input, "rust");

        assert_eq!(runtime.registry().props(0).unwrap().get("query"), &Value::from("rust"));
    }
}
