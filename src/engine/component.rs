//! Component descriptors and declared component handles.
//!
//! A component is a pure descriptor: name, prop schema, render function,
//! handlers and an optional memo key. Declaring it classifies every handler
//! once into a [`HandlerKind`] and attaches an empty memo cache when a memo
//! key is present. After that the component is immutable, except for the
//! cache.
//!
//! # Example
//!
//! ```ignore
//! use spark_markup::{ComponentDescriptor, PropDecl, Props, Registry};
//!
//! let mut registry = Registry::new();
//! let title = registry.declare(
//!     ComponentDescriptor::new("title", |props, _| Ok(format!("<h1>{}</h1>", props.get("text"))))
//!         .prop("text", PropDecl::with_default("(Untitled)")),
//! );
//!
//! let markup = title.instantiate(&mut registry, Props::new())?;
//! assert_eq!(markup, r#"<h1 data-spark-id="0">(Untitled)</h1>"#);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::warn;

use crate::error::{Error, Result};
use crate::state::Emitter;
use crate::types::{CUSTOM_EVENT_PREFIX, PROP_CHANGE_KEY, Props, Value};

use super::registry::Registry;
use super::render::Scope;

// =============================================================================
// Callback Types
// =============================================================================

/// Render function: props in, markup out. Nested components are instantiated
/// through the [`Scope`].
pub type RenderFn = Rc<dyn Fn(&Props, &mut Scope<'_>) -> Result<String>>;

/// Native or custom event handler: `(props, payload, emitter)`.
///
/// Handlers may mutate props. That is the only sanctioned mutation channel.
pub type EventHandler = Rc<dyn Fn(&mut Props, &Value, &mut Emitter)>;

/// Prop change callback: `(prop name, new value, old value, emitter)`.
pub type PropChangeHandler = Rc<dyn Fn(&str, &Value, &Value, &mut Emitter)>;

/// Memo key function: derives the cache key from props.
pub type MemoKeyFn = Rc<dyn Fn(&Props) -> String>;

// =============================================================================
// Prop Declarations
// =============================================================================

/// Declaration of one prop in a component's schema.
///
/// Exactly one of `required: true` or a default must be present. Both fields
/// are kept optional so a bad declaration can be reported instead of being
/// unrepresentable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropDecl {
    pub required: Option<bool>,
    pub default: Option<Value>,
}

impl PropDecl {
    /// `{ required: true }`
    pub fn required() -> Self {
        Self {
            required: Some(true),
            default: None,
        }
    }

    /// `{ default: value }`
    pub fn with_default(value: impl Into<Value>) -> Self {
        Self {
            required: None,
            default: Some(value.into()),
        }
    }

    fn is_required(&self) -> bool {
        self.required == Some(true)
    }

    /// Check the declaration shape.
    fn check(&self, component: &str, prop: &str) -> Result<()> {
        if self.default.is_none() && self.required.is_none() {
            return Err(Error::PropMisdefined {
                component: component.to_string(),
                prop: prop.to_string(),
            });
        }
        if self.default.is_some() && self.is_required() {
            return Err(Error::PropBothDefaultAndRequired {
                component: component.to_string(),
                prop: prop.to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Handler Kinds
// =============================================================================

/// What a handler key means, decided once at declaration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// Bound as a native listener on the instance root.
    NativeEvent(String),
    /// Called by the change detector for every changed prop.
    PropChange,
    /// Called by [`emit`](crate::Runtime::emit) for the matching event name.
    CustomEvent(String),
}

impl HandlerKind {
    /// Classify a handler key: `propChange`, `@name` or a native event name.
    pub fn classify(key: &str) -> Self {
        if key == PROP_CHANGE_KEY {
            HandlerKind::PropChange
        } else if let Some(name) = key.strip_prefix(CUSTOM_EVENT_PREFIX) {
            HandlerKind::CustomEvent(name.to_string())
        } else {
            HandlerKind::NativeEvent(key.to_string())
        }
    }

    pub fn is_reserved(&self) -> bool {
        !matches!(self, HandlerKind::NativeEvent(_))
    }
}

// =============================================================================
// Descriptor
// =============================================================================

/// Everything needed to declare a component.
pub struct ComponentDescriptor {
    name: String,
    schema: IndexMap<String, PropDecl>,
    render: RenderFn,
    native: IndexMap<String, EventHandler>,
    custom: IndexMap<String, EventHandler>,
    prop_change: Option<PropChangeHandler>,
    memo_key: Option<MemoKeyFn>,
}

impl ComponentDescriptor {
    pub fn new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&Props, &mut Scope<'_>) -> Result<String> + 'static,
    {
        Self {
            name: name.into(),
            schema: IndexMap::new(),
            render: Rc::new(render),
            native: IndexMap::new(),
            custom: IndexMap::new(),
            prop_change: None,
            memo_key: None,
        }
    }

    /// Declare a prop.
    pub fn prop(mut self, name: impl Into<String>, decl: PropDecl) -> Self {
        self.schema.insert(name.into(), decl);
        self
    }

    /// Register a handler under `key`.
    ///
    /// Keys starting with `@` handle custom events; any other key except
    /// `propChange` is a native event name. Use [`on_prop_change`](Self::on_prop_change)
    /// for prop change callbacks.
    pub fn on<F>(mut self, key: &str, handler: F) -> Self
    where
        F: Fn(&mut Props, &Value, &mut Emitter) + 'static,
    {
        match HandlerKind::classify(key) {
            HandlerKind::NativeEvent(event) => {
                self.native.insert(event, Rc::new(handler));
            }
            HandlerKind::CustomEvent(name) => {
                self.custom.insert(name, Rc::new(handler));
            }
            HandlerKind::PropChange => {
                warn!(component = %self.name, "'{}' is reserved; use on_prop_change", PROP_CHANGE_KEY);
            }
        }
        self
    }

    /// Register the prop change callback.
    pub fn on_prop_change<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &Value, &Value, &mut Emitter) + 'static,
    {
        self.prop_change = Some(Rc::new(handler));
        self
    }

    /// Memoize rendered markup under the key derived from props.
    pub fn memo_key<F>(mut self, key: F) -> Self
    where
        F: Fn(&Props) -> String + 'static,
    {
        self.memo_key = Some(Rc::new(key));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// =============================================================================
// Memo Cache
// =============================================================================

/// Per-component cache of validated, unstamped markup. Never evicted.
pub(crate) struct MemoCache {
    key: MemoKeyFn,
    entries: RefCell<HashMap<String, String>>,
}

impl MemoCache {
    fn new(key: MemoKeyFn) -> Self {
        Self {
            key,
            entries: RefCell::new(HashMap::new()),
        }
    }

    pub(crate) fn key_for(&self, props: &Props) -> String {
        (self.key)(props)
    }

    pub(crate) fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub(crate) fn insert(&self, key: String, markup: String) {
        self.entries.borrow_mut().insert(key, markup);
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

// =============================================================================
// Component
// =============================================================================

struct ComponentInner {
    name: String,
    schema: IndexMap<String, PropDecl>,
    render: RenderFn,
    native: IndexMap<String, EventHandler>,
    custom: IndexMap<String, EventHandler>,
    prop_change: Option<PropChangeHandler>,
    memo: Option<MemoCache>,
}

/// A declared component. Cheap to clone; clones share the memo cache.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

impl Component {
    pub(crate) fn from_descriptor(descriptor: ComponentDescriptor) -> Self {
        let ComponentDescriptor {
            name,
            schema,
            render,
            native,
            custom,
            prop_change,
            memo_key,
        } = descriptor;

        Self {
            inner: Rc::new(ComponentInner {
                name,
                schema,
                render,
                native,
                custom,
                prop_change,
                memo: memo_key.map(MemoCache::new),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn schema(&self) -> &IndexMap<String, PropDecl> {
        &self.inner.schema
    }

    /// Instantiate into `registry` and return the stamped markup.
    pub fn instantiate(&self, registry: &mut Registry, props: Props) -> Result<String> {
        registry.instantiate(self, props)
    }

    /// Instantiate from inside a parent's render function.
    pub fn of(&self, scope: &mut Scope<'_>, props: Props) -> Result<String> {
        scope.of(self, props)
    }

    /// Native event names bound on the instance root.
    pub fn native_events(&self) -> impl Iterator<Item = &str> {
        self.inner.native.keys().map(String::as_str)
    }

    pub fn native_handler(&self, event: &str) -> Option<EventHandler> {
        self.inner.native.get(event).cloned()
    }

    pub fn custom_handler(&self, name: &str) -> Option<EventHandler> {
        self.inner.custom.get(name).cloned()
    }

    pub fn prop_change_handler(&self) -> Option<PropChangeHandler> {
        self.inner.prop_change.clone()
    }

    /// Every handler kind this component declares.
    pub fn handler_kinds(&self) -> Vec<HandlerKind> {
        let mut kinds: Vec<HandlerKind> = self
            .inner
            .native
            .keys()
            .map(|event| HandlerKind::NativeEvent(event.clone()))
            .collect();
        if self.inner.prop_change.is_some() {
            kinds.push(HandlerKind::PropChange);
        }
        kinds.extend(
            self.inner
                .custom
                .keys()
                .map(|name| HandlerKind::CustomEvent(name.clone())),
        );
        kinds
    }

    pub fn is_memoized(&self) -> bool {
        self.inner.memo.is_some()
    }

    /// Number of cached markups, or 0 when not memoized.
    pub fn memo_len(&self) -> usize {
        self.inner.memo.as_ref().map_or(0, MemoCache::len)
    }

    pub(crate) fn memo(&self) -> Option<&MemoCache> {
        self.inner.memo.as_ref()
    }

    pub(crate) fn render_fn(&self) -> &RenderFn {
        &self.inner.render
    }

    /// Validate the schema and fill in defaults for omitted props.
    ///
    /// Defaults are shared, not copied.
    pub fn resolve_props(&self, mut props: Props) -> Result<Props> {
        for (prop, decl) in &self.inner.schema {
            decl.check(&self.inner.name, prop)?;
            if props.contains(prop) {
                continue;
            }
            if decl.is_required() {
                return Err(Error::PropRequired {
                    component: self.inner.name.clone(),
                    prop: prop.clone(),
                });
            }
            props.set(prop.clone(), decl.default.clone().unwrap_or_default());
        }
        Ok(props)
    }

    /// Whether two handles point at the same declaration.
    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.inner.name)
            .field("props", &self.inner.schema.keys().collect::<Vec<_>>())
            .field("memoized", &self.is_memoized())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
