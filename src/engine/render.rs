//! Renderer - instantiation, memoization and identity stamping.
//!
//! ```text
//! of(props) → allocate id → validate props (new ids only) → render
//! render    → memo lookup | render fn → one-root check → memo store
//!           → stamp instance id on root tag (never cached)
//! ```
//!
//! Nested instantiation happens inside the parent's render function through
//! [`Scope`], so child ids are allocated after the parent's and before the
//! parent call returns.

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::markup;
use crate::types::{INSTANCE_ATTR, InstanceId, Props};

use super::component::Component;
use super::registry::{Instance, Registry};

// =============================================================================
// Scope
// =============================================================================

/// Handle passed to render functions for instantiating child components.
pub struct Scope<'a> {
    registry: &'a mut Registry,
}

impl Scope<'_> {
    /// Instantiate `component` as a child of the instance being rendered.
    pub fn of(&mut self, component: &Component, props: Props) -> Result<String> {
        self.registry.instantiate(component, props)
    }

    /// Instance whose render function is running.
    pub fn current(&self) -> Option<InstanceId> {
        self.registry.current_parent()
    }
}

// =============================================================================
// Instantiation
// =============================================================================

impl Registry {
    /// Instantiate `component` with `props` and return its stamped markup.
    ///
    /// When the next id is already taken, the existing instance is rendered
    /// with its own current props and `props` is ignored.
    pub fn instantiate(&mut self, component: &Component, props: Props) -> Result<String> {
        self.instantiate_with_id(component, props)
            .map(|(_, markup)| markup)
    }

    pub(crate) fn instantiate_with_id(
        &mut self,
        component: &Component,
        props: Props,
    ) -> Result<(InstanceId, String)> {
        let id = self.allocate_id();

        if !self.contains(id) {
            let props = component.resolve_props(props)?;
            debug!(component = component.name(), id, "instance created");
            self.insert(Instance::new(id, component.clone(), props));
        }

        if let Some(parent) = self.current_parent().and_then(|parent| self.get_mut(parent)) {
            parent.push_child(id);
        }

        let markup = self.render(id)?;
        Ok((id, markup))
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Render instance `id` with its current props.
    pub fn render(&mut self, id: InstanceId) -> Result<String> {
        let Some(instance) = self.get(id) else {
            warn!(id, "render requested for unknown instance");
            return Ok(String::new());
        };
        let component = instance.component().clone();
        let props = instance.props().clone();

        let markup = match component.memo() {
            Some(memo) => {
                let key = memo.key_for(&props);
                match memo.get(&key) {
                    Some(cached) => {
                        trace!(component = component.name(), id, key = %key, "memo hit");
                        cached
                    }
                    None => {
                        let fresh = self.render_fresh(id, &component, &props)?;
                        memo.insert(key, fresh.clone());
                        fresh
                    }
                }
            }
            None => self.render_fresh(id, &component, &props)?,
        };

        Ok(markup::stamp_root(&markup, INSTANCE_ATTR, id))
    }

    /// Run the render function and check the one-root rule.
    fn render_fresh(&mut self, id: InstanceId, component: &Component, props: &Props) -> Result<String> {
        if let Some(instance) = self.get_mut(id) {
            instance.clear_children();
        }

        self.push_parent(id);
        let render = component.render_fn().clone();
        let result = render(props, &mut Scope { registry: &mut *self });
        self.pop_parent();
        let markup = result?;

        if !markup::has_single_root(&markup) {
            return Err(Error::RenderMustHaveOneRoot {
                component: component.name().to_string(),
            });
        }
        Ok(markup)
    }
}

// =============================================================================
// Tests
// =============================================================================
