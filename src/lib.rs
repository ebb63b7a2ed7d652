//! # spark-markup
//!
//! Markup components with polling change detection and subtree reconciliation.
//!
//! A component is a render function from props to a single-root markup
//! fragment, plus optional handlers. Instances get stable numeric ids that are
//! stamped on their root element. Props are plain data: a scheduler polls
//! every instance for changed props and re-renders the smallest subtree that
//! covers the change, wiring native events and two-way input bindings again
//! and keeping focus where it was.
//!
//! ## Architecture
//!
//! ```text
//! declare → Component ─► Registry (ids, props, snapshots, child lists)
//!                            │ render (memo, one-root check, id stamp)
//!                            ▼
//! Runtime ─► Host (Document) ◄─ wiring (listeners, bindings)
//!    └─ tick: diff → propChange → rerender → sync bindings
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Values, props, reserved attribute names, binding keys
//! - [`engine`] - Component declarations, instance registry, renderer
//! - [`markup`] - Fragment parser, root check, id stamping
//! - [`pipeline`] - Host trait, runtime, wiring, reconciliation, scheduler
//! - [`state`] - Custom events, bindings, focus keys
//! - [`dom`] - In-memory document host
//!
//! ## Example
//!
//! ```ignore
//! use spark_markup::{ComponentDescriptor, Document, PropDecl, Props, Runtime};
//!
//! let mut runtime = Runtime::new(Document::with_mount_point());
//! let counter = runtime.declare(
//!     ComponentDescriptor::new("counter", |props, _| {
//!         Ok(format!("<button>{}</button>", props.get("count")))
//!     })
//!     .prop("count", PropDecl::with_default(0))
//!     .on("click", |props, _, _| {
//!         let n = props.get("count").as_f64().unwrap_or(0.0);
//!         props.set("count", n + 1.0);
//!     }),
//! );
//! runtime.mount(&counter, Props::new())?;
//! ```

pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod markup;
pub mod pipeline;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::Config;
pub use dom::{Document, NodeId};
pub use engine::{
    Component, ComponentDescriptor, HandlerKind, Instance, PropDecl, Registry, Scope,
};
pub use error::{Error, ErrorKind, HostError, Result};
pub use pipeline::{Host, PropChange, Runtime, TickReport, diff};
pub use state::{Binding, BindingTable, CustomEvent, Emitter, FocusKey, Listener};
