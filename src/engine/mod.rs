//! Component Engine - declarations, instance registry and renderer.
//!
//! The engine owns everything that does not touch a live document:
//! - Component: descriptor, prop schema, handler kinds, memo cache
//! - Registry: instance table, id allocator, parent context stack
//! - Render: instantiation, one-root validation, memoization, id stamping
//!
//! # Identity
//!
//! ```text
//! section.of()            → id 0
//!   title.of()            → id 1
//!   paragraph.of() × 2    → id 2, id 3
//! rerender(0)             → allocator reset to 1, children get 1, 2, 3 again
//! ```

mod component;
mod registry;
mod render;

pub use component::*;
pub use registry::*;
pub use render::*;
