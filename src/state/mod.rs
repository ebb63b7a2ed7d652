//! State Module - runtime state shared between wiring and reconciliation
//!
//! - **Events** - custom event outbox, listener records
//! - **Binding** - two-way binding table
//! - **Focus** - stable focus keys across subtree replacement

mod binding;
mod events;
pub mod focus;

pub use binding::*;
pub use events::*;
pub use focus::FocusKey;
