//! DOM - a headless document host.
//!
//! [`Document`] implements [`Host`](crate::pipeline::Host) over an in-memory
//! node tree built from markup. It is what tests, demos and server-side
//! consumers run against.

mod document;

pub use document::{Document, NodeId};
