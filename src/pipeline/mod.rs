//! Pipeline - everything between the registry and a live document.
//!
//! ```text
//! mount ─► instantiate ─► host.mount ─► attach tree
//!   tick ─► diff snapshots ─► propChange ─► rerender (one instance | root)
//!        ─► sync bindings
//! dispatch ─► bubble through host ─► native handler | binding copy ─► emit
//! ```
//!
//! - [`Host`] - the capability set a document provides
//! - [`Runtime`] - owns registry, host, bindings and the scheduler state

mod detect;
mod dispatch;
mod host;
mod mount;
mod reconcile;
mod wiring;

pub use detect::{PropChange, TickReport, diff};
pub use host::Host;
pub use mount::Runtime;
