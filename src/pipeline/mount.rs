//! Mount API - runtime lifecycle and the polling loop.
//!
//! The [`Runtime`] is the context object: it owns the instance registry, the
//! host document, the binding table and the scheduler state. Nothing here is
//! global, so several runtimes can coexist (one per test, for instance).
//!
//! # Example
//!
//! ```ignore
//! use spark_markup::{ComponentDescriptor, Document, Props, Runtime};
//!
//! let mut runtime = Runtime::new(Document::with_mount_point());
//! let hello = runtime.declare(ComponentDescriptor::new("hello", |props, _| {
//!     Ok(format!("<h1>Hello {}</h1>", props.get("name")))
//! }));
//! runtime.mount(&hello, Props::new().with("name", "world"))?;
//!
//! // Option 1: block, ticking every 10ms until stop() or the callback says no
//! runtime.run(|rt| rt.registry().len() < 100)?;
//!
//! // Option 2: tick manually from your own loop
//! while runtime.is_running() {
//!     runtime.tick()?;
//! }
//! ```

use std::thread;
use std::time::Instant;

use tracing::{debug, info, trace};

use crate::config::Config;
use crate::engine::{Component, ComponentDescriptor, Registry};
use crate::error::Result;
use crate::state::BindingTable;
use crate::types::{InstanceId, Props};

use super::host::Host;

// =============================================================================
// Runtime
// =============================================================================

/// Registry, host document and scheduler state for one application.
pub struct Runtime<H: Host> {
    pub(crate) registry: Registry,
    pub(crate) host: H,
    pub(crate) bindings: BindingTable,
    config: Config,
    pub(crate) root: Option<InstanceId>,
    running: bool,
}

impl<H: Host> Runtime<H> {
    pub fn new(host: H) -> Self {
        Self::with_config(host, Config::default())
    }

    pub fn with_config(host: H, config: Config) -> Self {
        Self {
            registry: Registry::new(),
            host,
            bindings: BindingTable::new(),
            config,
            root: None,
            running: false,
        }
    }

    /// Declare a component in this runtime's registry.
    pub fn declare(&mut self, descriptor: ComponentDescriptor) -> Component {
        self.registry.declare(descriptor)
    }

    /// Instantiate outside of any render and return the stamped markup.
    pub fn instantiate(&mut self, component: &Component, props: Props) -> Result<String> {
        self.registry.instantiate(component, props)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable registry access. Prop writes made here are picked up by the
    /// next [`tick`](Self::tick).
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Id of the mounted root instance.
    pub fn root(&self) -> Option<InstanceId> {
        self.root
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop the scheduler. [`run`](Self::run) returns after the current tick.
    pub fn stop(&mut self) {
        if self.running {
            debug!("runtime stopped");
        }
        self.running = false;
    }

    // -------------------------------------------------------------------------
    // Mount
    // -------------------------------------------------------------------------

    /// Render `component` into the document's mount point and start scheduling.
    ///
    /// Fails with [`HostError::MountPointMissing`](crate::error::HostError)
    /// when the document has no mount point.
    pub fn mount(&mut self, component: &Component, props: Props) -> Result<InstanceId> {
        let (id, markup) = self.registry.instantiate_with_id(component, props)?;
        self.host.mount(&markup)?;
        self.attach_tree(id);

        self.root = Some(id);
        self.running = true;
        info!(
            component = component.name(),
            id,
            instances = self.registry.len(),
            bindings = self.bindings.len(),
            "mounted"
        );
        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Event Loop
    // -------------------------------------------------------------------------

    /// Tick at the configured period until [`stop`](Self::stop) is called or
    /// `keep_going` returns false.
    ///
    /// `keep_going` runs before every tick, so it can drive input. A tick that
    /// overruns its slot pushes the schedule forward instead of queueing
    /// catch-up ticks.
    pub fn run<F>(&mut self, mut keep_going: F) -> Result<()>
    where
        F: FnMut(&mut Self) -> bool,
    {
        let period = self.config.tick_interval;
        let mut next = Instant::now();

        while self.running && keep_going(self) {
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            }

            self.tick()?;

            next += period;
            let now = Instant::now();
            if next < now {
                trace!(behind = ?(now - next), "tick overran, skipping");
                next = now;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dom::Document;
    use crate::error::{ErrorKind, HostError};
    use crate::types::MOUNT_ATTR;

    fn greeting(runtime: &mut Runtime<Document>) -> Component {
        runtime.declare(ComponentDescriptor::new("greeting", |props, _| {
            Ok(format!("<p>Hi {}</p>", props.get("name")))
        }))
    }

    #[test]
    fn test_mount_replaces_mount_point() {
        let mut runtime = Runtime::new(Document::parse(&format!(
            "<body><div {MOUNT_ATTR}></div></body>"
        )));
        let greeting = greeting(&mut runtime);

        let id = runtime.mount(&greeting, Props::new().with("name", "Ada")).unwrap();

        assert_eq!(id, 0);
        assert_eq!(runtime.root(), Some(0));
        assert!(runtime.is_running());
        assert_eq!(
            runtime.host().html(),
            r#"<body><p data-spark-id="0">Hi Ada</p></body>"#
        );
    }

    #[test]
    fn test_mount_without_mount_point() {
        let mut runtime = Runtime::new(Document::parse("<body></body>"));
        let greeting = greeting(&mut runtime);

        let err = runtime.mount(&greeting, Props::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Host);
        assert!(matches!(
            err,
            crate::error::Error::Host(HostError::MountPointMissing(_))
        ));
        assert!(!runtime.is_running());
    }

    #[test]
    fn test_run_stops_when_callback_declines() {
        let config = Config::default().tick_interval(Duration::from_millis(1));
        let mut runtime = Runtime::with_config(Document::with_mount_point(), config);
        let greeting = greeting(&mut runtime);
        runtime.mount(&greeting, Props::new()).unwrap();

        let mut ticks = 0;
        runtime
            .run(|_| {
                ticks += 1;
                ticks <= 3
            })
            .unwrap();

        assert_eq!(ticks, 4);
        assert!(runtime.is_running());
    }

    #[test]
    fn test_run_stops_on_stop() {
        let config = Config::default().tick_interval(Duration::from_millis(1));
        let mut runtime = Runtime::with_config(Document::with_mount_point(), config);
        let greeting = greeting(&mut runtime);
        runtime.mount(&greeting, Props::new()).unwrap();

        runtime
            .run(|rt| {
                rt.stop();
                true
            })
            .unwrap();

        assert!(!runtime.is_running());
    }
}
