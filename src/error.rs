//! Errors raised by instantiation, rendering and the host document.
//!
//! Every error aborts the instantiate or reconcile call in progress and is
//! surfaced directly to the caller. Nothing is retried.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Stable tag identifying an error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PropMisdefined,
    PropBothDefaultAndRequired,
    PropRequired,
    RenderMustHaveOneRoot,
    Host,
}

impl ErrorKind {
    /// Snake-case tag, stable across releases.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::PropMisdefined => "prop_misdefined",
            ErrorKind::PropBothDefaultAndRequired => "prop_both_default_required",
            ErrorKind::PropRequired => "prop_required",
            ErrorKind::RenderMustHaveOneRoot => "render_not_one_root",
            ErrorKind::Host => "host",
        }
    }
}

/// Errors surfaced by the component engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("The prop '{prop}' of the component '{component}' must be either '{{ required: true }}' or '{{ default: ... }}'.")]
    PropMisdefined { component: String, prop: String },

    #[error("The prop '{prop}' of the component '{component}' can't be both default and required.")]
    PropBothDefaultAndRequired { component: String, prop: String },

    #[error("The prop '{prop}' of the component '{component}' is required.")]
    PropRequired { component: String, prop: String },

    #[error("The component '{component}' must have one root element.")]
    RenderMustHaveOneRoot { component: String },

    #[error(transparent)]
    Host(#[from] HostError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PropMisdefined { .. } => ErrorKind::PropMisdefined,
            Error::PropBothDefaultAndRequired { .. } => ErrorKind::PropBothDefaultAndRequired,
            Error::PropRequired { .. } => ErrorKind::PropRequired,
            Error::RenderMustHaveOneRoot { .. } => ErrorKind::RenderMustHaveOneRoot,
            Error::Host(_) => ErrorKind::Host,
        }
    }

    /// Component named by the error, when there is one.
    pub fn component(&self) -> Option<&str> {
        match self {
            Error::PropMisdefined { component, .. }
            | Error::PropBothDefaultAndRequired { component, .. }
            | Error::PropRequired { component, .. }
            | Error::RenderMustHaveOneRoot { component } => Some(component),
            Error::Host(_) => None,
        }
    }

    /// Prop named by the error, when there is one.
    pub fn prop(&self) -> Option<&str> {
        match self {
            Error::PropMisdefined { prop, .. }
            | Error::PropBothDefaultAndRequired { prop, .. }
            | Error::PropRequired { prop, .. } => Some(prop),
            _ => None,
        }
    }
}

/// Errors raised by a [`Host`](crate::pipeline::Host) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("no element carries the mount attribute '{0}'")]
    MountPointMissing(&'static str),

    #[error("node is no longer attached to the document")]
    Detached,

    #[error("markup rejected: {0}")]
    Markup(String),
}
