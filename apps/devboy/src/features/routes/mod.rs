//! Route creation: uniqueness checks, function resolution, handler
//! scaffolding and the registrar tying them to the registry store.

use std::path::PathBuf;

use devboy_types::Method;
use thiserror::Error;

use crate::features::registry::RegistryError;

pub mod registrar;
pub mod resolver;
pub mod scaffold;
pub mod session;
pub mod uniqueness;

pub use registrar::{NewRoute, Registrar};
pub use resolver::FunctionSelection;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route: {0}")]
    Validation(String),
    #[error("route {path} with method {method} already exists")]
    DuplicateRoute { path: String, method: Method },
    #[error("invalid function name: {0}")]
    InvalidFunctionName(String),
    #[error("failed to scaffold handler '{}': {source}", path.display())]
    Scaffold {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl RouteError {
    /// Errors the user can fix by entering different input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RouteError::Validation(_)
                | RouteError::DuplicateRoute { .. }
                | RouteError::InvalidFunctionName(_)
        )
    }
}
