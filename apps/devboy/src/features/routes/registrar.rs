use std::path::Path;

use devboy_types::{Method, Registry, RouteEntry, DEFAULT_FUNCTION};
use tracing::{info, warn};

use super::resolver::{self, FunctionSelection};
use super::scaffold::{self, HandlerScaffold, Scaffolded};
use super::uniqueness;
use super::RouteError;
use crate::features::registry::RegistryStore;

/// One user-confirmed route to add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoute {
    pub path: String,
    pub method: Method,
    pub function: FunctionSelection,
}

#[derive(Debug, Clone)]
pub struct AddedRoute {
    /// Registry after the route was appended and persisted.
    pub registry: Registry,
    pub function: String,
    pub route: RouteEntry,
    pub created_function: bool,
    pub scaffolded: Scaffolded,
}

/// Drives a single route creation against the store and the project tree.
#[derive(Debug, Clone)]
pub struct Registrar {
    store: RegistryStore,
    scaffold: HandlerScaffold,
}

impl Registrar {
    pub fn new(store: RegistryStore, project_dir: impl AsRef<Path>) -> Self {
        Self {
            store,
            scaffold: HandlerScaffold::new(project_dir.as_ref()),
        }
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Adds one route and persists the result.
    ///
    /// `registry` is never modified: every change is applied to a copy which
    /// is only returned once the store has written it. On any error the
    /// caller still holds the last committed registry; after a persistence
    /// error it should reload from the store before trying again.
    pub fn add_route(&self, registry: &Registry, req: &NewRoute) -> Result<AddedRoute, RouteError> {
        validate_path(&req.path)?;

        if uniqueness::is_duplicate(registry, &req.path, req.method) {
            return Err(RouteError::DuplicateRoute {
                path: req.path.clone(),
                method: req.method,
            });
        }

        let mut next = registry.clone();
        let function = resolver::resolve(&mut next, &req.function)?;
        let created_function = !registry.contains(&function);

        let handler_path = scaffold::synthesize(&req.path, req.method);
        let scaffolded = self.scaffold.scaffold(&handler_path, &req.path)?;

        let route = RouteEntry {
            path: req.path.clone(),
            method: req.method,
            handler_path,
        };
        next.get_mut(&function)
            .ok_or_else(|| RouteError::InvalidFunctionName(format!("function '{function}' does not exist")))?
            .routes
            .push(route.clone());

        self.store.save(&next)?;

        info!(
            path = %route.path,
            method = %route.method,
            handler = %route.handler_path,
            function = %function,
            "route created"
        );
        if needs_entry_point_reminder(&function) {
            warn!(
                "don't forget to create {function}.js in your project root as the entry point for the {function} function"
            );
        }

        Ok(AddedRoute {
            registry: next,
            function,
            route,
            created_function,
            scaffolded,
        })
    }
}

/// Every function other than the default one needs its own `<name>.js`
/// entry point in the project root.
fn needs_entry_point_reminder(function: &str) -> bool {
    function != DEFAULT_FUNCTION
}

/// Rejects paths that are empty, lack a leading '/', or contain segments that
/// would make two distinct routes share one handler file on disk (empty
/// segments, `.`) or escape the handler tree (`..`). The bare root `/` is
/// allowed.
pub fn validate_path(path: &str) -> Result<(), RouteError> {
    if path.trim().is_empty() {
        return Err(RouteError::Validation("route path cannot be empty".into()));
    }
    if !path.starts_with('/') {
        return Err(RouteError::Validation(format!(
            "route path must start with a \"/\", got '{path}'"
        )));
    }
    if path == "/" {
        return Ok(());
    }
    for segment in path[1..].split('/') {
        match segment {
            "" => {
                return Err(RouteError::Validation(format!(
                    "route path cannot contain empty segments or a trailing '/', got '{path}'"
                )))
            }
            "." | ".." => {
                return Err(RouteError::Validation(format!(
                    "route path cannot contain '{segment}' segments, got '{path}'"
                )))
            }
            _ => {}
        }
    }
    Ok(())
}
