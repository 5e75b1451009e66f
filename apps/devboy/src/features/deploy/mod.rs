use std::fmt;
use std::path::Path;

use devboy_types::{Method, Registry};
use thiserror::Error;
use tracing::info;

/// A registered route whose handler file is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub function: String,
    pub path: String,
    pub method: Method,
    pub handler_path: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "handler not found for route: {} ({}) -> {}",
            self.path, self.method, self.handler_path
        )
    }
}

/// Checks every route's handler file under `project_dir`. Empty means the
/// registry is deployable. Recomputed on every call.
pub fn validate(registry: &Registry, project_dir: &Path) -> Vec<Violation> {
    registry
        .routes()
        .filter(|(_, route)| !project_dir.join(&route.handler_path).is_file())
        .map(|(function, route)| Violation {
            function: function.to_string(),
            path: route.path.clone(),
            method: route.method,
            handler_path: route.handler_path.clone(),
        })
        .collect()
}

/// Receives a registry that passed validation.
pub trait DeploymentBackend {
    fn deploy(&self, registry: &Registry) -> anyhow::Result<()>;
}

/// Logs the deployment plan per function without contacting any provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanBackend;

impl DeploymentBackend for PlanBackend {
    fn deploy(&self, registry: &Registry) -> anyhow::Result<()> {
        for (name, function) in registry.functions() {
            info!(function = %name, entry = %function.handler_path, "deploying function");
            for route in &function.routes {
                info!("  {} {} -> {}", route.method, route.path, route.handler_path);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("deployment blocked by {} missing handler(s)", .0.len())]
    Blocked(Vec<Violation>),
    #[error("deployment backend failed: {0:#}")]
    Backend(anyhow::Error),
}

/// Validates, then hands the registry to `backend` only if nothing is missing.
pub fn deploy(
    registry: &Registry,
    project_dir: &Path,
    backend: &dyn DeploymentBackend,
) -> Result<(), DeployError> {
    let violations = validate(registry, project_dir);
    if !violations.is_empty() {
        return Err(DeployError::Blocked(violations));
    }
    backend.deploy(registry).map_err(DeployError::Backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use devboy_types::{FunctionEntry, RouteEntry, DEFAULT_FUNCTION};
    use std::cell::Cell;

    #[derive(Default)]
    struct RecordingBackend {
        calls: Cell<usize>,
    }

    impl DeploymentBackend for RecordingBackend {
        fn deploy(&self, _registry: &Registry) -> anyhow::Result<()> {
            self.calls.set(self.calls.get() + 1);
            Ok(())
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.insert_function("jobs", FunctionEntry::new("jobs.js"));
        for (function, path, method) in [
            (DEFAULT_FUNCTION, "/a", Method::Get),
            ("jobs", "/b", Method::Post),
            ("jobs", "/c", Method::Delete),
        ] {
            registry.get_mut(function).unwrap().routes.push(RouteEntry {
                path: path.into(),
                method,
                handler_path: format!("api{path}/{}/index.js", method.as_lower()),
            });
        }
        registry
    }

    fn touch(root: &Path, rel: &str) {
        let full = root.join(rel);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, "module.exports = async () => ({});").unwrap();
    }

    #[test]
    fn reports_every_missing_handler() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "api/b/post/index.js");

        let violations = validate(&registry(), tmp.path());

        assert_eq!(
            violations,
            vec![
                Violation {
                    function: DEFAULT_FUNCTION.into(),
                    path: "/a".into(),
                    method: Method::Get,
                    handler_path: "api/a/get/index.js".into(),
                },
                Violation {
                    function: "jobs".into(),
                    path: "/c".into(),
                    method: Method::Delete,
                    handler_path: "api/c/delete/index.js".into(),
                },
            ]
        );
    }

    #[test]
    fn complete_registry_has_no_violations() {
        let tmp = tempfile::tempdir().unwrap();
        for rel in ["api/a/get/index.js", "api/b/post/index.js", "api/c/delete/index.js"] {
            touch(tmp.path(), rel);
        }
        assert!(validate(&registry(), tmp.path()).is_empty());
        assert!(validate(&Registry::new(), tmp.path()).is_empty());
    }

    #[test]
    fn validation_reflects_current_files() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(validate(&registry(), tmp.path()).len(), 3);
        touch(tmp.path(), "api/a/get/index.js");
        assert_eq!(validate(&registry(), tmp.path()).len(), 2);
    }

    #[test]
    fn violations_block_the_backend() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = RecordingBackend::default();

        match deploy(&registry(), tmp.path(), &backend) {
            Err(DeployError::Blocked(violations)) => assert_eq!(violations.len(), 3),
            other => panic!("expected blocked deployment, got {other:?}"),
        }
        assert_eq!(backend.calls.get(), 0);
    }

    #[test]
    fn valid_registry_reaches_the_backend() {
        let tmp = tempfile::tempdir().unwrap();
        for rel in ["api/a/get/index.js", "api/b/post/index.js", "api/c/delete/index.js"] {
            touch(tmp.path(), rel);
        }
        let backend = RecordingBackend::default();

        deploy(&registry(), tmp.path(), &backend).unwrap();
        assert_eq!(backend.calls.get(), 1);
        PlanBackend.deploy(&registry()).unwrap();
    }

    #[test]
    fn violation_message_names_route_and_handler() {
        let violation = Violation {
            function: DEFAULT_FUNCTION.into(),
            path: "/a".into(),
            method: Method::Get,
            handler_path: "api/a/get/index.js".into(),
        };
        assert_eq!(
            violation.to_string(),
            "handler not found for route: /a (GET) -> api/a/get/index.js"
        );
    }
}
