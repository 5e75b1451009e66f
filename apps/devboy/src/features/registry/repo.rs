use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use devboy_types::{Method, Registry};
use thiserror::Error;

/// Loads and persists the registry document.
///
/// Every save rewrites the whole document through a temp file and a rename,
/// so a reader sees either the previous document or the new one.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the persisted registry, or a fresh one holding only the
    /// default function when no document exists yet.
    pub fn load(&self) -> Result<Registry, RegistryError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Registry::new()),
            Err(source) => {
                return Err(RegistryError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let registry: Registry =
            serde_json::from_slice(&bytes).map_err(|source| RegistryError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        if let Some((name, _)) = registry.functions().find(|(name, _)| name.trim().is_empty()) {
            return Err(RegistryError::InvalidFunctionName {
                path: self.path.clone(),
                name: name.to_string(),
            });
        }

        if let Some((path, method)) = first_duplicate(&registry) {
            return Err(RegistryError::Integrity {
                path: self.path.clone(),
                route: path,
                method,
            });
        }

        Ok(registry)
    }

    pub fn save(&self, registry: &Registry) -> Result<(), RegistryError> {
        let persistence = |source: io::Error| RegistryError::Persistence {
            path: self.path.clone(),
            source,
        };

        let mut bytes = serde_json::to_vec_pretty(registry).map_err(|e| persistence(e.into()))?;
        bytes.push(b'\n');
        write_atomic(&self.path, &bytes).map_err(persistence)?;
        tracing::debug!(path = %self.path.display(), "registry saved");
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("registry '{}' is not a valid document: {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("registry '{}' registers {method} {route} more than once", path.display())]
    Integrity {
        path: PathBuf,
        route: String,
        method: Method,
    },
    #[error("registry '{}' has an invalid function name {name:?}", path.display())]
    InvalidFunctionName { path: PathBuf, name: String },
    #[error("failed to write registry '{}': {source}", path.display())]
    Persistence { path: PathBuf, source: io::Error },
}

fn first_duplicate(registry: &Registry) -> Option<(String, Method)> {
    let mut seen = HashSet::new();
    registry
        .routes()
        .map(|(_, route)| (route.path.as_str(), route.method))
        .find(|key| !seen.insert(*key))
        .map(|(path, method)| (path.to_string(), method))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}
