use std::io::{self, Write};
use std::path::PathBuf;

use devboy_types::Method;

use super::RouteError;

pub const HANDLER_TEMPLATE: &str = r#"
module.exports = async (event, context) => {
  // Implementation for {{ROUTE}}
  return {
    statusCode: 200,
    body: JSON.stringify({ message: 'Hello from {{ROUTE}}!' })
  };
};
"#;

/// Handler file location for a route: `api/<path without leading '/'>/<method>/index.js`.
///
/// Pure function of its inputs, so equal (path, method) pairs always map to
/// the same file.
pub fn synthesize(path: &str, method: Method) -> String {
    let stripped = path.strip_prefix('/').unwrap_or(path);
    format!("api/{}/{}/index.js", stripped, method.as_lower())
}

pub fn render_stub(route_path: &str) -> String {
    let label = route_path
        .strip_prefix('/')
        .unwrap_or(route_path)
        .replace('\\', "\\\\")
        .replace('\'', "\\'");
    HANDLER_TEMPLATE.replace("{{ROUTE}}", &label)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaffolded {
    Created,
    AlreadyPresent,
}

/// Writes stub handlers under the project root.
#[derive(Debug, Clone)]
pub struct HandlerScaffold {
    root: PathBuf,
}

impl HandlerScaffold {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates parent directories and writes the stub, unless a file is
    /// already there. Existing handlers are never overwritten.
    pub fn scaffold(&self, handler_path: &str, route_path: &str) -> Result<Scaffolded, RouteError> {
        let full = self.root.join(handler_path);
        let scaffold_err = |source: io::Error| RouteError::Scaffold {
            path: full.clone(),
            source,
        };

        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(scaffold_err)?;
        }

        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
        {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Ok(Scaffolded::AlreadyPresent)
            }
            Err(err) => return Err(scaffold_err(err)),
        };
        file.write_all(render_stub(route_path).as_bytes())
            .map_err(scaffold_err)?;

        Ok(Scaffolded::Created)
    }
}
