use devboy_types::{FunctionEntry, Registry, DEFAULT_FUNCTION};

use super::RouteError;

/// Which function a new route attaches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionSelection {
    Default,
    Existing(String),
    New(String),
}

/// Resolves `selection` to a function name present in `registry`.
///
/// `New` inserts `{ handler: "<name>.js", routes: [] }` before returning; this
/// is the only place new top-level registry keys come from. On error the
/// registry is left as it was.
pub fn resolve(registry: &mut Registry, selection: &FunctionSelection) -> Result<String, RouteError> {
    match selection {
        FunctionSelection::Default => Ok(DEFAULT_FUNCTION.to_string()),
        FunctionSelection::Existing(name) => {
            if registry.contains(name) {
                Ok(name.clone())
            } else {
                Err(RouteError::InvalidFunctionName(format!(
                    "function '{name}' does not exist"
                )))
            }
        }
        FunctionSelection::New(raw) => {
            let name = raw.trim();
            if name.is_empty() {
                return Err(RouteError::InvalidFunctionName(
                    "function name cannot be empty".into(),
                ));
            }
            if !registry.insert_function(name, FunctionEntry::new(format!("{name}.js"))) {
                return Err(RouteError::InvalidFunctionName(format!(
                    "a function named '{name}' already exists"
                )));
            }
            Ok(name.to_string())
        }
    }
}
