use devboy_types::{Method, Registry};

/// True if any function already registers `path` with `method`.
///
/// Comparison is exact: no case folding, no trailing-slash normalization.
pub fn is_duplicate(registry: &Registry, path: &str, method: Method) -> bool {
    registry.routes().any(|(_, route)| route.matches(path, method))
}
