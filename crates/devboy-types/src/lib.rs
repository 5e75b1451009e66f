use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved key of the default function. Always present in a [`Registry`].
pub const DEFAULT_FUNCTION: &str = "api";

/// Entry point of the default function.
pub const DEFAULT_FUNCTION_HANDLER: &str = "index.js";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub const ALL: [Method; 4] = [Method::Get, Method::Post, Method::Put, Method::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Lower-case form used in synthesized handler paths.
    pub fn as_lower(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Delete => "delete",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported HTTP method '{0}'")]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

/// One (path, method) binding and the handler file serving it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteEntry {
    pub path: String,
    pub method: Method,
    #[serde(rename = "handler")]
    pub handler_path: String,
}

impl RouteEntry {
    pub fn matches(&self, path: &str, method: Method) -> bool {
        self.path == path && self.method == method
    }
}

/// A named group of routes sharing one backend function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionEntry {
    #[serde(rename = "handler")]
    pub handler_path: String,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

impl FunctionEntry {
    pub fn new(handler_path: impl Into<String>) -> Self {
        Self {
            handler_path: handler_path.into(),
            routes: Vec::new(),
        }
    }
}

/// Function name to [`FunctionEntry`] mapping, in insertion order.
///
/// The [`DEFAULT_FUNCTION`] key always exists: it is created on construction,
/// re-inserted when a deserialized document lacks it, and there is no way to
/// remove it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "IndexMap<String, FunctionEntry>",
    into = "IndexMap<String, FunctionEntry>"
)]
pub struct Registry {
    functions: IndexMap<String, FunctionEntry>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let mut functions = IndexMap::new();
        functions.insert(
            DEFAULT_FUNCTION.to_string(),
            FunctionEntry::new(DEFAULT_FUNCTION_HANDLER),
        );
        Self { functions }
    }

    pub fn get(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FunctionEntry> {
        self.functions.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Adds a function under `name`. Returns `false` and leaves the registry
    /// untouched if the name is already taken.
    pub fn insert_function(&mut self, name: impl Into<String>, entry: FunctionEntry) -> bool {
        match self.functions.entry(name.into()) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    pub fn functions(&self) -> impl Iterator<Item = (&str, &FunctionEntry)> {
        self.functions.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Names of every function other than the default one.
    pub fn custom_functions(&self) -> impl Iterator<Item = &str> {
        self.functions
            .keys()
            .map(String::as_str)
            .filter(|name| *name != DEFAULT_FUNCTION)
    }

    /// Every route paired with its owning function, functions in insertion
    /// order and routes in insertion order within each function.
    pub fn routes(&self) -> impl Iterator<Item = (&str, &RouteEntry)> {
        self.functions().flat_map(|(name, entry)| {
            entry.routes.iter().map(move |route| (name, route))
        })
    }

    pub fn route_count(&self) -> usize {
        self.functions.values().map(|f| f.routes.len()).sum()
    }
}

impl From<IndexMap<String, FunctionEntry>> for Registry {
    fn from(mut functions: IndexMap<String, FunctionEntry>) -> Self {
        if !functions.contains_key(DEFAULT_FUNCTION) {
            functions.shift_insert(
                0,
                DEFAULT_FUNCTION.to_string(),
                FunctionEntry::new(DEFAULT_FUNCTION_HANDLER),
            );
        }
        Self { functions }
    }
}

impl From<Registry> for IndexMap<String, FunctionEntry> {
    fn from(registry: Registry) -> Self {
        registry.functions
    }
}
