//! Compiles a registry snapshot into a (method, path) -> handler table.
//!
//! Handlers are reached through [`HandlerLoader`], so the table can be built
//! from real handler files ([`process::ProcessLoader`]) or from in-memory
//! fakes.

use std::collections::BTreeMap;
use std::sync::Arc;

use devboy_types::{Method, Registry, RouteEntry};
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub mod process;

pub use process::ProcessLoader;

/// Request data handed to a handler.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HandlerEvent {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// Which function and file is serving the request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HandlerContext {
    pub function: String,
    pub handler: String,
}

pub trait Handler: Send + Sync {
    fn call(&self, event: HandlerEvent, context: HandlerContext) -> BoxFuture<'_, anyhow::Result<Value>>;
}

pub trait HandlerLoader {
    fn load(&self, route: &RouteEntry) -> anyhow::Result<Arc<dyn Handler>>;
}

#[derive(Clone)]
pub struct Endpoint {
    pub function: String,
    pub route: RouteEntry,
    handler: Arc<dyn Handler>,
}

impl Endpoint {
    pub async fn invoke(&self, event: HandlerEvent) -> anyhow::Result<Value> {
        let context = HandlerContext {
            function: self.function.clone(),
            handler: self.route.handler_path.clone(),
        };
        self.handler.call(event, context).await
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("function", &self.function)
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to load handler '{handler_path}' for {method} {path} ({function}): {reason:#}")]
    HandlerLoad {
        function: String,
        path: String,
        method: Method,
        handler_path: String,
        reason: anyhow::Error,
    },
    #[error("{method} {path} is registered by both '{first}' and '{second}'")]
    Ambiguous {
        path: String,
        method: Method,
        first: String,
        second: String,
    },
}

/// Read-only routing table for one serving session.
#[derive(Debug, Default)]
pub struct DispatchTable {
    endpoints: IndexMap<(Method, String), Endpoint>,
}

impl DispatchTable {
    /// Loads a handler for every route in registry order. Any failure aborts
    /// the whole build; no partially filled table is ever returned.
    pub fn build(registry: &Registry, loader: &dyn HandlerLoader) -> Result<Self, DispatchError> {
        let mut endpoints: IndexMap<(Method, String), Endpoint> =
            IndexMap::with_capacity(registry.route_count());

        for (function, route) in registry.routes() {
            let key = (route.method, route.path.clone());
            if let Some(existing) = endpoints.get(&key) {
                return Err(DispatchError::Ambiguous {
                    path: route.path.clone(),
                    method: route.method,
                    first: existing.function.clone(),
                    second: function.to_string(),
                });
            }

            let handler = loader
                .load(route)
                .map_err(|reason| DispatchError::HandlerLoad {
                    function: function.to_string(),
                    path: route.path.clone(),
                    method: route.method,
                    handler_path: route.handler_path.clone(),
                    reason,
                })?;

            endpoints.insert(
                key,
                Endpoint {
                    function: function.to_string(),
                    route: route.clone(),
                    handler,
                },
            );
        }

        Ok(Self { endpoints })
    }

    pub fn lookup(&self, method: Method, path: &str) -> Option<&Endpoint> {
        self.endpoints.get(&(method, path.to_string()))
    }

    /// Endpoints in registry order.
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
