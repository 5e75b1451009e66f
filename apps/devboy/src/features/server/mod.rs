use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Query,
    http::{self, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Extension, Json, Router,
};
use devboy_types::Method;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::features::dispatch::{DispatchTable, HandlerEvent};

/// Every request goes through the dispatch table; there are no static routes.
pub fn router(table: Arc<DispatchTable>) -> Router {
    Router::new().fallback(dispatch).layer(Extension(table))
}

pub async fn serve(addr: &str, table: DispatchTable) -> anyhow::Result<()> {
    let table = Arc::new(table);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, routes = table.len(), "devboy development server is running on http://{addr}");
    if table.is_empty() {
        info!("no routes registered");
    } else {
        info!("available routes:");
    }
    for endpoint in table.endpoints() {
        info!(
            function = %endpoint.function,
            "  {} {}",
            endpoint.route.method,
            endpoint.route.path
        );
    }

    axum::serve(listener, router(table).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn dispatch(
    Extension(table): Extension<Arc<DispatchTable>>,
    method: http::Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let endpoint = method
        .as_str()
        .parse::<Method>()
        .ok()
        .and_then(|m| table.lookup(m, uri.path()));
    let Some(endpoint) = endpoint else {
        return not_found();
    };

    let query = match Query::<BTreeMap<String, String>>::try_from_uri(&uri) {
        Ok(Query(query)) => query,
        Err(err) => return bad_request(&err.body_text()),
    };
    let body = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(err) => return bad_request(&format!("invalid JSON body: {err}")),
        }
    };
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let event = HandlerEvent {
        method: endpoint.route.method,
        path: endpoint.route.path.clone(),
        query,
        headers,
        body,
    };

    match endpoint.invoke(event).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => {
            error!(
                path = %endpoint.route.path,
                method = %endpoint.route.method,
                function = %endpoint.function,
                "error in route: {err:#}"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal Server Error" })),
            )
                .into_response()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" }))).into_response()
}

fn bad_request(reason: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::dispatch::testing::{registry_with_routes, FakeLoader};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use devboy_types::DEFAULT_FUNCTION;
    use tower::ServiceExt; // for Router::oneshot

    fn app(failing: &[&str]) -> Router {
        let registry = registry_with_routes(&[
            (DEFAULT_FUNCTION, "/users", Method::Get),
            ("jobs", "/jobs", Method::Post),
        ]);
        let loader = FakeLoader {
            failing: failing.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        let table = DispatchTable::build(&registry, &loader).unwrap();
        router(Arc::new(table))
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn routes_request_to_registered_handler() {
        let req = Request::builder()
            .method("GET")
            .uri("/users?limit=5")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(app(&[]), req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["function"], DEFAULT_FUNCTION);
        assert_eq!(body["query"]["limit"], "5");
        assert_eq!(body["body"], Value::Null);
    }

    #[tokio::test]
    async fn passes_json_body_to_handler() {
        let req = Request::builder()
            .method("POST")
            .uri("/jobs")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "task": "build" }).to_string()))
            .unwrap();

        let (status, body) = send(app(&[]), req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["function"], "jobs");
        assert_eq!(body["body"], json!({ "task": "build" }));
    }

    #[tokio::test]
    async fn unmapped_routes_are_not_found() {
        for (method, uri) in [("GET", "/jobs"), ("GET", "/users/"), ("PATCH", "/users"), ("GET", "/nope")] {
            let req = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let (status, body) = send(app(&[]), req).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
            assert_eq!(body, json!({ "error": "Not Found" }));
        }
    }

    #[tokio::test]
    async fn handler_error_is_internal_server_error() {
        let req = Request::builder()
            .method("POST")
            .uri("/jobs")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(app(&["api/jobs/post/index.js"]), req).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal Server Error" }));
    }

    #[tokio::test]
    async fn malformed_json_body_is_bad_request() {
        let req = Request::builder()
            .method("POST")
            .uri("/jobs")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, _) = send(app(&[]), req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
