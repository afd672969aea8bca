//! Dashboard: read-only Axum server over the watchlist and loop registry.
//!
//! CORS enabled for local development.

pub mod routes;

use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

pub use routes::{AppState, DashboardState};

/// Start the dashboard web server.
///
/// This spawns a background task and returns immediately. Bind or serve
/// failures are logged; the tracker keeps running without a dashboard.
pub fn spawn_dashboard(state: AppState, port: u16) {
    let app = build_router(state);

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!(port, "Dashboard server starting on http://localhost:{port}");

        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(port, error = %e, "Failed to bind dashboard port");
                return;
            }
        };

        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Dashboard server error");
        }
    });
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/watchlist", get(routes::get_watchlist))
        .route("/api/report", get(routes::get_report))
        .route("/api/loops", get(routes::get_loops))
        .route("/api/loops/terminated", get(routes::get_terminated_loops))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::registry::LoopRegistry;
    use crate::storage::{MemoryStore, WatchlistStore};
    use crate::types::{TrackedItem, DEFAULT_WIN_THRESHOLD};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_if_absent(&TrackedItem::new("A", 1.0, "G1"))
            .await
            .unwrap();
        store.record_sample("A", 2.0, 2.0).await.unwrap();
        Arc::new(DashboardState::new(
            store,
            LoopRegistry::new(),
            DEFAULT_WIN_THRESHOLD,
        ))
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = build_router(test_state().await);
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, _) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_watchlist_endpoint() {
        let (status, json) = get_json("/api/watchlist").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["address"], "A");
        assert_eq!(json[0]["highest_multiplier"], 2.0);
    }

    #[tokio::test]
    async fn test_report_endpoint() {
        let (status, json) = get_json("/api/report").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["overall"]["total"], 1);
        assert_eq!(json["overall"]["wins"], 1);
        assert_eq!(json["groups"][0]["group_name"], "G1");
    }

    #[tokio::test]
    async fn test_loops_endpoints() {
        let (status, json) = get_json("/api/loops").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["running"], 0);

        let (status, json) = get_json("/api/loops/terminated").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = get_json("/api/trades").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
