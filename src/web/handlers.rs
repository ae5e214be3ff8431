//! HTTP request handlers.

use super::AppState;
use crate::db::{DbError, Target};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;

pub async fn handle_index() -> impl IntoResponse {
    "Welcome to the SiteWatch API. Targets live under /api/targets."
}

// ============================================================================
// API: Targets
// ============================================================================

pub async fn handle_get_targets(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.get_targets() {
        Ok(targets) => Json(targets).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_get_target(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.store.get_target(id) {
        Ok(target) => Json(target).into_response(),
        Err(DbError::NotFound) => (StatusCode::NOT_FOUND, "Target not found").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTargetRequest {
    pub name: String,
    pub url: String,
}

pub async fn handle_create_target(
    State(state): State<AppState>,
    Json(req): Json<CreateTargetRequest>,
) -> impl IntoResponse {
    if req.name.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "name must not be empty").into_response();
    }
    if req.url.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "url must not be empty").into_response();
    }

    let mut target = Target::new(&req.name, &req.url);

    if let Err(e) = state.store.add_target(&mut target) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    tracing::info!("Added target {} ({}) as #{}", target.name, target.url, target.id);

    // The row is committed; a failed check only leaves it pending.
    if let Err(e) = state.scheduler.on_target_created(target.clone()).await {
        tracing::warn!("Immediate check for #{} failed: {}", target.id, e);
    }

    let target = state.store.get_target(target.id).unwrap_or(target);
    (StatusCode::CREATED, Json(target)).into_response()
}

pub async fn handle_delete_target(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.store.delete_target(id) {
        Ok(true) => {
            tracing::info!("Deleted target #{}", id);
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => (StatusCode::NOT_FOUND, "Target not found").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

// ============================================================================
// API: Monitor
// ============================================================================

pub async fn handle_monitor_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduler.stats())
}

#[cfg(test)]
mod tests {
    use crate::config::ServerConfig;
    use crate::db::{Status, Store, Target, TargetRepository};
    use crate::probe::Prober;
    use crate::scheduler::Scheduler;
    use crate::testing::FakeProber;
    use crate::web::{router, AppState};

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use std::sync::Arc;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    struct Harness {
        _tmp: NamedTempFile,
        store: Store,
        prober: Arc<FakeProber>,
        app: Router,
    }

    fn harness() -> Harness {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        let prober = Arc::new(FakeProber::default());
        let config = ServerConfig::default();
        let scheduler = Arc::new(Scheduler::new(
            Arc::new(store.clone()) as Arc<dyn TargetRepository>,
            prober.clone() as Arc<dyn Prober>,
            &config,
        ));
        let app = router(AppState {
            config,
            store: store.clone(),
            scheduler,
        });
        Harness {
            _tmp: tmp,
            store,
            prober,
            app,
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn create(name: &str, url: &str) -> Request<Body> {
        let body = serde_json::json!({ "name": name, "url": url }).to_string();
        Request::post("/api/targets")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::delete(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_create_runs_immediate_check() {
        let h = harness();
        h.prober.set_reachable("http://up.example", true);

        let (status, body) = send(&h.app, create("Up", "up.example")).await;
        assert_eq!(status, StatusCode::CREATED);

        let target: Target = serde_json::from_slice(&body).unwrap();
        assert_eq!(target.url, "http://up.example");
        assert_eq!(target.status, Status::Online);
        assert_eq!(h.store.get_target(target.id).unwrap().status, Status::Online);
    }

    #[tokio::test]
    async fn test_create_unreachable_is_offline() {
        let h = harness();

        let (status, body) = send(&h.app, create("Down", "https://down.example")).await;
        assert_eq!(status, StatusCode::CREATED);
        let target: Target = serde_json::from_slice(&body).unwrap();
        assert_eq!(target.url, "https://down.example");
        assert_eq!(target.status, Status::Offline);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_fields() {
        let h = harness();

        let (status, _) = send(&h.app, create("", "example.com")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&h.app, create("x", "   ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(h.store.get_targets().unwrap().is_empty());
        assert_eq!(h.prober.calls(), 0);
    }

    #[tokio::test]
    async fn test_get_list_and_delete() {
        let h = harness();
        send(&h.app, create("A", "a.example")).await;
        let (_, body) = send(&h.app, create("B", "b.example")).await;
        let b: Target = serde_json::from_slice(&body).unwrap();

        let (status, body) = send(&h.app, get("/api/targets")).await;
        assert_eq!(status, StatusCode::OK);
        let all: Vec<Target> = serde_json::from_slice(&body).unwrap();
        assert_eq!(all.len(), 2);

        let uri = format!("/api/targets/{}", b.id);
        let (status, _) = send(&h.app, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&h.app, delete(&uri)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&h.app, delete(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&h.app, get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_monitor_stats_counts_pipelines() {
        let h = harness();
        send(&h.app, create("A", "a.example")).await;

        let (status, body) = send(&h.app, get("/api/monitor")).await;
        assert_eq!(status, StatusCode::OK);
        let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(stats["pipelines_ok"], 1);
        assert_eq!(stats["ticks"], 0);
    }
}
