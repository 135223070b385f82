//! REST API handlers.
//!
//! Mutations call into the scheduler; reads go via `StateStore` and
//! return JSON responses.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use matchgrid_scheduler::SchedulerError;
use matchgrid_state::*;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

fn scheduler_error_response(e: &SchedulerError) -> axum::response::Response {
    let status = match e {
        SchedulerError::PlayerNotFound(_)
        | SchedulerError::MapNotFound(_)
        | SchedulerError::RunNotFound(_)
        | SchedulerError::ScrimmageNotFound(_) => StatusCode::NOT_FOUND,
        SchedulerError::EmptyRun => StatusCode::BAD_REQUEST,
        SchedulerError::ScrimmageBusy(_) => StatusCode::CONFLICT,
        SchedulerError::State(_) | SchedulerError::Artifact(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(&e.to_string(), status).into_response()
}

// ── Runs ───────────────────────────────────────────────────────────

/// GET /api/v1/runs
pub async fn list_runs(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.list_runs() {
        Ok(runs) => ApiResponse::ok(runs).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// Queue request body.
#[derive(serde::Deserialize)]
pub struct QueueRunRequest {
    pub team_a: PlayerId,
    pub team_b: PlayerId,
    pub seeds: Vec<u64>,
    pub map_ids: Vec<MapId>,
}

/// POST /api/v1/runs
pub async fn queue_run(
    State(state): State<ApiState>,
    Json(req): Json<QueueRunRequest>,
) -> impl IntoResponse {
    match state
        .scheduler
        .queue_run(req.team_a, req.team_b, &req.seeds, &req.map_ids)
    {
        Ok(run_id) => (
            StatusCode::CREATED,
            ApiResponse::ok(serde_json::json!({ "run": run_id })),
        )
            .into_response(),
        Err(e) => scheduler_error_response(&e),
    }
}

/// Run detail payload: the run plus its matches.
#[derive(serde::Serialize)]
pub struct RunDetail {
    #[serde(flatten)]
    pub run: Run,
    pub matches: Vec<Match>,
}

/// GET /api/v1/runs/{id}
pub async fn get_run(
    State(state): State<ApiState>,
    Path(id): Path<RunId>,
) -> impl IntoResponse {
    match state.store.get_run(id) {
        Ok(Some(run)) => match state.store.matches_for_run(id) {
            Ok(matches) => ApiResponse::ok(RunDetail { run, matches }).into_response(),
            Err(e) => {
                error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
            }
        },
        Ok(None) => error_response("run not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// DELETE /api/v1/runs/{id}
pub async fn cancel_or_delete_run(
    State(state): State<ApiState>,
    Path(id): Path<RunId>,
) -> impl IntoResponse {
    match state.scheduler.cancel_or_delete_run(id) {
        Ok(()) => ApiResponse::ok("ok").into_response(),
        Err(e) => scheduler_error_response(&e),
    }
}

// ── Players ────────────────────────────────────────────────────────

/// GET /api/v1/players
pub async fn list_players(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.list_players() {
        Ok(players) => ApiResponse::ok(players).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// Registration request body.
#[derive(serde::Deserialize)]
pub struct RegisterPlayerRequest {
    pub name: String,
}

/// POST /api/v1/players
pub async fn register_player(
    State(state): State<ApiState>,
    Json(req): Json<RegisterPlayerRequest>,
) -> impl IntoResponse {
    if req.name.is_empty() {
        return error_response("player name must not be empty", StatusCode::BAD_REQUEST)
            .into_response();
    }
    match state.store.find_player_by_name(&req.name) {
        Ok(Some(_)) => {
            return error_response("player name already registered", StatusCode::CONFLICT)
                .into_response();
        }
        Ok(None) => {}
        Err(e) => {
            return error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
                .into_response();
        }
    }
    let player = match state.store.next_id("player") {
        Ok(id) => Player {
            id,
            name: req.name,
            registered_at: epoch_secs(),
        },
        Err(e) => {
            return error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
                .into_response();
        }
    };
    match state.store.put_player(&player) {
        Ok(()) => (StatusCode::CREATED, ApiResponse::ok(player)).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Maps ───────────────────────────────────────────────────────────

/// GET /api/v1/maps
pub async fn list_maps(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.list_maps() {
        Ok(maps) => ApiResponse::ok(maps).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Scrimmages ─────────────────────────────────────────────────────

/// GET /api/v1/scrimmages
pub async fn list_scrimmages(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.list_scrimmages() {
        Ok(scrims) => ApiResponse::ok(scrims).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// Upload query parameters.
#[derive(serde::Deserialize)]
pub struct UploadQuery {
    pub name: String,
}

/// POST /api/v1/scrimmages?name=...  (raw file bytes as the body)
pub async fn upload_scrimmage(
    State(state): State<ApiState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> impl IntoResponse {
    if body.is_empty() {
        return error_response("empty scrimmage file", StatusCode::BAD_REQUEST).into_response();
    }
    match state.scheduler.queue_scrimmage(&query.name, &body) {
        Ok(id) => (
            StatusCode::CREATED,
            ApiResponse::ok(serde_json::json!({ "scrimmage": id })),
        )
            .into_response(),
        Err(e) => scheduler_error_response(&e),
    }
}

/// DELETE /api/v1/scrimmages/{id}
pub async fn delete_scrimmage(
    State(state): State<ApiState>,
    Path(id): Path<ScrimmageId>,
) -> impl IntoResponse {
    match state.scheduler.delete_scrimmage(id) {
        Ok(()) => ApiResponse::ok("ok").into_response(),
        Err(e) => scheduler_error_response(&e),
    }
}

// ── Connections ────────────────────────────────────────────────────

/// GET /api/v1/connections
pub async fn list_connections(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.scheduler.connections()).into_response()
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use matchgrid_artifacts::ArtifactStore;
    use matchgrid_notify::NotificationBus;
    use matchgrid_scheduler::Scheduler;
    use matchgrid_state::*;

    use crate::build_router;

    fn test_router() -> (tempfile::TempDir, axum::Router, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        for file in ["engine.bin", "allow.list", "deny.list", "cost.table"] {
            fs::write(dir.path().join(file), file).unwrap();
        }
        let artifacts = ArtifactStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("maps/arena.xml"), b"<map/>").unwrap();
        fs::write(dir.path().join("teams/alpha.pkg"), b"a").unwrap();
        fs::write(dir.path().join("teams/beta.pkg"), b"b").unwrap();

        let store = StateStore::open_in_memory().unwrap();
        let scheduler = Arc::new(Scheduler::new(
            store.clone(),
            artifacts,
            NotificationBus::new(64),
        ));
        scheduler.rescan_maps().unwrap();
        let router = build_router(scheduler, store.clone());
        (dir, router, store)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(router: &axum::Router, name: &str) -> u64 {
        let response = router
            .clone()
            .oneshot(
                Request::post("/api/v1/players")
                    .header("content-type", "application/json")
                    .body(Body::from(format!("{{\"name\":\"{name}\"}}")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["data"]["id"].as_u64().unwrap()
    }

    #[tokio::test]
    async fn register_and_list_players() {
        let (_dir, router, _store) = test_router();
        register(&router, "alpha").await;

        let response = router
            .clone()
            .oneshot(Request::get("/api/v1/players").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"][0]["name"], "alpha");
    }

    #[tokio::test]
    async fn duplicate_player_name_conflicts() {
        let (_dir, router, _store) = test_router();
        register(&router, "alpha").await;

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/v1/players")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"name\":\"alpha\"}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn queue_run_via_api() {
        let (_dir, router, store) = test_router();
        let alpha = register(&router, "alpha").await;
        let beta = register(&router, "beta").await;
        let map = store.find_map_by_name("arena").unwrap().unwrap().id;

        let body = serde_json::json!({
            "team_a": alpha,
            "team_b": beta,
            "seeds": [1, 2],
            "map_ids": [map],
        });
        let response = router
            .clone()
            .oneshot(
                Request::post("/api/v1/runs")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let run_id = body_json(response).await["data"]["run"].as_u64().unwrap();

        // No workers are connected, but the run is promoted.
        assert_eq!(
            store.get_run(run_id).unwrap().unwrap().status,
            RunStatus::Running
        );

        let response = router
            .clone()
            .oneshot(
                Request::get(format!("/api/v1/runs/{run_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["matches"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn queue_run_with_unknown_player_is_404() {
        let (_dir, router, store) = test_router();
        let map = store.find_map_by_name("arena").unwrap().unwrap().id;

        let body = serde_json::json!({
            "team_a": 1, "team_b": 2, "seeds": [1], "map_ids": [map],
        });
        let response = router
            .clone()
            .oneshot(
                Request::post("/api/v1/runs")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn scrimmage_upload_and_delete() {
        let (_dir, router, store) = test_router();

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/v1/scrimmages?name=recorded.bin")
                    .body(Body::from("raw-scrimmage-bytes"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = body_json(response).await["data"]["scrimmage"].as_u64().unwrap();
        assert!(store.get_scrimmage(id).unwrap().is_some());

        let response = router
            .clone()
            .oneshot(
                Request::delete(format!("/api/v1/scrimmages/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(store.get_scrimmage(id).unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_unknown_run_is_404() {
        let (_dir, router, _store) = test_router();
        let response = router
            .clone()
            .oneshot(
                Request::delete("/api/v1/runs/42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn connections_start_empty() {
        let (_dir, router, _store) = test_router();
        let response = router
            .clone()
            .oneshot(
                Request::get("/api/v1/connections")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 0);
    }
}
