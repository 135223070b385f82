//! matchgrid-api — REST control surface for MatchGrid.
//!
//! JSON only; HTML rendering and authentication live elsewhere. All
//! mutations go through the scheduler so they serialize with the
//! dispatch loop; reads go straight to the state store.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/runs` | List all runs |
//! | POST | `/api/v1/runs` | Queue a run |
//! | GET | `/api/v1/runs/{id}` | Get a run and its matches |
//! | DELETE | `/api/v1/runs/{id}` | Cancel (if active) or delete a run |
//! | GET | `/api/v1/players` | List players |
//! | POST | `/api/v1/players` | Register a player |
//! | GET | `/api/v1/maps` | List the map catalog |
//! | GET | `/api/v1/scrimmages` | List scrimmage sets |
//! | POST | `/api/v1/scrimmages?name=` | Upload a scrimmage file |
//! | DELETE | `/api/v1/scrimmages/{id}` | Delete a scrimmage set |
//! | GET | `/api/v1/connections` | List connected workers |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use matchgrid_scheduler::Scheduler;
use matchgrid_state::StateStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub scheduler: Arc<Scheduler>,
    pub store: StateStore,
}

/// Build the complete API router.
pub fn build_router(scheduler: Arc<Scheduler>, store: StateStore) -> Router {
    let state = ApiState { scheduler, store };

    let api_routes = Router::new()
        .route("/runs", get(handlers::list_runs).post(handlers::queue_run))
        .route(
            "/runs/{id}",
            get(handlers::get_run).delete(handlers::cancel_or_delete_run),
        )
        .route(
            "/players",
            get(handlers::list_players).post(handlers::register_player),
        )
        .route("/maps", get(handlers::list_maps))
        .route(
            "/scrimmages",
            get(handlers::list_scrimmages).post(handlers::upload_scrimmage),
        )
        .route(
            "/scrimmages/{id}",
            axum::routing::delete(handlers::delete_scrimmage),
        )
        .route("/connections", get(handlers::list_connections))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
