use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch},
};
use tower_http::trace::TraceLayer;

use leadflow_core::health::{healthz, readiness};
use leadflow_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    orders::{change_order_status, get_order_history},
    rules::{create_rule, list_executions, list_rules, update_rule},
};
use crate::state::AppState;

/// `GET /readyz`: ready once the database answers a ping.
async fn readyz(State(state): State<AppState>) -> StatusCode {
    readiness(state.db.ping().await)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Automation rules
        .route(
            "/projects/{project_id}/automation-rules",
            get(list_rules).post(create_rule),
        )
        .route(
            "/projects/{project_id}/automation-rules/{rule_id}",
            patch(update_rule),
        )
        .route(
            "/projects/{project_id}/automation-rules/{rule_id}/executions",
            get(list_executions),
        )
        // Orders
        .route(
            "/projects/{project_id}/orders/{order_id}/history",
            get(get_order_history),
        )
        .route(
            "/projects/{project_id}/orders/{order_id}/status",
            patch(change_order_status),
        )
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
