use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use leadflow_domain::id::{OrderId, ProjectId, StatusId, UserId};

use crate::domain::types::{HistoryEntry, Order};
use crate::error::CrmServiceError;
use crate::handlers::actor::ActorHeader;
use crate::state::AppState;
use crate::usecase::orders::{ChangeOrderStatusUseCase, GetOrderHistoryUseCase};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HistoryEntryResponse {
    pub user_id: Option<UserId>,
    pub action: String,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub comment: Option<String>,
    #[serde(serialize_with = "leadflow_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<HistoryEntry> for HistoryEntryResponse {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            user_id: entry.user_id,
            action: entry.action,
            field_name: entry.field_name,
            old_value: entry.old_value,
            new_value: entry.new_value,
            comment: entry.comment,
            created_at: entry.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct OrderStatusResponse {
    pub id: OrderId,
    pub status_id: StatusId,
    #[serde(serialize_with = "leadflow_core::serde::to_rfc3339_ms")]
    pub status_updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "leadflow_core::serde::to_rfc3339_ms_opt")]
    pub approved_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(serialize_with = "leadflow_core::serde::to_rfc3339_ms_opt")]
    pub shipped_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(serialize_with = "leadflow_core::serde::to_rfc3339_ms_opt")]
    pub canceled_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Order> for OrderStatusResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            status_id: order.status_id,
            status_updated_at: order.status_updated_at,
            approved_at: order.approved_at,
            shipped_at: order.shipped_at,
            canceled_at: order.canceled_at,
        }
    }
}

// ── GET /projects/{project_id}/orders/{order_id}/history ─────────────────────

pub async fn get_order_history(
    State(state): State<AppState>,
    Path((project_id, order_id)): Path<(i32, i32)>,
) -> Result<Json<Vec<HistoryEntryResponse>>, CrmServiceError> {
    let usecase = GetOrderHistoryUseCase {
        orders: state.order_repo(),
    };
    let history = usecase
        .execute(ProjectId(project_id), OrderId(order_id))
        .await?;
    Ok(Json(
        history.into_iter().map(HistoryEntryResponse::from).collect(),
    ))
}

// ── PATCH /projects/{project_id}/orders/{order_id}/status ────────────────────

#[derive(Deserialize)]
pub struct ChangeStatusRequest {
    pub status_id: i32,
}

pub async fn change_order_status(
    ActorHeader(actor): ActorHeader,
    State(state): State<AppState>,
    Path((project_id, order_id)): Path<(i32, i32)>,
    Json(body): Json<ChangeStatusRequest>,
) -> Result<Json<OrderStatusResponse>, CrmServiceError> {
    let usecase = ChangeOrderStatusUseCase {
        orders: state.order_repo(),
        statuses: state.status_repo(),
        clock: state.clock(),
    };
    let order = usecase
        .execute(
            ProjectId(project_id),
            OrderId(order_id),
            StatusId(body.status_id),
            actor,
        )
        .await?;
    Ok(Json(order.into()))
}
