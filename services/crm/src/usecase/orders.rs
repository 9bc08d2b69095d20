use tracing::info;

use leadflow_core::clock::Clock;
use leadflow_domain::id::{OrderId, ProjectId, StatusId, UserId};

use crate::domain::repository::{OrderRepository, StatusRepository};
use crate::domain::types::{HistoryAction, HistoryEntry, Order, StatusChange};
use crate::error::CrmServiceError;

// ── ChangeOrderStatus ────────────────────────────────────────────────────────

/// Manual status change by an operator. Follows the same lifecycle rules as
/// automation: `status_updated_at` always moves, lifecycle stamps only once.
pub struct ChangeOrderStatusUseCase<O: OrderRepository, S: StatusRepository, C: Clock> {
    pub orders: O,
    pub statuses: S,
    pub clock: C,
}

impl<O: OrderRepository, S: StatusRepository, C: Clock> ChangeOrderStatusUseCase<O, S, C> {
    pub async fn execute(
        &self,
        project_id: ProjectId,
        order_id: OrderId,
        status_id: StatusId,
        actor: Option<UserId>,
    ) -> Result<Order, CrmServiceError> {
        let mut order = self
            .orders
            .find(project_id, order_id)
            .await?
            .ok_or(CrmServiceError::OrderNotFound)?;
        let status = self
            .statuses
            .find(project_id, status_id)
            .await?
            .ok_or(CrmServiceError::StatusNotFound)?;
        if order.status_id == status.id {
            return Ok(order);
        }

        let now = self.clock.now();
        let change = StatusChange::to(&status, now);
        let history = HistoryEntry::new(order.id, HistoryAction::StatusChanged, now)
            .by(actor)
            .field(
                "status_id",
                Some(order.status_id.to_string()),
                Some(status.id.to_string()),
            );
        self.orders
            .apply_status_change(order.id, &change, &history)
            .await?;
        info!(
            order_id = %order.id,
            status_id = %status.id,
            group = %status.group,
            "order status changed"
        );
        order.apply_status_change(&change);
        Ok(order)
    }
}

// ── GetOrderHistory ──────────────────────────────────────────────────────────

pub struct GetOrderHistoryUseCase<O: OrderRepository> {
    pub orders: O,
}

impl<O: OrderRepository> GetOrderHistoryUseCase<O> {
    pub async fn execute(
        &self,
        project_id: ProjectId,
        order_id: OrderId,
    ) -> Result<Vec<HistoryEntry>, CrmServiceError> {
        if self.orders.find(project_id, order_id).await?.is_none() {
            return Err(CrmServiceError::OrderNotFound);
        }
        self.orders.history(order_id).await
    }
}
