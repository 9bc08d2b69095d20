use tokio::time::Instant;
use tracing::{error, info, warn};

use leadflow_core::clock::Clock;
use leadflow_domain::status::StatusGroup;

use crate::config::ShippingConfig;
use crate::domain::repository::{OrderRepository, StatusRepository};
use crate::domain::types::{HistoryAction, HistoryEntry, Order, StatusChange};
use crate::error::CrmServiceError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShippingTickReport {
    pub candidates: usize,
    pub delivered: usize,
    /// Tenants without a paid-group status.
    pub skipped: usize,
    pub errors: usize,
}

// ── ProgressShippedOrders ────────────────────────────────────────────────────

/// Moves orders that have been in transit long enough to the tenant's first
/// paid-group status.
pub struct ProgressShippedOrdersUseCase<O, S, C>
where
    O: OrderRepository,
    S: StatusRepository,
    C: Clock,
{
    pub orders: O,
    pub statuses: S,
    pub clock: C,
    pub config: ShippingConfig,
}

impl<O, S, C> ProgressShippedOrdersUseCase<O, S, C>
where
    O: OrderRepository,
    S: StatusRepository,
    C: Clock,
{
    pub async fn execute(&self, deadline: Instant) -> Result<ShippingTickReport, CrmServiceError> {
        let now = self.clock.now();
        let orders = self
            .orders
            .list_shipped_between(now - self.config.lookback, now - self.config.delivered_after)
            .await?;
        let mut report = ShippingTickReport {
            candidates: orders.len(),
            ..Default::default()
        };

        for order in &orders {
            if Instant::now() >= deadline {
                warn!("tick budget exhausted; remaining orders wait for the next pass");
                break;
            }
            match self.progress(order).await {
                Ok(true) => report.delivered += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report.errors += 1;
                    error!(order_id = %order.id, error = %e.detail(), "shipping progression failed");
                }
            }
        }

        info!(
            candidates = report.candidates,
            delivered = report.delivered,
            "shipping progression finished"
        );
        Ok(report)
    }

    async fn progress(&self, order: &Order) -> Result<bool, CrmServiceError> {
        let Some(paid) = self
            .statuses
            .first_in_group(order.project_id, StatusGroup::Paid)
            .await?
        else {
            warn!(project_id = %order.project_id, "project has no paid status");
            return Ok(false);
        };
        if paid.id == order.status_id {
            return Ok(false);
        }

        let now = self.clock.now();
        let history = HistoryEntry::new(order.id, HistoryAction::StatusUpdatedByShipping, now)
            .field(
                "status_id",
                Some(order.status_id.to_string()),
                Some(paid.id.to_string()),
            )
            .comment(format!(
                "Delivered: tracking {}",
                order.tracking_number.as_deref().unwrap_or_default()
            ));
        self.orders
            .apply_status_change(order.id, &StatusChange::to(&paid, now), &history)
            .await?;
        info!(order_id = %order.id, status_id = %paid.id, "order marked delivered");
        Ok(true)
    }
}
