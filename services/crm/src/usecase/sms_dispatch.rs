use tokio::time::Instant;
use tracing::{error, info, warn};

use leadflow_core::clock::Clock;

use crate::domain::repository::{SmsGateway, SmsOutboxRepository};
use crate::error::CrmServiceError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmsDispatchReport {
    pub claimed: usize,
    pub sent: usize,
    pub failed: usize,
    /// Rows whose outcome could not be written back. They stay in
    /// `processing` and are not handed to the gateway again.
    pub unsettled: usize,
}

// ── DispatchPendingSms ───────────────────────────────────────────────────────

/// Hands pending SMS rows to the gateway, oldest first.
pub struct DispatchSmsUseCase<Q, G, C>
where
    Q: SmsOutboxRepository,
    G: SmsGateway,
    C: Clock,
{
    pub outbox: Q,
    pub gateway: G,
    pub clock: C,
    pub batch_size: u64,
}

impl<Q, G, C> DispatchSmsUseCase<Q, G, C>
where
    Q: SmsOutboxRepository,
    G: SmsGateway,
    C: Clock,
{
    /// The deadline only bounds claiming: every claimed row is attempted, and a
    /// failed status write for one row does not stop the rest of the batch.
    pub async fn execute(&self, deadline: Instant) -> Result<SmsDispatchReport, CrmServiceError> {
        if Instant::now() >= deadline {
            return Ok(SmsDispatchReport::default());
        }
        let messages = self.outbox.claim_pending(self.batch_size).await?;
        let mut report = SmsDispatchReport {
            claimed: messages.len(),
            ..Default::default()
        };

        for message in &messages {
            let settled = match self.gateway.send(message).await {
                Ok(delivery) => {
                    report.sent += 1;
                    self.outbox
                        .mark_sent(message.id, &delivery, self.clock.now())
                        .await
                }
                Err(e) => {
                    warn!(sms_id = message.id, error = %e, "sms send failed");
                    report.failed += 1;
                    self.outbox.mark_failed(message.id, &e.to_string()).await
                }
            };
            if let Err(e) = settled {
                report.unsettled += 1;
                error!(sms_id = message.id, error = %e.detail(), "failed to record sms outcome");
            }
        }

        if report.claimed > 0 {
            info!(
                claimed = report.claimed,
                sent = report.sent,
                failed = report.failed,
                unsettled = report.unsettled,
                "sms dispatch finished"
            );
        }
        Ok(report)
    }
}
