use chrono::{DateTime, Duration, Utc};

use leadflow_domain::call::CallResult;
use leadflow_domain::id::ProjectId;

use crate::config::EngineConfig;
use crate::domain::automation::Trigger;
use crate::domain::filter::OrderFilter;
use crate::error::RuleConfigError;

/// Translate a trigger into the order selection it matches at `now`.
/// Returns `None` for trigger types the engine does not know, and an error
/// when a trigger's window falls outside the representable date range.
pub fn order_filter(
    trigger: &Trigger,
    project_id: ProjectId,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<Option<OrderFilter>, RuleConfigError> {
    let mut filter = OrderFilter::project(project_id);
    match trigger {
        Trigger::StatusChange { to_status_id, .. } => {
            filter.status_id = *to_status_id;
            filter.status_updated_since = Some(now - config.recency_window);
        }
        Trigger::TimeDelay {
            status_id,
            delay_minutes,
        } => {
            filter.status_id = *status_id;
            let delay = Duration::try_minutes(i64::from(*delay_minutes));
            filter.status_updated_until = Some(ago(now, delay, "delay_minutes", *delay_minutes)?);
        }
        Trigger::OrderCreated => {
            filter.created_since = Some(now - config.recency_window);
        }
        Trigger::NoCallResponse {
            hours_since_call, ..
        } => {
            filter.last_call_results = CallResult::UNREACHED.to_vec();
            let age = Duration::try_hours(i64::from(*hours_since_call));
            filter.status_updated_until =
                Some(ago(now, age, "hours_since_call", *hours_since_call)?);
        }
        Trigger::Unknown => return Ok(None),
    }
    Ok(Some(filter))
}

fn ago(
    now: DateTime<Utc>,
    span: Option<Duration>,
    field: &'static str,
    value: u32,
) -> Result<DateTime<Utc>, RuleConfigError> {
    span.and_then(|span| now.checked_sub_signed(span))
        .ok_or(RuleConfigError::WindowOverflow { field, value })
}

/// True when the previous execution of a re-fireable trigger is still inside
/// its cooldown.
pub fn in_cooldown(
    trigger: &Trigger,
    last_started_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match (trigger.cooldown_minutes(), last_started_at) {
        (Some(minutes), Some(last)) => now - last < Duration::minutes(i64::from(minutes)),
        _ => false,
    }
}
