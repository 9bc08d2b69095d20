//! Typed trigger and action parameters of an automation rule.
//!
//! Rules store both as JSON tagged by `type`. Unknown tags parse into the
//! `Unknown` arm so one unsupported entry never breaks the whole rule; malformed
//! parameters of a known tag are a [`RuleConfigError`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use leadflow_domain::id::{StatusId, TemplateId, UserId};

use crate::error::RuleConfigError;

pub const DEFAULT_DELAY_MINUTES: u32 = 60;
pub const DEFAULT_HOURS_SINCE_CALL: u32 = 24;

/// Upper bound of every minute-valued delay or cooldown: one leap year.
pub const MAX_DELAY_MINUTES: u32 = 366 * 24 * 60;
pub const MAX_HOURS_SINCE_CALL: u32 = 366 * 24;

fn default_delay_minutes() -> u32 {
    DEFAULT_DELAY_MINUTES
}

fn default_hours_since_call() -> u32 {
    DEFAULT_HOURS_SINCE_CALL
}

/// Condition class selecting candidate orders for a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Order entered a status within the recency window.
    StatusChange {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to_status_id: Option<StatusId>,
        /// Accepted and stored, not evaluated: the order row does not keep its
        /// previous status.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_status_id: Option<StatusId>,
    },
    /// Order has stayed in a status for at least `delay_minutes`.
    TimeDelay {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_id: Option<StatusId>,
        #[serde(default = "default_delay_minutes")]
        delay_minutes: u32,
    },
    /// Order was created within the recency window.
    OrderCreated,
    /// Last call went unanswered and the status is at least `hours_since_call` old.
    NoCallResponse {
        #[serde(default = "default_hours_since_call")]
        hours_since_call: u32,
        /// Minimum gap between two executions for the same order.
        /// Defaults to `hours_since_call`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cooldown_minutes: Option<u32>,
    },
    #[serde(other)]
    Unknown,
}

impl Trigger {
    pub fn parse(raw: &Value) -> Result<Self, RuleConfigError> {
        let trigger = Self::deserialize(raw).map_err(RuleConfigError::Trigger)?;
        if let Some((field, value, max)) = trigger.out_of_range() {
            return Err(RuleConfigError::TriggerOutOfRange { field, value, max });
        }
        Ok(trigger)
    }

    /// First parameter above its bound, as `(field, value, max)`.
    fn out_of_range(&self) -> Option<(&'static str, u32, u32)> {
        match self {
            Self::TimeDelay { delay_minutes, .. } if *delay_minutes > MAX_DELAY_MINUTES => {
                Some(("delay_minutes", *delay_minutes, MAX_DELAY_MINUTES))
            }
            Self::NoCallResponse {
                hours_since_call, ..
            } if *hours_since_call > MAX_HOURS_SINCE_CALL => {
                Some(("hours_since_call", *hours_since_call, MAX_HOURS_SINCE_CALL))
            }
            Self::NoCallResponse {
                cooldown_minutes: Some(cooldown),
                ..
            } if *cooldown > MAX_DELAY_MINUTES => {
                Some(("cooldown_minutes", *cooldown, MAX_DELAY_MINUTES))
            }
            _ => None,
        }
    }

    /// Re-fireable triggers may execute more than once for the same order and
    /// are not covered by the dedup index.
    pub fn is_refireable(&self) -> bool {
        matches!(self, Self::NoCallResponse { .. })
    }

    /// Cooldown between executions of a re-fireable trigger, in minutes.
    pub fn cooldown_minutes(&self) -> Option<u32> {
        match self {
            Self::NoCallResponse {
                hours_since_call,
                cooldown_minutes,
            } => Some(cooldown_minutes.unwrap_or(hours_since_call.saturating_mul(60))),
            _ => None,
        }
    }
}

/// One typed side-effecting operation of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    ChangeStatus {
        status_id: StatusId,
    },
    SendSms {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template_id: Option<TemplateId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    SendEmail {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subject: Option<String>,
    },
    AssignOperator {
        operator_id: UserId,
    },
    ScheduleCall {
        #[serde(default = "default_delay_minutes")]
        delay_minutes: u32,
    },
    AddComment {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl Action {
    /// Parse one action entry.
    pub fn parse(index: usize, raw: &Value) -> Result<Self, RuleConfigError> {
        let action =
            Self::deserialize(raw).map_err(|source| RuleConfigError::Action { index, source })?;
        match action {
            Self::ScheduleCall { delay_minutes } if delay_minutes > MAX_DELAY_MINUTES => {
                Err(RuleConfigError::ActionOutOfRange {
                    index,
                    field: "delay_minutes",
                    value: delay_minutes,
                    max: MAX_DELAY_MINUTES,
                })
            }
            action => Ok(action),
        }
    }

    /// Parse every entry of an action list, keeping per-entry failures so the
    /// executor can report them in place.
    pub fn parse_list(raw: &Value) -> Result<Vec<Result<Self, RuleConfigError>>, RuleConfigError> {
        let entries = raw.as_array().ok_or(RuleConfigError::ActionsNotArray)?;
        Ok(entries
            .iter()
            .enumerate()
            .map(|(index, entry)| Self::parse(index, entry))
            .collect())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChangeStatus { .. } => "change_status",
            Self::SendSms { .. } => "send_sms",
            Self::SendEmail { .. } => "send_email",
            Self::AssignOperator { .. } => "assign_operator",
            Self::ScheduleCall { .. } => "schedule_call",
            Self::AddComment { .. } => "add_comment",
            Self::Unknown => "unknown",
        }
    }
}

/// `type` tag of a raw trigger/action entry, for logging and error results.
pub fn raw_type(raw: &Value) -> &str {
    raw.get("type").and_then(Value::as_str).unwrap_or("unknown")
}

/// Per-action outcome stored on the execution. Serialized flat:
/// `{"action": "change_status", "old_status": 1, "new_status": 2}` or
/// `{"action": "send_email", "error": "no email address"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ActionResult {
    pub fn success(action: &str, details: Value) -> Self {
        let details = match details {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            action: action.to_owned(),
            error: None,
            details,
        }
    }

    pub fn error(action: &str, message: impl Into<String>) -> Self {
        Self {
            action: action.to_owned(),
            error: Some(message.into()),
            details: Map::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Execution result document: `{"actions": [...]}`.
pub fn execution_result(results: &[ActionResult]) -> Value {
    serde_json::json!({ "actions": results })
}
