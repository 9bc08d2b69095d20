use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use leadflow_domain::call::CallResult;
use leadflow_domain::id::{
    ExecutionId, OrderId, ProjectId, RuleId, StatusId, TemplateId, UserId,
};
use leadflow_domain::status::{LifecycleStamp, StatusGroup};

/// One customer lead / purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub project_id: ProjectId,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub tracking_number: Option<String>,
    /// Order total in minor currency units (kopecks, cents).
    pub total_amount: i64,
    pub status_id: StatusId,
    pub operator_id: Option<UserId>,
    pub call_attempts: i32,
    pub last_call_result: Option<CallResult>,
    pub next_call_at: Option<DateTime<Utc>>,
    pub custom_fields: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status_updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn lifecycle_timestamp(&self, stamp: LifecycleStamp) -> Option<DateTime<Utc>> {
        match stamp {
            LifecycleStamp::Approved => self.approved_at,
            LifecycleStamp::Shipped => self.shipped_at,
            LifecycleStamp::Canceled => self.canceled_at,
        }
    }

    /// Apply a status change in memory with the same first-write-wins rule the
    /// repositories enforce in SQL.
    pub fn apply_status_change(&mut self, change: &StatusChange) {
        self.status_id = change.status_id;
        self.status_updated_at = change.at;
        self.updated_at = change.at;
        if let Some(stamp) = change.stamp {
            let slot = match stamp {
                LifecycleStamp::Approved => &mut self.approved_at,
                LifecycleStamp::Shipped => &mut self.shipped_at,
                LifecycleStamp::Canceled => &mut self.canceled_at,
            };
            slot.get_or_insert(change.at);
        }
    }
}

/// Format minor units as a decimal amount with two fraction digits.
pub fn format_amount(minor_units: i64) -> String {
    let sign = if minor_units < 0 { "-" } else { "" };
    let abs = minor_units.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Tenant-defined order status.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatus {
    pub id: StatusId,
    pub project_id: ProjectId,
    pub name: String,
    pub group: StatusGroup,
    pub position: i32,
}

/// Transition of an order into a new status, computed once and written both to
/// the in-memory order and to storage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusChange {
    pub status_id: StatusId,
    pub at: DateTime<Utc>,
    /// Lifecycle timestamp to stamp if it is still empty.
    pub stamp: Option<LifecycleStamp>,
}

impl StatusChange {
    pub fn to(status: &OrderStatus, at: DateTime<Utc>) -> Self {
        Self {
            status_id: status.id,
            at,
            stamp: status.group.lifecycle_stamp(),
        }
    }
}

/// Automation rule as configured by the tenant. Trigger and action parameters
/// stay raw JSON here and are parsed by the engine at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationRule {
    pub id: RuleId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub trigger_conditions: Value,
    pub actions: Value,
    pub is_active: bool,
    pub priority: i32,
    pub executions_count: i32,
    pub last_executed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a rule.
#[derive(Debug, Clone)]
pub struct NewAutomationRule {
    pub project_id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub trigger_conditions: Value,
    pub actions: Value,
    pub is_active: bool,
    pub priority: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One attempted run of a rule's actions against one order.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationExecution {
    pub id: ExecutionId,
    pub rule_id: RuleId,
    pub order_id: OrderId,
    pub status: ExecutionStatus,
    /// Re-fireable executions are not covered by the dedup index.
    pub refireable: bool,
    pub result: Option<Value>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Claim request for a new execution row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionClaim {
    pub rule_id: RuleId,
    pub order_id: OrderId,
    pub refireable: bool,
    pub started_at: DateTime<Utc>,
}

/// Kinds of order history entries written by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    StatusChanged,
    StatusChangedByAutomation,
    OperatorAssignedByAutomation,
    CommentAddedByAutomation,
    AutoAssigned,
    StatusUpdatedByShipping,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatusChanged => "status_changed",
            Self::StatusChangedByAutomation => "status_changed_by_automation",
            Self::OperatorAssignedByAutomation => "operator_assigned_by_automation",
            Self::CommentAddedByAutomation => "comment_added_by_automation",
            Self::AutoAssigned => "auto_assigned",
            Self::StatusUpdatedByShipping => "status_updated_by_shipping",
        }
    }
}

/// Append-only audit record. `user_id` is `None` for system actions.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub order_id: OrderId,
    pub user_id: Option<UserId>,
    pub action: String,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(order_id: OrderId, action: HistoryAction, created_at: DateTime<Utc>) -> Self {
        Self {
            order_id,
            user_id: None,
            action: action.as_str().to_owned(),
            field_name: None,
            old_value: None,
            new_value: None,
            comment: None,
            created_at,
        }
    }

    pub fn by(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn field(
        mut self,
        name: &str,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        self.field_name = Some(name.to_owned());
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Project member eligible for automatic assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub user_id: UserId,
    pub project_id: ProjectId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmsTemplate {
    pub id: TemplateId,
    pub project_id: ProjectId,
    pub name: String,
    pub content: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsStatus {
    Pending,
    Processing,
    Sent,
    Failed,
}

impl SmsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

/// Outbound SMS queued for the dispatch job.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSmsMessage {
    pub project_id: ProjectId,
    pub order_id: Option<OrderId>,
    pub template_id: Option<TemplateId>,
    pub phone_number: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmsMessage {
    pub id: i32,
    pub project_id: ProjectId,
    pub order_id: Option<OrderId>,
    pub phone_number: String,
    pub content: String,
    pub status: SmsStatus,
    pub created_at: DateTime<Utc>,
}

/// Provider acknowledgement for a sent SMS.
#[derive(Debug, Clone, PartialEq)]
pub struct SmsDelivery {
    pub provider: String,
    pub external_id: Option<String>,
}

/// Outbox event for async delivery (order notification emails).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub kind: String,
    pub payload: Value,
    pub idempotency_key: String,
}

/// Outbox event kind consumed by the email sender.
pub const ORDER_NOTIFICATION_EMAIL: &str = "order_notification_email";

/// Everything one execution writes, committed in a single transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderChangeSet {
    /// Applied in order; each one stamps its own lifecycle timestamp.
    pub status_changes: Vec<StatusChange>,
    pub operator_id: Option<UserId>,
    pub next_call_at: Option<DateTime<Utc>>,
    pub history: Vec<HistoryEntry>,
    pub sms: Vec<NewSmsMessage>,
    pub outbox: Vec<OutboxEvent>,
}
