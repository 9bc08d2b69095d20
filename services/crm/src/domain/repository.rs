#![allow(async_fn_in_trait)]

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use leadflow_domain::id::{ExecutionId, OrderId, ProjectId, RuleId, StatusId, TemplateId, UserId};
use leadflow_domain::pagination::PageRequest;
use leadflow_domain::status::StatusGroup;

use crate::domain::filter::OrderFilter;
use crate::domain::types::{
    AutomationExecution, AutomationRule, ExecutionClaim, HistoryEntry, NewAutomationRule,
    Operator, Order, OrderChangeSet, OrderStatus, SmsDelivery, SmsMessage, SmsTemplate,
    StatusChange,
};
use crate::error::{CrmServiceError, SmsSendError};

/// Repository for orders and their history.
pub trait OrderRepository: Send + Sync {
    async fn find(
        &self,
        project_id: ProjectId,
        order_id: OrderId,
    ) -> Result<Option<Order>, CrmServiceError>;

    /// Orders matching a trigger filter, ascending by id.
    async fn list_matching(&self, filter: &OrderFilter) -> Result<Vec<Order>, CrmServiceError>;

    /// Unassigned orders of every tenant created at or after `since`, oldest first.
    async fn list_unassigned_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Order>, CrmServiceError>;

    /// Open-work load (orders in processing/accepted groups) per operator.
    /// Operators with no open orders are absent from the map.
    async fn count_open_by_operator(
        &self,
        project_id: ProjectId,
        operators: &[UserId],
    ) -> Result<HashMap<UserId, u64>, CrmServiceError>;

    /// Set the operator only if the order is still unassigned, appending
    /// `history` in the same transaction. Returns `false` if another writer won.
    async fn assign_if_unassigned(
        &self,
        order_id: OrderId,
        operator_id: UserId,
        history: &HistoryEntry,
    ) -> Result<bool, CrmServiceError>;

    /// Orders in a shipped-group status with a tracking number whose
    /// `shipped_at` lies in `[from, until]`, across all tenants.
    async fn list_shipped_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Order>, CrmServiceError>;

    /// Move an order to a new status and append `history` atomically.
    async fn apply_status_change(
        &self,
        order_id: OrderId,
        change: &StatusChange,
        history: &HistoryEntry,
    ) -> Result<(), CrmServiceError>;

    /// Full audit trail of an order, oldest first.
    async fn history(&self, order_id: OrderId) -> Result<Vec<HistoryEntry>, CrmServiceError>;
}

/// Repository for tenant-defined order statuses.
pub trait StatusRepository: Send + Sync {
    async fn find(
        &self,
        project_id: ProjectId,
        status_id: StatusId,
    ) -> Result<Option<OrderStatus>, CrmServiceError>;

    /// Lowest-position status of a group in a project.
    async fn first_in_group(
        &self,
        project_id: ProjectId,
        group: StatusGroup,
    ) -> Result<Option<OrderStatus>, CrmServiceError>;
}

/// Repository for automation rules.
pub trait RuleRepository: Send + Sync {
    /// Active rules of every tenant, priority descending then id ascending.
    async fn list_active(&self) -> Result<Vec<AutomationRule>, CrmServiceError>;

    /// Add `executions` to the rule's counter and stamp `last_executed_at`.
    async fn record_run(
        &self,
        rule_id: RuleId,
        executions: u32,
        at: DateTime<Utc>,
    ) -> Result<(), CrmServiceError>;

    async fn list(
        &self,
        project_id: ProjectId,
        page: PageRequest,
    ) -> Result<Vec<AutomationRule>, CrmServiceError>;

    async fn find(
        &self,
        project_id: ProjectId,
        rule_id: RuleId,
    ) -> Result<Option<AutomationRule>, CrmServiceError>;

    async fn create(
        &self,
        rule: &NewAutomationRule,
        at: DateTime<Utc>,
    ) -> Result<AutomationRule, CrmServiceError>;

    /// Returns `None` if the rule does not exist in the project.
    async fn update_settings(
        &self,
        project_id: ProjectId,
        rule_id: RuleId,
        is_active: Option<bool>,
        priority: Option<i32>,
        at: DateTime<Utc>,
    ) -> Result<Option<AutomationRule>, CrmServiceError>;
}

/// Execution log and committer.
pub trait ExecutionRepository: Send + Sync {
    /// Insert a `running` execution. Returns `None` when a running or completed
    /// execution already holds the (rule, order) pair.
    async fn claim(&self, claim: &ExecutionClaim) -> Result<Option<ExecutionId>, CrmServiceError>;

    /// Start time of the most recent execution for the pair, in any state.
    async fn last_started_at(
        &self,
        rule_id: RuleId,
        order_id: OrderId,
    ) -> Result<Option<DateTime<Utc>>, CrmServiceError>;

    /// Commit the order changes, history, SMS rows, outbox events and the
    /// `completed` transition in a single transaction.
    async fn complete(
        &self,
        execution_id: ExecutionId,
        order_id: OrderId,
        changes: &OrderChangeSet,
        result: &Value,
        at: DateTime<Utc>,
    ) -> Result<(), CrmServiceError>;

    /// Mark a running execution `failed`. Terminal executions are left untouched.
    async fn fail(
        &self,
        execution_id: ExecutionId,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CrmServiceError>;

    /// Mark every `running` execution started before `cutoff` as `failed`,
    /// releasing its (rule, order) pair. Returns the number released.
    async fn fail_stale(
        &self,
        cutoff: DateTime<Utc>,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, CrmServiceError>;

    /// Executions of a rule, newest first.
    async fn list_by_rule(
        &self,
        rule_id: RuleId,
        page: PageRequest,
    ) -> Result<Vec<AutomationExecution>, CrmServiceError>;
}

/// Repository for auto-assignment candidates.
pub trait OperatorRepository: Send + Sync {
    /// Active users with auto-assignment enabled in the project, ascending by id.
    async fn list_assignable(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Operator>, CrmServiceError>;
}

/// Repository for SMS templates.
pub trait TemplateRepository: Send + Sync {
    async fn find(
        &self,
        project_id: ProjectId,
        template_id: TemplateId,
    ) -> Result<Option<SmsTemplate>, CrmServiceError>;
}

/// Queue of outbound SMS rows.
pub trait SmsOutboxRepository: Send + Sync {
    /// Move up to `limit` pending rows (oldest first) to `processing` and return them.
    async fn claim_pending(&self, limit: u64) -> Result<Vec<SmsMessage>, CrmServiceError>;

    async fn mark_sent(
        &self,
        id: i32,
        delivery: &SmsDelivery,
        at: DateTime<Utc>,
    ) -> Result<(), CrmServiceError>;

    async fn mark_failed(&self, id: i32, error: &str) -> Result<(), CrmServiceError>;
}

/// SMS provider.
pub trait SmsGateway: Send + Sync {
    async fn send(&self, message: &SmsMessage) -> Result<SmsDelivery, SmsSendError>;
}

/// Local business-hours check for a customer city.
pub trait WorkingHoursResolver: Send + Sync {
    /// `None` when the city's timezone is unknown.
    fn is_working_hours(&self, city: &str, at: DateTime<Utc>) -> Option<bool>;
}
