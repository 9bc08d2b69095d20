use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::time::Instant;

use leadflow_crm::config::EngineConfig;
use leadflow_crm::domain::filter::OrderFilter;
use leadflow_crm::domain::repository::{
    ExecutionRepository, OperatorRepository, OrderRepository, RuleRepository, SmsGateway,
    SmsOutboxRepository, StatusRepository, TemplateRepository,
};
use leadflow_crm::domain::types::{
    AutomationExecution, AutomationRule, ExecutionClaim, ExecutionStatus, HistoryEntry,
    NewAutomationRule, Operator, Order, OrderChangeSet, OrderStatus, OutboxEvent, SmsDelivery,
    SmsMessage, SmsStatus, SmsTemplate, StatusChange,
};
use leadflow_crm::error::{CrmServiceError, SmsSendError};
use leadflow_crm::usecase::automation::ProcessAutomationUseCase;
use leadflow_crm::usecase::automation::executor::ActionExecutor;
use leadflow_domain::id::{ExecutionId, OrderId, ProjectId, RuleId, StatusId, TemplateId, UserId};
use leadflow_domain::pagination::PageRequest;
use leadflow_domain::status::StatusGroup;
use leadflow_testing::clock::FixedClock;

// ── Store ────────────────────────────────────────────────────────────────────

/// Rows of the in-memory CRM database.
#[derive(Default)]
pub struct Store {
    pub orders: Vec<Order>,
    pub statuses: Vec<OrderStatus>,
    pub rules: Vec<AutomationRule>,
    pub executions: Vec<AutomationExecution>,
    pub history: Vec<HistoryEntry>,
    pub operators: Vec<Operator>,
    pub templates: Vec<SmsTemplate>,
    pub sms: Vec<SmsMessage>,
    pub deliveries: HashMap<i32, SmsDelivery>,
    pub sms_errors: HashMap<i32, String>,
    pub outbox: Vec<OutboxEvent>,
    /// When set, `complete` fails as if the database went away mid-commit.
    pub fail_commits: bool,
    /// SMS ids whose `mark_sent` / `mark_failed` write fails.
    pub unwritable_sms: Vec<i32>,
    /// Latency of `list_matching`, standing in for a slow trigger query.
    pub list_delay: Option<StdDuration>,
    /// Latency of status lookups made while actions run.
    pub status_lookup_delay: Option<StdDuration>,
}

impl Store {
    pub fn order(&self, id: OrderId) -> &Order {
        self.orders.iter().find(|o| o.id == id).unwrap()
    }

    pub fn executions_for(&self, rule_id: RuleId, order_id: OrderId) -> Vec<&AutomationExecution> {
        self.executions
            .iter()
            .filter(|e| e.rule_id == rule_id && e.order_id == order_id)
            .collect()
    }

    pub fn history_for(&self, order_id: OrderId) -> Vec<&HistoryEntry> {
        self.history.iter().filter(|h| h.order_id == order_id).collect()
    }

    fn status(&self, id: StatusId) -> Option<&OrderStatus> {
        self.statuses.iter().find(|s| s.id == id)
    }

    fn order_mut(&mut self, id: OrderId) -> Result<&mut Order, CrmServiceError> {
        self.orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(CrmServiceError::OrderNotFound)
    }
}

/// In-memory implementation of every repository port. Clones share the store,
/// so one clone can be handed to each use-case field while the test keeps a
/// handle for inspection.
#[derive(Clone, Default)]
pub struct InMemoryCrm {
    pub store: Arc<Mutex<Store>>,
}

impl InMemoryCrm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a shared handle to the store for setup and post-execution inspection.
    pub fn store_handle(&self) -> Arc<Mutex<Store>> {
        Arc::clone(&self.store)
    }

    pub fn with(self, setup: impl FnOnce(&mut Store)) -> Self {
        setup(&mut self.store.lock().unwrap());
        self
    }
}

// ── Order repository ─────────────────────────────────────────────────────────

impl OrderRepository for InMemoryCrm {
    async fn find(
        &self,
        project_id: ProjectId,
        order_id: OrderId,
    ) -> Result<Option<Order>, CrmServiceError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .orders
            .iter()
            .find(|o| o.id == order_id && o.project_id == project_id)
            .cloned())
    }

    async fn list_matching(&self, filter: &OrderFilter) -> Result<Vec<Order>, CrmServiceError> {
        let delay = self.store.lock().unwrap().list_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let store = self.store.lock().unwrap();
        let mut orders: Vec<Order> = store
            .orders
            .iter()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn list_unassigned_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Order>, CrmServiceError> {
        let store = self.store.lock().unwrap();
        let mut orders: Vec<Order> = store
            .orders
            .iter()
            .filter(|o| o.operator_id.is_none() && o.created_at >= since)
            .cloned()
            .collect();
        orders.sort_by_key(|o| (o.created_at, o.id));
        Ok(orders)
    }

    async fn count_open_by_operator(
        &self,
        project_id: ProjectId,
        operators: &[UserId],
    ) -> Result<HashMap<UserId, u64>, CrmServiceError> {
        let store = self.store.lock().unwrap();
        let mut loads = HashMap::new();
        for order in &store.orders {
            let Some(operator_id) = order.operator_id else {
                continue;
            };
            let open = store
                .status(order.status_id)
                .is_some_and(|s| s.group.is_open());
            if order.project_id == project_id && open && operators.contains(&operator_id) {
                *loads.entry(operator_id).or_insert(0) += 1;
            }
        }
        Ok(loads)
    }

    async fn assign_if_unassigned(
        &self,
        order_id: OrderId,
        operator_id: UserId,
        history: &HistoryEntry,
    ) -> Result<bool, CrmServiceError> {
        let mut store = self.store.lock().unwrap();
        let order = store.order_mut(order_id)?;
        if order.operator_id.is_some() {
            return Ok(false);
        }
        order.operator_id = Some(operator_id);
        order.updated_at = history.created_at;
        store.history.push(history.clone());
        Ok(true)
    }

    async fn list_shipped_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Order>, CrmServiceError> {
        let store = self.store.lock().unwrap();
        let mut orders: Vec<Order> = store
            .orders
            .iter()
            .filter(|o| {
                store
                    .status(o.status_id)
                    .is_some_and(|s| s.group == StatusGroup::Shipped)
            })
            .filter(|o| o.tracking_number.as_deref().is_some_and(|t| !t.is_empty()))
            .filter(|o| o.shipped_at.is_some_and(|at| at >= from && at <= until))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn apply_status_change(
        &self,
        order_id: OrderId,
        change: &StatusChange,
        history: &HistoryEntry,
    ) -> Result<(), CrmServiceError> {
        let mut store = self.store.lock().unwrap();
        store.order_mut(order_id)?.apply_status_change(change);
        store.history.push(history.clone());
        Ok(())
    }

    async fn history(&self, order_id: OrderId) -> Result<Vec<HistoryEntry>, CrmServiceError> {
        let store = self.store.lock().unwrap();
        Ok(store.history_for(order_id).into_iter().cloned().collect())
    }
}

// ── Status repository ────────────────────────────────────────────────────────

impl StatusRepository for InMemoryCrm {
    async fn find(
        &self,
        project_id: ProjectId,
        status_id: StatusId,
    ) -> Result<Option<OrderStatus>, CrmServiceError> {
        let delay = self.store.lock().unwrap().status_lookup_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let store = self.store.lock().unwrap();
        Ok(store
            .statuses
            .iter()
            .find(|s| s.id == status_id && s.project_id == project_id)
            .cloned())
    }

    async fn first_in_group(
        &self,
        project_id: ProjectId,
        group: StatusGroup,
    ) -> Result<Option<OrderStatus>, CrmServiceError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .statuses
            .iter()
            .filter(|s| s.project_id == project_id && s.group == group)
            .min_by_key(|s| (s.position, s.id))
            .cloned())
    }
}

// ── Rule repository ──────────────────────────────────────────────────────────

impl RuleRepository for InMemoryCrm {
    async fn list_active(&self) -> Result<Vec<AutomationRule>, CrmServiceError> {
        let store = self.store.lock().unwrap();
        let mut rules: Vec<AutomationRule> =
            store.rules.iter().filter(|r| r.is_active).cloned().collect();
        rules.sort_by_key(|r| (std::cmp::Reverse(r.priority), r.id));
        Ok(rules)
    }

    async fn record_run(
        &self,
        rule_id: RuleId,
        executions: u32,
        at: DateTime<Utc>,
    ) -> Result<(), CrmServiceError> {
        let mut store = self.store.lock().unwrap();
        if let Some(rule) = store.rules.iter_mut().find(|r| r.id == rule_id) {
            rule.executions_count += executions as i32;
            rule.last_executed_at = Some(at);
        }
        Ok(())
    }

    async fn list(
        &self,
        project_id: ProjectId,
        page: PageRequest,
    ) -> Result<Vec<AutomationRule>, CrmServiceError> {
        let store = self.store.lock().unwrap();
        let mut rules: Vec<AutomationRule> = store
            .rules
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect();
        rules.sort_by_key(|r| (std::cmp::Reverse(r.priority), r.id));
        Ok(rules
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn find(
        &self,
        project_id: ProjectId,
        rule_id: RuleId,
    ) -> Result<Option<AutomationRule>, CrmServiceError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .rules
            .iter()
            .find(|r| r.id == rule_id && r.project_id == project_id)
            .cloned())
    }

    async fn create(
        &self,
        rule: &NewAutomationRule,
        at: DateTime<Utc>,
    ) -> Result<AutomationRule, CrmServiceError> {
        let mut store = self.store.lock().unwrap();
        let id = store.rules.iter().map(|r| r.id.0).max().unwrap_or(0) + 1;
        let created = AutomationRule {
            id: RuleId(id),
            project_id: rule.project_id,
            name: rule.name.clone(),
            description: rule.description.clone(),
            trigger_conditions: rule.trigger_conditions.clone(),
            actions: rule.actions.clone(),
            is_active: rule.is_active,
            priority: rule.priority,
            executions_count: 0,
            last_executed_at: None,
            created_at: at,
        };
        store.rules.push(created.clone());
        Ok(created)
    }

    async fn update_settings(
        &self,
        project_id: ProjectId,
        rule_id: RuleId,
        is_active: Option<bool>,
        priority: Option<i32>,
        _at: DateTime<Utc>,
    ) -> Result<Option<AutomationRule>, CrmServiceError> {
        let mut store = self.store.lock().unwrap();
        let Some(rule) = store
            .rules
            .iter_mut()
            .find(|r| r.id == rule_id && r.project_id == project_id)
        else {
            return Ok(None);
        };
        if let Some(is_active) = is_active {
            rule.is_active = is_active;
        }
        if let Some(priority) = priority {
            rule.priority = priority;
        }
        Ok(Some(rule.clone()))
    }
}

// ── Execution repository ─────────────────────────────────────────────────────

impl ExecutionRepository for InMemoryCrm {
    async fn claim(&self, claim: &ExecutionClaim) -> Result<Option<ExecutionId>, CrmServiceError> {
        let mut store = self.store.lock().unwrap();
        let held = !claim.refireable
            && store.executions.iter().any(|e| {
                e.rule_id == claim.rule_id
                    && e.order_id == claim.order_id
                    && !e.refireable
                    && matches!(e.status, ExecutionStatus::Running | ExecutionStatus::Completed)
            });
        if held {
            return Ok(None);
        }
        let id = ExecutionId(store.executions.len() as i64 + 1);
        store.executions.push(AutomationExecution {
            id,
            rule_id: claim.rule_id,
            order_id: claim.order_id,
            status: ExecutionStatus::Running,
            refireable: claim.refireable,
            result: None,
            error_message: None,
            started_at: claim.started_at,
            completed_at: None,
        });
        Ok(Some(id))
    }

    async fn last_started_at(
        &self,
        rule_id: RuleId,
        order_id: OrderId,
    ) -> Result<Option<DateTime<Utc>>, CrmServiceError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .executions_for(rule_id, order_id)
            .into_iter()
            .map(|e| e.started_at)
            .max())
    }

    async fn complete(
        &self,
        execution_id: ExecutionId,
        order_id: OrderId,
        changes: &OrderChangeSet,
        result: &Value,
        at: DateTime<Utc>,
    ) -> Result<(), CrmServiceError> {
        let mut store = self.store.lock().unwrap();
        if store.fail_commits {
            return Err(anyhow::anyhow!("connection reset by peer").into());
        }
        let execution = store
            .executions
            .iter_mut()
            .find(|e| e.id == execution_id && e.status == ExecutionStatus::Running)
            .ok_or_else(|| anyhow::anyhow!("execution {execution_id} is no longer running"))?;
        execution.status = ExecutionStatus::Completed;
        execution.result = Some(result.clone());
        execution.completed_at = Some(at);

        let order = store.order_mut(order_id)?;
        for change in &changes.status_changes {
            order.apply_status_change(change);
        }
        if let Some(operator_id) = changes.operator_id {
            order.operator_id = Some(operator_id);
            order.updated_at = at;
        }
        if let Some(next_call_at) = changes.next_call_at {
            order.next_call_at = Some(next_call_at);
            order.updated_at = at;
        }
        store.history.extend(changes.history.iter().cloned());
        for message in &changes.sms {
            let id = store.sms.len() as i32 + 1;
            store.sms.push(SmsMessage {
                id,
                project_id: message.project_id,
                order_id: message.order_id,
                phone_number: message.phone_number.clone(),
                content: message.content.clone(),
                status: SmsStatus::Pending,
                created_at: at,
            });
        }
        store.outbox.extend(changes.outbox.iter().cloned());
        Ok(())
    }

    async fn fail(
        &self,
        execution_id: ExecutionId,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CrmServiceError> {
        let mut store = self.store.lock().unwrap();
        if let Some(execution) = store
            .executions
            .iter_mut()
            .find(|e| e.id == execution_id && e.status == ExecutionStatus::Running)
        {
            execution.status = ExecutionStatus::Failed;
            execution.error_message = Some(message.to_owned());
            execution.completed_at = Some(at);
        }
        Ok(())
    }

    async fn fail_stale(
        &self,
        cutoff: DateTime<Utc>,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, CrmServiceError> {
        let mut store = self.store.lock().unwrap();
        let mut released = 0;
        for execution in store
            .executions
            .iter_mut()
            .filter(|e| e.status == ExecutionStatus::Running && e.started_at < cutoff)
        {
            execution.status = ExecutionStatus::Failed;
            execution.error_message = Some(message.to_owned());
            execution.completed_at = Some(at);
            released += 1;
        }
        Ok(released)
    }

    async fn list_by_rule(
        &self,
        rule_id: RuleId,
        page: PageRequest,
    ) -> Result<Vec<AutomationExecution>, CrmServiceError> {
        let store = self.store.lock().unwrap();
        let mut executions: Vec<AutomationExecution> = store
            .executions
            .iter()
            .filter(|e| e.rule_id == rule_id)
            .cloned()
            .collect();
        executions.sort_by_key(|e| std::cmp::Reverse(e.id));
        Ok(executions
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }
}

// ── Operator / template repositories ─────────────────────────────────────────

impl OperatorRepository for InMemoryCrm {
    async fn list_assignable(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Operator>, CrmServiceError> {
        let store = self.store.lock().unwrap();
        let mut operators: Vec<Operator> = store
            .operators
            .iter()
            .filter(|op| op.project_id == project_id)
            .cloned()
            .collect();
        operators.sort_by_key(|op| op.user_id);
        Ok(operators)
    }
}

impl TemplateRepository for InMemoryCrm {
    async fn find(
        &self,
        project_id: ProjectId,
        template_id: TemplateId,
    ) -> Result<Option<SmsTemplate>, CrmServiceError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .templates
            .iter()
            .find(|t| t.id == template_id && t.project_id == project_id)
            .cloned())
    }
}

// ── SMS outbox ───────────────────────────────────────────────────────────────

impl SmsOutboxRepository for InMemoryCrm {
    async fn claim_pending(&self, limit: u64) -> Result<Vec<SmsMessage>, CrmServiceError> {
        let mut store = self.store.lock().unwrap();
        let mut pending: Vec<&mut SmsMessage> = store
            .sms
            .iter_mut()
            .filter(|m| m.status == SmsStatus::Pending)
            .collect();
        pending.sort_by_key(|m| (m.created_at, m.id));
        Ok(pending
            .into_iter()
            .take(limit as usize)
            .map(|m| {
                m.status = SmsStatus::Processing;
                m.clone()
            })
            .collect())
    }

    async fn mark_sent(
        &self,
        id: i32,
        delivery: &SmsDelivery,
        _at: DateTime<Utc>,
    ) -> Result<(), CrmServiceError> {
        let mut store = self.store.lock().unwrap();
        if store.unwritable_sms.contains(&id) {
            return Err(anyhow::anyhow!("deadlock detected").into());
        }
        if let Some(message) = store.sms.iter_mut().find(|m| m.id == id) {
            message.status = SmsStatus::Sent;
        }
        store.deliveries.insert(id, delivery.clone());
        Ok(())
    }

    async fn mark_failed(&self, id: i32, error: &str) -> Result<(), CrmServiceError> {
        let mut store = self.store.lock().unwrap();
        if store.unwritable_sms.contains(&id) {
            return Err(anyhow::anyhow!("deadlock detected").into());
        }
        if let Some(message) = store.sms.iter_mut().find(|m| m.id == id) {
            message.status = SmsStatus::Failed;
        }
        store.sms_errors.insert(id, error.to_owned());
        Ok(())
    }
}

// ── MockSmsGateway ───────────────────────────────────────────────────────────

/// Gateway that rejects a configured set of phone numbers and records every
/// attempt.
#[derive(Default)]
pub struct MockSmsGateway {
    pub rejected_phones: Vec<String>,
    pub attempts: Arc<Mutex<Vec<i32>>>,
}

impl MockSmsGateway {
    pub fn rejecting(phones: &[&str]) -> Self {
        Self {
            rejected_phones: phones.iter().map(|p| (*p).to_owned()).collect(),
            attempts: Arc::default(),
        }
    }

    pub fn attempts_handle(&self) -> Arc<Mutex<Vec<i32>>> {
        Arc::clone(&self.attempts)
    }
}

impl SmsGateway for MockSmsGateway {
    async fn send(&self, message: &SmsMessage) -> Result<SmsDelivery, SmsSendError> {
        self.attempts.lock().unwrap().push(message.id);
        if self.rejected_phones.contains(&message.phone_number) {
            return Err(SmsSendError("number blacklisted by provider".to_owned()));
        }
        Ok(SmsDelivery {
            provider: "mock".to_owned(),
            external_id: Some(format!("ext-{}", message.id)),
        })
    }
}

// ── Builders ─────────────────────────────────────────────────────────────────

pub const PROJECT: ProjectId = ProjectId(1);
pub const OTHER_PROJECT: ProjectId = ProjectId(2);

pub const NEW: StatusId = StatusId(1);
pub const ACCEPTED: StatusId = StatusId(2);
pub const SHIPPED: StatusId = StatusId(3);
pub const PAID: StatusId = StatusId(4);
pub const CANCELED: StatusId = StatusId(5);

pub fn status(id: StatusId, project_id: ProjectId, name: &str, group: StatusGroup) -> OrderStatus {
    OrderStatus {
        id,
        project_id,
        name: name.to_owned(),
        group,
        position: id.0,
    }
}

/// One status per interesting group in [`PROJECT`].
pub fn default_statuses() -> Vec<OrderStatus> {
    vec![
        status(NEW, PROJECT, "New", StatusGroup::Processing),
        status(ACCEPTED, PROJECT, "Accepted", StatusGroup::Accepted),
        status(SHIPPED, PROJECT, "Shipped", StatusGroup::Shipped),
        status(PAID, PROJECT, "Delivered", StatusGroup::Paid),
        status(CANCELED, PROJECT, "Canceled", StatusGroup::Canceled),
    ]
}

pub fn order(id: i32, status_id: StatusId, now: DateTime<Utc>) -> Order {
    Order {
        id: OrderId(id),
        project_id: PROJECT,
        customer_name: "Anna Petrova".to_owned(),
        customer_phone: "+79991234567".to_owned(),
        customer_email: Some("anna@example.com".to_owned()),
        city: None,
        address: Some("Lenina 1".to_owned()),
        tracking_number: None,
        total_amount: 150_000,
        status_id,
        operator_id: None,
        call_attempts: 0,
        last_call_result: None,
        next_call_at: None,
        custom_fields: json!({}),
        created_at: now,
        updated_at: now,
        status_updated_at: now,
        approved_at: None,
        shipped_at: None,
        canceled_at: None,
    }
}

pub fn rule(id: i32, trigger: Value, actions: Value, now: DateTime<Utc>) -> AutomationRule {
    AutomationRule {
        id: RuleId(id),
        project_id: PROJECT,
        name: format!("rule {id}"),
        description: None,
        trigger_conditions: trigger,
        actions,
        is_active: true,
        priority: 0,
        executions_count: 0,
        last_executed_at: None,
        created_at: now,
    }
}

pub fn operator(user_id: i32) -> Operator {
    Operator {
        user_id: UserId(user_id),
        project_id: PROJECT,
    }
}

pub fn far_deadline() -> Instant {
    Instant::now() + StdDuration::from_secs(60)
}

pub type Engine = ProcessAutomationUseCase<
    InMemoryCrm,
    InMemoryCrm,
    InMemoryCrm,
    InMemoryCrm,
    InMemoryCrm,
    FixedClock,
>;

/// Automation engine wired entirely to `crm`.
pub fn engine(crm: &InMemoryCrm, clock: &FixedClock) -> Engine {
    ProcessAutomationUseCase {
        rules: crm.clone(),
        orders: crm.clone(),
        executions: crm.clone(),
        executor: ActionExecutor {
            statuses: crm.clone(),
            templates: crm.clone(),
        },
        clock: clock.clone(),
        config: EngineConfig::default(),
    }
}
