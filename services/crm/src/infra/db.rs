use std::collections::HashMap;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, FromQueryResult, IntoActiveModel as _, QueryFilter, QueryOrder,
    QuerySelect, SqlErr, TransactionTrait,
    sea_query::{Expr, Func, LockBehavior, LockType, SimpleExpr},
};
use serde_json::Value;

use leadflow_crm_schema::{
    automation_executions, automation_rules, order_history, order_statuses, orders,
    outbox_events, project_users, sms_messages, sms_templates, users,
};
use leadflow_domain::id::{
    ExecutionId, OrderId, ProjectId, RuleId, StatusId, TemplateId, UserId,
};
use leadflow_domain::pagination::PageRequest;
use leadflow_domain::status::{LifecycleStamp, StatusGroup};

use crate::domain::filter::OrderFilter;
use crate::domain::repository::{
    ExecutionRepository, OperatorRepository, OrderRepository, RuleRepository,
    SmsOutboxRepository, StatusRepository, TemplateRepository,
};
use crate::domain::types::{
    AutomationExecution, AutomationRule, ExecutionClaim, ExecutionStatus, HistoryEntry,
    NewAutomationRule, NewSmsMessage, Operator, Order, OrderChangeSet, OrderStatus,
    OutboxEvent, SmsDelivery, SmsMessage, SmsStatus, SmsTemplate, StatusChange,
};
use crate::error::CrmServiceError;

// ── Order repository ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOrderRepository {
    pub db: DatabaseConnection,
}

#[derive(Debug, FromQueryResult)]
struct OperatorLoad {
    operator_id: i32,
    load: i64,
}

impl OrderRepository for DbOrderRepository {
    async fn find(
        &self,
        project_id: ProjectId,
        order_id: OrderId,
    ) -> Result<Option<Order>, CrmServiceError> {
        let model = orders::Entity::find_by_id(order_id.0)
            .filter(orders::Column::ProjectId.eq(project_id.0))
            .one(&self.db)
            .await
            .context("find order")?;
        Ok(model.map(order_from_model))
    }

    async fn list_matching(&self, filter: &OrderFilter) -> Result<Vec<Order>, CrmServiceError> {
        let mut query =
            orders::Entity::find().filter(orders::Column::ProjectId.eq(filter.project_id.0));
        if let Some(status_id) = filter.status_id {
            query = query.filter(orders::Column::StatusId.eq(status_id.0));
        }
        if let Some(since) = filter.status_updated_since {
            query = query.filter(orders::Column::StatusUpdatedAt.gte(since));
        }
        if let Some(until) = filter.status_updated_until {
            query = query.filter(orders::Column::StatusUpdatedAt.lte(until));
        }
        if let Some(since) = filter.created_since {
            query = query.filter(orders::Column::CreatedAt.gte(since));
        }
        if !filter.last_call_results.is_empty() {
            query = query.filter(
                orders::Column::LastCallResult
                    .is_in(filter.last_call_results.iter().map(|result| result.as_str())),
            );
        }
        let models = query
            .order_by_asc(orders::Column::Id)
            .all(&self.db)
            .await
            .context("list orders matching trigger")?;
        Ok(models.into_iter().map(order_from_model).collect())
    }

    async fn list_unassigned_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Order>, CrmServiceError> {
        let models = orders::Entity::find()
            .filter(orders::Column::OperatorId.is_null())
            .filter(orders::Column::CreatedAt.gte(since))
            .order_by_asc(orders::Column::CreatedAt)
            .order_by_asc(orders::Column::Id)
            .all(&self.db)
            .await
            .context("list unassigned orders")?;
        Ok(models.into_iter().map(order_from_model).collect())
    }

    async fn count_open_by_operator(
        &self,
        project_id: ProjectId,
        operators: &[UserId],
    ) -> Result<HashMap<UserId, u64>, CrmServiceError> {
        if operators.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = orders::Entity::find()
            .select_only()
            .column(orders::Column::OperatorId)
            .column_as(Expr::col((orders::Entity, orders::Column::Id)).count(), "load")
            .inner_join(order_statuses::Entity)
            .filter(orders::Column::ProjectId.eq(project_id.0))
            .filter(orders::Column::OperatorId.is_in(operators.iter().map(|id| id.0)))
            .filter(
                order_statuses::Column::StatusGroup
                    .is_in(StatusGroup::OPEN.iter().map(|group| group.as_str())),
            )
            .group_by(orders::Column::OperatorId)
            .into_model::<OperatorLoad>()
            .all(&self.db)
            .await
            .context("count open orders per operator")?;
        Ok(rows
            .into_iter()
            .map(|row| (UserId(row.operator_id), row.load.max(0) as u64))
            .collect())
    }

    async fn assign_if_unassigned(
        &self,
        order_id: OrderId,
        operator_id: UserId,
        history: &HistoryEntry,
    ) -> Result<bool, CrmServiceError> {
        let assigned = self
            .db
            .transaction::<_, bool, DbErr>(|txn| {
                let history = history.clone();
                Box::pin(async move {
                    let result = orders::Entity::update_many()
                        .col_expr(orders::Column::OperatorId, Expr::value(operator_id.0))
                        .col_expr(orders::Column::UpdatedAt, Expr::value(history.created_at))
                        .filter(orders::Column::Id.eq(order_id.0))
                        .filter(orders::Column::OperatorId.is_null())
                        .exec(txn)
                        .await?;
                    if result.rows_affected == 0 {
                        return Ok(false);
                    }
                    insert_history(txn, &history).await?;
                    Ok(true)
                })
            })
            .await
            .context("assign order operator")?;
        Ok(assigned)
    }

    async fn list_shipped_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Order>, CrmServiceError> {
        let models = orders::Entity::find()
            .inner_join(order_statuses::Entity)
            .filter(order_statuses::Column::StatusGroup.eq(StatusGroup::Shipped.as_str()))
            .filter(orders::Column::TrackingNumber.is_not_null())
            .filter(orders::Column::TrackingNumber.ne(""))
            .filter(orders::Column::ShippedAt.gte(from))
            .filter(orders::Column::ShippedAt.lte(until))
            .order_by_asc(orders::Column::Id)
            .all(&self.db)
            .await
            .context("list shipped orders")?;
        Ok(models.into_iter().map(order_from_model).collect())
    }

    async fn apply_status_change(
        &self,
        order_id: OrderId,
        change: &StatusChange,
        history: &HistoryEntry,
    ) -> Result<(), CrmServiceError> {
        self.db
            .transaction::<_, (), DbErr>(|txn| {
                let change = *change;
                let history = history.clone();
                Box::pin(async move {
                    update_status(txn, order_id, &change).await?;
                    insert_history(txn, &history).await?;
                    Ok(())
                })
            })
            .await
            .context("apply order status change")?;
        Ok(())
    }

    async fn history(&self, order_id: OrderId) -> Result<Vec<HistoryEntry>, CrmServiceError> {
        let models = order_history::Entity::find()
            .filter(order_history::Column::OrderId.eq(order_id.0))
            .order_by_asc(order_history::Column::Id)
            .all(&self.db)
            .await
            .context("list order history")?;
        Ok(models.into_iter().map(history_from_model).collect())
    }
}

fn stamp_column(stamp: LifecycleStamp) -> orders::Column {
    match stamp {
        LifecycleStamp::Approved => orders::Column::ApprovedAt,
        LifecycleStamp::Shipped => orders::Column::ShippedAt,
        LifecycleStamp::Canceled => orders::Column::CanceledAt,
    }
}

/// Status transition with first-write-wins lifecycle stamp.
async fn update_status(
    txn: &DatabaseTransaction,
    order_id: OrderId,
    change: &StatusChange,
) -> Result<(), DbErr> {
    let mut update = orders::Entity::update_many()
        .col_expr(orders::Column::StatusId, Expr::value(change.status_id.0))
        .col_expr(orders::Column::StatusUpdatedAt, Expr::value(change.at))
        .col_expr(orders::Column::UpdatedAt, Expr::value(change.at));
    if let Some(stamp) = change.stamp {
        let column = stamp_column(stamp);
        let stamped: SimpleExpr = Func::coalesce([
            Expr::col(column).into(),
            Expr::value(change.at),
        ])
        .into();
        update = update.col_expr(column, stamped);
    }
    update
        .filter(orders::Column::Id.eq(order_id.0))
        .exec(txn)
        .await?;
    Ok(())
}

async fn insert_history(txn: &DatabaseTransaction, entry: &HistoryEntry) -> Result<(), DbErr> {
    order_history::ActiveModel {
        order_id: Set(entry.order_id.0),
        user_id: Set(entry.user_id.map(|id| id.0)),
        action: Set(entry.action.clone()),
        field_name: Set(entry.field_name.clone()),
        old_value: Set(entry.old_value.clone()),
        new_value: Set(entry.new_value.clone()),
        comment: Set(entry.comment.clone()),
        created_at: Set(entry.created_at),
        ..Default::default()
    }
    .insert(txn)
    .await?;
    Ok(())
}

async fn insert_sms(
    txn: &DatabaseTransaction,
    message: &NewSmsMessage,
    at: DateTime<Utc>,
) -> Result<(), DbErr> {
    sms_messages::ActiveModel {
        project_id: Set(message.project_id.0),
        order_id: Set(message.order_id.map(|id| id.0)),
        template_id: Set(message.template_id.map(|id| id.0)),
        phone_number: Set(message.phone_number.clone()),
        content: Set(message.content.clone()),
        status: Set(SmsStatus::Pending.as_str().to_owned()),
        provider: Set(None),
        external_id: Set(None),
        error_message: Set(None),
        sent_at: Set(None),
        created_at: Set(at),
        ..Default::default()
    }
    .insert(txn)
    .await?;
    Ok(())
}

async fn insert_outbox_event(
    txn: &DatabaseTransaction,
    event: &OutboxEvent,
    at: DateTime<Utc>,
) -> Result<(), DbErr> {
    outbox_events::ActiveModel {
        id: Set(event.id),
        kind: Set(event.kind.clone()),
        payload: Set(event.payload.clone()),
        idempotency_key: Set(event.idempotency_key.clone()),
        attempts: Set(0),
        last_error: Set(None),
        created_at: Set(at),
        next_attempt_at: Set(at),
        processed_at: Set(None),
        failed_at: Set(None),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn order_from_model(model: orders::Model) -> Order {
    Order {
        id: OrderId(model.id),
        project_id: ProjectId(model.project_id),
        customer_name: model.customer_name,
        customer_phone: model.customer_phone,
        customer_email: model.customer_email,
        city: model.city,
        address: model.address,
        tracking_number: model.tracking_number,
        total_amount: model.total_amount,
        status_id: StatusId(model.status_id),
        operator_id: model.operator_id.map(UserId),
        call_attempts: model.call_attempts,
        last_call_result: model
            .last_call_result
            .as_deref()
            .and_then(|result| result.parse().ok()),
        next_call_at: model.next_call_at,
        custom_fields: model.custom_fields,
        created_at: model.created_at,
        updated_at: model.updated_at,
        status_updated_at: model.status_updated_at,
        approved_at: model.approved_at,
        shipped_at: model.shipped_at,
        canceled_at: model.canceled_at,
    }
}

fn history_from_model(model: order_history::Model) -> HistoryEntry {
    HistoryEntry {
        order_id: OrderId(model.order_id),
        user_id: model.user_id.map(UserId),
        action: model.action,
        field_name: model.field_name,
        old_value: model.old_value,
        new_value: model.new_value,
        comment: model.comment,
        created_at: model.created_at,
    }
}

// ── Status repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbStatusRepository {
    pub db: DatabaseConnection,
}

impl StatusRepository for DbStatusRepository {
    async fn find(
        &self,
        project_id: ProjectId,
        status_id: StatusId,
    ) -> Result<Option<OrderStatus>, CrmServiceError> {
        let model = order_statuses::Entity::find_by_id(status_id.0)
            .filter(order_statuses::Column::ProjectId.eq(project_id.0))
            .one(&self.db)
            .await
            .context("find order status")?;
        model.map(status_from_model).transpose()
    }

    async fn first_in_group(
        &self,
        project_id: ProjectId,
        group: StatusGroup,
    ) -> Result<Option<OrderStatus>, CrmServiceError> {
        let model = order_statuses::Entity::find()
            .filter(order_statuses::Column::ProjectId.eq(project_id.0))
            .filter(order_statuses::Column::StatusGroup.eq(group.as_str()))
            .order_by_asc(order_statuses::Column::Position)
            .order_by_asc(order_statuses::Column::Id)
            .one(&self.db)
            .await
            .context("find first status in group")?;
        model.map(status_from_model).transpose()
    }
}

fn status_from_model(model: order_statuses::Model) -> Result<OrderStatus, CrmServiceError> {
    let group = model
        .status_group
        .parse::<StatusGroup>()
        .with_context(|| format!("order status {}", model.id))?;
    Ok(OrderStatus {
        id: StatusId(model.id),
        project_id: ProjectId(model.project_id),
        name: model.name,
        group,
        position: model.position,
    })
}

// ── Rule repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRuleRepository {
    pub db: DatabaseConnection,
}

impl RuleRepository for DbRuleRepository {
    async fn list_active(&self) -> Result<Vec<AutomationRule>, CrmServiceError> {
        let models = automation_rules::Entity::find()
            .filter(automation_rules::Column::IsActive.eq(true))
            .order_by_desc(automation_rules::Column::Priority)
            .order_by_asc(automation_rules::Column::Id)
            .all(&self.db)
            .await
            .context("list active automation rules")?;
        Ok(models.into_iter().map(rule_from_model).collect())
    }

    async fn record_run(
        &self,
        rule_id: RuleId,
        executions: u32,
        at: DateTime<Utc>,
    ) -> Result<(), CrmServiceError> {
        let executions = i32::try_from(executions).unwrap_or(i32::MAX);
        automation_rules::Entity::update_many()
            .col_expr(
                automation_rules::Column::ExecutionsCount,
                Expr::col(automation_rules::Column::ExecutionsCount).add(executions),
            )
            .col_expr(automation_rules::Column::LastExecutedAt, Expr::value(Some(at)))
            .filter(automation_rules::Column::Id.eq(rule_id.0))
            .exec(&self.db)
            .await
            .context("record automation rule run")?;
        Ok(())
    }

    async fn list(
        &self,
        project_id: ProjectId,
        page: PageRequest,
    ) -> Result<Vec<AutomationRule>, CrmServiceError> {
        let models = automation_rules::Entity::find()
            .filter(automation_rules::Column::ProjectId.eq(project_id.0))
            .order_by_desc(automation_rules::Column::Priority)
            .order_by_asc(automation_rules::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list automation rules")?;
        Ok(models.into_iter().map(rule_from_model).collect())
    }

    async fn find(
        &self,
        project_id: ProjectId,
        rule_id: RuleId,
    ) -> Result<Option<AutomationRule>, CrmServiceError> {
        let model = automation_rules::Entity::find_by_id(rule_id.0)
            .filter(automation_rules::Column::ProjectId.eq(project_id.0))
            .one(&self.db)
            .await
            .context("find automation rule")?;
        Ok(model.map(rule_from_model))
    }

    async fn create(
        &self,
        rule: &NewAutomationRule,
        at: DateTime<Utc>,
    ) -> Result<AutomationRule, CrmServiceError> {
        let model = automation_rules::ActiveModel {
            project_id: Set(rule.project_id.0),
            name: Set(rule.name.clone()),
            description: Set(rule.description.clone()),
            trigger_conditions: Set(rule.trigger_conditions.clone()),
            actions: Set(rule.actions.clone()),
            is_active: Set(rule.is_active),
            priority: Set(rule.priority),
            executions_count: Set(0),
            last_executed_at: Set(None),
            created_at: Set(at),
            updated_at: Set(at),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .context("create automation rule")?;
        Ok(rule_from_model(model))
    }

    async fn update_settings(
        &self,
        project_id: ProjectId,
        rule_id: RuleId,
        is_active: Option<bool>,
        priority: Option<i32>,
        at: DateTime<Utc>,
    ) -> Result<Option<AutomationRule>, CrmServiceError> {
        let Some(model) = automation_rules::Entity::find_by_id(rule_id.0)
            .filter(automation_rules::Column::ProjectId.eq(project_id.0))
            .one(&self.db)
            .await
            .context("find automation rule for update")?
        else {
            return Ok(None);
        };
        let mut active = model.into_active_model();
        if let Some(is_active) = is_active {
            active.is_active = Set(is_active);
        }
        if let Some(priority) = priority {
            active.priority = Set(priority);
        }
        active.updated_at = Set(at);
        let model = active
            .update(&self.db)
            .await
            .context("update automation rule settings")?;
        Ok(Some(rule_from_model(model)))
    }
}

fn rule_from_model(model: automation_rules::Model) -> AutomationRule {
    AutomationRule {
        id: RuleId(model.id),
        project_id: ProjectId(model.project_id),
        name: model.name,
        description: model.description,
        trigger_conditions: model.trigger_conditions,
        actions: model.actions,
        is_active: model.is_active,
        priority: model.priority,
        executions_count: model.executions_count,
        last_executed_at: model.last_executed_at,
        created_at: model.created_at,
    }
}

// ── Execution repository ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbExecutionRepository {
    pub db: DatabaseConnection,
}

impl ExecutionRepository for DbExecutionRepository {
    async fn claim(&self, claim: &ExecutionClaim) -> Result<Option<ExecutionId>, CrmServiceError> {
        let inserted = automation_executions::ActiveModel {
            rule_id: Set(claim.rule_id.0),
            order_id: Set(claim.order_id.0),
            status: Set(ExecutionStatus::Running.as_str().to_owned()),
            refireable: Set(claim.refireable),
            result: Set(None),
            error_message: Set(None),
            started_at: Set(claim.started_at),
            completed_at: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await;
        match inserted {
            Ok(model) => Ok(Some(ExecutionId(model.id))),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e)
                .context("claim automation execution")
                .into()),
        }
    }

    async fn last_started_at(
        &self,
        rule_id: RuleId,
        order_id: OrderId,
    ) -> Result<Option<DateTime<Utc>>, CrmServiceError> {
        let model = automation_executions::Entity::find()
            .filter(automation_executions::Column::RuleId.eq(rule_id.0))
            .filter(automation_executions::Column::OrderId.eq(order_id.0))
            .order_by_desc(automation_executions::Column::StartedAt)
            .one(&self.db)
            .await
            .context("find last automation execution")?;
        Ok(model.map(|m| m.started_at))
    }

    async fn complete(
        &self,
        execution_id: ExecutionId,
        order_id: OrderId,
        changes: &OrderChangeSet,
        result: &Value,
        at: DateTime<Utc>,
    ) -> Result<(), CrmServiceError> {
        self.db
            .transaction::<_, (), DbErr>(|txn| {
                let changes = changes.clone();
                let result = result.clone();
                Box::pin(async move {
                    let transitioned = automation_executions::Entity::update_many()
                        .col_expr(
                            automation_executions::Column::Status,
                            Expr::value(ExecutionStatus::Completed.as_str()),
                        )
                        .col_expr(automation_executions::Column::Result, Expr::value(result))
                        .col_expr(automation_executions::Column::CompletedAt, Expr::value(at))
                        .filter(automation_executions::Column::Id.eq(execution_id.0))
                        .filter(
                            automation_executions::Column::Status
                                .eq(ExecutionStatus::Running.as_str()),
                        )
                        .exec(txn)
                        .await?;
                    if transitioned.rows_affected == 0 {
                        return Err(DbErr::Custom(format!(
                            "execution {execution_id} is no longer running"
                        )));
                    }

                    for change in &changes.status_changes {
                        update_status(txn, order_id, change).await?;
                    }
                    if changes.operator_id.is_some() || changes.next_call_at.is_some() {
                        let mut update = orders::Entity::update_many()
                            .col_expr(orders::Column::UpdatedAt, Expr::value(at));
                        if let Some(operator_id) = changes.operator_id {
                            update = update
                                .col_expr(orders::Column::OperatorId, Expr::value(operator_id.0));
                        }
                        if let Some(next_call_at) = changes.next_call_at {
                            update = update
                                .col_expr(orders::Column::NextCallAt, Expr::value(next_call_at));
                        }
                        update
                            .filter(orders::Column::Id.eq(order_id.0))
                            .exec(txn)
                            .await?;
                    }
                    for entry in &changes.history {
                        insert_history(txn, entry).await?;
                    }
                    for message in &changes.sms {
                        insert_sms(txn, message, at).await?;
                    }
                    for event in &changes.outbox {
                        insert_outbox_event(txn, event, at).await?;
                    }
                    Ok(())
                })
            })
            .await
            .context("commit automation execution")?;
        Ok(())
    }

    async fn fail(
        &self,
        execution_id: ExecutionId,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CrmServiceError> {
        automation_executions::Entity::update_many()
            .col_expr(
                automation_executions::Column::Status,
                Expr::value(ExecutionStatus::Failed.as_str()),
            )
            .col_expr(
                automation_executions::Column::ErrorMessage,
                Expr::value(message.to_owned()),
            )
            .col_expr(automation_executions::Column::CompletedAt, Expr::value(at))
            .filter(automation_executions::Column::Id.eq(execution_id.0))
            .filter(automation_executions::Column::Status.eq(ExecutionStatus::Running.as_str()))
            .exec(&self.db)
            .await
            .context("mark automation execution failed")?;
        Ok(())
    }

    async fn fail_stale(
        &self,
        cutoff: DateTime<Utc>,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, CrmServiceError> {
        let released = automation_executions::Entity::update_many()
            .col_expr(
                automation_executions::Column::Status,
                Expr::value(ExecutionStatus::Failed.as_str()),
            )
            .col_expr(
                automation_executions::Column::ErrorMessage,
                Expr::value(message.to_owned()),
            )
            .col_expr(automation_executions::Column::CompletedAt, Expr::value(at))
            .filter(automation_executions::Column::Status.eq(ExecutionStatus::Running.as_str()))
            .filter(automation_executions::Column::StartedAt.lt(cutoff))
            .exec(&self.db)
            .await
            .context("release stale automation executions")?;
        Ok(released.rows_affected)
    }

    async fn list_by_rule(
        &self,
        rule_id: RuleId,
        page: PageRequest,
    ) -> Result<Vec<AutomationExecution>, CrmServiceError> {
        let models = automation_executions::Entity::find()
            .filter(automation_executions::Column::RuleId.eq(rule_id.0))
            .order_by_desc(automation_executions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list automation executions")?;
        models.into_iter().map(execution_from_model).collect()
    }
}

fn execution_from_model(
    model: automation_executions::Model,
) -> Result<AutomationExecution, CrmServiceError> {
    let status = ExecutionStatus::from_db(&model.status)
        .with_context(|| format!("execution {} has unknown status {}", model.id, model.status))?;
    Ok(AutomationExecution {
        id: ExecutionId(model.id),
        rule_id: RuleId(model.rule_id),
        order_id: OrderId(model.order_id),
        status,
        refireable: model.refireable,
        result: model.result,
        error_message: model.error_message,
        started_at: model.started_at,
        completed_at: model.completed_at,
    })
}

// ── Operator repository ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOperatorRepository {
    pub db: DatabaseConnection,
}

impl OperatorRepository for DbOperatorRepository {
    async fn list_assignable(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Operator>, CrmServiceError> {
        let models = project_users::Entity::find()
            .inner_join(users::Entity)
            .filter(project_users::Column::ProjectId.eq(project_id.0))
            .filter(project_users::Column::AutoAssignment.eq(true))
            .filter(users::Column::Status.eq("active"))
            .order_by_asc(project_users::Column::UserId)
            .all(&self.db)
            .await
            .context("list auto-assignable operators")?;
        Ok(models
            .into_iter()
            .map(|m| Operator {
                user_id: UserId(m.user_id),
                project_id: ProjectId(m.project_id),
            })
            .collect())
    }
}

// ── Template repository ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbTemplateRepository {
    pub db: DatabaseConnection,
}

impl TemplateRepository for DbTemplateRepository {
    async fn find(
        &self,
        project_id: ProjectId,
        template_id: TemplateId,
    ) -> Result<Option<SmsTemplate>, CrmServiceError> {
        let model = sms_templates::Entity::find_by_id(template_id.0)
            .filter(sms_templates::Column::ProjectId.eq(project_id.0))
            .one(&self.db)
            .await
            .context("find sms template")?;
        Ok(model.map(|m| SmsTemplate {
            id: TemplateId(m.id),
            project_id: ProjectId(m.project_id),
            name: m.name,
            content: m.content,
            is_active: m.is_active,
        }))
    }
}

// ── SMS outbox repository ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSmsOutboxRepository {
    pub db: DatabaseConnection,
}

impl SmsOutboxRepository for DbSmsOutboxRepository {
    async fn claim_pending(&self, limit: u64) -> Result<Vec<SmsMessage>, CrmServiceError> {
        let models = self
            .db
            .transaction::<_, Vec<sms_messages::Model>, DbErr>(|txn| {
                Box::pin(async move {
                    let models = sms_messages::Entity::find()
                        .filter(sms_messages::Column::Status.eq(SmsStatus::Pending.as_str()))
                        .order_by_asc(sms_messages::Column::CreatedAt)
                        .order_by_asc(sms_messages::Column::Id)
                        .limit(limit)
                        .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
                        .all(txn)
                        .await?;
                    if models.is_empty() {
                        return Ok(models);
                    }
                    sms_messages::Entity::update_many()
                        .col_expr(
                            sms_messages::Column::Status,
                            Expr::value(SmsStatus::Processing.as_str()),
                        )
                        .filter(sms_messages::Column::Id.is_in(models.iter().map(|m| m.id)))
                        .exec(txn)
                        .await?;
                    Ok(models)
                })
            })
            .await
            .context("claim pending sms")?;
        Ok(models
            .into_iter()
            .map(|m| SmsMessage {
                id: m.id,
                project_id: ProjectId(m.project_id),
                order_id: m.order_id.map(OrderId),
                phone_number: m.phone_number,
                content: m.content,
                status: SmsStatus::Processing,
                created_at: m.created_at,
            })
            .collect())
    }

    async fn mark_sent(
        &self,
        id: i32,
        delivery: &SmsDelivery,
        at: DateTime<Utc>,
    ) -> Result<(), CrmServiceError> {
        sms_messages::Entity::update_many()
            .col_expr(
                sms_messages::Column::Status,
                Expr::value(SmsStatus::Sent.as_str()),
            )
            .col_expr(
                sms_messages::Column::Provider,
                Expr::value(delivery.provider.clone()),
            )
            .col_expr(
                sms_messages::Column::ExternalId,
                Expr::value(delivery.external_id.clone()),
            )
            .col_expr(sms_messages::Column::SentAt, Expr::value(Some(at)))
            .filter(sms_messages::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("mark sms sent")?;
        Ok(())
    }

    async fn mark_failed(&self, id: i32, error: &str) -> Result<(), CrmServiceError> {
        sms_messages::Entity::update_many()
            .col_expr(
                sms_messages::Column::Status,
                Expr::value(SmsStatus::Failed.as_str()),
            )
            .col_expr(
                sms_messages::Column::ErrorMessage,
                Expr::value(error.to_owned()),
            )
            .filter(sms_messages::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("mark sms failed")?;
        Ok(())
    }
}
