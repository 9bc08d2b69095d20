use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use leadflow_core::serde::format_rfc3339_ms;
use leadflow_domain::id::{ExecutionId, RuleId, StatusId, TemplateId, UserId};

use crate::domain::automation::{Action, ActionResult, raw_type};
use crate::domain::repository::{StatusRepository, TemplateRepository};
use crate::domain::types::{
    HistoryAction, HistoryEntry, NewSmsMessage, ORDER_NOTIFICATION_EMAIL, Order, OrderChangeSet,
    OutboxEvent, StatusChange, format_amount,
};
use crate::error::CrmServiceError;
use crate::usecase::automation::template::{render_template, template_variables};

pub const DEFAULT_SMS_TEXT: &str = "Order notification";
pub const DEFAULT_EMAIL_TEMPLATE: &str = "order_notification";
pub const DEFAULT_COMMENT: &str = "Automated comment";

/// Identity of the execution an action list runs under.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext {
    pub rule_id: RuleId,
    pub execution_id: ExecutionId,
    pub now: DateTime<Utc>,
}

/// Outcome of running an action list: the writes to commit and one result per
/// action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionPlan {
    pub changes: OrderChangeSet,
    pub results: Vec<ActionResult>,
}

/// Runs a rule's actions in order against a working copy of the order.
///
/// Nothing is written here: every effect lands in the returned
/// [`ExecutionPlan`] and is committed by the execution repository in one
/// transaction. Domain problems (unknown status, no phone, no email, malformed
/// parameters) become error results and later actions still run. Repository
/// failures abort the whole execution.
pub struct ActionExecutor<S: StatusRepository, T: TemplateRepository> {
    pub statuses: S,
    pub templates: T,
}

impl<S: StatusRepository, T: TemplateRepository> ActionExecutor<S, T> {
    pub async fn run(
        &self,
        ctx: &ExecutionContext,
        order: &Order,
        actions: &[Value],
    ) -> Result<ExecutionPlan, CrmServiceError> {
        let mut working = order.clone();
        let mut plan = ExecutionPlan::default();

        for (index, raw) in actions.iter().enumerate() {
            let result = match Action::parse(index, raw) {
                Ok(Action::Unknown) => {
                    warn!(
                        rule_id = %ctx.rule_id,
                        order_id = %order.id,
                        action_type = raw_type(raw),
                        "skipping unknown action type"
                    );
                    ActionResult::error(raw_type(raw), "unknown action type")
                }
                Ok(action) => {
                    self.apply(ctx, index, &action, &mut working, &mut plan.changes)
                        .await?
                }
                Err(e) => {
                    warn!(
                        rule_id = %ctx.rule_id,
                        order_id = %order.id,
                        error = %e,
                        "skipping malformed action"
                    );
                    ActionResult::error(raw_type(raw), e.to_string())
                }
            };
            plan.results.push(result);
        }

        Ok(plan)
    }

    async fn apply(
        &self,
        ctx: &ExecutionContext,
        index: usize,
        action: &Action,
        order: &mut Order,
        changes: &mut OrderChangeSet,
    ) -> Result<ActionResult, CrmServiceError> {
        let kind = action.kind();
        match action {
            Action::ChangeStatus { status_id } => {
                self.change_status(ctx, kind, *status_id, order, changes).await
            }
            Action::SendSms {
                template_id,
                message,
            } => {
                self.send_sms(kind, *template_id, message.as_deref(), order, changes)
                    .await
            }
            Action::SendEmail { template, subject } => {
                self.send_email(
                    ctx,
                    index,
                    kind,
                    template.as_deref(),
                    subject.as_deref(),
                    order,
                    changes,
                )
                .await
            }
            Action::AssignOperator { operator_id } => {
                Ok(assign_operator(ctx, kind, *operator_id, order, changes))
            }
            Action::ScheduleCall { delay_minutes } => {
                let Some(at) = Duration::try_minutes(i64::from(*delay_minutes))
                    .and_then(|delay| ctx.now.checked_add_signed(delay))
                else {
                    return Ok(ActionResult::error(kind, "delay_minutes out of range"));
                };
                order.next_call_at = Some(at);
                order.updated_at = ctx.now;
                changes.next_call_at = Some(at);
                Ok(ActionResult::success(
                    kind,
                    json!({ "scheduled_for": format_rfc3339_ms(&at) }),
                ))
            }
            Action::AddComment { comment } => {
                let comment = comment.as_deref().unwrap_or(DEFAULT_COMMENT);
                changes.history.push(
                    HistoryEntry::new(order.id, HistoryAction::CommentAddedByAutomation, ctx.now)
                        .comment(comment),
                );
                Ok(ActionResult::success(kind, json!({ "comment": comment })))
            }
            Action::Unknown => Ok(ActionResult::error(kind, "unknown action type")),
        }
    }

    async fn change_status(
        &self,
        ctx: &ExecutionContext,
        kind: &str,
        status_id: StatusId,
        order: &mut Order,
        changes: &mut OrderChangeSet,
    ) -> Result<ActionResult, CrmServiceError> {
        let Some(status) = self.statuses.find(order.project_id, status_id).await? else {
            return Ok(ActionResult::error(
                kind,
                format!("status {status_id} not found"),
            ));
        };

        let old_status = order.status_id;
        let change = StatusChange::to(&status, ctx.now);
        order.apply_status_change(&change);
        changes.status_changes.push(change);
        changes.history.push(
            HistoryEntry::new(order.id, HistoryAction::StatusChangedByAutomation, ctx.now)
                .field(
                    "status_id",
                    Some(old_status.to_string()),
                    Some(status.id.to_string()),
                )
                .comment("Status changed by automation rule"),
        );
        Ok(ActionResult::success(
            kind,
            json!({ "old_status": old_status, "new_status": status.id }),
        ))
    }

    async fn send_sms(
        &self,
        kind: &str,
        template_id: Option<TemplateId>,
        message: Option<&str>,
        order: &Order,
        changes: &mut OrderChangeSet,
    ) -> Result<ActionResult, CrmServiceError> {
        if order.customer_phone.trim().is_empty() {
            return Ok(ActionResult::error(kind, "no phone number"));
        }

        let content = match template_id {
            Some(template_id) => match self.templates.find(order.project_id, template_id).await? {
                Some(template) if template.is_active => {
                    let status_name = self.status_name(order).await?;
                    render_template(&template.content, &template_variables(order, &status_name))
                }
                _ => DEFAULT_SMS_TEXT.to_owned(),
            },
            None => message
                .filter(|text| !text.is_empty())
                .unwrap_or(DEFAULT_SMS_TEXT)
                .to_owned(),
        };

        changes.sms.push(NewSmsMessage {
            project_id: order.project_id,
            order_id: Some(order.id),
            template_id,
            phone_number: order.customer_phone.clone(),
            content: content.clone(),
        });
        Ok(ActionResult::success(
            kind,
            json!({ "phone": order.customer_phone, "message": content }),
        ))
    }

    #[allow(clippy::too_many_arguments)]
    async fn send_email(
        &self,
        ctx: &ExecutionContext,
        index: usize,
        kind: &str,
        template: Option<&str>,
        subject: Option<&str>,
        order: &Order,
        changes: &mut OrderChangeSet,
    ) -> Result<ActionResult, CrmServiceError> {
        let Some(email) = order
            .customer_email
            .as_deref()
            .filter(|email| !email.trim().is_empty())
        else {
            return Ok(ActionResult::error(kind, "no email address"));
        };

        let template = template.unwrap_or(DEFAULT_EMAIL_TEMPLATE);
        let subject = subject
            .map(str::to_owned)
            .unwrap_or_else(|| format!("Order #{} notification", order.id));
        let status_name = self.status_name(order).await?;

        changes.outbox.push(OutboxEvent {
            id: Uuid::new_v4(),
            kind: ORDER_NOTIFICATION_EMAIL.to_owned(),
            payload: json!({
                "email": email,
                "template": template,
                "subject": subject,
                "order": {
                    "id": order.id,
                    "customer_name": order.customer_name,
                    "total_amount": format_amount(order.total_amount),
                    "status": status_name,
                },
            }),
            idempotency_key: format!("automation:{}:{index}:email", ctx.execution_id),
        });
        Ok(ActionResult::success(
            kind,
            json!({ "email": email, "subject": subject }),
        ))
    }

    async fn status_name(&self, order: &Order) -> Result<String, CrmServiceError> {
        Ok(self
            .statuses
            .find(order.project_id, order.status_id)
            .await?
            .map(|status| status.name)
            .unwrap_or_default())
    }
}

fn assign_operator(
    ctx: &ExecutionContext,
    kind: &str,
    operator_id: UserId,
    order: &mut Order,
    changes: &mut OrderChangeSet,
) -> ActionResult {
    let old_operator = order.operator_id;
    order.operator_id = Some(operator_id);
    order.updated_at = ctx.now;
    changes.operator_id = Some(operator_id);
    changes.history.push(
        HistoryEntry::new(order.id, HistoryAction::OperatorAssignedByAutomation, ctx.now)
            .field(
                "operator_id",
                old_operator.map(|id| id.to_string()),
                Some(operator_id.to_string()),
            )
            .comment("Operator assigned by automation rule"),
    );
    ActionResult::success(
        kind,
        json!({ "old_operator": old_operator, "new_operator": operator_id }),
    )
}
