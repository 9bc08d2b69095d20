//! Order-status-driven automation engine.
//!
//! One tick walks every active rule (priority descending, then id), selects
//! the orders its trigger matches, claims an execution per (rule, order) and
//! runs the rule's actions. Claiming doubles as deduplication: a second claim
//! for a pair that already has a running or completed execution is refused by
//! the execution repository. A `running` row older than the stale cutoff is
//! failed at the start of the next tick so it cannot hold its pair forever.

pub mod executor;
pub mod template;
pub mod trigger;

use serde_json::Value;
use tokio::time::{Instant, timeout};
use tracing::{Instrument, debug, error, info, info_span, warn};

use leadflow_core::clock::Clock;

use crate::config::EngineConfig;
use crate::domain::automation::{Trigger, execution_result, raw_type};
use crate::domain::repository::{
    ExecutionRepository, OrderRepository, RuleRepository, StatusRepository, TemplateRepository,
};
use crate::domain::types::{AutomationRule, ExecutionClaim, Order};
use crate::error::CrmServiceError;

use self::executor::{ActionExecutor, ExecutionContext};

/// Counters of one automation tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutomationTickReport {
    pub rules: usize,
    /// Rules with malformed trigger or action configuration.
    pub rules_skipped: usize,
    /// Rules whose evaluation errored or ran out of time.
    pub rules_failed: usize,
    pub completed: usize,
    pub failed: usize,
    /// Candidates refused by the claim or held back by a cooldown.
    pub deduplicated: usize,
    /// Abandoned `running` executions marked failed at tick start.
    pub released: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderOutcome {
    Completed,
    Failed,
    Deduplicated,
}

// ── ProcessAutomation ────────────────────────────────────────────────────────

pub struct ProcessAutomationUseCase<R, O, E, S, T, C>
where
    R: RuleRepository,
    O: OrderRepository,
    E: ExecutionRepository,
    S: StatusRepository,
    T: TemplateRepository,
    C: Clock,
{
    pub rules: R,
    pub orders: O,
    pub executions: E,
    pub executor: ActionExecutor<S, T>,
    pub clock: C,
    pub config: EngineConfig,
}

impl<R, O, E, S, T, C> ProcessAutomationUseCase<R, O, E, S, T, C>
where
    R: RuleRepository,
    O: OrderRepository,
    E: ExecutionRepository,
    S: StatusRepository,
    T: TemplateRepository,
    C: Clock,
{
    /// Run one tick. Work not started before `deadline` waits for the next
    /// tick; an execution already started always reaches a terminal state.
    pub async fn execute(&self, deadline: Instant) -> Result<AutomationTickReport, CrmServiceError> {
        let released = self.release_stale_executions().await;
        let rules = self.rules.list_active().await?;
        let mut report = AutomationTickReport {
            rules: rules.len(),
            released,
            ..Default::default()
        };

        for rule in &rules {
            if Instant::now() >= deadline {
                warn!(
                    rule_id = %rule.id,
                    "tick budget exhausted; remaining rules wait for the next tick"
                );
                break;
            }
            let rule_deadline = deadline.min(Instant::now() + self.config.rule_timeout);
            let span = info_span!("automation_rule", rule_id = %rule.id, project_id = %rule.project_id);
            match self
                .process_rule(rule, rule_deadline, &mut report)
                .instrument(span)
                .await
            {
                Ok(Some(executions)) => {
                    if let Err(e) = self
                        .rules
                        .record_run(rule.id, executions, self.clock.now())
                        .await
                    {
                        error!(rule_id = %rule.id, error = %e.detail(), "failed to record rule statistics");
                    }
                }
                Ok(None) => report.rules_skipped += 1,
                Err(e) => {
                    report.rules_failed += 1;
                    error!(rule_id = %rule.id, error = %e.detail(), "automation rule failed");
                }
            }
        }

        info!(
            rules = report.rules,
            completed = report.completed,
            failed = report.failed,
            deduplicated = report.deduplicated,
            released = report.released,
            "automation tick finished"
        );
        Ok(report)
    }

    /// Fail executions left `running` by a crashed process or a lost `fail()`
    /// write, so their (rule, order) pairs can be claimed again.
    async fn release_stale_executions(&self) -> u64 {
        let now = self.clock.now();
        let Some(cutoff) = chrono::Duration::from_std(self.config.stale_execution_after)
            .ok()
            .and_then(|age| now.checked_sub_signed(age))
        else {
            return 0;
        };
        let message = format!(
            "execution abandoned: still running after {:?}",
            self.config.stale_execution_after
        );
        match self.executions.fail_stale(cutoff, &message, now).await {
            Ok(0) => 0,
            Ok(released) => {
                warn!(released, "released abandoned automation executions");
                released
            }
            Err(e) => {
                error!(error = %e.detail(), "failed to release abandoned automation executions");
                0
            }
        }
    }

    /// Evaluate one rule. Returns the number of executions claimed, or `None`
    /// if the rule's configuration is malformed.
    async fn process_rule(
        &self,
        rule: &AutomationRule,
        deadline: Instant,
        report: &mut AutomationTickReport,
    ) -> Result<Option<u32>, CrmServiceError> {
        let trigger = match Trigger::parse(&rule.trigger_conditions) {
            Ok(trigger) => trigger,
            Err(e) => {
                warn!(rule_id = %rule.id, error = %e, "skipping rule with malformed trigger");
                return Ok(None);
            }
        };
        let Some(actions) = rule.actions.as_array() else {
            warn!(rule_id = %rule.id, "skipping rule whose actions are not a list");
            return Ok(None);
        };

        let now = self.clock.now();
        let filter = match trigger::order_filter(&trigger, rule.project_id, now, &self.config) {
            Ok(Some(filter)) => filter,
            Ok(None) => {
                info!(
                    rule_id = %rule.id,
                    trigger_type = raw_type(&rule.trigger_conditions),
                    "unrecognized trigger type matches no orders"
                );
                return Ok(Some(0));
            }
            Err(e) => {
                warn!(rule_id = %rule.id, error = %e, "skipping rule with out-of-range trigger");
                return Ok(None);
            }
        };

        let orders = timeout(
            deadline.saturating_duration_since(Instant::now()),
            self.orders.list_matching(&filter),
        )
        .await
        .map_err(|_| anyhow::anyhow!("rule evaluation timed out"))??;
        debug!(rule_id = %rule.id, candidates = orders.len(), "trigger evaluated");

        let mut claimed = 0u32;
        for (position, order) in orders.iter().enumerate() {
            if Instant::now() >= deadline {
                warn!(
                    rule_id = %rule.id,
                    remaining = orders.len() - position,
                    "rule timeout reached; remaining orders wait for the next tick"
                );
                break;
            }
            match self.process_order(rule, &trigger, actions, order).await {
                Ok(OrderOutcome::Completed) => {
                    report.completed += 1;
                    claimed += 1;
                }
                Ok(OrderOutcome::Failed) => {
                    report.failed += 1;
                    claimed += 1;
                }
                Ok(OrderOutcome::Deduplicated) => report.deduplicated += 1,
                Err(e) => {
                    error!(
                        rule_id = %rule.id,
                        order_id = %order.id,
                        error = %e.detail(),
                        "automation candidate failed"
                    );
                }
            }
        }
        Ok(Some(claimed))
    }

    async fn process_order(
        &self,
        rule: &AutomationRule,
        trigger: &Trigger,
        actions: &[Value],
        order: &Order,
    ) -> Result<OrderOutcome, CrmServiceError> {
        let now = self.clock.now();
        if trigger.is_refireable() {
            let last = self.executions.last_started_at(rule.id, order.id).await?;
            if trigger::in_cooldown(trigger, last, now) {
                debug!(rule_id = %rule.id, order_id = %order.id, "execution in cooldown");
                return Ok(OrderOutcome::Deduplicated);
            }
        }

        let claim = ExecutionClaim {
            rule_id: rule.id,
            order_id: order.id,
            refireable: trigger.is_refireable(),
            started_at: now,
        };
        let Some(execution_id) = self.executions.claim(&claim).await? else {
            debug!(rule_id = %rule.id, order_id = %order.id, "already executed");
            return Ok(OrderOutcome::Deduplicated);
        };

        let ctx = ExecutionContext {
            rule_id: rule.id,
            execution_id,
            now,
        };
        let run = timeout(self.config.execution_timeout, async {
            let plan = self.executor.run(&ctx, order, actions).await?;
            self.executions
                .complete(
                    execution_id,
                    order.id,
                    &plan.changes,
                    &execution_result(&plan.results),
                    self.clock.now(),
                )
                .await?;
            Ok::<_, CrmServiceError>(plan)
        })
        .await;

        let message = match run {
            Ok(Ok(plan)) => {
                info!(
                    rule_id = %rule.id,
                    order_id = %order.id,
                    execution_id = %execution_id,
                    actions = plan.results.len(),
                    action_errors = plan.results.iter().filter(|r| r.is_error()).count(),
                    "automation execution completed"
                );
                return Ok(OrderOutcome::Completed);
            }
            Ok(Err(e)) => e.detail(),
            Err(_) => format!(
                "execution timed out after {:?}",
                self.config.execution_timeout
            ),
        };

        warn!(
            rule_id = %rule.id,
            order_id = %order.id,
            execution_id = %execution_id,
            error = %message,
            "automation execution failed"
        );
        self.executions
            .fail(execution_id, &message, self.clock.now())
            .await?;
        Ok(OrderOutcome::Failed)
    }
}
