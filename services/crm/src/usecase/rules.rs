use serde_json::Value;

use leadflow_core::clock::Clock;
use leadflow_domain::id::{ProjectId, RuleId};
use leadflow_domain::pagination::PageRequest;

use crate::domain::automation::{Action, Trigger, raw_type};
use crate::domain::repository::{ExecutionRepository, RuleRepository};
use crate::domain::types::{AutomationExecution, AutomationRule, NewAutomationRule};
use crate::error::{CrmServiceError, RuleConfigError};

/// Strict check applied when a rule is written. The engine itself tolerates
/// unknown entries at run time; the API refuses them up front.
pub fn validate_rule(trigger: &Value, actions: &Value) -> Result<(), RuleConfigError> {
    if Trigger::parse(trigger)? == Trigger::Unknown {
        return Err(RuleConfigError::UnknownTriggerType(raw_type(trigger).to_owned()));
    }
    for (index, action) in Action::parse_list(actions)?.into_iter().enumerate() {
        if action? == Action::Unknown {
            return Err(RuleConfigError::UnknownActionType {
                index,
                kind: raw_type(&actions[index]).to_owned(),
            });
        }
    }
    Ok(())
}

// ── ListRules ────────────────────────────────────────────────────────────────

pub struct ListRulesUseCase<R: RuleRepository> {
    pub repo: R,
}

impl<R: RuleRepository> ListRulesUseCase<R> {
    pub async fn execute(
        &self,
        project_id: ProjectId,
        page: PageRequest,
    ) -> Result<Vec<AutomationRule>, CrmServiceError> {
        self.repo.list(project_id, page).await
    }
}

// ── CreateRule ───────────────────────────────────────────────────────────────

pub struct CreateRuleInput {
    pub name: String,
    pub description: Option<String>,
    pub trigger_conditions: Value,
    pub actions: Value,
    pub is_active: bool,
    pub priority: i32,
}

pub struct CreateRuleUseCase<R: RuleRepository, C: Clock> {
    pub repo: R,
    pub clock: C,
}

impl<R: RuleRepository, C: Clock> CreateRuleUseCase<R, C> {
    pub async fn execute(
        &self,
        project_id: ProjectId,
        input: CreateRuleInput,
    ) -> Result<AutomationRule, CrmServiceError> {
        if input.name.trim().is_empty() {
            return Err(CrmServiceError::MissingData);
        }
        validate_rule(&input.trigger_conditions, &input.actions)?;
        let rule = NewAutomationRule {
            project_id,
            name: input.name,
            description: input.description,
            trigger_conditions: input.trigger_conditions,
            actions: input.actions,
            is_active: input.is_active,
            priority: input.priority,
        };
        self.repo.create(&rule, self.clock.now()).await
    }
}

// ── UpdateRuleSettings ───────────────────────────────────────────────────────

pub struct UpdateRuleSettingsUseCase<R: RuleRepository, C: Clock> {
    pub repo: R,
    pub clock: C,
}

impl<R: RuleRepository, C: Clock> UpdateRuleSettingsUseCase<R, C> {
    pub async fn execute(
        &self,
        project_id: ProjectId,
        rule_id: RuleId,
        is_active: Option<bool>,
        priority: Option<i32>,
    ) -> Result<AutomationRule, CrmServiceError> {
        if is_active.is_none() && priority.is_none() {
            return Err(CrmServiceError::MissingData);
        }
        self.repo
            .update_settings(project_id, rule_id, is_active, priority, self.clock.now())
            .await?
            .ok_or(CrmServiceError::RuleNotFound)
    }
}

// ── ListExecutions ───────────────────────────────────────────────────────────

pub struct ListExecutionsUseCase<R: RuleRepository, E: ExecutionRepository> {
    pub rules: R,
    pub executions: E,
}

impl<R: RuleRepository, E: ExecutionRepository> ListExecutionsUseCase<R, E> {
    pub async fn execute(
        &self,
        project_id: ProjectId,
        rule_id: RuleId,
        page: PageRequest,
    ) -> Result<Vec<AutomationExecution>, CrmServiceError> {
        if self.rules.find(project_id, rule_id).await?.is_none() {
            return Err(CrmServiceError::RuleNotFound);
        }
        self.executions.list_by_rule(rule_id, page).await
    }
}
