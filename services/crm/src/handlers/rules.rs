use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use leadflow_domain::id::{ExecutionId, OrderId, ProjectId, RuleId};
use leadflow_domain::pagination::PageRequest;

use crate::domain::types::{AutomationExecution, AutomationRule, ExecutionStatus};
use crate::error::CrmServiceError;
use crate::state::AppState;
use crate::usecase::rules::{
    CreateRuleInput, CreateRuleUseCase, ListExecutionsUseCase, ListRulesUseCase,
    UpdateRuleSettingsUseCase,
};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct RuleResponse {
    pub id: RuleId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub trigger_conditions: Value,
    pub actions: Value,
    pub is_active: bool,
    pub priority: i32,
    pub executions_count: i32,
    #[serde(serialize_with = "leadflow_core::serde::to_rfc3339_ms_opt")]
    pub last_executed_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(serialize_with = "leadflow_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<AutomationRule> for RuleResponse {
    fn from(rule: AutomationRule) -> Self {
        Self {
            id: rule.id,
            project_id: rule.project_id,
            name: rule.name,
            description: rule.description,
            trigger_conditions: rule.trigger_conditions,
            actions: rule.actions,
            is_active: rule.is_active,
            priority: rule.priority,
            executions_count: rule.executions_count,
            last_executed_at: rule.last_executed_at,
            created_at: rule.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ExecutionResponse {
    pub id: ExecutionId,
    pub rule_id: RuleId,
    pub order_id: OrderId,
    pub status: ExecutionStatus,
    pub result: Option<Value>,
    pub error_message: Option<String>,
    #[serde(serialize_with = "leadflow_core::serde::to_rfc3339_ms")]
    pub started_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "leadflow_core::serde::to_rfc3339_ms_opt")]
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<AutomationExecution> for ExecutionResponse {
    fn from(execution: AutomationExecution) -> Self {
        Self {
            id: execution.id,
            rule_id: execution.rule_id,
            order_id: execution.order_id,
            status: execution.status,
            result: execution.result,
            error_message: execution.error_message,
            started_at: execution.started_at,
            completed_at: execution.completed_at,
        }
    }
}

// ── Query params ─────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct PageQuery {
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

impl PageQuery {
    fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            per_page: self.per_page.unwrap_or(defaults.per_page),
            page: self.page.unwrap_or(defaults.page),
        }
    }
}

// ── GET /projects/{project_id}/automation-rules ──────────────────────────────

pub async fn list_rules(
    State(state): State<AppState>,
    Path(project_id): Path<i32>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<RuleResponse>>, CrmServiceError> {
    let usecase = ListRulesUseCase {
        repo: state.rule_repo(),
    };
    let rules = usecase
        .execute(ProjectId(project_id), query.page_request())
        .await?;
    Ok(Json(rules.into_iter().map(RuleResponse::from).collect()))
}

// ── POST /projects/{project_id}/automation-rules ─────────────────────────────

#[derive(Deserialize)]
pub struct CreateRuleRequest {
    pub name: String,
    pub description: Option<String>,
    pub trigger_conditions: Value,
    pub actions: Value,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub priority: i32,
}

fn default_is_active() -> bool {
    true
}

pub async fn create_rule(
    State(state): State<AppState>,
    Path(project_id): Path<i32>,
    Json(body): Json<CreateRuleRequest>,
) -> Result<(StatusCode, Json<RuleResponse>), CrmServiceError> {
    let usecase = CreateRuleUseCase {
        repo: state.rule_repo(),
        clock: state.clock(),
    };
    let rule = usecase
        .execute(
            ProjectId(project_id),
            CreateRuleInput {
                name: body.name,
                description: body.description,
                trigger_conditions: body.trigger_conditions,
                actions: body.actions,
                is_active: body.is_active,
                priority: body.priority,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(rule.into())))
}

// ── PATCH /projects/{project_id}/automation-rules/{rule_id} ──────────────────

#[derive(Deserialize)]
pub struct UpdateRuleRequest {
    pub is_active: Option<bool>,
    pub priority: Option<i32>,
}

pub async fn update_rule(
    State(state): State<AppState>,
    Path((project_id, rule_id)): Path<(i32, i32)>,
    Json(body): Json<UpdateRuleRequest>,
) -> Result<Json<RuleResponse>, CrmServiceError> {
    let usecase = UpdateRuleSettingsUseCase {
        repo: state.rule_repo(),
        clock: state.clock(),
    };
    let rule = usecase
        .execute(
            ProjectId(project_id),
            RuleId(rule_id),
            body.is_active,
            body.priority,
        )
        .await?;
    Ok(Json(rule.into()))
}

// ── GET /projects/{project_id}/automation-rules/{rule_id}/executions ─────────

pub async fn list_executions(
    State(state): State<AppState>,
    Path((project_id, rule_id)): Path<(i32, i32)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<ExecutionResponse>>, CrmServiceError> {
    let usecase = ListExecutionsUseCase {
        rules: state.rule_repo(),
        executions: state.execution_repo(),
    };
    let executions = usecase
        .execute(ProjectId(project_id), RuleId(rule_id), query.page_request())
        .await?;
    Ok(Json(
        executions.into_iter().map(ExecutionResponse::from).collect(),
    ))
}
