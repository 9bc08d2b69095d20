use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};

use leadflow_core::clock::Clock;
use leadflow_core::config::Config;
use leadflow_crm::config::CrmConfig;
use leadflow_crm::domain::automation::{Action, Trigger};
use leadflow_crm::error::CrmServiceError;
use leadflow_crm::router::build_router;
use leadflow_crm::state::AppState;
use leadflow_crm::usecase::rules::{
    CreateRuleInput, CreateRuleUseCase, ListExecutionsUseCase, ListRulesUseCase,
    UpdateRuleSettingsUseCase, validate_rule,
};
use leadflow_domain::id::{ProjectId, RuleId};
use leadflow_domain::pagination::PageRequest;
use leadflow_testing::clock::FixedClock;
use leadflow_testing::fixture::Fixture;

use crate::helpers::{InMemoryCrm, OTHER_PROJECT, PROJECT, rule};

const FIXTURES: [&str; 3] = [
    "fixtures/rules/status_change_sms.json",
    "fixtures/rules/time_delay_call.json",
    "fixtures/rules/no_call_response_nudge.json",
];

fn input_from(fixture: &Value) -> CreateRuleInput {
    CreateRuleInput {
        name: fixture["name"].as_str().unwrap_or_default().to_owned(),
        description: fixture["description"].as_str().map(str::to_owned),
        trigger_conditions: fixture["trigger_conditions"].clone(),
        actions: fixture["actions"].clone(),
        is_active: fixture["is_active"].as_bool().unwrap_or(true),
        priority: fixture["priority"].as_i64().unwrap_or(0) as i32,
    }
}

// ── Rule documents ───────────────────────────────────────────────────────────

#[test]
fn should_accept_every_sample_rule() {
    for path in FIXTURES {
        let fixture = Fixture::load(path);
        validate_rule(&fixture["trigger_conditions"], &fixture["actions"])
            .unwrap_or_else(|e| panic!("{path}: {e}"));
    }
}

#[test]
fn should_keep_sample_rule_documents_intact_through_typed_parsing() {
    for path in FIXTURES {
        let fixture = Fixture::load(path);

        let trigger = Trigger::parse(&fixture["trigger_conditions"]).unwrap();
        assert_eq!(
            serde_json::to_value(&trigger).unwrap(),
            fixture["trigger_conditions"],
            "{path}"
        );

        let actions: Vec<Action> = Action::parse_list(&fixture["actions"])
            .unwrap()
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(serde_json::to_value(&actions).unwrap(), fixture["actions"], "{path}");
    }
}

// ── Use cases ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_rule_from_sample_document() {
    let crm = InMemoryCrm::new();
    let clock = FixedClock::default();
    let usecase = CreateRuleUseCase {
        repo: crm.clone(),
        clock: clock.clone(),
    };

    let created = usecase
        .execute(PROJECT, input_from(&Fixture::load(FIXTURES[1])))
        .await
        .unwrap();

    assert_eq!(created.project_id, PROJECT);
    assert_eq!(created.name, "Call back stale new orders");
    assert_eq!(created.priority, 5);
    assert_eq!(created.executions_count, 0);
    assert_eq!(created.created_at, clock.now());
    assert_eq!(crm.store_handle().lock().unwrap().rules.len(), 1);
}

#[tokio::test]
async fn should_refuse_rule_without_name_or_with_unknown_action() {
    let crm = InMemoryCrm::new();
    let usecase = CreateRuleUseCase {
        repo: crm.clone(),
        clock: FixedClock::default(),
    };

    let mut unnamed = input_from(&Fixture::load(FIXTURES[0]));
    unnamed.name = "   ".to_owned();
    let err = usecase.execute(PROJECT, unnamed).await.unwrap_err();
    assert!(matches!(err, CrmServiceError::MissingData));

    let mut faxing = input_from(&Fixture::load(FIXTURES[0]));
    faxing.actions = json!([{"type": "send_fax"}]);
    let err = usecase.execute(PROJECT, faxing).await.unwrap_err();
    assert_eq!(err.kind(), "INVALID_RULE");

    assert!(crm.store_handle().lock().unwrap().rules.is_empty());
}

#[tokio::test]
async fn should_list_rules_of_one_project_by_priority() {
    let now = FixedClock::default_instant();
    let crm = InMemoryCrm::new().with(|s| {
        let mut low = rule(1, json!({"type": "order_created"}), json!([]), now);
        low.priority = 1;
        let mut high = rule(2, json!({"type": "order_created"}), json!([]), now);
        high.priority = 9;
        let mut foreign = rule(3, json!({"type": "order_created"}), json!([]), now);
        foreign.project_id = OTHER_PROJECT;
        s.rules.extend([low, high, foreign]);
    });

    let rules = ListRulesUseCase { repo: crm.clone() }
        .execute(PROJECT, PageRequest::default())
        .await
        .unwrap();

    let ids: Vec<RuleId> = rules.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![RuleId(2), RuleId(1)]);
}

#[tokio::test]
async fn should_update_rule_settings_within_its_project() {
    let now = FixedClock::default_instant();
    let crm = InMemoryCrm::new().with(|s| {
        s.rules
            .push(rule(1, json!({"type": "order_created"}), json!([]), now));
    });
    let usecase = UpdateRuleSettingsUseCase {
        repo: crm.clone(),
        clock: FixedClock::default(),
    };

    let updated = usecase
        .execute(PROJECT, RuleId(1), Some(false), None)
        .await
        .unwrap();
    assert!(!updated.is_active);
    assert_eq!(updated.priority, 0);

    let err = usecase
        .execute(PROJECT, RuleId(1), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CrmServiceError::MissingData));

    let err = usecase
        .execute(OTHER_PROJECT, RuleId(1), None, Some(3))
        .await
        .unwrap_err();
    assert!(matches!(err, CrmServiceError::RuleNotFound));
}

#[tokio::test]
async fn should_hide_executions_of_rules_from_other_projects() {
    let now = FixedClock::default_instant();
    let crm = InMemoryCrm::new().with(|s| {
        s.rules
            .push(rule(1, json!({"type": "order_created"}), json!([]), now));
    });
    let usecase = ListExecutionsUseCase {
        rules: crm.clone(),
        executions: crm.clone(),
    };

    let own = usecase
        .execute(PROJECT, RuleId(1), PageRequest::default())
        .await
        .unwrap();
    assert!(own.is_empty());

    let err = usecase
        .execute(ProjectId(2), RuleId(1), PageRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CrmServiceError::RuleNotFound));
}

// ── HTTP surface ─────────────────────────────────────────────────────────────

/// Router over a disconnected database: only paths that answer before any
/// query are exercised here.
fn server() -> TestServer {
    let config = CrmConfig::from_vars([(
        "DATABASE_URL".to_owned(),
        "postgres://localhost/crm".to_owned(),
    )])
    .unwrap();
    let state = AppState {
        db: DatabaseConnection::default(),
        config,
    };
    TestServer::new(build_router(state)).unwrap()
}

#[tokio::test]
async fn should_report_liveness_but_not_readiness_without_database() {
    let server = server();

    server.get("/healthz").await.assert_status_ok();
    server
        .get("/readyz")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn should_reject_rule_with_unknown_trigger() {
    let server = server();

    let response = server
        .post("/projects/1/automation-rules")
        .json(&json!({
            "name": "Birthday greeting",
            "trigger_conditions": {"type": "birthday"},
            "actions": [{"type": "send_sms", "message": "Happy birthday"}]
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "INVALID_RULE");
    assert_eq!(
        body["message"],
        "invalid automation rule: unknown trigger type: birthday"
    );
}

#[tokio::test]
async fn should_reject_rule_with_out_of_range_parameters() {
    let server = server();

    let response = server
        .post("/projects/1/automation-rules")
        .json(&json!({
            "name": "Nudge silent customers",
            "trigger_conditions": {"type": "no_call_response", "hours_since_call": 4_000_000_000u32},
            "actions": [{"type": "add_comment"}]
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "INVALID_RULE");

    let err = validate_rule(
        &json!({"type": "order_created"}),
        &json!([{"type": "schedule_call", "delay_minutes": 600_000}]),
    )
    .unwrap_err();
    assert!(err.to_string().starts_with("action #0: delay_minutes must be at most"));
}

#[tokio::test]
async fn should_reject_rule_with_blank_name() {
    let server = server();
    let fixture = Fixture::load(FIXTURES[0]);

    let response = server
        .post("/projects/1/automation-rules")
        .json(&json!({
            "name": "",
            "trigger_conditions": fixture["trigger_conditions"],
            "actions": fixture["actions"]
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "MISSING_DATA");
}

#[tokio::test]
async fn should_reject_empty_rule_settings_patch() {
    let server = server();

    let response = server
        .patch("/projects/1/automation-rules/1")
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "MISSING_DATA");
}

#[tokio::test]
async fn should_reject_status_change_with_malformed_actor_header() {
    let server = server();

    let response = server
        .patch("/projects/1/orders/1/status")
        .add_header(
            HeaderName::from_static("x-leadflow-user-id"),
            HeaderValue::from_static("not-a-number"),
        )
        .json(&json!({"status_id": 2}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
