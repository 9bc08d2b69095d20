use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// CRM service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum CrmServiceError {
    #[error("order not found")]
    OrderNotFound,
    #[error("status not found")]
    StatusNotFound,
    #[error("automation rule not found")]
    RuleNotFound,
    #[error("invalid automation rule: {0}")]
    InvalidRule(#[from] RuleConfigError),
    #[error("missing data")]
    MissingData,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl CrmServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::StatusNotFound => "STATUS_NOT_FOUND",
            Self::RuleNotFound => "RULE_NOT_FOUND",
            Self::InvalidRule(_) => "INVALID_RULE",
            Self::MissingData => "MISSING_DATA",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Message for logs and stored execution errors. Unlike `Display`, keeps
    /// the full context chain of internal errors.
    pub fn detail(&self) -> String {
        match self {
            Self::Internal(e) => format!("{e:#}"),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for CrmServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::OrderNotFound | Self::StatusNotFound | Self::RuleNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::InvalidRule(_) | Self::MissingData => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

/// Malformed trigger or action parameters on a stored rule.
#[derive(Debug, thiserror::Error)]
pub enum RuleConfigError {
    #[error("trigger: {0}")]
    Trigger(serde_json::Error),
    #[error("action #{index}: {source}")]
    Action {
        index: usize,
        source: serde_json::Error,
    },
    #[error("actions must be a JSON array")]
    ActionsNotArray,
    #[error("unknown trigger type: {0}")]
    UnknownTriggerType(String),
    #[error("action #{index}: unknown action type: {kind}")]
    UnknownActionType { index: usize, kind: String },
    #[error("trigger: {field} must be at most {max}, got {value}")]
    TriggerOutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },
    #[error("action #{index}: {field} must be at most {max}, got {value}")]
    ActionOutOfRange {
        index: usize,
        field: &'static str,
        value: u32,
        max: u32,
    },
    #[error("trigger: {field} = {value} reaches outside the supported date range")]
    WindowOverflow { field: &'static str, value: u32 },
}

/// SMS provider rejected or failed to accept a message.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SmsSendError(pub String);
