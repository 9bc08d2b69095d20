use axum::http::StatusCode;

/// Liveness handler for `GET /healthz`.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Map a readiness probe outcome to a status code. Services call this from
/// their own `/readyz` handler after pinging their dependencies.
pub fn readiness<E: std::fmt::Display>(probe: Result<(), E>) -> StatusCode {
    match probe {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness probe failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
