//! Gateway-injected acting user.

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;

use leadflow_domain::id::UserId;

pub const ACTOR_HEADER: &str = "x-leadflow-user-id";

/// User performing a manual change, taken from `x-leadflow-user-id`.
///
/// Absent header yields `ActorHeader(None)`; an unparsable value is rejected
/// with 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorHeader(pub Option<UserId>);

impl<S> FromRequestParts<S> for ActorHeader
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let actor = match parts.headers.get(ACTOR_HEADER) {
            None => Ok(None),
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|s| s.trim().parse::<UserId>().ok())
                .map(Some)
                .ok_or(StatusCode::BAD_REQUEST),
        };

        async move { actor.map(Self) }
    }
}
