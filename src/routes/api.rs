use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::post,
};
use serde::Serialize;
use serde_json::Value;

use crate::{
    errors::{Error, Result},
    middleware::SessionContext,
    state::AppState,
};

pub fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/events/invite", post(invite))
        .with_state(state)
}

#[derive(Debug, Clone, Serialize)]
pub struct InviteResponse {
    pub ok: bool,
}

/// `eventId` as a positive number or a numeric string.
pub fn event_id(body: &[u8]) -> Result<i64> {
    let required = || Error::invalid("Event ID is required");
    let value: Value = serde_json::from_slice(body).map_err(|_| required())?;
    let id = match value.get("eventId") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0).ok_or_else(required)
}

/// Mails the calendar invite for one event to the signed-in member.
pub async fn invite(
    State(state): State<AppState>,
    session: SessionContext,
    body: Bytes,
) -> Result<Json<InviteResponse>> {
    let event_id = event_id(&body)?;
    state.invites.dispatch(event_id, &session.identity).await?;
    Ok(Json(InviteResponse { ok: true }))
}
