use axum::{
    Json, Router,
    response::Redirect,
    routing::get,
};
use serde::Serialize;

use crate::{consts::route_const::FALLBACK_REDIRECT, errors::Result, state::AppState};

pub mod admin;
pub mod api;
pub mod auth_route;
pub mod events;
pub mod news;
pub mod profile;

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

pub async fn root_route() -> Redirect {
    Redirect::to(FALLBACK_REDIRECT)
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Every area of the portal; the session gate and tracing are layered on in `app`.
pub fn portal_router(state: AppState) -> Result<Router<AppState>> {
    Ok(Router::new()
        .route("/", get(root_route))
        .route("/health", get(health))
        .merge(auth_route::auth_router(state.clone())?)
        .merge(profile::profile_router(state.clone()))
        .merge(news::news_router(state.clone()))
        .merge(events::events_router(state.clone()))
        .nest("/api", api::api_router(state.clone()))
        .nest("/admin", admin::admin_router(state.clone()))
        .with_state(state))
}


#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::testing::test_app;

    #[tokio::test]
    async fn health_is_public_and_bare() {
        let app = test_app();
        let reply = app.get("/health", None).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["status"], "ok");
        assert!(reply.headers.get("x-frame-options").is_none());
    }

    #[tokio::test]
    async fn signed_in_root_lands_on_news() {
        let app = test_app();
        let cookie = app.signed_in("ada@example.com").await;
        let reply = app.get("/", Some(&cookie)).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location(), "/news");
        assert_eq!(reply.headers["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn anonymous_page_request_goes_to_sign_in() {
        let app = test_app();
        let reply = app.get("/admin/events", None).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location(), "/login?redirectedFrom=%2Fadmin%2Fevents");
    }

    #[tokio::test]
    async fn members_are_turned_away_from_admin_pages() {
        let app = test_app();
        let cookie = app.signed_in("ada@example.com").await;
        let writes = app.store.writes();
        let reply = app.get("/admin/members", Some(&cookie)).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location(), "/");
        assert_eq!(app.store.writes(), writes);
    }
}
