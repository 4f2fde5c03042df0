use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use serde::Serialize;

use crate::{
    consts::store_const::{EVENT_TABLE, MEMBER_TABLE, NEWS_TABLE},
    errors::Result,
    middleware::SessionContext,
    state::AppState,
    store::Query,
};

pub mod editor;
pub mod events;
pub mod members;
pub mod news;

/// Management area. The session gate only lets administrators through.
pub fn admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .merge(members::members_router())
        .merge(news::news_admin_router())
        .merge(events::events_admin_router())
        .route("/editor", get(editor::editor_config))
        .with_state(state)
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub signed_in_as: String,
    pub members: usize,
    pub news: usize,
    pub events: usize,
}

pub async fn dashboard(State(state): State<AppState>, session: SessionContext) -> Result<Json<Dashboard>> {
    let all = Query::new();
    Ok(Json(Dashboard {
        signed_in_as: session.identity.email,
        members: state.store.select(MEMBER_TABLE, &all).await?.len(),
        news: state.store.select(NEWS_TABLE, &all).await?.len(),
        events: state.store.select(EVENT_TABLE, &all).await?.len(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::routes::testing::{ADMIN_EMAIL, test_app};

    #[tokio::test]
    async fn dashboard_counts_each_table() {
        let app = test_app();
        app.schedule("Summer Gala", 20, 4).await;
        let cookie = app.signed_in(ADMIN_EMAIL).await;
        app.get("/profile", Some(&cookie)).await;

        let reply = app.get("/admin", Some(&cookie)).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["signed_in_as"], ADMIN_EMAIL);
        assert_eq!(reply.body["members"], 1);
        assert_eq!(reply.body["news"], 0);
        assert_eq!(reply.body["events"], 1);
        assert_eq!(reply.headers["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn dashboard_is_closed_to_members() {
        let app = test_app();
        let cookie = app.signed_in("ada@example.com").await;
        let reply = app.get("/admin", Some(&cookie)).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location(), "/");
    }
}
