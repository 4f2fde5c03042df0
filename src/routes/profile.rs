use axum::{
    Json, Router,
    extract::State,
    routing::get,
};

use crate::{
    errors::Result,
    middleware::SessionContext,
    models::member::{MemberRecord, ProfileChanges},
    state::AppState,
    store::Collection,
    views::editor_form::{EditorRejection, RecordEditor},
};

pub fn profile_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/profile", get(read_profile).patch(update_profile))
        .with_state(state)
}

/// The member's own record, provisioned on first visit.
pub async fn read_profile(
    State(state): State<AppState>,
    session: SessionContext,
) -> Result<Json<MemberRecord>> {
    Ok(Json(state.store.ensure_member_for(&session.identity).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    session: SessionContext,
    Json(changes): Json<ProfileChanges>,
) -> std::result::Result<Json<MemberRecord>, EditorRejection> {
    let member = state.store.ensure_member_for(&session.identity).await?;
    let mut editor = RecordEditor::new(member)?;
    editor.apply(changes.into_changes());
    let saved = editor
        .submit_tracked(&Collection::new(state.store.clone()), &state.saves.members)
        .await?;
    Ok(Json(saved))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::testing::test_app;

    #[tokio::test]
    async fn first_visit_provisions_the_record() {
        let app = test_app();
        let cookie = app.signed_in("ada@example.com").await;

        let reply = app.get("/profile", Some(&cookie)).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["email_1"], "ada@example.com");
        let again = app.get("/profile", Some(&cookie)).await;
        assert_eq!(again.body["id"], reply.body["id"]);
        assert_eq!(app.store.count("alumni").await, 1);
    }

    #[tokio::test]
    async fn members_edit_their_own_subset_only() {
        let app = test_app();
        let cookie = app.signed_in("ada@example.com").await;

        let reply = app
            .json(
                "PATCH",
                "/profile",
                Some(&cookie),
                json!({"f_name": "Ada", "job_title": "Analyst", "user_id": 99, "ref_no": "X1"}),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["f_name"], "Ada");
        assert_eq!(reply.body["job_title"], "Analyst");
        assert_ne!(reply.body["user_id"], 99);
        assert!(reply.body["ref_no"].is_null());
        assert!(reply.body["updated_at"].is_string());
    }

    #[tokio::test]
    async fn anonymous_profile_request_is_redirected() {
        let app = test_app();
        let reply = app.get("/profile", None).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location(), "/login?redirectedFrom=%2Fprofile");
    }
}
