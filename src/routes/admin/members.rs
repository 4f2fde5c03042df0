use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    errors::Result,
    middleware::SessionContext,
    models::member::{MemberRecord, SEARCH_FIELDS, search_field},
    routes::MessageResponse,
    state::AppState,
    store::{Collection, Direction, Query as StoreQuery, Row},
    views::{
        editor_form::{EditorRejection, EditorSnapshot, RecordEditor},
        list::{ListView, Page},
    },
};

pub fn members_router() -> Router<AppState> {
    Router::new()
        .route("/members", get(list_members))
        .route(
            "/members/{id}",
            get(read_member).patch(update_member).delete(delete_member),
        )
        .route("/members/{id}/edit", get(edit_member))
}

fn members(state: &AppState) -> Collection<MemberRecord> {
    Collection::new(state.store.clone())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberSearch {
    pub field: Option<String>,
    pub q: Option<String>,
    pub page: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOption {
    pub field: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct MembersPage {
    #[serde(flatten)]
    pub page: Page<MemberRecord>,
    #[serde(rename = "searchField")]
    pub search_field: &'static str,
    #[serde(rename = "searchFields")]
    pub search_fields: Vec<SearchOption>,
}

/// Newest first, optionally narrowed by a substring of one searchable column.
pub async fn list_members(
    State(state): State<AppState>,
    Query(search): Query<MemberSearch>,
) -> Result<Json<MembersPage>> {
    let field = search_field(search.field.as_deref())?;
    let mut query = StoreQuery::new();
    if let Some(needle) = search.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        query = query.ilike(field, needle);
    }
    let rows = members(&state)
        .list(&query.order("created_at", Direction::Desc))
        .await?;

    Ok(Json(MembersPage {
        page: ListView::new("/admin/members")
            .manageable()
            .load(rows)
            .into_page(search.page.unwrap_or(1)),
        search_field: field,
        search_fields: SEARCH_FIELDS
            .iter()
            .map(|&(field, label)| SearchOption { field, label })
            .collect(),
    }))
}

pub async fn read_member(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<MemberRecord>> {
    Ok(Json(members(&state).require(id).await?))
}

pub async fn edit_member(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<EditorSnapshot>> {
    let mut editor = RecordEditor::new(members(&state).require(id).await?)?;
    editor.edit();
    Ok(Json(editor.snapshot()))
}

pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<Row>,
) -> std::result::Result<Json<MemberRecord>, EditorRejection> {
    let collection = members(&state);
    let mut editor = RecordEditor::new(collection.require(id).await?)?;
    editor.apply(changes);
    let saved = editor.submit_tracked(&collection, &state.saves.members).await?;
    Ok(Json(saved))
}

pub async fn delete_member(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let collection = members(&state);
    collection.require(id).await?;
    let _saving = state.saves.members.acquire(id)?;
    collection.delete(id).await?;
    info!("member record {id} deleted by user {}", session.identity.id);
    Ok(MessageResponse::new("Member deleted."))
}
