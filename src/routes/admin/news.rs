use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::{
    errors::Result,
    middleware::SessionContext,
    models::news::{CreateNewsArticle, NewsArticle, NewsItem},
    routes::{
        MessageResponse,
        news::{NewsFilter, news_page},
    },
    state::AppState,
    store::{Collection, Row},
    utils::{time::time_now, validated_form::ValidatedJson, validator::validate_title},
    views::{
        editor_form::{EditorRejection, EditorSnapshot, RecordEditor},
        list::{ListView, Page},
        rich_content::RichContent,
    },
};

pub fn news_admin_router() -> Router<AppState> {
    Router::new()
        .route("/news", get(list_articles).post(create_article))
        .route("/news/{id}", get(read_article).patch(update_article).delete(delete_article))
        .route("/news/{id}/edit", get(edit_article))
}

fn articles(state: &AppState) -> Collection<NewsArticle> {
    Collection::new(state.store.clone())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewsDraft {
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    /// HTML from the rich content editor.
    #[serde(default)]
    pub body: String,
}

pub async fn list_articles(
    State(state): State<AppState>,
    Query(filter): Query<NewsFilter>,
) -> Result<Json<Page<NewsItem>>> {
    let view: ListView<NewsArticle> = ListView::new("/admin/news").manageable();
    Ok(Json(news_page(&state, &filter, view).await?))
}

pub async fn read_article(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<NewsItem>> {
    Ok(Json(articles(&state).require(id).await?.into()))
}

pub async fn edit_article(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<EditorSnapshot>> {
    let mut editor = RecordEditor::new(articles(&state).require(id).await?)?;
    editor.edit();
    Ok(Json(editor.snapshot()))
}

pub async fn create_article(
    State(state): State<AppState>,
    session: SessionContext,
    ValidatedJson(draft): ValidatedJson<NewsDraft>,
) -> Result<(StatusCode, Json<NewsItem>)> {
    let now = time_now();
    let article = articles(&state)
        .insert(&CreateNewsArticle {
            title: draft.title.trim().to_string(),
            body: RichContent::from_html(&draft.body),
            created_at: now.clone(),
            updated_at: now,
        })
        .await?;
    info!("news article {} published by user {}", article.id, session.identity.id);
    Ok((StatusCode::CREATED, Json(article.into())))
}

pub async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<Row>,
) -> std::result::Result<Json<NewsItem>, EditorRejection> {
    let collection = articles(&state);
    let mut editor = RecordEditor::new(collection.require(id).await?)?;
    editor.apply(changes);
    let saved = editor.submit_tracked(&collection, &state.saves.news).await?;
    Ok(Json(saved.into()))
}

pub async fn delete_article(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<MessageResponse>> {
    let collection = articles(&state);
    collection.require(id).await?;
    let _saving = state.saves.news.acquire(id)?;
    collection.delete(id).await?;
    info!("news article {id} deleted");
    Ok(MessageResponse::new("Article deleted."))
}
