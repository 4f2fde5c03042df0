use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::{
    errors::Result,
    models::news::{NewsArticle, NewsItem},
    state::AppState,
    store::{Collection, Direction, Query as StoreQuery},
    utils::time::day_range,
    views::list::{ListView, Page},
};

pub fn news_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/news", get(list_news))
        .route("/news/{id}", get(read_news))
        .with_state(state)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsFilter {
    pub q: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<usize>,
}

/// Newest first, filtered by text over title and body and by creation day.
pub async fn news_page(
    state: &AppState,
    filter: &NewsFilter,
    view: ListView<NewsArticle>,
) -> Result<Page<NewsItem>> {
    let (from, to) = day_range(filter.from.as_deref(), filter.to.as_deref())?;
    let articles = Collection::<NewsArticle>::new(state.store.clone())
        .list(&StoreQuery::new().order("created_at", Direction::Desc))
        .await?;

    let page = view
        .load(articles)
        .text_filter(["title", "body"], filter.q.as_deref())
        .date_range("created_at", from, to)
        .into_page(filter.page.unwrap_or(1));
    Ok(page.map_records(NewsItem::from))
}

pub async fn list_news(
    State(state): State<AppState>,
    Query(filter): Query<NewsFilter>,
) -> Result<Json<Page<NewsItem>>> {
    Ok(Json(news_page(&state, &filter, ListView::new("/news")).await?))
}

pub async fn read_news(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<NewsItem>> {
    let article = Collection::<NewsArticle>::new(state.store.clone()).require(id).await?;
    Ok(Json(article.into()))
}
