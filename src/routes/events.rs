use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    errors::Result,
    models::event::Event,
    state::AppState,
    store::{Collection, Direction, Query as StoreQuery},
    utils::time::{day_range, format_instant},
    views::list::{ListView, Page},
};

pub fn events_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/{id}", get(read_event))
        .with_state(state)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub term: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    pub page: Option<usize>,
}

impl EventFilter {
    /// Filters run in the store: starts on or after the start day, ends on or
    /// before the end day, title substring. Ascending by start.
    pub fn store_query(&self) -> Result<StoreQuery> {
        let (from, to) = day_range(self.start_date.as_deref(), self.end_date.as_deref())?;
        let mut query = StoreQuery::new();
        if let Some(from) = from {
            query = query.gte("starts_at", format_instant(&from));
        }
        if let Some(to) = to {
            query = query.lte("ends_at", format_instant(&to));
        }
        if let Some(term) = self.term.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query = query.ilike("title", term);
        }
        Ok(query.order("starts_at", Direction::Asc))
    }

    pub fn has_filters(&self) -> bool {
        [&self.term, &self.start_date, &self.end_date]
            .into_iter()
            .flatten()
            .any(|value| !value.trim().is_empty())
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct EventsPage {
    #[serde(flatten)]
    pub page: Page<Event>,
    #[serde(rename = "hasFilters")]
    pub has_filters: bool,
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Result<Json<EventsPage>> {
    let query = filter.store_query()?;
    let events = Collection::<Event>::new(state.store.clone()).list(&query).await?;
    Ok(Json(EventsPage {
        page: ListView::new("/events").load(events).into_page(filter.page.unwrap_or(1)),
        has_filters: filter.has_filters(),
    }))
}

pub async fn read_event(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Event>> {
    Ok(Json(Collection::<Event>::new(state.store.clone()).require(id).await?))
}
