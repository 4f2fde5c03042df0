use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Serialize;
use tracing::info;

use crate::{
    errors::Result,
    middleware::SessionContext,
    models::event::{EditableEvent, Event, EventDraft},
    routes::{MessageResponse, events::EventFilter},
    state::AppState,
    store::{Collection, to_row},
    views::{
        editor_form::{EditorMode, EditorRejection, EditorSnapshot, RecordEditor},
        list::{ListView, Page},
    },
};

pub fn events_admin_router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", get(read_event).patch(update_event).delete(delete_event))
        .route("/events/{id}/edit", get(edit_event))
}

fn events(state: &AppState) -> Collection<Event> {
    Collection::new(state.store.clone())
}

/// A table row: the stored event, its inline-edit projection and whether a save is running.
#[derive(Serialize, Debug, Clone)]
pub struct AdminEventRow {
    #[serde(flatten)]
    pub event: Event,
    pub editable: EditableEvent,
    pub saving: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct AdminEventsPage {
    #[serde(flatten)]
    pub page: Page<AdminEventRow>,
    #[serde(rename = "hasFilters")]
    pub has_filters: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct EventSaved {
    pub message: &'static str,
    pub event: Event,
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Result<Json<AdminEventsPage>> {
    let rows = events(&state).list(&filter.store_query()?).await?;
    let saving = &state.saves.events;
    let page = ListView::new("/admin/events")
        .manageable()
        .load(rows)
        .into_page(filter.page.unwrap_or(1))
        .map_records(|event| AdminEventRow {
            editable: EditableEvent::from(&event),
            saving: saving.is_saving(event.id),
            event,
        });
    Ok(Json(AdminEventsPage {
        page,
        has_filters: filter.has_filters(),
    }))
}

pub async fn read_event(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Event>> {
    Ok(Json(events(&state).require(id).await?))
}

/// Opens the row in its inline-edit projection.
pub async fn edit_event(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<EditorSnapshot>> {
    let event = events(&state).require(id).await?;
    Ok(Json(EditorSnapshot {
        mode: EditorMode::Edit,
        draft: to_row(&EditableEvent::from(&event))?,
        error: None,
    }))
}

/// The draft is checked in full before anything is written.
pub async fn create_event(
    State(state): State<AppState>,
    session: SessionContext,
    Json(draft): Json<EventDraft>,
) -> Result<(StatusCode, Json<EventSaved>)> {
    let new_event = draft.into_new_event(Some(session.identity.id))?;
    let event = events(&state).insert(&new_event).await?;
    info!("event {} created by user {}", event.id, session.identity.id);
    Ok((
        StatusCode::CREATED,
        Json(EventSaved {
            message: "Event created successfully.",
            event,
        }),
    ))
}

/// Row edits are validated before the stored event is even read.
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(row): Json<EditableEvent>,
) -> std::result::Result<Json<EventSaved>, EditorRejection> {
    let changes = match row.clone().into_changes() {
        Ok(changes) => changes,
        Err(error) => {
            return Err(EditorRejection {
                error,
                draft: to_row(&row)?,
            });
        }
    };

    let collection = events(&state);
    let mut editor = RecordEditor::new(collection.require(id).await?)?;
    editor.apply(changes);
    let event = editor.submit_tracked(&collection, &state.saves.events).await?;
    Ok(Json(EventSaved {
        message: "Event updated successfully.",
        event,
    }))
}

pub async fn delete_event(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<MessageResponse>> {
    let collection = events(&state);
    collection.require(id).await?;
    let _saving = state.saves.events.acquire(id)?;
    collection.delete(id).await?;
    info!("event {id} deleted");
    Ok(MessageResponse::new("Event deleted."))
}
