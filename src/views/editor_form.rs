//! Single-record editing: a draft over a stored record, the partial update it
//! turns into, and per-row save tracking.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    consts::store_const::IMMUTABLE_FIELDS,
    errors::{Error, ErrorBody, Result},
    store::{Collection, Record, Row, from_row, to_row},
};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    View,
    Edit,
}

/// What an open editor shows: its mode, the draft and the last save error.
#[derive(Serialize, Debug, Clone)]
pub struct EditorSnapshot {
    pub mode: EditorMode,
    pub draft: Row,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RecordEditor<T> {
    original: T,
    draft: Row,
    mode: EditorMode,
    error: Option<String>,
}

fn is_immutable(field: &str) -> bool {
    IMMUTABLE_FIELDS.contains(&field)
}

impl<T: Record> RecordEditor<T> {
    pub fn new(record: T) -> Result<Self> {
        Ok(Self {
            draft: to_row(&record)?,
            original: record,
            mode: EditorMode::View,
            error: None,
        })
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn draft(&self) -> &Row {
        &self.draft
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn record(&self) -> &T {
        &self.original
    }

    pub fn edit(&mut self) {
        self.mode = EditorMode::Edit;
        self.error = None;
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            mode: self.mode,
            draft: self.draft.clone(),
            error: self.error.clone(),
        }
    }

    /// Merges field edits into the draft. Identifier, linkage and timestamps are ignored.
    pub fn apply(&mut self, changes: Row) {
        self.edit();
        for (field, value) in changes {
            if !is_immutable(&field) {
                self.draft.insert(field, value);
            }
        }
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.draft = to_row(&self.original)?;
        self.mode = EditorMode::View;
        self.error = None;
        Ok(())
    }

    /// The draft read back as a record, so field types and formats are normalised.
    fn candidate(&self) -> Result<T> {
        from_row(self.draft.clone())
            .map_err(|e| Error::invalid(format!("Invalid {}: {e}", T::NAME.to_lowercase())))
    }

    /// Mutable fields whose value differs from the stored record.
    pub fn patch(&self) -> Result<Row> {
        let candidate = to_row(&self.candidate()?)?;
        let original = to_row(&self.original)?;
        Ok(candidate
            .into_iter()
            .filter(|(field, value)| !is_immutable(field) && original.get(field) != Some(value))
            .collect())
    }

    async fn save(&self, collection: &Collection<T>) -> Result<T> {
        self.candidate()?.check()?;
        let patch = self.patch()?;
        if patch.is_empty() {
            debug!("{} {} unchanged, nothing to save", T::NAME, self.original.id());
            return Ok(self.original.clone());
        }
        collection.update(self.original.id(), patch).await
    }

    /// Checks the draft locally, then sends the patch. A failure keeps the draft
    /// and records the message; success returns the editor to view mode.
    pub async fn submit(&mut self, collection: &Collection<T>) -> Result<T> {
        match self.save(collection).await {
            Ok(saved) => {
                self.draft = to_row(&saved)?;
                self.original = saved.clone();
                self.mode = EditorMode::View;
                self.error = None;
                info!("{} {} saved", T::NAME, saved.id());
                Ok(saved)
            }
            Err(e) => {
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// [`Self::submit`] while holding the row's save mark.
    pub async fn submit_tracked(
        mut self,
        collection: &Collection<T>,
        tracker: &SaveTracker,
    ) -> std::result::Result<T, EditorRejection> {
        let _saving = match tracker.acquire(self.original.id()) {
            Ok(guard) => guard,
            Err(e) => return Err(self.rejection(e)),
        };
        match self.submit(collection).await {
            Ok(saved) => Ok(saved),
            Err(e) => Err(self.rejection(e)),
        }
    }

    pub fn rejection(self, error: Error) -> EditorRejection {
        EditorRejection {
            error,
            draft: self.draft,
        }
    }
}

/// A failed save answered with the message and the draft it was made with.
#[derive(Debug)]
pub struct EditorRejection {
    pub error: Error,
    pub draft: Row,
}

/// Failures before a draft exists carry an empty one.
impl From<Error> for EditorRejection {
    fn from(error: Error) -> Self {
        Self {
            error,
            draft: Row::new(),
        }
    }
}

#[derive(Serialize)]
struct RejectionBody {
    #[serde(flatten)]
    error: ErrorBody,
    draft: Row,
}

impl IntoResponse for EditorRejection {
    fn into_response(self) -> Response {
        let status = self.error.status();
        debug!("save rejected: {}", self.error);
        let body = RejectionBody {
            error: ErrorBody::from(&self.error),
            draft: self.draft,
        };
        (status, Json(body)).into_response()
    }
}

/// Rows with a save (or delete) in flight, keyed by record id.
#[derive(Debug, Clone, Default)]
pub struct SaveTracker {
    in_flight: Arc<Mutex<HashMap<i64, Instant>>>,
}

impl SaveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<i64, Instant>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `id` as saving until the returned guard drops.
    pub fn acquire(&self, id: i64) -> Result<SaveGuard> {
        let mut rows = self.rows();
        if rows.contains_key(&id) {
            return Err(Error::RowBusy(id));
        }
        rows.insert(id, Instant::now());
        Ok(SaveGuard {
            tracker: self.clone(),
            id,
        })
    }

    pub fn is_saving(&self, id: i64) -> bool {
        self.rows().contains_key(&id)
    }
}

pub struct SaveGuard {
    tracker: SaveTracker,
    id: i64,
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        if let Some(started) = self.tracker.rows().remove(&self.id) {
            debug!("row {} released after {:?}", self.id, started.elapsed());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::{
        models::{
            event::{CreateEvent, Event, EventStatus},
            member::MemberRecord,
        },
        store::{RecordStore, memory::MemoryStore},
    };

    fn changes(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    async fn stored_event(store: Arc<MemoryStore>) -> (Collection<Event>, Event) {
        let events = Collection::<Event>::new(store);
        let event = events
            .insert(&CreateEvent {
                title: "Gala".into(),
                description: None,
                location: Some("Vienna".into()),
                department: None,
                contact_point: None,
                region: None,
                starts_at: Utc.with_ymd_and_hms(2025, 5, 1, 18, 0, 0).unwrap(),
                ends_at: Utc.with_ymd_and_hms(2025, 5, 1, 22, 0, 0).unwrap(),
                status: EventStatus::Scheduled,
                created_by: Some(1),
            })
            .await
            .unwrap();
        (events, event)
    }

    #[test]
    fn patch_never_carries_identity_or_timestamps() {
        let member = MemberRecord {
            id: 4,
            user_id: Some(9),
            f_name: Some("Ada".into()),
            created_at: Some("2025-01-01T00:00:00Z".into()),
            ..Default::default()
        };
        let mut editor = RecordEditor::new(member).unwrap();
        editor.apply(changes(json!({
            "id": 77,
            "user_id": 1,
            "created_at": "2030-01-01T00:00:00Z",
            "updated_at": "2030-01-01T00:00:00Z",
            "f_name": "Grace",
        })));

        let patch = editor.patch().unwrap();
        assert_eq!(patch.len(), 1);
        assert_eq!(patch["f_name"], "Grace");
        for field in IMMUTABLE_FIELDS {
            assert!(!patch.contains_key(field));
        }
    }

    #[tokio::test]
    async fn end_before_start_is_refused_before_the_store() {
        let store = Arc::new(MemoryStore::new());
        let (events, event) = stored_event(store.clone()).await;
        let writes = store.writes();

        let mut editor = RecordEditor::new(event).unwrap();
        editor.apply(changes(json!({"ends_at": "2025-05-01T17:00"})));
        assert!(editor.submit(&events).await.is_err());

        assert_eq!(store.writes(), writes);
        assert_eq!(editor.mode(), EditorMode::Edit);
        assert_eq!(editor.draft()["ends_at"], "2025-05-01T17:00");
        assert!(editor.error().is_some());

        let snapshot = editor.snapshot();
        assert_eq!(snapshot.mode, EditorMode::Edit);
        assert_eq!(snapshot.error.as_deref(), editor.error());
        assert_eq!(snapshot.draft["ends_at"], "2025-05-01T17:00");
    }

    #[tokio::test]
    async fn successful_submit_returns_to_view_mode() {
        let store = Arc::new(MemoryStore::new());
        let (events, event) = stored_event(store.clone()).await;

        let mut editor = RecordEditor::new(event).unwrap();
        editor.apply(changes(json!({"title": "Spring Gala", "starts_at": "2025-05-01T19:00"})));
        let saved = editor.submit(&events).await.unwrap();

        assert_eq!(editor.mode(), EditorMode::View);
        assert_eq!(saved.title, "Spring Gala");
        assert_eq!(saved.starts_at, Utc.with_ymd_and_hms(2025, 5, 1, 19, 0, 0).unwrap());
        assert_eq!(saved.created_by, Some(1));
        let stored = store.get("events", saved.id).await.unwrap().unwrap();
        assert_eq!(stored["starts_at"], "2025-05-01T19:00:00Z");
    }

    #[tokio::test]
    async fn store_rejection_keeps_the_draft() {
        let store = Arc::new(MemoryStore::new());
        let (events, event) = stored_event(store.clone()).await;
        events.delete(event.id).await.unwrap();

        let mut editor = RecordEditor::new(event).unwrap();
        editor.apply(changes(json!({"title": "Renamed"})));
        let err = editor.submit(&events).await.unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(editor.draft()["title"], "Renamed");
        let rejection = editor.rejection(err);
        assert_eq!(rejection.draft["title"], "Renamed");
    }

    #[test]
    fn cancel_restores_the_stored_values() {
        let mut editor = RecordEditor::new(MemberRecord {
            id: 1,
            f_name: Some("Ada".into()),
            ..Default::default()
        })
        .unwrap();
        editor.apply(changes(json!({"f_name": "Grace"})));
        editor.cancel().unwrap();
        assert_eq!(editor.mode(), EditorMode::View);
        assert_eq!(editor.draft()["f_name"], "Ada");
        assert!(editor.patch().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tracked_submit_refuses_a_row_already_saving() {
        let store = Arc::new(MemoryStore::new());
        let (events, event) = stored_event(store.clone()).await;
        let tracker = SaveTracker::new();
        let _in_flight = tracker.acquire(event.id).unwrap();

        let mut editor = RecordEditor::new(event).unwrap();
        editor.apply(changes(json!({"title": "Renamed"})));
        let rejection = editor.submit_tracked(&events, &tracker).await.unwrap_err();
        assert!(matches!(rejection.error, Error::RowBusy(_)));
        assert_eq!(rejection.draft["title"], "Renamed");
    }

    #[test]
    fn one_save_per_row_at_a_time() {
        let tracker = SaveTracker::new();
        let first = tracker.acquire(1).unwrap();
        assert!(matches!(tracker.acquire(1), Err(Error::RowBusy(1))));
        let other = tracker.acquire(2).unwrap();
        assert!(tracker.is_saving(1) && tracker.is_saving(2));

        drop(first);
        assert!(!tracker.is_saving(1));
        assert!(tracker.acquire(1).is_ok());
        drop(other);
        assert!(!tracker.is_saving(2));
    }
}
