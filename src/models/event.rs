use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    consts::store_const::EVENT_TABLE,
    errors::{Error, Result},
    store::{Record, Row},
    utils::time::{self, format_instant, parse_instant},
};

const END_BEFORE_START: &str = "End date must be the same as or after the start date.";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Scheduled,
    Cancelled,
    Completed,
}

impl EventStatus {
    pub const ALL: [EventStatus; 3] = [
        EventStatus::Scheduled,
        EventStatus::Cancelled,
        EventStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Scheduled => "scheduled",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EventStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| Error::invalid(format!("Unknown event status `{s}`")))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub department: Option<String>,
    pub contact_point: Option<String>,
    pub region: Option<String>,
    #[serde(with = "time::instant")]
    pub starts_at: DateTime<Utc>,
    #[serde(with = "time::instant")]
    pub ends_at: DateTime<Utc>,
    pub status: Option<EventStatus>,
    pub created_by: Option<i64>,
}

impl Event {
    pub fn status(&self) -> EventStatus {
        self.status.unwrap_or_default()
    }
}

impl Record for Event {
    const TABLE: &'static str = EVENT_TABLE;
    const NAME: &'static str = "Event";

    fn id(&self) -> i64 {
        self.id
    }

    fn check(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::invalid("Title is required."));
        }
        if self.ends_at < self.starts_at {
            return Err(Error::invalid(END_BEFORE_START));
        }
        Ok(())
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateEvent {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub department: Option<String>,
    pub contact_point: Option<String>,
    pub region: Option<String>,
    #[serde(with = "time::instant")]
    pub starts_at: DateTime<Utc>,
    #[serde(with = "time::instant")]
    pub ends_at: DateTime<Utc>,
    pub status: EventStatus,
    pub created_by: Option<i64>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// The admin "create event" form as submitted.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct EventDraft {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub department: Option<String>,
    pub contact_point: Option<String>,
    pub region: Option<String>,
    pub status: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
}

impl EventDraft {
    pub fn into_new_event(self, created_by: Option<i64>) -> Result<CreateEvent> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::invalid("Title is required."));
        }
        let (Some(starts_at), Some(ends_at)) = (required(&self.starts_at), required(&self.ends_at))
        else {
            return Err(Error::invalid("Start and end dates are required."));
        };
        let (Some(starts_at), Some(ends_at)) = (parse_instant(starts_at), parse_instant(ends_at))
        else {
            return Err(Error::invalid("Invalid start or end date."));
        };
        if ends_at < starts_at {
            return Err(Error::invalid(END_BEFORE_START));
        }
        let status = match required(&self.status) {
            Some(status) => status.parse()?,
            None => EventStatus::Scheduled,
        };

        Ok(CreateEvent {
            title,
            description: blank_to_none(self.description),
            location: blank_to_none(self.location),
            department: blank_to_none(self.department),
            contact_point: blank_to_none(self.contact_point),
            region: blank_to_none(self.region),
            starts_at,
            ends_at,
            status,
            created_by,
        })
    }
}

/// One row of the admin events table while it is being edited in place.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EditableEvent {
    #[serde(default)]
    pub title: String,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
}

fn local_input_value(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M").to_string()
}

impl From<&Event> for EditableEvent {
    fn from(event: &Event) -> Self {
        EditableEvent {
            title: event.title.clone(),
            starts_at: Some(local_input_value(&event.starts_at)),
            ends_at: Some(local_input_value(&event.ends_at)),
            location: event.location.clone(),
            status: Some(event.status().to_string()),
        }
    }
}

impl EditableEvent {
    /// Validates the row and turns it into field changes for the record editor.
    pub fn into_changes(self) -> Result<Row> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::invalid("Title is required."));
        }
        let (Some(starts_at), Some(ends_at)) = (required(&self.starts_at), required(&self.ends_at))
        else {
            return Err(Error::invalid("Start and end times are required."));
        };
        let (Some(starts_at), Some(ends_at)) = (parse_instant(starts_at), parse_instant(ends_at))
        else {
            return Err(Error::invalid("Invalid dates supplied."));
        };
        if ends_at < starts_at {
            return Err(Error::invalid(END_BEFORE_START));
        }
        let status = match required(&self.status) {
            Some(status) => status.parse()?,
            None => EventStatus::Scheduled,
        };

        let mut changes = Row::new();
        changes.insert("title".into(), Value::String(title));
        changes.insert("starts_at".into(), Value::String(format_instant(&starts_at)));
        changes.insert("ends_at".into(), Value::String(format_instant(&ends_at)));
        changes.insert(
            "location".into(),
            blank_to_none(self.location).map(Value::String).unwrap_or(Value::Null),
        );
        changes.insert("status".into(), Value::String(status.to_string()));
        Ok(changes)
    }
}
