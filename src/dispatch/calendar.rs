use chrono::{DateTime, Utc};

use crate::{config::CalendarConfig, models::event::Event, utils::time::format_ics};

/// Text value escaping for iCalendar; carriage returns are dropped.
pub fn escape_ics(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            ',' => escaped.push_str("\\,"),
            ';' => escaped.push_str("\\;"),
            '\r' => {}
            c => escaped.push(c),
        }
    }
    escaped
}

/// A single-event `VCALENDAR` with CRLF line endings.
pub fn build(event: &Event, config: &CalendarConfig, stamp: DateTime<Utc>) -> String {
    let lines = [
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{}", config.prod_id),
        "BEGIN:VEVENT".to_string(),
        format!("UID:event-{}@{}", event.id, config.uid_domain),
        format!("DTSTAMP:{}", format_ics(&stamp)),
        format!("DTSTART:{}", format_ics(&event.starts_at)),
        format!("DTEND:{}", format_ics(&event.ends_at)),
        format!("SUMMARY:{}", escape_ics(&event.title)),
        format!("LOCATION:{}", escape_ics(event.location.as_deref().unwrap_or_default())),
        format!(
            "DESCRIPTION:{}",
            escape_ics(event.description.as_deref().unwrap_or_default())
        ),
        "END:VEVENT".to_string(),
        "END:VCALENDAR".to_string(),
    ];
    lines.join("\r\n")
}
