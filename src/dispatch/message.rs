use chrono::{DateTime, Utc};

use crate::models::event::Event;

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn when(value: &DateTime<Utc>) -> String {
    value.format("%a %-d %b %Y, %H:%M UTC").to_string()
}

fn or_dash(value: &Option<String>) -> String {
    escape_html(value.as_deref().filter(|v| !v.is_empty()).unwrap_or("-"))
}

pub fn subject(event: &Event) -> String {
    format!("Event: {}", event.title)
}

/// HTML body of the invite mail; every event field is escaped.
pub fn render(event: &Event) -> String {
    let location = escape_html(
        event
            .location
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or("TBA"),
    );
    format!(
        concat!(
            "<div style=\"font-family:Arial,sans-serif\">",
            "<h2>{title}</h2>",
            "<p><strong>When:</strong> {starts} - {ends}</p>",
            "<p><strong>Where:</strong> {location}</p>",
            "<p><strong>Department:</strong> {department}</p>",
            "<p><strong>Region:</strong> {region}</p>",
            "<p><strong>Contact:</strong> {contact}</p>",
            "<p>{description}</p>",
            "</div>"
        ),
        title = escape_html(&event.title),
        starts = when(&event.starts_at),
        ends = when(&event.ends_at),
        location = location,
        department = or_dash(&event.department),
        region = or_dash(&event.region),
        contact = or_dash(&event.contact_point),
        description = escape_html(event.description.as_deref().unwrap_or_default()),
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn body_escapes_fields_and_fills_gaps() {
        let event = Event {
            id: 1,
            title: "<script>alert(1)</script>".into(),
            description: None,
            location: None,
            department: Some("Alumni & Partners".into()),
            contact_point: None,
            region: None,
            starts_at: Utc.with_ymd_and_hms(2025, 5, 1, 18, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2025, 5, 1, 22, 0, 0).unwrap(),
            status: None,
            created_by: None,
        };
        let html = render(&event);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("<strong>Where:</strong> TBA"));
        assert!(html.contains("Alumni &amp; Partners"));
        assert!(html.contains("Thu 1 May 2025, 18:00 UTC"));
        assert_eq!(subject(&event), "Event: <script>alert(1)</script>");
    }
}
