//! Event invites: a calendar file and an HTML summary mailed to the member
//! who asked for them, followed by a best-effort audit row.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use tracing::{info, warn};

use crate::{
    config::{CalendarConfig, Config},
    errors::Result,
    mailer::{Attachment, Mailer, OutboundEmail},
    models::{
        event::Event,
        invitation::{CreateInviteRecord, InviteOutcome, InviteRecord},
        user::Identity,
    },
    store::{Collection, RecordStore},
    utils::time::time_now,
};

pub mod calendar;
pub mod message;

#[derive(Clone)]
pub struct InviteDispatcher {
    events: Collection<Event>,
    invites: Collection<InviteRecord>,
    mailer: Arc<dyn Mailer>,
    from: String,
    calendar: CalendarConfig,
}

impl InviteDispatcher {
    pub fn new(store: Arc<dyn RecordStore>, mailer: Arc<dyn Mailer>, config: &Config) -> Self {
        Self {
            events: Collection::new(store.clone()),
            invites: Collection::new(store),
            mailer,
            from: config.mail.from.clone(),
            calendar: config.calendar.clone(),
        }
    }

    pub fn compose(&self, event: &Event, to: &str) -> OutboundEmail {
        let ics = calendar::build(event, &self.calendar, Utc::now());
        OutboundEmail {
            from: self.from.clone(),
            to: vec![to.to_string()],
            subject: message::subject(event),
            html: message::render(event),
            attachments: vec![Attachment {
                filename: format!("event-{}.ics", event.id),
                content: STANDARD.encode(ics),
                content_type: "text/calendar".to_string(),
            }],
        }
    }

    /// Mails the invite for `event_id` to `identity`. Unknown events fail with
    /// `NotFound` before anything is sent. Only accepted sends are recorded.
    pub async fn dispatch(&self, event_id: i64, identity: &Identity) -> Result<()> {
        let event = self.events.require(event_id).await?;
        let email = self.compose(&event, &identity.email);

        if let Err(e) = self.mailer.send(&email).await {
            warn!("invite for event {} to user {} failed: {e}", event.id, identity.id);
            return Err(e);
        }
        info!("invite for event {} sent to user {}", event.id, identity.id);

        self.record(&event, identity).await;
        Ok(())
    }

    async fn record(&self, event: &Event, identity: &Identity) {
        let row = CreateInviteRecord {
            event_id: event.id,
            user_id: identity.id,
            email_to: identity.email.clone(),
            status: InviteOutcome::Sent,
            created_at: time_now(),
        };
        if let Err(e) = self.invites.insert(&row).await {
            warn!("could not record invite for event {}: {e}", event.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{
        consts::store_const::INVITE_TABLE,
        errors::Error,
        mailer::testing::RecordingMailer,
        models::event::{CreateEvent, EventStatus},
        store::{memory::MemoryStore, testing::FailingStore},
    };

    fn ada() -> Identity {
        Identity {
            id: 5,
            email: "ada@example.com".into(),
        }
    }

    async fn seeded(mailer: Arc<RecordingMailer>) -> (Arc<MemoryStore>, InviteDispatcher, Event) {
        let store = Arc::new(MemoryStore::new());
        let event = Collection::<Event>::new(store.clone())
            .insert(&CreateEvent {
                title: "Alumni Gala".into(),
                description: Some("Dinner, drinks; music".into()),
                location: Some("Laxenburg".into()),
                department: None,
                contact_point: None,
                region: None,
                starts_at: Utc.with_ymd_and_hms(2025, 5, 1, 18, 0, 0).unwrap(),
                ends_at: Utc.with_ymd_and_hms(2025, 5, 1, 22, 0, 0).unwrap(),
                status: EventStatus::Scheduled,
                created_by: None,
            })
            .await
            .unwrap();
        let dispatcher = InviteDispatcher::new(store.clone(), mailer, &Config::local());
        (store, dispatcher, event)
    }

    #[tokio::test]
    async fn sends_calendar_attachment_and_records_it() {
        let mailer = Arc::new(RecordingMailer::default());
        let (store, dispatcher, event) = seeded(mailer.clone()).await;

        dispatcher.dispatch(event.id, &ada()).await.unwrap();

        let sent = mailer.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["ada@example.com".to_string()]);
        assert_eq!(sent[0].subject, "Event: Alumni Gala");
        let attachment = &sent[0].attachments[0];
        assert_eq!(attachment.filename, format!("event-{}.ics", event.id));
        assert_eq!(attachment.content_type, "text/calendar");
        let ics = String::from_utf8(STANDARD.decode(&attachment.content).unwrap()).unwrap();
        assert!(ics.contains("DESCRIPTION:Dinner\\, drinks\\; music"));

        let rows = store.select(INVITE_TABLE, &Default::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["status"], "sent");
        assert_eq!(rows[0]["email_to"], "ada@example.com");
    }

    #[tokio::test]
    async fn unknown_event_sends_and_records_nothing() {
        let mailer = Arc::new(RecordingMailer::default());
        let (store, dispatcher, _) = seeded(mailer.clone()).await;

        let err = dispatcher.dispatch(999, &ada()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound("Event")));
        assert!(mailer.sent.lock().await.is_empty());
        assert_eq!(store.count(INVITE_TABLE).await, 0);
    }

    #[tokio::test]
    async fn provider_message_survives_a_failed_send() {
        let mailer = Arc::new(RecordingMailer::failing("Domain not verified"));
        let (store, dispatcher, event) = seeded(mailer).await;

        let err = dispatcher.dispatch(event.id, &ada()).await.unwrap_err();
        assert_eq!(err.user_message(), "Domain not verified");
        assert_eq!(store.count(INVITE_TABLE).await, 0);
    }

    #[tokio::test]
    async fn lost_audit_row_does_not_fail_the_dispatch() {
        let mailer = Arc::new(RecordingMailer::default());
        let (store, _, event) = seeded(mailer.clone()).await;
        let refusing = Arc::new(FailingStore::new(store.clone(), INVITE_TABLE));
        let dispatcher = InviteDispatcher::new(refusing, mailer.clone(), &Config::local());

        dispatcher.dispatch(event.id, &ada()).await.unwrap();
        assert_eq!(mailer.sent.lock().await.len(), 1);
        assert_eq!(store.count(INVITE_TABLE).await, 0);
    }
}
