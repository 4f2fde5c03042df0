use serde::{Deserialize, Serialize};

use crate::{consts::store_const::INVITE_TABLE, store::Record};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InviteOutcome {
    Sent,
}

/// Audit trail of calendar invites the provider accepted. Append-only.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InviteRecord {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub email_to: String, // ! & (len = 255)
    pub status: InviteOutcome,
    pub created_at: String,
}

impl Record for InviteRecord {
    const TABLE: &'static str = INVITE_TABLE;
    const NAME: &'static str = "Invite";

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateInviteRecord {
    pub event_id: i64,
    pub user_id: i64,
    pub email_to: String,
    pub status: InviteOutcome,
    pub created_at: String,
}
