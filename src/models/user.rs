use serde::{Deserialize, Serialize};

use crate::{
    consts::store_const::{ADMIN_TABLE, AUTH_PASSWORD_TABLE, SESSION_TABLE, USER_TABLE},
    store::Record,
};

/// The authenticated person behind a request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String, // ! unique, stored lowercase
    pub email_confirmed: Option<bool>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            email: self.email.clone(),
        }
    }
}

impl Record for User {
    const TABLE: &'static str = USER_TABLE;
    const NAME: &'static str = "User";

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct UserReqForSignUp {
    pub email: String,
    pub email_confirmed: bool,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserWithPassword {
    pub id: i64,
    pub user_id: i64,
    pub password_hash: String,
}

impl Record for UserWithPassword {
    const TABLE: &'static str = AUTH_PASSWORD_TABLE;
    const NAME: &'static str = "Credential";

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct UserReqWithPassword {
    pub user_id: i64,
    pub password_hash: String,
}

/// Server-side half of a session; the signed token only carries `sid`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionRow {
    pub id: i64,
    pub user_id: i64,
    pub sid: String,
    pub created_at: String,
    pub expires_at: String,
}

impl Record for SessionRow {
    const TABLE: &'static str = SESSION_TABLE;
    const NAME: &'static str = "Session";

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateSession {
    pub user_id: i64,
    pub sid: String,
    pub created_at: String,
    pub expires_at: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AdminRow {
    pub id: i64,
    pub user_id: i64,
}

impl Record for AdminRow {
    const TABLE: &'static str = ADMIN_TABLE;
    const NAME: &'static str = "Administrator";

    fn id(&self) -> i64 {
        self.id
    }
}

/// A freshly issued session token and the identity it belongs to.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub identity: Identity,
    pub max_age_secs: i64,
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateAdmin {
    pub user_id: i64,
}
