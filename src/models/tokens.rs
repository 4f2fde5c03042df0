use serde::{Deserialize, Serialize};

use crate::{consts::store_const::PASSWORD_RESET_TABLE, store::Record};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PasswordResetTokens {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: String,
    pub used_at: Option<String>,
    pub created_at: String,
}

impl Record for PasswordResetTokens {
    const TABLE: &'static str = PASSWORD_RESET_TABLE;
    const NAME: &'static str = "Reset token";

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct CreatePasswordResetToken {
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}
