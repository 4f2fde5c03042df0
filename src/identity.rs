//! Session and identity provider.
//!
//! A session is two halves: a signed token held by the client and a row in
//! the sessions table. A token whose row is gone (signed out, rotated on a
//! password change, expired) no longer resolves to an identity.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use tracing::{debug, info};

use crate::{
    config::Config,
    consts::MIN_PASSWORD_LEN,
    errors::{Error, Result},
    models::{
        tokens::{CreatePasswordResetToken, PasswordResetTokens},
        user::{
            AdminRow, CreateAdmin, CreateSession, Identity, IssuedSession, SessionRow, User,
            UserReqForSignUp, UserReqWithPassword, UserWithPassword,
        },
    },
    store::{Collection, Query, RecordStore, Row},
    utils::{
        jwt::{Claims, decode_jwt, encode_jwt},
        pwd::{hash_password, verify_password},
        time::{format_instant, time_now},
        token::{generate_reset_token, hash_token, random_token},
    },
};

const RESET_TOKEN_TTL_SECS: i64 = 60 * 60;
const INVALID_RESET_LINK: &str = "Reset link is invalid or has expired.";

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `None` for a token that is malformed, expired or no longer backed by a session.
    async fn current_identity(&self, token: &str) -> Result<Option<Identity>>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<IssuedSession>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity>;

    async fn sign_out(&self, token: &str) -> Result<()>;

    /// Returns the raw reset token when the account exists.
    async fn request_password_reset(&self, email: &str) -> Result<Option<String>>;

    async fn reset_password(&self, token: &str, password: &str) -> Result<()>;

    /// Changes the password and replaces every session of the identity with a fresh one.
    async fn update_password(&self, identity: &Identity, password: &str) -> Result<IssuedSession>;

    async fn is_admin(&self, user_id: i64) -> Result<bool>;
}

pub struct StoreIdentityProvider {
    users: Collection<User>,
    passwords: Collection<UserWithPassword>,
    sessions: Collection<SessionRow>,
    resets: Collection<PasswordResetTokens>,
    admins: Collection<AdminRow>,
    jwt_secret: String,
    jwt_issuer: String,
    session_ttl_secs: i64,
    admin_emails: Vec<String>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_password_length(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::invalid("Password must be at least 6 characters."));
    }
    Ok(())
}

impl StoreIdentityProvider {
    pub fn new(store: Arc<dyn RecordStore>, config: &Config) -> Self {
        Self {
            users: Collection::new(store.clone()),
            passwords: Collection::new(store.clone()),
            sessions: Collection::new(store.clone()),
            resets: Collection::new(store.clone()),
            admins: Collection::new(store),
            jwt_secret: config.jwt_secret.clone(),
            jwt_issuer: config.jwt_issuer.clone(),
            session_ttl_secs: config.session_ttl_secs,
            admin_emails: config.admin_emails.clone(),
        }
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users
            .find(&Query::new().eq("email", normalize_email(email)))
            .await
    }

    async fn issue_session(&self, user: &User) -> Result<IssuedSession> {
        let now = Utc::now();
        let expires = now + TimeDelta::seconds(self.session_ttl_secs);
        let sid = random_token(32);

        self.sessions
            .insert(&CreateSession {
                user_id: user.id,
                sid: sid.clone(),
                created_at: format_instant(&now),
                expires_at: format_instant(&expires),
            })
            .await?;

        let claims = Claims {
            id: user.id.to_string(),
            sid,
            exp: expires.timestamp() as usize,
            iat: now.timestamp() as usize,
            iss: self.jwt_issuer.clone(),
        };
        let token = encode_jwt(&claims, &self.jwt_secret)?;
        info!("session issued for user {}", user.id);

        Ok(IssuedSession {
            token,
            identity: user.identity(),
            max_age_secs: self.session_ttl_secs,
        })
    }

    async fn revoke_sessions(&self, user_id: i64) -> Result<()> {
        let sessions = self
            .sessions
            .list(&Query::new().eq("user_id", user_id))
            .await?;
        for session in sessions {
            self.sessions.delete(session.id).await?;
        }
        Ok(())
    }

    async fn set_password(&self, user_id: i64, password: &str) -> Result<()> {
        let password_hash = hash_password(password)?;
        let credential = self
            .passwords
            .find(&Query::new().eq("user_id", user_id))
            .await?;
        match credential {
            Some(credential) => {
                let mut patch = Row::new();
                patch.insert("password_hash".into(), password_hash.into());
                self.passwords.update(credential.id, patch).await?;
            }
            None => {
                self.passwords
                    .insert(&UserReqWithPassword {
                        user_id,
                        password_hash,
                    })
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for StoreIdentityProvider {
    async fn current_identity(&self, token: &str) -> Result<Option<Identity>> {
        let claims = match decode_jwt(token, &self.jwt_secret, &self.jwt_issuer) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!("session token rejected: {e}");
                return Ok(None);
            }
        };
        let Ok(user_id) = claims.id.parse::<i64>() else {
            return Ok(None);
        };

        let session = self
            .sessions
            .find(&Query::new().eq("sid", claims.sid).eq("user_id", user_id))
            .await?;
        match session {
            Some(session) if session.expires_at > time_now() => {}
            _ => return Ok(None),
        }

        Ok(self.users.get(user_id).await?.map(|user| user.identity()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<IssuedSession> {
        let user = self
            .user_by_email(email)
            .await?
            .ok_or(Error::InvalidLoginDetails)?;
        let credential = self
            .passwords
            .find(&Query::new().eq("user_id", user.id))
            .await?
            .ok_or(Error::InvalidLoginDetails)?;

        if !verify_password(password, &credential.password_hash)? {
            return Err(Error::InvalidLoginDetails);
        }

        self.issue_session(&user).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        check_password_length(password)?;
        let email = normalize_email(email);
        if self.user_by_email(&email).await?.is_some() {
            return Err(Error::EmailExist(email));
        }

        let user = self
            .users
            .insert(&UserReqForSignUp {
                email: email.clone(),
                email_confirmed: false,
                created_at: time_now(),
            })
            .await
            .map_err(|e| match e {
                Error::Duplicate(_) => Error::EmailExist(email.clone()),
                other => other,
            })?;
        self.set_password(user.id, password).await?;

        if self.admin_emails.contains(&email) {
            self.admins.insert(&CreateAdmin { user_id: user.id }).await?;
            info!("user {} registered as administrator", user.id);
        }

        info!("user {} registered", user.id);
        Ok(user.identity())
    }

    async fn sign_out(&self, token: &str) -> Result<()> {
        let Ok(data) = decode_jwt(token, &self.jwt_secret, &self.jwt_issuer) else {
            return Ok(());
        };
        let session = self
            .sessions
            .find(&Query::new().eq("sid", data.claims.sid))
            .await?;
        if let Some(session) = session {
            self.sessions.delete(session.id).await?;
            info!("session closed for user {}", session.user_id);
        }
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<Option<String>> {
        let Some(user) = self.user_by_email(email).await? else {
            return Ok(None);
        };

        let (token, token_hash) = generate_reset_token();
        let now = Utc::now();
        self.resets
            .insert(&CreatePasswordResetToken {
                user_id: user.id,
                token_hash,
                expires_at: format_instant(&(now + TimeDelta::seconds(RESET_TOKEN_TTL_SECS))),
                created_at: format_instant(&now),
            })
            .await?;
        info!("password reset requested for user {}", user.id);
        Ok(Some(token))
    }

    async fn reset_password(&self, token: &str, password: &str) -> Result<()> {
        check_password_length(password)?;
        let reset = self
            .resets
            .find(&Query::new().eq("token_hash", hash_token(token.trim())))
            .await?
            .filter(|reset| reset.used_at.is_none() && reset.expires_at > time_now())
            .ok_or_else(|| Error::invalid(INVALID_RESET_LINK))?;

        self.set_password(reset.user_id, password).await?;

        let mut used = Row::new();
        used.insert("used_at".into(), time_now().into());
        self.resets.update(reset.id, used).await?;

        self.revoke_sessions(reset.user_id).await?;
        info!("password reset completed for user {}", reset.user_id);
        Ok(())
    }

    async fn update_password(&self, identity: &Identity, password: &str) -> Result<IssuedSession> {
        check_password_length(password)?;
        let user = self.users.require(identity.id).await?;
        self.set_password(user.id, password).await?;
        self.revoke_sessions(user.id).await?;
        self.issue_session(&user).await
    }

    async fn is_admin(&self, user_id: i64) -> Result<bool> {
        Ok(self
            .admins
            .find(&Query::new().eq("user_id", user_id))
            .await?
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{memory::MemoryStore, testing::DelayedStore};

    fn provider_with(config: &Config) -> (Arc<MemoryStore>, StoreIdentityProvider) {
        let store = Arc::new(MemoryStore::new());
        let provider = StoreIdentityProvider::new(store.clone(), config);
        (store, provider)
    }

    fn provider() -> (Arc<MemoryStore>, StoreIdentityProvider) {
        provider_with(&Config::local())
    }

    #[tokio::test]
    async fn sign_up_then_sign_in_resolves_identity() {
        let (_, provider) = provider();
        let identity = provider.sign_up("Ada@Example.com ", "secret1").await.unwrap();
        assert_eq!(identity.email, "ada@example.com");

        let session = provider.sign_in("ada@example.com", "secret1").await.unwrap();
        assert_eq!(session.identity, identity);
        let current = provider.current_identity(&session.token).await.unwrap();
        assert_eq!(current, Some(identity));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let (_, provider) = provider();
        provider.sign_up("ada@example.com", "secret1").await.unwrap();

        let wrong = provider.sign_in("ada@example.com", "secret2").await;
        let unknown = provider.sign_in("bob@example.com", "secret1").await;
        assert!(matches!(wrong, Err(Error::InvalidLoginDetails)));
        assert!(matches!(unknown, Err(Error::InvalidLoginDetails)));
    }

    #[tokio::test]
    async fn duplicate_and_short_sign_ups_are_refused() {
        let (_, provider) = provider();
        provider.sign_up("ada@example.com", "secret1").await.unwrap();
        assert!(matches!(
            provider.sign_up("ADA@example.com", "secret1").await,
            Err(Error::EmailExist(_))
        ));
        assert!(matches!(
            provider.sign_up("bob@example.com", "short").await,
            Err(Error::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn racing_sign_ups_register_one_account() {
        let store = Arc::new(DelayedStore::new(Arc::new(MemoryStore::new())));
        let provider = StoreIdentityProvider::new(store.clone(), &Config::local());

        let (first, second) = tokio::join!(
            provider.sign_up("ada@example.com", "secret1"),
            provider.sign_up("ada@example.com", "secret1")
        );
        let refused = [&first, &second]
            .iter()
            .filter(|r| matches!(r, Err(Error::EmailExist(_))))
            .count();
        assert_eq!(refused, 1);
        assert_eq!(store.inner.count("users").await, 1);
        assert_eq!(store.inner.count("auth_passwords").await, 1);
    }

    #[tokio::test]
    async fn signed_out_or_forged_tokens_resolve_to_nobody() {
        let (_, provider) = provider();
        provider.sign_up("ada@example.com", "secret1").await.unwrap();
        let session = provider.sign_in("ada@example.com", "secret1").await.unwrap();

        provider.sign_out(&session.token).await.unwrap();
        assert_eq!(provider.current_identity(&session.token).await.unwrap(), None);
        assert_eq!(provider.current_identity("not-a-token").await.unwrap(), None);
        provider.sign_out("not-a-token").await.unwrap();
    }

    #[tokio::test]
    async fn admin_flag_follows_bootstrap_list() {
        let mut config = Config::local();
        config.admin_emails = vec!["root@example.com".into()];
        let (_, provider) = provider_with(&config);

        let admin = provider.sign_up("Root@example.com", "secret1").await.unwrap();
        let member = provider.sign_up("ada@example.com", "secret1").await.unwrap();
        assert!(provider.is_admin(admin.id).await.unwrap());
        assert!(!provider.is_admin(member.id).await.unwrap());
    }

    #[tokio::test]
    async fn reset_token_is_single_use_and_revokes_sessions() {
        let (_, provider) = provider();
        provider.sign_up("ada@example.com", "secret1").await.unwrap();
        let old = provider.sign_in("ada@example.com", "secret1").await.unwrap();

        assert_eq!(provider.request_password_reset("nobody@example.com").await.unwrap(), None);
        let token = provider
            .request_password_reset("ada@example.com")
            .await
            .unwrap()
            .unwrap();

        provider.reset_password(&token, "newsecret").await.unwrap();
        assert_eq!(provider.current_identity(&old.token).await.unwrap(), None);
        assert!(provider.sign_in("ada@example.com", "newsecret").await.is_ok());

        let again = provider.reset_password(&token, "another1").await.unwrap_err();
        assert_eq!(again.to_string(), INVALID_RESET_LINK);
    }

    #[tokio::test]
    async fn password_update_rotates_the_session() {
        let (_, provider) = provider();
        let identity = provider.sign_up("ada@example.com", "secret1").await.unwrap();
        let old = provider.sign_in("ada@example.com", "secret1").await.unwrap();

        let fresh = provider.update_password(&identity, "changed1").await.unwrap();
        assert_eq!(provider.current_identity(&old.token).await.unwrap(), None);
        assert_eq!(
            provider.current_identity(&fresh.token).await.unwrap(),
            Some(identity)
        );
    }
}
