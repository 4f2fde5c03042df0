use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

use crate::errors::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// `memory` for the in-process store, anything else is handed to SurrealDB.
    pub store_url: String,
    pub store_namespace: String,
    pub store_database: String,
    pub store_username: String,
    pub store_password: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub session_ttl_secs: i64,
    pub session_cookie: String,
    pub public_base_url: String,
    pub admin_emails: Vec<String>,
    pub rate_limit: bool,
    pub mail: MailConfig,
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Without a key messages are logged instead of sent.
    pub api_key: Option<String>,
    pub endpoint: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub prod_id: String,
    pub uid_domain: String,
}

/// `store_url` selecting the in-process store.
pub const MEMORY_STORE: &str = "memory";

impl Config {
    pub fn load() -> Result<Self> {
        let store_url: String = try_load("PORTAL_STORE_URL", "ws://localhost:8050")?;
        Ok(Self {
            host: try_load("PORTAL_HOST", "127.0.0.1")?,
            port: try_load("PORTAL_PORT", "3587")?,
            store_namespace: try_load("PORTAL_STORE_NS", "portal")?,
            store_database: try_load("PORTAL_STORE_DB", "portal")?,
            store_username: try_load("PORTAL_STORE_USER", "root")?,
            store_password: store_password(&store_url)?,
            store_url,
            jwt_secret: read_secret("PORTAL_JWT_SECRET")?,
            jwt_issuer: try_load("PORTAL_JWT_ISSUER", "member-portal")?,
            session_ttl_secs: try_load("PORTAL_SESSION_TTL_SECS", "604800")?,
            session_cookie: try_load("PORTAL_SESSION_COOKIE", "portal-session")?,
            public_base_url: try_load("PORTAL_PUBLIC_URL", "http://localhost:3587")?,
            admin_emails: try_load::<String>("PORTAL_ADMIN_EMAILS", "")?
                .split(',')
                .map(|email| email.trim().to_lowercase())
                .filter(|email| !email.is_empty())
                .collect(),
            rate_limit: try_load("PORTAL_RATE_LIMIT", "true")?,
            mail: MailConfig {
                api_key: var("RESEND_API_KEY").ok(),
                endpoint: try_load("PORTAL_MAIL_ENDPOINT", "https://api.resend.com/emails")?,
                from: try_load("FROM_EMAIL", "IACA Alumni <no-reply@iaca-alumni.org>")?,
            },
            calendar: CalendarConfig {
                prod_id: try_load("PORTAL_ICS_PRODID", "-//IACA Alumni//Events//EN")?,
                uid_domain: try_load("PORTAL_ICS_DOMAIN", "iaca-alumni")?,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings for local runs and tests: in-memory store, no mail key, no rate limit.
    pub fn local() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3587,
            store_url: MEMORY_STORE.into(),
            store_namespace: "portal".into(),
            store_database: "portal".into(),
            store_username: "root".into(),
            store_password: String::new(),
            jwt_secret: "local-development-secret".into(),
            jwt_issuer: "member-portal".into(),
            session_ttl_secs: 60 * 60,
            session_cookie: "portal-session".into(),
            public_base_url: "http://localhost:3587".into(),
            admin_emails: Vec::new(),
            rate_limit: false,
            mail: MailConfig {
                api_key: None,
                endpoint: "https://api.resend.com/emails".into(),
                from: "IACA Alumni <no-reply@iaca-alumni.org>".into(),
            },
            calendar: CalendarConfig {
                prod_id: "-//IACA Alumni//Events//EN".into(),
                uid_domain: "iaca-alumni".into(),
            },
        }
    }
}

fn var(key: &str) -> core::result::Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| Error::Config(format!("Invalid {key} value: {e}")))
}

/// The in-process store has no credentials to read.
fn store_password(store_url: &str) -> Result<String> {
    if store_url == MEMORY_STORE {
        return Ok(String::new());
    }
    read_secret("PORTAL_STORE_PASSWORD")
}

/// Secrets come from the environment or, failing that, a mounted secret file.
fn read_secret(secret_name: &str) -> Result<String> {
    if let Ok(value) = env::var(secret_name) {
        return Ok(value);
    }
    let path = format!("/run/secrets/{secret_name}");
    std::fs::read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
            Error::Config(format!("{secret_name} is not configured"))
        })
}
