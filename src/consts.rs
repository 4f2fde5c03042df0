pub mod store_const {
    pub const USER_TABLE: &str = "users";
    pub const AUTH_PASSWORD_TABLE: &str = "auth_passwords";
    pub const SESSION_TABLE: &str = "sessions";
    pub const PASSWORD_RESET_TABLE: &str = "password_resets";
    pub const ADMIN_TABLE: &str = "admins";
    pub const MEMBER_TABLE: &str = "alumni";
    pub const NEWS_TABLE: &str = "news";
    pub const EVENT_TABLE: &str = "events";
    pub const INVITE_TABLE: &str = "event_invite_emails";

    /// Fields the editor never sends and the store refuses to patch.
    pub const IMMUTABLE_FIELDS: [&str; 5] = ["id", "user_id", "created_by", "created_at", "updated_at"];

    /// `(table, field)` pairs that hold at most one row per value.
    pub const UNIQUE_FIELDS: [(&str, &str); 4] = [
        (USER_TABLE, "email"),
        (AUTH_PASSWORD_TABLE, "user_id"),
        (ADMIN_TABLE, "user_id"),
        (MEMBER_TABLE, "user_id"),
    ];
}

pub mod route_const {
    pub const SIGN_IN: &str = "/login";
    pub const NEUTRAL: &str = "/";
    pub const FALLBACK_REDIRECT: &str = "/news";
    pub const RETURN_PARAM: &str = "redirectedFrom";
    pub const PUBLIC_ROUTES: [&str; 5] = [
        "/login",
        "/register",
        "/forgot-password",
        "/reset-password",
        "/health",
    ];
    pub const STATIC_PREFIXES: [&str; 5] = ["/_next", "/static", "/favicon", "/icon", "/apple-icon"];
}

pub const PAGE_SIZE: usize = 10;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const NEWS_AUTHOR: &str = "IACA Alumni Team";
