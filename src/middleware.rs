use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, warn};

use crate::{
    consts::route_const::{NEUTRAL, PUBLIC_ROUTES, STATIC_PREFIXES},
    errors::{Error, Result as RResult},
    models::user::Identity,
    state::AppState,
    utils::redirect::sign_in_location,
};

const SECURITY_HEADERS: [(&str, &str); 5] = [
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("x-xss-protection", "1; mode=block"),
    (
        "content-security-policy",
        "default-src 'self'; script-src 'self' 'unsafe-inline' 'unsafe-eval'; style-src 'self' 'unsafe-inline';",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Static,
    Protected,
    Admin,
    Api,
}

fn under(path: &str, root: &str) -> bool {
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

pub fn classify(path: &str) -> RouteClass {
    let last_segment = path.rsplit('/').next().unwrap_or_default();
    if STATIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) || last_segment.contains('.') {
        return RouteClass::Static;
    }
    if PUBLIC_ROUTES.iter().any(|route| under(path, route)) {
        return RouteClass::Public;
    }
    if under(path, "/api") {
        return RouteClass::Api;
    }
    if under(path, "/admin") {
        return RouteClass::Admin;
    }
    RouteClass::Protected
}

/// Who is behind the current request, resolved once by [`session_gate`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub identity: Identity,
    pub is_admin: bool,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    /// 303 to the sign-in page, carrying the original path.
    SignIn,
    /// 401 JSON.
    Unauthorized,
    /// 303 to the neutral page.
    Neutral,
}

pub fn decide(route: RouteClass, session: Option<&SessionContext>) -> GateDecision {
    match (route, session) {
        (RouteClass::Public | RouteClass::Static, _) => GateDecision::Pass,
        (RouteClass::Api, None) => GateDecision::Unauthorized,
        (RouteClass::Protected | RouteClass::Admin, None) => GateDecision::SignIn,
        (RouteClass::Admin, Some(session)) if !session.is_admin => GateDecision::Neutral,
        (_, Some(_)) => GateDecision::Pass,
    }
}

/// Session token from the session cookie, or a bearer `Authorization` header.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string());
    if from_cookie.is_some() {
        return from_cookie;
    }

    let header_value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = header_value.trim().splitn(2, ' ');
    let scheme = parts.next()?;
    let token = parts.next()?.trim();
    if scheme != "Bearer" {
        warn!("Invalid auth scheme: {scheme}");
        return None;
    }
    (!token.is_empty()).then(|| token.to_string())
}

pub fn session_cookie(name: &str, token: &str, max_age_secs: i64) -> String {
    format!("{name}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

pub fn cleared_cookie(name: &str) -> String {
    format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

pub fn apply_security_headers(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
}

/// Full provider check: the token must decode and still be backed by a session.
async fn resolve_session(state: &AppState, headers: &HeaderMap) -> Option<SessionContext> {
    let token = session_token(headers, &state.config.session_cookie)?;
    let identity = match state.identity.current_identity(&token).await {
        Ok(Some(identity)) => identity,
        Ok(None) => return None,
        Err(e) => {
            warn!("session lookup failed: {e}");
            return None;
        }
    };
    let is_admin = state.identity.is_admin(identity.id).await.unwrap_or_else(|e| {
        warn!("administrator check failed for user {}: {e}", identity.id);
        false
    });
    Some(SessionContext {
        identity,
        is_admin,
        token,
    })
}

pub async fn session_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let route = classify(&path);
    let headers = request.headers().clone();
    let session = match route {
        RouteClass::Static => None,
        _ => resolve_session(&state, &headers).await,
    };

    let mut response = match decide(route, session.as_ref()) {
        GateDecision::Pass => {
            if let Some(session) = session {
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
        GateDecision::SignIn => {
            debug!("no session for {path}, sending to sign in");
            Redirect::to(&sign_in_location(&path)).into_response()
        }
        GateDecision::Unauthorized => Error::NotAuthenticated.into_response(),
        GateDecision::Neutral => {
            debug!("non-administrator on {path}");
            Redirect::to(NEUTRAL).into_response()
        }
    };

    if !matches!(route, RouteClass::Public | RouteClass::Static) {
        apply_security_headers(response.headers_mut());
    }
    response
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> RResult<Self> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or(Error::NotAuthenticated)
    }
}

/// For routes that behave differently for signed-in visitors.
impl<S> OptionalFromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Option<Self>, Infallible> {
        Ok(parts.extensions.get::<SessionContext>().cloned())
    }
}
