use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    consts::route_const::SIGN_IN,
    errors::Result,
    middleware::{SessionContext, cleared_cookie, session_cookie},
    models::user::Identity,
    routes::MessageResponse,
    state::AppState,
    utils::{
        redirect::sanitize_return_target,
        validated_form::ValidatedForm,
        validator::{validate_email_shape, validate_password, validate_required_password},
    },
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReturnTarget {
    #[serde(rename = "returnUrl")]
    pub return_url: Option<String>,
    #[serde(rename = "redirectedFrom")]
    pub redirected_from: Option<String>,
}

impl ReturnTarget {
    pub fn resolve(&self) -> String {
        sanitize_return_target(self.return_url.as_deref().or(self.redirected_from.as_deref()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignInFormRequest {
    #[validate(custom(function = "validate_email_shape"))]
    pub email: String,
    #[validate(custom(function = "validate_required_password"))]
    pub password: String,
    #[serde(flatten)]
    pub target: ReturnTarget,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignInPageResponse {
    #[serde(rename = "returnTo")]
    return_to: String,
}

/// Already signed in: straight on to the target. Otherwise the form's context.
pub async fn sign_in_page(
    session: Option<SessionContext>,
    Query(target): Query<ReturnTarget>,
) -> Response {
    let return_to = target.resolve();
    match session {
        Some(_) => Redirect::to(&return_to).into_response(),
        None => Json(SignInPageResponse { return_to }).into_response(),
    }
}

pub async fn sign_in(
    State(state): State<AppState>,
    ValidatedForm(input): ValidatedForm<SignInFormRequest>,
) -> Result<impl IntoResponse> {
    let issued = state.identity.sign_in(&input.email, &input.password).await?;

    if let Err(e) = state.store.ensure_member_for(&issued.identity).await {
        warn!("profile provisioning after sign in failed for user {}: {e}", issued.identity.id);
    }

    let cookie = session_cookie(
        &state.config.session_cookie,
        &issued.token,
        issued.max_age_secs,
    );
    Ok(([(SET_COOKIE, cookie)], Redirect::to(&input.target.resolve())))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpFormRequest {
    #[validate(custom(function = "validate_email_shape"))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

pub async fn sign_up(
    State(state): State<AppState>,
    ValidatedForm(input): ValidatedForm<SignUpFormRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    state.identity.sign_up(&input.email, &input.password).await?;
    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Check your email to confirm your account, then sign in."),
    ))
}

pub async fn sign_out(State(state): State<AppState>, session: SessionContext) -> Result<impl IntoResponse> {
    state.identity.sign_out(&session.token).await?;
    info!("user {} signed out", session.identity.id);
    Ok((
        [(SET_COOKIE, cleared_cookie(&state.config.session_cookie))],
        Redirect::to(SIGN_IN),
    ))
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub identity: Identity,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

pub async fn session(session: SessionContext) -> Json<SessionResponse> {
    Json(SessionResponse {
        identity: session.identity,
        is_admin: session.is_admin,
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::{
        consts::store_const::MEMBER_TABLE,
        routes::testing::{ADMIN_EMAIL, test_app, test_app_refusing_inserts},
    };

    #[tokio::test]
    async fn sign_in_returns_to_the_original_path() {
        let app = test_app();
        app.state.identity.sign_up("ada@example.com", "secret1").await.unwrap();

        let reply = app
            .form(
                "/login",
                None,
                &[
                    ("email", "ada@example.com"),
                    ("password", "secret1"),
                    ("redirectedFrom", "/events"),
                ],
            )
            .await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location(), "/events");
        let cookie = reply.headers["set-cookie"].to_str().unwrap().to_string();
        assert!(cookie.starts_with("portal-session="));
        assert!(cookie.contains("HttpOnly"));

        let token = cookie.split(';').next().unwrap();
        let back = app.get("/events", Some(token)).await;
        assert_eq!(back.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn sign_in_provisions_a_member_record() {
        let app = test_app();
        app.state.identity.sign_up("ada@example.com", "secret1").await.unwrap();
        app.form("/login", None, &[("email", "ada@example.com"), ("password", "secret1")])
            .await;
        assert_eq!(app.store.count("alumni").await, 1);
    }

    #[tokio::test]
    async fn failed_provisioning_still_signs_in() {
        let app = test_app_refusing_inserts(MEMBER_TABLE);
        app.state.identity.sign_up("ada@example.com", "secret1").await.unwrap();

        let reply = app
            .form(
                "/login",
                None,
                &[
                    ("email", "ada@example.com"),
                    ("password", "secret1"),
                    ("redirectedFrom", "/events"),
                ],
            )
            .await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location(), "/events");
        let cookie = reply.headers["set-cookie"].to_str().unwrap();
        assert!(cookie.starts_with("portal-session="));
        assert_eq!(app.store.count(MEMBER_TABLE).await, 0);
    }

    #[tokio::test]
    async fn foreign_return_targets_fall_back_to_news() {
        let app = test_app();
        app.state.identity.sign_up("ada@example.com", "secret1").await.unwrap();
        let reply = app
            .form(
                "/login",
                None,
                &[
                    ("email", "ada@example.com"),
                    ("password", "secret1"),
                    ("returnUrl", "//evil.example/steal"),
                ],
            )
            .await;
        assert_eq!(reply.location(), "/news");
    }

    #[tokio::test]
    async fn bad_credentials_are_reported() {
        let app = test_app();
        let reply = app
            .form("/login", None, &[("email", "ada@example"), ("password", "x")])
            .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["error"], "Please enter a valid email address.");

        let reply = app
            .form("/login", None, &[("email", "ada@example.com"), ("password", "secret1")])
            .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["error"], "Invalid login credentials");
        assert_eq!(reply.body["kind"], "authorization");
    }

    #[tokio::test]
    async fn register_checks_password_length() {
        let app = test_app();
        let reply = app
            .form("/register", None, &[("email", "ada@example.com"), ("password", "12345")])
            .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["error"], "Password must be at least 6 characters.");

        let reply = app
            .form("/register", None, &[("email", "ada@example.com"), ("password", "123456")])
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(
            reply.body["message"],
            "Check your email to confirm your account, then sign in."
        );
    }

    #[tokio::test]
    async fn signed_in_visitor_skips_the_login_page() {
        let app = test_app();
        let cookie = app.signed_in("ada@example.com").await;
        let reply = app.get("/login?redirectedFrom=%2Fprofile", Some(&cookie)).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location(), "/profile");

        let anonymous = app.get("/login", None).await;
        assert_eq!(anonymous.status, StatusCode::OK);
        assert_eq!(anonymous.body["returnTo"], "/news");
    }

    #[tokio::test]
    async fn sign_out_tears_the_session_down() {
        let app = test_app();
        let cookie = app.signed_in(ADMIN_EMAIL).await;
        let session = app.get("/session", Some(&cookie)).await;
        assert_eq!(session.body["isAdmin"], true);

        let reply = app.form("/logout", Some(&cookie), &[]).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location(), "/login");
        assert!(reply.headers["set-cookie"].to_str().unwrap().contains("Max-Age=0"));

        let after = app.get("/session", Some(&cookie)).await;
        assert_eq!(after.status, StatusCode::SEE_OTHER);
    }
}
