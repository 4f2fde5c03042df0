use axum::{
    Json,
    extract::State,
    http::header::SET_COOKIE,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::warn;
use validator::Validate;

use crate::{
    dispatch::message::escape_html,
    errors::Result,
    mailer::OutboundEmail,
    middleware::{SessionContext, session_cookie},
    routes::MessageResponse,
    state::AppState,
    utils::{
        validated_form::{ValidatedForm, ValidatedJson},
        validator::{validate_email_shape, validate_password},
    },
};

const RESET_REQUESTED: &str = "If that email exists, a reset link has been sent.";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(custom(function = "validate_email_shape"))]
    pub email: String,
}

fn reset_email(from: &str, to: &str, link: &str) -> OutboundEmail {
    let link = escape_html(link);
    OutboundEmail {
        from: from.to_string(),
        to: vec![to.to_string()],
        subject: "Reset your password".to_string(),
        html: format!(
            "<p>We received a request to reset your password.</p>\
             <p><a href=\"{link}\">Choose a new password</a></p>\
             <p>The link expires in one hour. If you did not ask for it, ignore this email.</p>"
        ),
        attachments: Vec::new(),
    }
}

/// Same answer whether or not the account exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedForm(input): ValidatedForm<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let email = input.email.trim().to_lowercase();
    if let Some(token) = state.identity.request_password_reset(&email).await? {
        let link = format!(
            "{}/reset-password?{}",
            state.config.public_base_url.trim_end_matches('/'),
            serde_urlencoded::to_string([("token", token.as_str())]).unwrap_or_default()
        );
        let message = reset_email(&state.config.mail.from, &email, &link);
        if let Err(e) = state.mailer.send(&message).await {
            warn!("password reset mail could not be sent: {e}");
        }
    }
    Ok(MessageResponse::new(RESET_REQUESTED))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedForm(input): ValidatedForm<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    state.identity.reset_password(&input.token, &input.password).await?;
    Ok(MessageResponse::new("Password updated. You can now sign in."))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

/// Changing the password rotates the session; the response carries the new cookie.
pub async fn update_password(
    State(state): State<AppState>,
    session: SessionContext,
    ValidatedJson(input): ValidatedJson<UpdatePasswordRequest>,
) -> Result<impl IntoResponse> {
    let issued = state
        .identity
        .update_password(&session.identity, &input.password)
        .await?;
    let cookie = session_cookie(
        &state.config.session_cookie,
        &issued.token,
        issued.max_age_secs,
    );
    Ok(([(SET_COOKIE, cookie)], MessageResponse::new("Password updated.")))
}
