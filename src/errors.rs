use argon2::password_hash::Error as ArError;
use axum::{Json, http::StatusCode, response::IntoResponse};
use jsonwebtoken::errors::Error as JWError;
use serde::Serialize;
use surrealdb::Error as SError;

use thiserror::Error;
use tracing::error;

pub type Result<T> = core::result::Result<T, Error>;

pub const TRY_AGAIN: &str = "Something went wrong, please try again.";

/// Coarse classification every failure collapses into before it reaches a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Transport,
    Unknown,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Argon 2 Error: {0}")]
    Argon2Error(#[from] ArError),

    #[error("Jason web token Error: {0}")]
    JwTError(#[from] JWError),

    #[error("SurrealDb Error: {0}")]
    SurrealError(#[from] SError),

    #[error("Http client Error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("Io Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization Error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Validator Error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Form Rejection Error: {0}")]
    AxumFormRejection(#[from] axum::extract::rejection::FormRejection),

    #[error("Json Rejection Error: {0}")]
    AxumJsonRejection(#[from] axum::extract::rejection::JsonRejection),

    #[error("Query Rejection Error: {0}")]
    AxumQueryRejection(#[from] axum::extract::rejection::QueryRejection),

    #[error("{0}")]
    Invalid(String),

    #[error("Field `{0}` cannot be modified")]
    ImmutableField(String),

    #[error("Invalid login credentials")]
    InvalidLoginDetails,

    #[error("User already registered")]
    EmailExist(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("Record {0} is already being saved")]
    RowBusy(i64),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Access denied")]
    AccessDenied,

    #[error("{0}")]
    MailRejected(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("unknown Error")]
    Unknown,
}

impl Error {
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::Invalid(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ValidationError(_)
            | Error::AxumFormRejection(_)
            | Error::AxumJsonRejection(_)
            | Error::AxumQueryRejection(_)
            | Error::Invalid(_)
            | Error::ImmutableField(_)
            | Error::EmailExist(_)
            | Error::Duplicate(_)
            | Error::RowBusy(_) => ErrorKind::Validation,
            Error::InvalidLoginDetails | Error::NotAuthenticated | Error::AccessDenied => {
                ErrorKind::Authorization
            }
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::SurrealError(_) | Error::HttpClientError(_) | Error::IoError(_) => {
                ErrorKind::Transport
            }
            Error::Argon2Error(_)
            | Error::JwTError(_)
            | Error::SerdeError(_)
            | Error::MailRejected(_)
            | Error::Config(_)
            | Error::Unknown => ErrorKind::Unknown,
        }
    }

    /// Text a person is shown for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Error::ValidationError(errors) => first_validation_message(errors),
            Error::AxumFormRejection(error) => error.body_text(),
            Error::AxumJsonRejection(error) => error.body_text(),
            Error::AxumQueryRejection(error) => error.body_text(),
            Error::Argon2Error(_) | Error::JwTError(_) | Error::SerdeError(_) | Error::Config(_) => {
                "Internal Error".to_string()
            }
            _ if self.kind() == ErrorKind::Transport => TRY_AGAIN.to_string(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::RowBusy(_) | Error::Duplicate(_) => StatusCode::CONFLICT,
            Error::InvalidLoginDetails => StatusCode::BAD_REQUEST,
            Error::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Error::AccessDenied => StatusCode::FORBIDDEN,
            _ => match self.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Authorization => StatusCode::UNAUTHORIZED,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Transport | ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

/// Validation messages sorted by field so the reported one is stable.
fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(field, errs)| errs.iter().map(move |e| (field.clone(), e)))
        .map(|(field, e)| {
            e.message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid value for {field}"))
        })
        .next()
        .unwrap_or_else(|| format!("Input validation error: [{}]", errors).replace('\n', ", "))
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
}

impl From<&Error> for ErrorBody {
    fn from(value: &Error) -> Self {
        ErrorBody {
            error: value.user_message(),
            kind: value.kind(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        match self.kind() {
            ErrorKind::Transport | ErrorKind::Unknown => error!("{:#?}", self),
            _ => tracing::debug!("request rejected: {}", self),
        }
        (self.status(), Json(ErrorBody::from(&self))).into_response()
    }
}
