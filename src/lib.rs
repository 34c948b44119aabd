//! SpendWise is a web app for tracking personal income and expenses.
//!
//! This library serves HTML pages for browsing and editing records directly,
//! and exposes a JSON API under `/api` for programmatic clients.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod db;
mod endpoints;
mod extract;
mod html;
mod log_in;
mod log_out;
mod logging;
mod navigation;
mod not_found;
mod register_user;
mod routing;
mod timezone;

pub mod password;
pub mod record;
pub mod user;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use user::{User, UserID, get_user_by_email, get_user_by_id};

use crate::{
    alert::AlertTemplate, html::render_error_page, not_found::get_404_not_found_response,
    record::RecordType, user::MAX_USERNAME_LENGTH,
};

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an email/password combination that does not match a
    /// registered user.
    #[error("incorrect email or password")]
    InvalidCredentials,

    /// The session cookie is missing from the cookie jar in the request.
    #[error("no session cookie in the cookie jar :(")]
    CookieMissing,

    /// The session token in the cookie has passed its expiry time.
    #[error("the session token has expired")]
    TokenExpired,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The password and its confirmation did not match during registration.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// The email address does not look like an email address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// A required registration field was left empty.
    #[error("the field \"{0}\" must not be empty")]
    EmptyField(&'static str),

    /// The username is longer than [MAX_USERNAME_LENGTH] characters.
    #[error("usernames must be at most {MAX_USERNAME_LENGTH} characters long")]
    UsernameTooLong,

    /// The username already belongs to a registered user.
    #[error("this username is already taken")]
    DuplicateUsername,

    /// The email address already belongs to a registered user.
    #[error("this email address is already registered")]
    DuplicateEmail,

    /// An empty string was used as a record name.
    #[error("the record name must not be empty")]
    EmptyRecordName,

    /// The category is not part of the catalog for the record's type.
    #[error("\"{category}\" is not a known {record_type} category")]
    UnknownCategory {
        /// The type whose catalog was consulted.
        record_type: RecordType,
        /// The rejected category label.
        category: String,
    },

    /// The record type string was neither "income" nor "expense".
    #[error("\"{0}\" is not a known record type")]
    UnknownRecordType(String),

    /// A date-time string could not be parsed in the `YYYY-MM-DDTHH:MM`
    /// format used by the record forms and the JSON API.
    #[error("\"{0}\" is not a valid date and time")]
    InvalidDateTime(String),

    /// An amount string could not be parsed as a decimal number.
    #[error("\"{0}\" is not a valid amount")]
    InvalidAmount(String),

    /// An update request did not carry the id of the record to update.
    #[error("an update request must include the record id")]
    MissingRecordId,

    /// A record referred to a user id that is not in the database.
    #[error("there is no user with the ID {0}")]
    InvalidUser(UserID),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to delete a record that does not exist.
    #[error("tried to delete a record that is not in the database")]
    DeleteMissingRecord,

    /// Tried to update a record that does not exist.
    #[error("tried to update a record that is not in the database")]
    UpdateMissingRecord,

    /// An error occurred while serializing a struct as JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical
    /// timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status code this error maps to on the JSON API.
    pub(crate) fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCredentials | Error::CookieMissing | Error::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            Error::TooWeak(_)
            | Error::PasswordMismatch
            | Error::InvalidEmail(_)
            | Error::EmptyField(_)
            | Error::UsernameTooLong
            | Error::DuplicateUsername
            | Error::DuplicateEmail
            | Error::EmptyRecordName
            | Error::UnknownCategory { .. }
            | Error::UnknownRecordType(_)
            | Error::InvalidDateTime(_)
            | Error::InvalidAmount(_)
            | Error::MissingRecordId
            | Error::InvalidUser(_) => StatusCode::BAD_REQUEST,
            Error::NotFound | Error::DeleteMissingRecord | Error::UpdateMissingRecord => {
                StatusCode::NOT_FOUND
            }
            Error::HashingError(_)
            | Error::JSONSerializationError(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::InvalidTimezoneError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// A message that is safe to show to the client.
    ///
    /// Internal errors are logged on the server and replaced with a generic
    /// message.
    pub(crate) fn user_message(&self) -> String {
        match self {
            Error::HashingError(_)
            | Error::JSONSerializationError(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::InvalidTimezoneError(_) => {
                tracing::error!("An unexpected error occurred: {}", self);
                "An unexpected error occurred. Try again later.".to_owned()
            }
            error => error.to_string(),
        }
    }

    /// Render this error as a `{"message": ...}` JSON response for the API.
    pub(crate) fn into_api_response(self) -> Response {
        let status_code = self.status_code();
        let message = self.user_message();

        (status_code, axum::Json(json!({ "message": message }))).into_response()
    }

    /// Render this error as a toast alert fragment for HTMX requests.
    pub(crate) fn into_alert_response(self) -> Response {
        let status_code = self.status_code();
        let message = self.user_message();

        (
            status_code,
            AlertTemplate::error("Something went wrong", &message).into_markup(),
        )
            .into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => render_error_page(
                "Invalid Timezone Settings",
                &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to a valid, canonical timezone string"
                ),
            ),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                render_error_page(
                    "Sorry, something went wrong.",
                    "Try again later or check the server logs",
                )
            }
        }
    }
}
