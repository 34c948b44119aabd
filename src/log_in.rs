//! The log-in page and the `/api/users/login` endpoint.
//! The auth module handles the lower level cookie and token logic.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::{HxRedirect, HxRequest};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    alert::{AlertType, ToastQueue, push_toast_inline},
    auth::{DEFAULT_COOKIE_DURATION, set_auth_cookie},
    endpoints,
    extract::JsonOrForm,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, loading_spinner,
        log_in_register,
    },
    timezone::get_local_offset,
    user::{UserProfile, get_user_by_email},
};

fn log_in_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            hx-target-error="#alert-container"
            hx-swap="beforeend"
            class="space-y-4 md:space-y-6"
        {
            div
            {
                label for="email" class=(FORM_LABEL_STYLE) { "Email" }

                input
                    type="email"
                    name="email"
                    id="email"
                    placeholder="you@example.com"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    autofocus;
            }

            div
            {
                label for="password" class=(FORM_LABEL_STYLE) { "Password" }

                input
                    type="password"
                    name="password"
                    id="password"
                    placeholder="••••••••"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required;
            }

            button
                type="submit" id="submit-button" tabindex="0"
                class=(format!("w-full {BUTTON_PRIMARY_STYLE}"))
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "Don't have an account? "
                a
                    href=(endpoints::REGISTER_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Register here"
                }
            }
        }
    }
}

/// Display the log-in page.
pub async fn get_log_in_page() -> Response {
    let content = log_in_register("Log in to your account", &log_in_form());
    base("Log In", &content).into_response()
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The database connection for reading users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The process-wide toast queue.
    pub toast_queue: Arc<Mutex<ToastQueue>>,
}

impl LoginState {
    /// Create a login state with the default cookie duration.
    pub fn new(
        cookie_key: Key,
        local_timezone: &str,
        db_connection: Arc<Mutex<Connection>>,
    ) -> Self {
        Self {
            cookie_key,
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone: local_timezone.to_owned(),
            db_connection,
            toast_queue: Arc::new(Mutex::new(ToastQueue::default())),
        }
    }
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
            toast_queue: state.toast_queue.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The credentials entered by the user at log-in.
///
/// The password is a plain string. There is no need for validation here since
/// it is only compared against the stored hash.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// The email address used at registration.
    pub email: String,
    /// Password entered during log-in.
    pub password: String,
}

/// Handler for log-in requests via the POST method.
///
/// On success the session cookie is set; the HTMX form is redirected to the
/// records page, and JSON clients receive the user's public profile. A wrong
/// email and a wrong password are indistinguishable from the outside.
pub async fn log_in_endpoint(
    State(state): State<LoginState>,
    HxRequest(is_htmx): HxRequest,
    jar: PrivateCookieJar,
    JsonOrForm(credentials): JsonOrForm<LogInData>,
) -> Response {
    let result = (|| {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let user = match get_user_by_email(credentials.email.trim(), &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Err(Error::InvalidCredentials),
            Err(error) => return Err(error),
        };

        let is_password_valid = user.password_hash.verify(&credentials.password).map_err(
            |error| {
                tracing::error!("unhandled error while verifying credentials: {error}");
                Error::HashingError(error.to_string())
            },
        )?;

        if !is_password_valid {
            return Err(Error::InvalidCredentials);
        }

        Ok(user)
    })();

    let user = match result {
        Ok(user) => user,
        Err(error) if is_htmx => {
            let status_code = error.status_code();
            let toast = push_toast_inline(
                &state.toast_queue,
                AlertType::Error,
                "Log in failed",
                &error.user_message(),
            );

            return (status_code, toast).into_response();
        }
        Err(error) => return error.into_api_response(),
    };

    let local_offset = match get_local_offset(&state.local_timezone) {
        Some(offset) => offset,
        None => return Error::InvalidTimezoneError(state.local_timezone).into_response(),
    };

    match set_auth_cookie(jar, user.id, state.cookie_duration, local_offset) {
        Ok(jar) if is_htmx => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::RECORDS_VIEW.to_owned()),
            jar,
        )
            .into_response(),
        Ok(jar) => (jar, Json(UserProfile::from(&user))).into_response(),
        Err(error) => {
            tracing::error!("could not set the session cookie: {error}");
            error.into_api_response()
        }
    }
}


#[cfg(test)]
mod log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, routing::post};
    use axum_extra::extract::cookie::Key;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::Value;
    use sha2::{Digest, Sha512};

    use crate::{
        PasswordHash,
        auth::COOKIE_TOKEN,
        endpoints,
        user::{NewUser, create_user, create_user_table},
    };

    use super::{LogInData, LoginState, log_in_endpoint};

    fn get_test_state() -> LoginState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        create_user_table(&connection).expect("Could not create user table");
        create_user(
            NewUser {
                username: "alice".to_owned(),
                email: "alice@example.com".to_owned(),
                // The hash of "correct horse battery staple" at cost 4.
                password_hash: PasswordHash::from_secret("correct horse battery staple", 4)
                    .unwrap(),
                codeword_hash: PasswordHash::new_unchecked("swordfish"),
            },
            &connection,
        )
        .expect("Could not create test user");

        LoginState::new(
            Key::from(&Sha512::digest("a test secret")),
            "Etc/UTC",
            Arc::new(Mutex::new(connection)),
        )
    }

    fn get_test_server() -> TestServer {
        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(log_in_endpoint))
            .with_state(get_test_state());

        TestServer::new(app)
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN_API)
            .json(&LogInData {
                email: "alice@example.com".to_owned(),
                password: "correct horse battery staple".to_owned(),
            })
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["username"], "alice");
        assert_eq!(body["email"], "alice@example.com");
        assert_eq!(body["id"], 1);

        let cookie = response.cookie(COOKIE_TOKEN);
        assert!(!cookie.value().is_empty());
    }

    #[tokio::test]
    async fn log_in_fails_with_incorrect_password() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN_API)
            .json(&LogInData {
                email: "alice@example.com".to_owned(),
                password: "wrongpassword".to_owned(),
            })
            .await;

        response.assert_status_unauthorized();
        let body: Value = response.json();
        assert!(
            body["message"].as_str().unwrap().contains("incorrect"),
            "got {body}"
        );
    }

    #[tokio::test]
    async fn unknown_email_reads_the_same_as_a_wrong_password() {
        let server = get_test_server();

        let wrong_password = server
            .post(endpoints::LOG_IN_API)
            .json(&LogInData {
                email: "alice@example.com".to_owned(),
                password: "wrongpassword".to_owned(),
            })
            .await;
        let unknown_email = server
            .post(endpoints::LOG_IN_API)
            .json(&LogInData {
                email: "mallory@example.com".to_owned(),
                password: "wrongpassword".to_owned(),
            })
            .await;

        assert_eq!(wrong_password.status_code(), unknown_email.status_code());
        let left: Value = wrong_password.json();
        let right: Value = unknown_email.json();
        assert_eq!(left["message"], right["message"]);
    }

    #[tokio::test]
    async fn form_log_in_redirects_to_the_records_page() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN_API)
            .add_header("HX-Request", "true")
            .form(&LogInData {
                email: "alice@example.com".to_owned(),
                password: "correct horse battery staple".to_owned(),
            })
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("hx-redirect"), endpoints::RECORDS_VIEW);

        let cookie = response.cookie(COOKIE_TOKEN);
        assert!(!cookie.value().is_empty());
    }

    #[tokio::test]
    async fn form_log_in_failure_renders_a_toast() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN_API)
            .add_header("HX-Request", "true")
            .form(&LogInData {
                email: "alice@example.com".to_owned(),
                password: "wrongpassword".to_owned(),
            })
            .await;

        response.assert_status_unauthorized();
        let text = response.text();
        assert!(text.contains("Log in failed"), "expected a toast: {text}");
    }
}
