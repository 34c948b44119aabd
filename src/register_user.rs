//! The registration page and the `/api/users/register` endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRequest;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    alert::{AlertType, ToastQueue, push_toast_inline},
    endpoints,
    extract::JsonOrForm,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, loading_spinner,
        log_in_register,
    },
    user::{MAX_USERNAME_LENGTH, NewUser, create_user},
};

fn text_input(
    name: &str,
    id: &str,
    label: &str,
    input_type: &str,
    placeholder: &str,
) -> Markup {
    html! {
        div
        {
            label for=(id) class=(FORM_LABEL_STYLE) { (label) }

            input
                type=(input_type)
                name=(name)
                id=(id)
                placeholder=(placeholder)
                class=(FORM_TEXT_INPUT_STYLE)
                required;
        }
    }
}

fn registration_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::REGISTER_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            hx-target-error="#alert-container"
            hx-swap="beforeend"
            class="space-y-4 md:space-y-6"
        {
            (text_input("username", "username", "Username", "text", "yourname"))
            (text_input("email", "email", "Email", "email", "you@example.com"))
            (text_input("password", "password", "Password", "password", "••••••••"))
            (text_input(
                "confirmPassword",
                "confirm-password",
                "Confirm password",
                "password",
                "••••••••",
            ))
            (text_input(
                "codeword",
                "codeword",
                "Codeword",
                "text",
                "A memorable word for account recovery",
            ))

            button
                type="submit" id="submit-button" tabindex="0"
                class=(format!("w-full {BUTTON_PRIMARY_STYLE}"))
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Register"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "

                a
                    href=(endpoints::LOG_IN_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Log in here"
                }
            }
        }
    }
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let content = log_in_register("Create your account", &registration_form());
    base("Register", &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The database connection for creating users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The process-wide toast queue.
    pub toast_queue: Arc<Mutex<ToastQueue>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            toast_queue: state.toast_queue.clone(),
        }
    }
}

/// The registration request, from the form or a JSON client.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterData {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
    /// A memorable word used to reset a forgotten password.
    pub codeword: String,
}

/// A shallow shape check matching the classic `local@domain.tld` pattern.
fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    if local.is_empty() || local.contains(char::is_whitespace) {
        return false;
    }

    if domain.contains(char::is_whitespace) {
        return false;
    }

    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn validate_registration(data: &RegisterData) -> Result<ValidatedPassword, Error> {
    for (value, field) in [
        (&data.username, "username"),
        (&data.email, "email"),
        (&data.password, "password"),
        (&data.confirm_password, "confirmPassword"),
        (&data.codeword, "codeword"),
    ] {
        if value.trim().is_empty() {
            return Err(Error::EmptyField(field));
        }
    }

    if data.username.len() > MAX_USERNAME_LENGTH {
        return Err(Error::UsernameTooLong);
    }

    if !is_valid_email(&data.email) {
        return Err(Error::InvalidEmail(data.email.clone()));
    }

    if data.password != data.confirm_password {
        return Err(Error::PasswordMismatch);
    }

    ValidatedPassword::new(&data.password)
}

/// A route handler for registering a new user.
///
/// On success JSON clients get a `{message}` acknowledgment and the HTMX form
/// is redirected to the log-in page; the user logs in with their new
/// credentials rather than being signed in implicitly.
pub async fn register_user_endpoint(
    State(state): State<RegistrationState>,
    HxRequest(is_htmx): HxRequest,
    JsonOrForm(data): JsonOrForm<RegisterData>,
) -> Response {
    let result = validate_registration(&data).and_then(|validated_password| {
        let password_hash = PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST)?;
        let codeword_hash =
            PasswordHash::from_secret(data.codeword.trim(), PasswordHash::DEFAULT_COST)?;

        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        create_user(
            NewUser {
                username: data.username.trim().to_owned(),
                email: data.email.trim().to_owned(),
                password_hash,
                codeword_hash,
            },
            &connection,
        )
    });

    match result {
        Ok(_) if is_htmx => (
            axum_htmx::HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Ok(_) => Json(json!({
            "message": "Registration successful. You can now log in."
        }))
        .into_response(),
        Err(error) if is_htmx => {
            let status_code = error.status_code();
            let toast = push_toast_inline(
                &state.toast_queue,
                AlertType::Error,
                "Registration failed",
                &error.user_message(),
            );

            (status_code, toast).into_response()
        }
        Err(error) => error.into_api_response(),
    }
}

#[cfg(test)]
mod get_register_page_tests {
    use axum::{
        body::Body,
        http::{Response, StatusCode, header::CONTENT_TYPE},
    };
    use scraper::Html;

    use crate::{endpoints, register_user::get_register_page};

    #[tokio::test]
    async fn render_register_page() {
        let response = get_register_page().await;
        assert_eq!(response.status(), StatusCode::OK);

        assert!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );

        let document = parse_html(response).await;
        assert_valid_html(&document);

        let form_selector = scraper::Selector::parse("form").unwrap();
        let forms = document.select(&form_selector).collect::<Vec<_>>();
        assert_eq!(forms.len(), 1, "want 1 form, got {}", forms.len());
        let form = forms.first().unwrap();
        let hx_post = form.value().attr("hx-post");
        assert_eq!(
            hx_post,
            Some(endpoints::REGISTER_API),
            "want form with attribute hx-post=\"{}\", got {:?}",
            endpoints::REGISTER_API,
            hx_post
        );

        struct FormInput {
            type_: &'static str,
            name: &'static str,
        }

        let want_form_inputs: Vec<FormInput> = vec![
            FormInput {
                type_: "text",
                name: "username",
            },
            FormInput {
                type_: "email",
                name: "email",
            },
            FormInput {
                type_: "password",
                name: "password",
            },
            FormInput {
                type_: "password",
                name: "confirmPassword",
            },
            FormInput {
                type_: "text",
                name: "codeword",
            },
        ];

        for FormInput { type_, name } in want_form_inputs {
            let selector_string = format!("input[type={type_}][name={name}]");
            let input_selector = scraper::Selector::parse(&selector_string).unwrap();
            let inputs = form.select(&input_selector).collect::<Vec<_>>();
            assert_eq!(
                inputs.len(),
                1,
                "want 1 {type_} input named {name}, got {}",
                inputs.len()
            );
        }

        let log_in_link_selector = scraper::Selector::parse("a[href]").unwrap();
        let links = form.select(&log_in_link_selector).collect::<Vec<_>>();
        assert_eq!(links.len(), 1, "want 1 link, got {}", links.len());
        let link = links.first().unwrap();
        assert_eq!(
            link.value().attr("href"),
            Some(endpoints::LOG_IN_VIEW),
            "want link to {}, got {:?}",
            endpoints::LOG_IN_VIEW,
            link.value().attr("href")
        );
    }

    async fn parse_html(response: Response<Body>) -> scraper::Html {
        let body = response.into_body();
        let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&body).to_string();

        scraper::Html::parse_document(&text)
    }

    #[track_caller]
    fn assert_valid_html(html: &Html) {
        assert!(
            html.errors.is_empty(),
            "Got HTML parsing errors: {:?}",
            html.errors
        );
    }
}


#[cfg(test)]
mod is_valid_email_tests {
    use super::is_valid_email;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.co"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for email in [
            "",
            "alice",
            "alice@",
            "@example.com",
            "alice@example",
            "alice@.com",
            "alice@com.",
            "al ice@example.com",
            "alice@exa mple.com",
            "alice@@example.com",
        ] {
            assert!(!is_valid_email(email), "{email:?} should be rejected");
        }
    }
}
