//! The record form overlay.
//!
//! The modal is an HTMX partial swapped into the page's `#modal-container`.
//! Opening renders a draft (empty for create, populated for edit), cancel
//! swaps the container empty again, and submits go to the `/api/records`
//! endpoints which close the modal from their responses.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, endpoints,
    auth::session_user_id,
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, loading_spinner,
    },
    record::{
        RecordType,
        core::{RecordId, get_record},
        form::{RecordDraft, record_form_fields},
    },
    user::UserID,
};

/// The state needed to open the record modal.
#[derive(Debug, Clone)]
pub struct RecordModalState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The database connection for loading the record being edited.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RecordModalState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RecordModalState> for Key {
    fn from_ref(state: &RecordModalState) -> Self {
        state.cookie_key.clone()
    }
}

/// The empty modal container, i.e. the modal in its closed state.
pub(crate) fn empty_modal_container() -> Markup {
    html! {
        div id="modal-container" {}
    }
}

/// The modal overlay with the record form bound to `draft`.
///
/// The submit method is chosen from the draft: a draft with an id puts to the
/// update endpoint, one without posts to the create endpoint. The submit
/// button is disabled while a request is in flight, so a double click cannot
/// fire two overlapping submissions.
pub(crate) fn record_modal(draft: &RecordDraft, user_id: UserID) -> Markup {
    let is_edit = draft.id.is_some();
    let title = if is_edit { "Edit record" } else { "Add record" };
    let delete_url = draft.id.map(|id| {
        format!(
            "{}?id={}&type={}",
            endpoints::RECORDS_API,
            id,
            draft.record_type.as_str()
        )
    });

    html! {
        div id="modal-container"
        {
            div
                class="fixed inset-0 bg-gray-900/50 dark:bg-gray-900/80 z-40"
                hx-get=(endpoints::CLOSE_RECORD_MODAL)
                hx-target="#modal-container"
                hx-swap="outerHTML"
            {}

            div
                class="fixed top-1/2 left-1/2 -translate-x-1/2 -translate-y-1/2 z-50 \
                    w-full max-w-md p-6 bg-white rounded-lg shadow dark:bg-gray-800"
                role="dialog"
            {
                h2 class="mb-4 text-xl font-bold text-gray-900 dark:text-white" { (title) }

                form
                    hx-post=[(!is_edit).then_some(endpoints::RECORDS_API)]
                    hx-put=[is_edit.then_some(endpoints::RECORDS_API)]
                    hx-target="#modal-container"
                    hx-swap="outerHTML"
                    hx-target-error="#modal-container"
                    hx-indicator="#indicator"
                    hx-disabled-elt="#record-submit-button"
                    class="space-y-4"
                {
                    input type="hidden" name="userId" value=(user_id.as_i64());
                    input type="hidden" name="type" value=(draft.record_type.as_str());

                    @if let Some(id) = draft.id {
                        input type="hidden" name="id" value=(id);
                    }

                    (record_form_fields(draft))

                    div class="flex items-center gap-3"
                    {
                        button
                            type="submit" id="record-submit-button" tabindex="0"
                            class=(BUTTON_PRIMARY_STYLE)
                        {
                            span class="inline htmx-indicator" id="indicator"
                            {
                                (loading_spinner())
                            }
                            "Save"
                        }

                        button
                            type="button"
                            hx-get=(endpoints::CLOSE_RECORD_MODAL)
                            hx-target="#modal-container"
                            hx-swap="outerHTML"
                            class=(BUTTON_SECONDARY_STYLE)
                        {
                            "Cancel"
                        }

                        @if let Some(delete_url) = delete_url {
                            button
                                type="button"
                                hx-delete=(delete_url)
                                hx-confirm="Are you sure you want to delete this record?"
                                hx-target="#modal-container"
                                hx-swap="outerHTML"
                                hx-target-error="#modal-container"
                                class=(BUTTON_DELETE_STYLE)
                            {
                                "Delete"
                            }
                        }
                    }
                }
            }
        }
    }
}

/// The query string of the create-modal route, e.g. `/records/new?type=income`.
#[derive(Debug, Deserialize)]
pub struct NewRecordModalQuery {
    /// The type of record the modal will create.
    #[serde(rename = "type")]
    pub record_type: String,
}

/// Open the modal with an empty draft for creating a record.
///
/// The record's type is fixed here and carried through the form as a hidden
/// field. Visitors without a session are redirected to the log-in page.
pub async fn get_new_record_modal(
    State(_state): State<RecordModalState>,
    jar: PrivateCookieJar,
    Query(query): Query<NewRecordModalQuery>,
) -> Response {
    let Some(user_id) = session_user_id(&jar) else {
        return (
            HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response();
    };

    let record_type: RecordType = match query.record_type.parse() {
        Ok(record_type) => record_type,
        Err(error @ Error::UnknownRecordType(_)) => return error.into_alert_response(),
        Err(error) => return error.into_response(),
    };

    let draft = RecordDraft::for_create(record_type);

    record_modal(&draft, user_id).into_response()
}

/// Open the modal populated from the record at `/records/{type}/{id}/edit`.
pub async fn get_edit_record_modal(
    State(state): State<RecordModalState>,
    Path((record_type, record_id)): Path<(String, RecordId)>,
) -> Response {
    let record_type: RecordType = match record_type.parse() {
        Ok(record_type) => record_type,
        Err(error @ Error::UnknownRecordType(_)) => return error.into_alert_response(),
        Err(error) => return error.into_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match get_record(record_id, record_type, &connection) {
        Ok(record) => {
            let draft = RecordDraft::for_edit(&record);
            record_modal(&draft, record.user_id).into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}

/// Close the modal by swapping in the empty container.
pub async fn get_close_modal() -> Markup {
    empty_modal_container()
}

#[cfg(test)]
mod modal_endpoint_tests {
    use axum::{Router, extract::State, routing::get};
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use axum_test::TestServer;
    use scraper::{Html, Selector};
    use sha2::{Digest, Sha512};
    use std::sync::{Arc, Mutex};
    use time::UtcOffset;

    use crate::{
        Error, endpoints,
        auth::{DEFAULT_COOKIE_DURATION, set_auth_cookie},
        record::core::{create_record, test_fixtures},
        user::UserID,
    };

    use super::{RecordModalState, get_close_modal, get_edit_record_modal, get_new_record_modal};

    const TEST_LOG_IN_ROUTE: &str = "/test_log_in";

    async fn stub_log_in_route(
        State(_state): State<RecordModalState>,
        jar: PrivateCookieJar,
    ) -> Result<PrivateCookieJar, Error> {
        set_auth_cookie(jar, UserID::new(1), DEFAULT_COOKIE_DURATION, UtcOffset::UTC)
    }

    fn get_test_server() -> TestServer {
        let connection = test_fixtures::get_test_connection();
        create_record(test_fixtures::salary_data(UserID::new(1)), &connection).unwrap();

        let state = RecordModalState {
            cookie_key: Key::from(&Sha512::digest("a test secret")),
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let app = Router::new()
            .route(endpoints::NEW_RECORD_MODAL, get(get_new_record_modal))
            .route(endpoints::EDIT_RECORD_MODAL, get(get_edit_record_modal))
            .route(endpoints::CLOSE_RECORD_MODAL, get(get_close_modal))
            .route(TEST_LOG_IN_ROUTE, get(stub_log_in_route))
            .with_state(state);

        TestServer::new(app)
    }

    #[tokio::test]
    async fn create_modal_posts_to_the_records_api() {
        let server = get_test_server();
        let cookie = server
            .get(TEST_LOG_IN_ROUTE)
            .await
            .cookie(crate::auth::COOKIE_TOKEN);

        let response = server
            .get(endpoints::NEW_RECORD_MODAL)
            .add_query_param("type", "income")
            .add_cookie(cookie)
            .await;

        response.assert_status_ok();
        let document = Html::parse_fragment(&response.text());
        let form_selector = Selector::parse("form[hx-post='/api/records']").unwrap();
        let form = document
            .select(&form_selector)
            .next()
            .expect("expected a form posting to the records API");

        let user_id_selector = Selector::parse("input[type=hidden][name=userId]").unwrap();
        let user_id = form
            .select(&user_id_selector)
            .next()
            .expect("expected a hidden userId field");
        assert_eq!(user_id.value().attr("value"), Some("1"));

        let type_selector = Selector::parse("input[type=hidden][name=type]").unwrap();
        let record_type = form
            .select(&type_selector)
            .next()
            .expect("expected a hidden type field");
        assert_eq!(record_type.value().attr("value"), Some("income"));

        // The create modal must not offer a delete button.
        let delete_selector = Selector::parse("button[hx-delete]").unwrap();
        assert_eq!(document.select(&delete_selector).count(), 0);
    }

    #[tokio::test]
    async fn create_modal_rejects_unknown_types() {
        let server = get_test_server();
        let cookie = server
            .get(TEST_LOG_IN_ROUTE)
            .await
            .cookie(crate::auth::COOKIE_TOKEN);

        let response = server
            .get(endpoints::NEW_RECORD_MODAL)
            .add_query_param("type", "winnings")
            .add_cookie(cookie)
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn create_modal_without_session_redirects_to_log_in() {
        let server = get_test_server();

        let response = server
            .get(endpoints::NEW_RECORD_MODAL)
            .add_query_param("type", "income")
            .await;

        response.assert_status_see_other();
        assert_eq!(
            response.header("hx-redirect"),
            endpoints::LOG_IN_VIEW,
            "expected an HTMX redirect to the log-in page"
        );
    }

    #[tokio::test]
    async fn edit_modal_is_prefilled_and_guards_deletion_with_a_confirm() {
        let server = get_test_server();

        let response = server.get("/records/income/1/edit").await;

        response.assert_status_ok();
        let document = Html::parse_fragment(&response.text());

        let form_selector = Selector::parse("form[hx-put='/api/records']").unwrap();
        let form = document
            .select(&form_selector)
            .next()
            .expect("expected a form putting to the records API");

        let name_selector = Selector::parse("input[name=name]").unwrap();
        let name = form.select(&name_selector).next().unwrap();
        assert_eq!(name.value().attr("value"), Some("Salary"));

        let date_selector = Selector::parse("input[name=date_time]").unwrap();
        let date = form.select(&date_selector).next().unwrap();
        assert_eq!(date.value().attr("value"), Some("2024-01-01T10:00"));

        // Deleting requires an interactive confirmation: declining it means
        // the browser never sends the request and the modal stays open.
        let delete_selector = Selector::parse("button[hx-delete]").unwrap();
        let delete = document
            .select(&delete_selector)
            .next()
            .expect("expected a delete button");
        assert!(delete.value().attr("hx-confirm").is_some());
        assert_eq!(
            delete.value().attr("hx-delete"),
            Some("/api/records?id=1&type=income")
        );
    }

    #[tokio::test]
    async fn edit_modal_for_missing_record_is_not_found() {
        let server = get_test_server();

        let response = server.get("/records/income/99/edit").await;

        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn close_modal_returns_the_empty_container() {
        let server = get_test_server();

        let response = server.get(endpoints::CLOSE_RECORD_MODAL).await;

        response.assert_status_ok();
        let document = Html::parse_fragment(&response.text());
        let container_selector = Selector::parse("div#modal-container").unwrap();
        let container = document
            .select(&container_selector)
            .next()
            .expect("expected the modal container");
        assert_eq!(container.children().count(), 0, "the container is empty");
    }
}
