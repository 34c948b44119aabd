//! The records page: the coordinator that ties the store, the filter
//! pipeline, and the modal form together.
//!
//! Without a session the page renders a landing call-to-action and performs
//! no record fetch. With a session it lists the user's records once per
//! render, derives the income and expense views from the filter state in the
//! query string, and hands mutations off to the `/api/records` endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState,
    auth::session_user_id,
    html::{PAGE_CONTAINER_STYLE, base},
    navigation::{landing_header, page_header},
    record::{
        RecordType,
        core::list_records,
        filter::SectionFilter,
        view::{SectionFilters, records_section},
    },
    user::get_user_by_id,
};

/// The per-section filter controls as they appear in the page query string.
///
/// Every field is optional so a bare `/records` renders both sections
/// unfiltered.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RecordsQuery {
    income_search: Option<String>,
    income_operator: Option<String>,
    income_amount: Option<String>,
    income_start: Option<String>,
    income_end: Option<String>,
    expense_search: Option<String>,
    expense_operator: Option<String>,
    expense_amount: Option<String>,
    expense_start: Option<String>,
    expense_end: Option<String>,
}

impl RecordsQuery {
    pub(crate) fn into_filters(self) -> SectionFilters {
        SectionFilters {
            income: SectionFilter::from_raw(
                self.income_search,
                self.income_operator,
                self.income_amount,
                self.income_start,
                self.income_end,
            ),
            expense: SectionFilter::from_raw(
                self.expense_search,
                self.expense_operator,
                self.expense_amount,
                self.expense_start,
                self.expense_end,
            ),
        }
    }
}

/// Recover the filter state from the `HX-Current-URL` request header.
///
/// Mutation responses re-render both sections, and the page the user is
/// looking at may be filtered; HTMX sends the browser's current URL along, so
/// the refreshed sections keep the same filters. Anything unparsable falls
/// back to unfiltered sections.
pub(crate) fn filters_from_current_url(headers: &HeaderMap) -> SectionFilters {
    headers
        .get("hx-current-url")
        .and_then(|value| value.to_str().ok())
        .and_then(|url| url.split_once('?'))
        .and_then(|(_, query)| serde_urlencoded::from_str::<RecordsQuery>(query).ok())
        .unwrap_or_default()
        .into_filters()
}

/// The state needed for the records page.
#[derive(Debug, Clone)]
pub struct RecordsPageState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The database connection for reading users and records.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RecordsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RecordsPageState> for Key {
    fn from_ref(state: &RecordsPageState) -> Self {
        state.cookie_key.clone()
    }
}

/// Render the records page, or the landing page when no session is present.
///
/// A failure to list records is logged and the page renders with empty
/// sections rather than a blocking error.
pub async fn get_records_page(
    State(state): State<RecordsPageState>,
    jar: PrivateCookieJar,
    Query(query): Query<RecordsQuery>,
) -> Response {
    let Some(user_id) = session_user_id(&jar) else {
        return landing_page().into_response();
    };

    let (username, records) = match state.db_connection.lock() {
        Ok(connection) => {
            let user = match get_user_by_id(user_id, &connection) {
                Ok(user) => user,
                Err(error) => {
                    // The session points at a user that no longer exists.
                    tracing::warn!("session user {user_id} could not be loaded: {error}");
                    return landing_page().into_response();
                }
            };

            let records = list_records(user_id, &connection).unwrap_or_else(|error| {
                tracing::error!("could not list records for user {user_id}: {error}");
                Vec::new()
            });

            (user.username, records)
        }
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return landing_page().into_response();
        }
    };

    let filters = query.into_filters();

    let content = html! {
        (page_header(&username))

        main class=(PAGE_CONTAINER_STYLE)
        {
            @for record_type in RecordType::ALL {
                (records_section(record_type, &records, &filters, false))
            }
        }
    };

    base("Records", &content).into_response()
}

/// The landing view shown to visitors without a session.
fn landing_page() -> Markup {
    let content = html! {
        (landing_header())

        main class="flex flex-col items-center justify-center px-6 py-24 mx-auto text-center"
        {
            h1 class="mb-4 text-4xl font-extrabold tracking-tight text-gray-900 dark:text-white"
            {
                "Take control of your money"
            }

            p class="mb-8 text-lg text-gray-500 dark:text-gray-400"
            {
                "Track your income and expenses, search and filter your records, \
                and see where your budget goes."
            }

            a
                href=(crate::endpoints::REGISTER_VIEW)
                class="px-6 py-3 text-white bg-blue-600 hover:bg-blue-700 rounded font-medium"
            {
                "Get started"
            }
        }
    };

    base("Welcome", &content)
}
