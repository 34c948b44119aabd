//! Defines the endpoint for creating a new record.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_htmx::HxRequest;
use maud::html;
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error,
    alert::{AlertType, ToastQueue, push_toast_oob},
    extract::JsonOrForm,
    record::{
        core::{RecordPayload, create_record, list_records},
        form::RecordDraft,
        modal::{empty_modal_container, record_modal},
        records_page::filters_from_current_url,
        view::records_sections_oob,
    },
};

/// The state needed to create a record.
#[derive(Debug, Clone)]
pub struct CreateRecordState {
    /// The database connection for managing records.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The process-wide toast queue.
    pub toast_queue: Arc<Mutex<ToastQueue>>,
    /// Whether the modal also closes when the submission fails.
    pub close_modal_on_error: bool,
}

impl FromRef<AppState> for CreateRecordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            toast_queue: state.toast_queue.clone(),
            close_modal_on_error: state.close_modal_on_error,
        }
    }
}

/// A route handler for creating a new record.
///
/// JSON clients get an acknowledgment only and are expected to re-list.
/// The HTMX form gets the refreshed income and expense sections out-of-band,
/// built from a full re-list of the store, plus a toast; the modal closes on
/// success and, depending on configuration, on failure too.
pub async fn create_record_endpoint(
    State(state): State<CreateRecordState>,
    HxRequest(is_htmx): HxRequest,
    headers: HeaderMap,
    JsonOrForm(payload): JsonOrForm<RecordPayload>,
) -> Response {
    let user_id = payload.user_id;
    let draft = RecordDraft::from_payload(&payload);

    let result = payload.validate().and_then(|(_, data)| {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        create_record(data, &connection)?;

        // The view is never patched in place: re-list from the source of
        // truth after every mutation.
        list_records(user_id, &connection)
    });

    match result {
        Ok(records) if is_htmx => {
            let filters = filters_from_current_url(&headers);
            let toast = push_toast_oob(
                &state.toast_queue,
                AlertType::Success,
                "Record saved successfully!",
                "",
            );

            html! {
                (empty_modal_container())
                (records_sections_oob(&records, &filters))
                (toast)
            }
            .into_response()
        }
        Ok(_) => (
            StatusCode::CREATED,
            Json(json!({ "message": "Record saved." })),
        )
            .into_response(),
        Err(error) if is_htmx => {
            let status_code = error.status_code();
            let toast = push_toast_oob(
                &state.toast_queue,
                AlertType::Error,
                "Could not save the record",
                &error.user_message(),
            );

            let body = if state.close_modal_on_error {
                html! {
                    (empty_modal_container())
                    (toast)
                }
            } else {
                html! {
                    (record_modal(&draft, user_id))
                    (toast)
                }
            };

            (status_code, body).into_response()
        }
        Err(error) => error.into_api_response(),
    }
}
