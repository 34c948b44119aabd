//! Defines the endpoint for deleting a record.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRequest;
use maud::html;
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error,
    alert::{AlertType, ToastQueue, push_toast_oob},
    extract::JsonOrQuery,
    record::{
        core::{DeleteRecordRequest, delete_record, get_record, list_records},
        modal::empty_modal_container,
        records_page::filters_from_current_url,
        view::records_sections_oob,
    },
};

/// The state needed to delete a record.
#[derive(Debug, Clone)]
pub struct DeleteRecordState {
    /// The database connection for managing records.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The process-wide toast queue.
    pub toast_queue: Arc<Mutex<ToastQueue>>,
}

impl FromRef<AppState> for DeleteRecordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            toast_queue: state.toast_queue.clone(),
        }
    }
}

/// A route handler for deleting a record.
///
/// Both the id and the type are required: the type resolves which table holds
/// the record. Deleting is not idempotent, so a second delete of the same id
/// responds with not-found.
///
/// On success the HTMX flavor closes the modal and re-renders both sections
/// from a fresh re-list; deliberately, no success toast is emitted, unlike
/// create and update. Failures do surface as an error toast.
pub async fn delete_record_endpoint(
    State(state): State<DeleteRecordState>,
    HxRequest(is_htmx): HxRequest,
    headers: HeaderMap,
    JsonOrQuery(request): JsonOrQuery<DeleteRecordRequest>,
) -> Response {
    let result = (|| {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        // The request does not carry the owner, so look the record up first
        // to know whose sections to re-render.
        let record = get_record(request.id, request.record_type, &connection)
            .map_err(|error| match error {
                Error::NotFound => Error::DeleteMissingRecord,
                error => error,
            })?;

        delete_record(request.id, request.record_type, &connection)?;

        list_records(record.user_id, &connection)
    })();

    match result {
        Ok(records) if is_htmx => {
            let filters = filters_from_current_url(&headers);

            html! {
                (empty_modal_container())
                (records_sections_oob(&records, &filters))
            }
            .into_response()
        }
        Ok(_) => Json(json!({ "message": "Record deleted." })).into_response(),
        Err(error) if is_htmx => {
            let status_code = error.status_code();
            let toast = push_toast_oob(
                &state.toast_queue,
                AlertType::Error,
                "Could not delete the record",
                &error.user_message(),
            );

            (
                status_code,
                html! {
                    (empty_modal_container())
                    (toast)
                },
            )
                .into_response()
        }
        Err(error) => error.into_api_response(),
    }
}
