//! Defines the endpoint for updating an existing record.

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
    extract::JsonOrForm,
    record::{
        core::{RecordPayload, list_records, update_record},
        form::RecordDraft,
        modal::{empty_modal_container, record_modal},
        records_page::filters_from_current_url,
        view::records_sections_oob,
    },
};

/// The state needed to update a record.
#[derive(Debug, Clone)]
pub struct UpdateRecordState {
    /// The database connection for managing records.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The process-wide toast queue.
    pub toast_queue: Arc<Mutex<ToastQueue>>,
    /// Whether the modal also closes when the submission fails.
    pub close_modal_on_error: bool,
}

impl FromRef<AppState> for UpdateRecordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            toast_queue: state.toast_queue.clone(),
            close_modal_on_error: state.close_modal_on_error,
        }
    }
}

/// A route handler for updating a record.
///
/// The payload must carry the id of the record to update; the record's type
/// cannot change through this endpoint since the id is resolved within the
/// table for the payload's type. Success responses acknowledge only, and the
/// HTMX flavor re-renders both sections from a fresh re-list.
pub async fn update_record_endpoint(
    State(state): State<UpdateRecordState>,
    HxRequest(is_htmx): HxRequest,
    headers: HeaderMap,
    JsonOrForm(payload): JsonOrForm<RecordPayload>,
) -> Response {
    let user_id = payload.user_id;
    let draft = RecordDraft::from_payload(&payload);

    let result = payload.validate().and_then(|(id, data)| {
        let id = id.ok_or(Error::MissingRecordId)?;

        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        update_record(id, &data, &connection)?;

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
        Ok(_) => Json(json!({ "message": "Record saved." })).into_response(),
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

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, routing::put};
    use axum_test::TestServer;
    use serde_json::Value;

    use crate::{
        alert::ToastQueue,
        endpoints,
        record::core::{
            RecordPayload, RecordType, create_record, list_records, test_fixtures,
        },
        user::UserID,
    };

    use super::{UpdateRecordState, update_record_endpoint};

    fn get_test_state() -> UpdateRecordState {
        let connection = test_fixtures::get_test_connection();
        create_record(test_fixtures::salary_data(UserID::new(1)), &connection).unwrap();

        UpdateRecordState {
            db_connection: Arc::new(Mutex::new(connection)),
            toast_queue: Arc::new(Mutex::new(ToastQueue::default())),
            close_modal_on_error: true,
        }
    }

    fn get_test_server(state: UpdateRecordState) -> TestServer {
        let app = Router::new()
            .route(endpoints::RECORDS_API, put(update_record_endpoint))
            .with_state(state);

        TestServer::new(app)
    }

    fn update_payload(id: Option<i64>) -> RecordPayload {
        RecordPayload {
            id,
            user_id: UserID::new(1),
            record_type: RecordType::Income,
            name: "Salary".to_owned(),
            category: "Job".to_owned(),
            amount: 1250.0,
            description: "After the raise".to_owned(),
            date_time: "2024-02-01T10:00".to_owned(),
        }
    }

    #[tokio::test]
    async fn json_update_overwrites_the_record() {
        let state = get_test_state();
        let server = get_test_server(state.clone());

        let response = server
            .put(endpoints::RECORDS_API)
            .json(&update_payload(Some(1)))
            .await;

        response.assert_status_ok();

        let connection = state.db_connection.lock().unwrap();
        let records = list_records(UserID::new(1), &connection).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, 1250.0);
        assert_eq!(records[0].description, "After the raise");
    }

    #[tokio::test]
    async fn update_without_an_id_is_rejected() {
        let state = get_test_state();
        let server = get_test_server(state);

        let response = server
            .put(endpoints::RECORDS_API)
            .json(&update_payload(None))
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert!(
            body["message"].as_str().unwrap().contains("record id"),
            "got {body}"
        );
    }

    #[tokio::test]
    async fn update_of_a_missing_record_is_not_found() {
        let state = get_test_state();
        let server = get_test_server(state);

        let response = server
            .put(endpoints::RECORDS_API)
            .json(&update_payload(Some(99)))
            .await;

        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn htmx_update_refreshes_the_sections_with_a_toast() {
        let state = get_test_state();
        let server = get_test_server(state);

        let response = server
            .put(endpoints::RECORDS_API)
            .add_header("HX-Request", "true")
            .form(&[
                ("id", "1"),
                ("userId", "1"),
                ("type", "income"),
                ("name", "Salary"),
                ("category", "Job"),
                ("amount", "1250"),
                ("description", "After the raise"),
                ("date_time", "2024-02-01T10:00"),
            ])
            .await;

        response.assert_status_ok();
        let text = response.text();
        assert!(text.contains("Record saved successfully!"));
        assert!(text.contains("income-section"));
        assert!(text.contains("After the raise"));
    }
}
