//! Defines the endpoint that lists all of a user's records as JSON.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    record::core::list_records,
    user::UserID,
};

/// The state needed to list records.
#[derive(Debug, Clone)]
pub struct ListRecordsState {
    /// The database connection for reading records.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListRecordsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler returning the full, unfiltered record set for a user.
///
/// The array includes both income and expense records; callers derive their
/// own filtered views. An unknown user simply has no records.
pub async fn list_records_endpoint(
    State(state): State<ListRecordsState>,
    Path(user_id): Path<i64>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_api_response();
        }
    };

    match list_records(UserID::new(user_id), &connection) {
        Ok(records) => Json(records).into_response(),
        Err(error) => error.into_api_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, routing::get};
    use axum_test::TestServer;
    use serde_json::Value;

    use crate::{
        PasswordHash, endpoints,
        endpoints::format_endpoint,
        record::core::{create_record, test_fixtures},
        user::{NewUser, UserID, create_user},
    };

    use super::{ListRecordsState, list_records_endpoint};

    fn get_test_server() -> TestServer {
        let connection = test_fixtures::get_test_connection();
        create_user(
            NewUser {
                username: "bob".to_owned(),
                email: "bob@example.com".to_owned(),
                password_hash: PasswordHash::new_unchecked("hunter2"),
                codeword_hash: PasswordHash::new_unchecked("swordfish"),
            },
            &connection,
        )
        .unwrap();
        create_record(test_fixtures::salary_data(UserID::new(1)), &connection).unwrap();
        create_record(test_fixtures::groceries_data(UserID::new(1)), &connection).unwrap();
        create_record(test_fixtures::salary_data(UserID::new(2)), &connection).unwrap();

        let state = ListRecordsState {
            db_connection: Arc::new(Mutex::new(connection)),
        };
        let app = Router::new()
            .route(endpoints::USER_RECORDS_API, get(list_records_endpoint))
            .with_state(state);

        TestServer::new(app)
    }

    #[tokio::test]
    async fn lists_only_the_users_records() {
        let server = get_test_server();

        let response = server
            .get(&format_endpoint(endpoints::USER_RECORDS_API, 1))
            .await;

        response.assert_status_ok();
        let records: Vec<Value> = response.json();
        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record["userId"], 1, "got {record}");
        }
    }

    #[tokio::test]
    async fn records_use_the_wire_field_names() {
        let server = get_test_server();

        let response = server
            .get(&format_endpoint(endpoints::USER_RECORDS_API, 1))
            .await;

        let records: Vec<Value> = response.json();
        let salary = records
            .iter()
            .find(|record| record["name"] == "Salary")
            .expect("expected the salary record");

        assert_eq!(salary["type"], "income");
        assert_eq!(salary["date_time"], "2024-01-01T10:00");
        assert_eq!(salary["amount"], 1000.0);
    }

    #[tokio::test]
    async fn unknown_user_has_no_records() {
        let server = get_test_server();

        let response = server
            .get(&format_endpoint(endpoints::USER_RECORDS_API, 99))
            .await;

        response.assert_status_ok();
        let records: Vec<Value> = response.json();
        assert!(records.is_empty());
    }
}
