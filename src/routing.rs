//! Application router configuration for the pages and the JSON API.

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState, endpoints,
    log_in::{get_log_in_page, log_in_endpoint},
    log_out::get_log_out,
    not_found::get_404_not_found,
    record::{
        create_record_endpoint, delete_record_endpoint, get_close_modal, get_edit_record_modal,
        get_new_record_modal, get_records_page, list_records_endpoint, update_record_endpoint,
    },
    register_user::{get_register_page, register_user_endpoint},
    user::get_user_endpoint,
};

/// Return a router with all the app's routes.
///
/// The view routes resolve the user from the session cookie themselves; the
/// records page renders a landing call-to-action without one instead of
/// redirecting. The `/api` routes follow the published contract and carry the
/// owning user in the path or payload.
pub fn build_router(state: AppState) -> Router {
    let view_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::RECORDS_VIEW, get(get_records_page))
        .route(endpoints::NEW_RECORD_MODAL, get(get_new_record_modal))
        .route(endpoints::EDIT_RECORD_MODAL, get(get_edit_record_modal))
        .route(endpoints::CLOSE_RECORD_MODAL, get(get_close_modal))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_OUT, get(get_log_out));

    let api_routes = Router::new()
        .route(endpoints::USER_RECORDS_API, get(list_records_endpoint))
        .route(
            endpoints::RECORDS_API,
            post(create_record_endpoint)
                .put(update_record_endpoint)
                .delete(delete_record_endpoint),
        )
        .route(endpoints::REGISTER_API, post(register_user_endpoint))
        .route(endpoints::LOG_IN_API, post(log_in_endpoint))
        .route(endpoints::GET_USER_API, get(get_user_endpoint));

    view_routes
        .merge(api_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the records page, which renders either the
/// landing view or the user's records depending on the session.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::RECORDS_VIEW)
}

#[cfg(test)]
mod root_route_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::{endpoints, routing::get_index_page};

    #[tokio::test]
    async fn root_redirects_to_records() {
        let response = get_index_page().await.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = response.headers().get("location").unwrap();
        assert_eq!(location, endpoints::RECORDS_VIEW);
    }
}

#[cfg(test)]
mod router_tests {
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, endpoints, endpoints::format_endpoint};

    use super::build_router;

    fn get_test_server() -> TestServer {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        let state = AppState::new(connection, "a test secret", "Etc/UTC", true)
            .expect("Could not create app state");

        TestServer::new(build_router(state))
    }

    /// Walks the published API contract end to end: register, log in, create,
    /// re-list, update, delete.
    #[tokio::test]
    async fn full_api_round_trip() {
        let server = get_test_server();

        server
            .post(endpoints::REGISTER_API)
            .json(&json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "correct horse battery staple",
                "confirmPassword": "correct horse battery staple",
                "codeword": "swordfish",
            }))
            .await
            .assert_status_ok();

        let log_in_response = server
            .post(endpoints::LOG_IN_API)
            .json(&json!({
                "email": "alice@example.com",
                "password": "correct horse battery staple",
            }))
            .await;
        log_in_response.assert_status_ok();
        let user: Value = log_in_response.json();
        let user_id = user["id"].as_i64().unwrap();

        server
            .post(endpoints::RECORDS_API)
            .json(&json!({
                "userId": user_id,
                "type": "income",
                "name": "Salary",
                "category": "Job",
                "amount": 1000.0,
                "date_time": "2024-01-01T10:00",
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let records: Vec<Value> = server
            .get(&format_endpoint(endpoints::USER_RECORDS_API, user_id))
            .await
            .json();
        assert_eq!(records.len(), 1);
        let record_id = records[0]["id"].as_i64().unwrap();

        server
            .put(endpoints::RECORDS_API)
            .json(&json!({
                "id": record_id,
                "userId": user_id,
                "type": "income",
                "name": "Salary",
                "category": "Job",
                "amount": 1250.0,
                "date_time": "2024-01-01T10:00",
            }))
            .await
            .assert_status_ok();

        let records: Vec<Value> = server
            .get(&format_endpoint(endpoints::USER_RECORDS_API, user_id))
            .await
            .json();
        assert_eq!(records[0]["amount"], 1250.0);

        server
            .delete(endpoints::RECORDS_API)
            .json(&json!({ "id": record_id, "type": "income" }))
            .await
            .assert_status_ok();

        let records: Vec<Value> = server
            .get(&format_endpoint(endpoints::USER_RECORDS_API, user_id))
            .await
            .json();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn unknown_routes_fall_back_to_404() {
        let server = get_test_server();

        let response = server.get("/definitely/not/a/route").await;

        response.assert_status_not_found();
    }
}
