//! Request extractors shared by the API endpoints.
//!
//! Each mutation endpoint serves two callers with one handler: JSON clients
//! of the `/api` contract and the HTMX forms of the server-rendered pages.
//! These extractors pick the right body decoder based on the request.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
// axum_extra's Form is used since it parses an empty string as None instead
// of rejecting like axum::Form.
use axum_extra::extract::Form;
use serde::de::DeserializeOwned;

fn is_json_request(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with("application/json"))
}

/// Deserializes the request body from JSON or an urlencoded form, depending on
/// the request's content type.
#[derive(Debug, Clone)]
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + 'static,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_json_request(&request) {
            let Json(value) = Json::<T>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self(value));
        }

        let Form(value) = Form::<T>::from_request(request, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(Self(value))
    }
}

/// Deserializes from a JSON body, falling back to the query string.
///
/// DELETE requests from HTMX carry their values as query parameters, while
/// JSON clients put `{id, type}` in the request body.
#[derive(Debug, Clone)]
pub struct JsonOrQuery<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + 'static,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_json_request(&request) {
            let Json(value) = Json::<T>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self(value));
        }

        let (mut parts, _body) = request.into_parts();
        let Query(value) = Query::<T>::from_request_parts(&mut parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod json_or_form_tests {
    use axum::{Router, routing::post};
    use axum_test::TestServer;
    use serde::{Deserialize, Serialize};

    use super::{JsonOrForm, JsonOrQuery};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        name: String,
        amount: f64,
    }

    fn json_or_form_server() -> TestServer {
        async fn echo(JsonOrForm(payload): JsonOrForm<Payload>) -> String {
            format!("{}:{}", payload.name, payload.amount)
        }

        let app = Router::new().route("/echo", post(echo));
        TestServer::new(app)
    }

    #[tokio::test]
    async fn accepts_json_bodies() {
        let server = json_or_form_server();

        let response = server
            .post("/echo")
            .json(&Payload {
                name: "Salary".to_owned(),
                amount: 1000.0,
            })
            .await;

        response.assert_status_ok();
        response.assert_text("Salary:1000");
    }

    #[tokio::test]
    async fn accepts_form_bodies() {
        let server = json_or_form_server();

        let response = server
            .post("/echo")
            .form(&[("name", "Salary"), ("amount", "1000")])
            .await;

        response.assert_status_ok();
        response.assert_text("Salary:1000");
    }

    #[tokio::test]
    async fn query_fallback_reads_url_parameters() {
        async fn echo(JsonOrQuery(payload): JsonOrQuery<Payload>) -> String {
            format!("{}:{}", payload.name, payload.amount)
        }

        let app = Router::new().route("/echo", post(echo));
        let server = TestServer::new(app);

        let response = server.post("/echo?name=Rent&amount=500").await;

        response.assert_status_ok();
        response.assert_text("Rent:500");
    }
}
