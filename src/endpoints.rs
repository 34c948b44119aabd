//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/records/{user_id}', use
//! [format_endpoint].

/// The root route which redirects to the records page.
pub const ROOT: &str = "/";
/// The page for browsing and editing a user's records.
pub const RECORDS_VIEW: &str = "/records";
/// The modal form partial for creating a new record.
pub const NEW_RECORD_MODAL: &str = "/records/new";
/// The modal form partial for editing an existing record.
pub const EDIT_RECORD_MODAL: &str = "/records/{record_type}/{record_id}/edit";
/// The route that closes the record modal by swapping in an empty container.
pub const CLOSE_RECORD_MODAL: &str = "/records/modal/close";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/log_out";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route to create (POST), update (PUT), or delete (DELETE) a record.
pub const RECORDS_API: &str = "/api/records";
/// The route to list all of a user's records.
pub const USER_RECORDS_API: &str = "/api/records/{user_id}";
/// The route for registering a new user.
pub const REGISTER_API: &str = "/api/users/register";
/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/users/login";
/// The route to look up a user's public profile.
pub const GET_USER_API: &str = "/api/users/user/{user_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/records/{user_id}', '{user_id}' is
/// the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

/// Fill in the type and id parameters of [EDIT_RECORD_MODAL].
pub fn format_edit_record_endpoint(record_type: &str, record_id: i64) -> String {
    let path = EDIT_RECORD_MODAL.replace("{record_type}", record_type);
    format_endpoint(&path, record_id)
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::{format_edit_record_endpoint, format_endpoint};

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::ROOT);
        assert_endpoint_is_valid_uri(endpoints::RECORDS_VIEW);
        assert_endpoint_is_valid_uri(endpoints::NEW_RECORD_MODAL);
        assert_endpoint_is_valid_uri(endpoints::EDIT_RECORD_MODAL);
        assert_endpoint_is_valid_uri(endpoints::CLOSE_RECORD_MODAL);
        assert_endpoint_is_valid_uri(endpoints::REGISTER_VIEW);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN_VIEW);
        assert_endpoint_is_valid_uri(endpoints::LOG_OUT);
        assert_endpoint_is_valid_uri(endpoints::STATIC);

        assert_endpoint_is_valid_uri(endpoints::RECORDS_API);
        assert_endpoint_is_valid_uri(endpoints::USER_RECORDS_API);
        assert_endpoint_is_valid_uri(endpoints::REGISTER_API);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN_API);
        assert_endpoint_is_valid_uri(endpoints::GET_USER_API);
    }

    #[test]
    fn api_prefixes_match_the_published_contract() {
        assert_eq!(endpoints::RECORDS_API, "/api/records");
        assert!(endpoints::USER_RECORDS_API.starts_with("/api/records/"));
        assert_eq!(endpoints::REGISTER_API, "/api/users/register");
        assert_eq!(endpoints::LOG_IN_API, "/api/users/login");
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint("/hello/{world_id}", 1);

        assert_eq!(formatted_path, "/hello/1");
        assert!(formatted_path.parse::<Uri>().is_ok());

        // Parameter with single word should also work.
        let formatted_path = format_endpoint("/hello/{world}", 1);

        assert_eq!(formatted_path, "/hello/1");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint("/hello/world", 1);

        assert_eq!(formatted_path, "/hello/world");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn fills_both_edit_modal_parameters() {
        let formatted_path = format_edit_record_endpoint("income", 42);

        assert_eq!(formatted_path, "/records/income/42/edit");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }
}
