//! Session-aware request and response middleware.
//!
//! `ApiClient` applies these in a fixed order around every call:
//! 1. `authorize_request` before dispatch: attaches the bearer token or
//!    rejects the request when the token is known to be expired.
//! 2. `inspect_response` after delivery: a 401 tears the session down.

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response, StatusCode};
use tracing::{debug, warn};

use super::ApiError;
use crate::auth::{is_token_expired, SessionStore};
use crate::navigation::Navigator;

/// Request → request-or-rejection.
pub fn authorize_request(
    session: &SessionStore,
    navigator: &Navigator,
    mut request: Request,
) -> Result<Request, ApiError> {
    let Some(token) = session.token() else {
        debug!(url = %request.url(), "Sending unauthenticated request");
        return Ok(request);
    };

    if is_token_expired(&token, session.now()) {
        warn!(url = %request.url(), "Token expired before dispatch, aborting request");
        session.clear_token();
        navigator.redirect_to_login();
        return Err(ApiError::SessionExpired);
    }

    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
    value.set_sensitive(true);
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(request)
}

/// Response → response-or-remediation. Only 401 is interpreted.
pub fn inspect_response(
    session: &SessionStore,
    navigator: &Navigator,
    response: Response,
) -> Result<Response, ApiError> {
    if response.status() == StatusCode::UNAUTHORIZED {
        warn!(url = %response.url(), "Server rejected credentials, ending session");
        session.clear_token();
        navigator.redirect_to_login();
        return Err(ApiError::Unauthorized);
    }
    Ok(response)
}
