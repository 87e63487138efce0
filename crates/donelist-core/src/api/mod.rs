//! REST API client for the donelist backend.
//!
//! `ApiClient` sends every request through the session middleware: the
//! bearer token is attached (or the request is refused locally when the
//! token has expired) and a 401 response ends the session.

pub mod client;
pub mod error;
pub mod middleware;

pub use client::ApiClient;
pub use error::ApiError;
pub use middleware::{authorize_request, inspect_response};
