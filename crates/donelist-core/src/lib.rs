//! Core library for donelist.
//!
//! donelist is a client for a personal todo service. This crate owns the
//! client-side session lifecycle:
//!
//! - `auth`: bearer token decoding, durable session storage, `SessionStore`
//! - `api`: `ApiClient` with request/response session middleware
//! - `navigation`: views, route guards and the `Navigator`
//! - `context`: `SessionContext`, which wires the three together
//! - `config`: on-disk configuration
//! - `models`: `User` and todo types

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod models;
pub mod navigation;

pub use api::{ApiClient, ApiError};
pub use auth::{SessionState, SessionStore};
pub use config::Config;
pub use context::SessionContext;
pub use navigation::Navigator;
