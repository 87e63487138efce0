use serde::{Deserialize, Serialize};

/// Identity of the logged-in user. Only meaningful while a valid token is held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// Login and registration request body.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Login response body.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionToken {
    pub token: String,
}
