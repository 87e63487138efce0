//! Session lifecycle: token decoding, durable storage and the session store.
//!
//! This module provides:
//! - `SessionStore`: owner of the token and user, with expiry re-checked on every read
//! - `SessionStorage`: durable key/value backends (file, OS keychain, memory)
//! - `Clock`: time source so expiry can be tested deterministically
//!
//! Tokens are never trusted past their `exp` claim; anything undecodable is
//! treated as expired.

pub mod clock;
pub mod keyring_storage;
pub mod session;
pub mod storage;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use keyring_storage::KeyringStorage;
pub use session::{SessionState, SessionStore};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use token::{decode_claims, decode_expiration, is_token_expired, Claims, TokenError};
