//! Data models exchanged with the donelist backend.
//!
//! - `User`: the authenticated principal
//! - `Todo`, `NewTodo`, `RepeatRule`: todo items as the API serves them

pub mod todo;
pub mod user;

pub use todo::{NewTodo, RepeatRule, Todo};
pub use user::{Credentials, SessionToken, User};
