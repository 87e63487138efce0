//! Client-side views and the guards that gate them.
//!
//! Every view is tagged with a `RouteRequirement`. The `Navigator` consults
//! the session before each transition and redirects guests away from
//! protected views and authenticated users away from guest-only views.

pub mod navigator;
pub mod router;

pub use navigator::Navigator;
pub use router::{guard, NavigationDecision, Route, RouteRequirement, DEFAULT_PATH, LOGIN_PATH, REGISTER_PATH};
