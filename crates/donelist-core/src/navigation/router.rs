/// Where unauthenticated visitors are sent.
pub const LOGIN_PATH: &str = "/login";

/// Where authenticated users land.
pub const DEFAULT_PATH: &str = "/";

pub const REGISTER_PATH: &str = "/register";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRequirement {
    None,
    Authenticated,
    Guest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    TodoList,
    Login,
    Register,
    NotFound,
}

impl Route {
    pub fn resolve(path: &str) -> Self {
        // Query strings and trailing slashes do not change the view
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Route::TodoList,
            "/login" => Route::Login,
            "/register" => Route::Register,
            _ => Route::NotFound,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Route::TodoList => "TodoList",
            Route::Login => "Login",
            Route::Register => "Register",
            Route::NotFound => "NotFound",
        }
    }

    pub fn requirement(&self) -> RouteRequirement {
        match self {
            Route::TodoList => RouteRequirement::Authenticated,
            Route::Login | Route::Register => RouteRequirement::Guest,
            Route::NotFound => RouteRequirement::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Proceed,
    Redirect(&'static str),
}

/// Decide whether a visitor may enter `route`.
pub fn guard(route: Route, authenticated: bool) -> NavigationDecision {
    match (route.requirement(), authenticated) {
        (RouteRequirement::Authenticated, false) => NavigationDecision::Redirect(LOGIN_PATH),
        (RouteRequirement::Guest, true) => NavigationDecision::Redirect(DEFAULT_PATH),
        _ => NavigationDecision::Proceed,
    }
}
