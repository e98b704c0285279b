//! Route table
//!
//! Every path the application serves, with its access class. Paths match
//! case-insensitively; [`canonicalize_request`] rewrites incoming paths to
//! their canonical spelling before the router sees them.

use axum::extract::Request;
use axum::http::uri::{PathAndQuery, Uri};

/// Whether the profile-completion gate applies to a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Reachable with an incomplete profile
    Public,
    /// Redirects to profile completion while the profile is incomplete
    Gated,
    /// Authorization-server redirect target. Finishes a sign-in or sign-out
    /// started earlier, so it runs before any page is considered.
    Callback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Error,
    Health,
    Login,
    LoginWithIdp,
    Link,
    LinkChallenge,
    Logout,
    Register,
    RegisterThanks,
    CompleteProfile,
    Manage,
    OidcCallback,
    SignedOutCallback,
}

impl Route {
    pub const ALL: [Route; 14] = [
        Route::Home,
        Route::Error,
        Route::Health,
        Route::Login,
        Route::LoginWithIdp,
        Route::Link,
        Route::LinkChallenge,
        Route::Logout,
        Route::Register,
        Route::RegisterThanks,
        Route::CompleteProfile,
        Route::Manage,
        Route::OidcCallback,
        Route::SignedOutCallback,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Error => "/Home/Error",
            Route::Health => "/health",
            Route::Login => "/Account/Login",
            Route::LoginWithIdp => "/Account/LoginWithIdp",
            Route::Link => "/Account/Link",
            Route::LinkChallenge => "/Account/LinkChallenge",
            Route::Logout => "/Account/Logout",
            Route::Register => "/Account/Register",
            Route::RegisterThanks => "/Account/RegisterThanks",
            Route::CompleteProfile => "/Account/CompleteProfile",
            Route::Manage => "/Account/Manage",
            Route::OidcCallback => "/authorization-code/callback",
            Route::SignedOutCallback => "/signout/callback",
        }
    }

    pub fn access(self) -> RouteAccess {
        match self {
            Route::Logout | Route::CompleteProfile => RouteAccess::Public,
            Route::OidcCallback | Route::SignedOutCallback => RouteAccess::Callback,
            _ => RouteAccess::Gated,
        }
    }

    /// Route whose path equals `path`, ignoring ASCII case.
    pub fn resolve(path: &str) -> Option<Route> {
        Self::ALL
            .into_iter()
            .find(|route| route.path().eq_ignore_ascii_case(path))
    }

    /// Access class for any path. Unknown paths are gated.
    pub fn access_for_path(path: &str) -> RouteAccess {
        Self::resolve(path)
            .map(Route::access)
            .unwrap_or(RouteAccess::Gated)
    }
}

/// Rewrite a known path to its canonical casing, keeping the query.
pub fn canonicalize_request(mut request: Request) -> Request {
    let Some(route) = Route::resolve(request.uri().path()) else {
        return request;
    };
    if route.path() == request.uri().path() {
        return request;
    }

    let path_and_query = match request.uri().query() {
        Some(query) => format!("{}?{}", route.path(), query),
        None => route.path().to_string(),
    };

    let mut parts = request.uri().clone().into_parts();
    if let Ok(pq) = PathAndQuery::try_from(path_and_query) {
        parts.path_and_query = Some(pq);
        if let Ok(uri) = Uri::from_parts(parts) {
            *request.uri_mut() = uri;
        }
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_only_logout_and_complete_profile_are_public() {
        let public: Vec<Route> = Route::ALL
            .into_iter()
            .filter(|r| r.access() == RouteAccess::Public)
            .collect();
        assert_eq!(public, vec![Route::Logout, Route::CompleteProfile]);
    }

    #[test]
    fn test_public_paths_match_any_case() {
        for path in [
            "/Account/Logout",
            "/account/logout",
            "/ACCOUNT/LOGOUT",
            "/Account/CompleteProfile",
            "/account/completeprofile",
        ] {
            assert_eq!(Route::access_for_path(path), RouteAccess::Public, "{}", path);
        }
    }

    #[test]
    fn test_public_match_is_exact_not_prefix() {
        assert_eq!(Route::access_for_path("/Account/Logout/extra"), RouteAccess::Gated);
        assert_eq!(Route::access_for_path("/Account/LogoutNow"), RouteAccess::Gated);
        assert_eq!(Route::access_for_path("/Account/Logout/"), RouteAccess::Gated);
        assert_eq!(Route::access_for_path("/Account/CompleteProfile2"), RouteAccess::Gated);
    }

    #[test]
    fn test_callbacks_are_never_gated() {
        assert_eq!(Route::access_for_path("/authorization-code/callback"), RouteAccess::Callback);
        assert_eq!(Route::access_for_path("/Signout/Callback"), RouteAccess::Callback);
        assert_eq!(
            Route::access_for_path("/authorization-code/callback/x"),
            RouteAccess::Gated
        );
    }

    #[test]
    fn test_unknown_and_other_paths_are_gated() {
        assert_eq!(Route::access_for_path("/Account/Manage"), RouteAccess::Gated);
        assert_eq!(Route::access_for_path("/"), RouteAccess::Gated);
        assert_eq!(Route::access_for_path("/no/such/page"), RouteAccess::Gated);
    }

    #[test]
    fn test_canonicalize_keeps_query() {
        let request = Request::builder()
            .uri("/account/loginwithidp?idp=0oa1")
            .body(Body::empty())
            .unwrap();
        let request = canonicalize_request(request);
        assert_eq!(request.uri().path(), "/Account/LoginWithIdp");
        assert_eq!(request.uri().query(), Some("idp=0oa1"));
    }

    #[test]
    fn test_canonicalize_leaves_unknown_paths() {
        let request = Request::builder()
            .uri("/favicon.ico")
            .body(Body::empty())
            .unwrap();
        assert_eq!(canonicalize_request(request).uri().path(), "/favicon.ico");
    }
}
