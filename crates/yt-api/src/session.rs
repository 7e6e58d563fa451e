//! Session cookie handling and the `Viewer` extractor.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;
use yt_core::{AppError, AuthProvider, User, UserRepo};

use crate::error::ApiError;
use crate::handlers::AppState;

pub const SESSION_COOKIE: &str = "yt_session";
pub const LOGIN_PATH: &str = "/auth/login/";

/// The logged-in user, if the request carries a valid session cookie.
///
/// A missing, forged, or expired cookie is not an error; it just means
/// an anonymous visitor.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|user| user.id)
    }

    /// The user, or a redirect to the login page that comes back to this
    /// request, query string included.
    pub fn require(&self, req: &HttpRequest) -> Result<&User, ApiError> {
        self.0.as_ref().ok_or_else(|| ApiError::LoginRequired {
            next: req
                .uri()
                .path_and_query()
                .map_or_else(|| req.path(), |pq| pq.as_str())
                .to_string(),
        })
    }
}

impl FromRequest for Viewer {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());

        Box::pin(async move {
            let (Some(state), Some(token)) = (state, token) else {
                return Ok(Viewer(None));
            };
            let Some(user_id) = state.auth.resolve_session(&token) else {
                return Ok(Viewer(None));
            };
            let user = state.repo.get_user(user_id).await.map_err(AppError::from)?;
            Ok(Viewer(user))
        })
    }
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Only local absolute paths are followed after login; anything else goes home.
pub fn sanitize_next(next: Option<&str>) -> String {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

pub fn login_url(next: &str) -> String {
    format!("{LOGIN_PATH}?next={}", encode_query_value(next))
}

// Usernames may contain `+` and `@`, which must survive the round trip
// through the query string.
fn encode_query_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_must_be_a_local_path() {
        assert_eq!(sanitize_next(Some("/follow/")), "/follow/");
        assert_eq!(sanitize_next(Some("https://evil.example/")), "/");
        assert_eq!(sanitize_next(Some("//evil.example/")), "/");
        assert_eq!(sanitize_next(Some("/\\evil.example")), "/");
        assert_eq!(sanitize_next(Some("")), "/");
        assert_eq!(sanitize_next(None), "/");
    }

    #[test]
    fn login_url_escapes_reserved_characters() {
        assert_eq!(login_url("/create/"), "/auth/login/?next=/create/");
        assert_eq!(
            login_url("/profile/a+b@c/follow/"),
            "/auth/login/?next=/profile/a%2Bb%40c/follow/"
        );
    }

    #[test]
    fn login_redirect_keeps_the_query_string() {
        let req = actix_web::test::TestRequest::with_uri("/follow/?page=2").to_http_request();
        match Viewer(None).require(&req) {
            Err(ApiError::LoginRequired { next }) => {
                assert_eq!(next, "/follow/?page=2");
                assert_eq!(login_url(&next), "/auth/login/?next=/follow/%3Fpage%3D2");
            }
            other => panic!("expected a login redirect, got {other:?}"),
        }
    }

    #[test]
    fn removal_cookie_expires_session() {
        let cookie = removal_cookie();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "");
        assert!(cookie.max_age().is_some());
    }
}
