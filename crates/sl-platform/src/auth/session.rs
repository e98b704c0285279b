//! Cookie session
//!
//! The signed-in principal, the pending sign-in challenge and the post
//! sign-out target all live in private (encrypted and authenticated) cookies.
//! Nothing is stored server-side.

use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use sl_config::SessionConfig;

use super::challenge::{PendingChallenge, CHALLENGE_TTL_SECS};
use super::claims::Principal;
use crate::shared::error::AppError;

/// Session carried in the session cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub principal: Principal,
    /// Raw ID token, kept as the hint for federated sign-out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    pub expires_at: i64,
}

impl Session {
    pub fn new(principal: Principal, id_token: Option<String>, lifetime_secs: i64) -> Self {
        Self {
            principal,
            id_token,
            expires_at: Utc::now().timestamp() + lifetime_secs,
        }
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Names and attributes of every cookie the application sets
#[derive(Debug, Clone)]
pub struct SessionCookies {
    session_name: String,
    secure: bool,
    same_site: SameSite,
    lifetime_secs: i64,
}

impl SessionCookies {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            session_name: config.cookie_name.clone(),
            secure: config.secure,
            same_site: parse_same_site(&config.same_site),
            lifetime_secs: config.expiry_secs,
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn challenge_name(&self) -> String {
        format!("{}.challenge", self.session_name)
    }

    pub fn signout_name(&self) -> String {
        format!("{}.signout", self.session_name)
    }

    pub fn antiforgery_name(&self) -> String {
        format!("{}.af", self.session_name)
    }

    fn cookie(&self, name: String, value: String, same_site: SameSite, max_age: i64) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(same_site)
            .max_age(time::Duration::seconds(max_age))
            .build()
    }

    fn removal(name: String) -> Cookie<'static> {
        Cookie::build((name, "")).path("/").build()
    }

    /// Current session, if the cookie decrypts, parses and has not expired.
    pub fn read_session(&self, jar: &PrivateCookieJar) -> Option<Session> {
        let session: Session = read_json(jar, &self.session_name)?;
        if session.is_expired_at(Utc::now().timestamp()) {
            debug!("Session cookie expired");
            return None;
        }
        Some(session)
    }

    pub fn start_session(
        &self,
        jar: PrivateCookieJar,
        session: &Session,
    ) -> Result<PrivateCookieJar, AppError> {
        let value = to_json(session)?;
        Ok(jar.add(self.cookie(
            self.session_name.clone(),
            value,
            self.same_site,
            self.lifetime_secs,
        )))
    }

    pub fn end_session(&self, jar: PrivateCookieJar) -> PrivateCookieJar {
        jar.remove(Self::removal(self.session_name.clone()))
    }

    // The provider redirects back with a cross-site top-level GET, so the
    // round-trip cookies are always Lax.

    pub fn store_challenge(
        &self,
        jar: PrivateCookieJar,
        challenge: &PendingChallenge,
    ) -> Result<PrivateCookieJar, AppError> {
        let value = to_json(challenge)?;
        Ok(jar.add(self.cookie(
            self.challenge_name(),
            value,
            SameSite::Lax,
            CHALLENGE_TTL_SECS,
        )))
    }

    /// Remove and return the pending challenge.
    pub fn take_challenge(&self, jar: PrivateCookieJar) -> (PrivateCookieJar, Option<PendingChallenge>) {
        let challenge = read_json(&jar, &self.challenge_name());
        (jar.remove(Self::removal(self.challenge_name())), challenge)
    }

    pub fn store_signout_target(&self, jar: PrivateCookieJar, target: &str) -> PrivateCookieJar {
        jar.add(self.cookie(
            self.signout_name(),
            target.to_string(),
            SameSite::Lax,
            CHALLENGE_TTL_SECS,
        ))
    }

    /// Remove and return where to go after federated sign-out.
    pub fn take_signout_target(&self, jar: PrivateCookieJar) -> (PrivateCookieJar, Option<String>) {
        let target = jar.get(&self.signout_name()).map(|c| c.value().to_string());
        (jar.remove(Self::removal(self.signout_name())), target)
    }

    pub fn antiforgery_token(&self, jar: &PrivateCookieJar) -> Option<String> {
        jar.get(&self.antiforgery_name())
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn store_antiforgery_token(&self, jar: PrivateCookieJar, token: String) -> PrivateCookieJar {
        jar.add(self.cookie(self.antiforgery_name(), token, SameSite::Strict, self.lifetime_secs))
    }
}

fn read_json<T: DeserializeOwned>(jar: &PrivateCookieJar, name: &str) -> Option<T> {
    let cookie = jar.get(name)?;
    match serde_json::from_str(cookie.value()) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(cookie = name, error = %e, "Ignoring unreadable cookie");
            None
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value)
        .map_err(|e| AppError::internal(format!("Failed to encode cookie: {}", e)))
}

pub fn parse_same_site(value: &str) -> SameSite {
    match value.to_ascii_lowercase().as_str() {
        "strict" => SameSite::Strict,
        "none" => SameSite::None,
        _ => SameSite::Lax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Key;

    fn cookies() -> SessionCookies {
        SessionCookies::new(&SessionConfig::default())
    }

    fn jar() -> PrivateCookieJar {
        PrivateCookieJar::new(Key::generate())
    }

    fn principal() -> Principal {
        Principal::from_claims([("sub", "00u1"), ("name", "Ada")])
    }

    #[test]
    fn test_session_round_trip() {
        let cookies = cookies();
        let session = Session::new(principal(), Some("id.token".to_string()), 60);
        let jar = cookies.start_session(jar(), &session).unwrap();

        assert_eq!(cookies.read_session(&jar), Some(session));

        let jar = cookies.end_session(jar);
        assert_eq!(cookies.read_session(&jar), None);
    }

    #[test]
    fn test_expired_session_is_ignored() {
        let cookies = cookies();
        let mut session = Session::new(principal(), None, 60);
        session.expires_at = Utc::now().timestamp() - 1;
        let jar = cookies.start_session(jar(), &session).unwrap();
        assert_eq!(cookies.read_session(&jar), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookies = cookies();
        let jar = cookies
            .start_session(jar(), &Session::new(principal(), None, 60))
            .unwrap();
        let cookie = jar.get("sl_session").unwrap();
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn test_challenge_is_taken_once() {
        let cookies = cookies();
        let challenge = PendingChallenge::new("/Account/Manage");
        let jar = cookies.store_challenge(jar(), &challenge).unwrap();

        let (jar, taken) = cookies.take_challenge(jar);
        assert_eq!(taken, Some(challenge));
        let (_, again) = cookies.take_challenge(jar);
        assert_eq!(again, None);
    }

    #[test]
    fn test_signout_target_is_taken_once() {
        let cookies = cookies();
        let jar = cookies.store_signout_target(jar(), "/Account/LinkChallenge?idp=0oa1");
        let (jar, target) = cookies.take_signout_target(jar);
        assert_eq!(target.as_deref(), Some("/Account/LinkChallenge?idp=0oa1"));
        assert_eq!(cookies.take_signout_target(jar).1, None);
    }

    #[test]
    fn test_parse_same_site() {
        assert_eq!(parse_same_site("Strict"), SameSite::Strict);
        assert_eq!(parse_same_site("none"), SameSite::None);
        assert_eq!(parse_same_site("Lax"), SameSite::Lax);
        assert_eq!(parse_same_site("bogus"), SameSite::Lax);
    }
}
