//! Authenticated carrier session

use super::cookies::CookieJar;
use crate::envelope::Emptiness;
use crate::error::ProtocolError;

/// Cookie carrying the anti-forgery token
pub const XSRF_COOKIE: &str = "XSRF-TOKEN";

/// Token and cookies obtained from a successful login
///
/// Every later call sends the cookies back and echoes the token in the
/// `x-xsrf-token` header. A handle is never empty: it cannot be built
/// without a token.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionHandle {
    token: String,
    cookies: CookieJar,
}

impl SessionHandle {
    /// Build a session from the cookies set by the login response
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::MissingToken` if the jar has no non-empty `XSRF-TOKEN`
    pub fn from_jar(cookies: CookieJar) -> Result<Self, ProtocolError> {
        let token = cookies
            .get(XSRF_COOKIE)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ProtocolError::MissingToken)?
            .to_string();

        Ok(Self { token, cookies })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// `Cookie` request header value
    pub fn cookie_header(&self) -> String {
        self.cookies.to_header()
    }
}

// Tokens are credentials; keep them out of debug output.
impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("token", &"<redacted>")
            .field("cookies", &self.cookies.len())
            .finish()
    }
}

impl Emptiness for SessionHandle {
    fn is_empty_result(&self) -> bool {
        self.token.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_from_jar() {
        let jar = CookieJar::from_set_cookie(["XSRF-TOKEN=tok123; Path=/", "sid=abc; HttpOnly"]);
        let session = SessionHandle::from_jar(jar).unwrap();

        assert_eq!(session.token(), "tok123");
        assert_eq!(session.cookie_header(), "XSRF-TOKEN=tok123; sid=abc");
        assert!(!session.is_empty_result());
    }

    #[test]
    fn test_missing_token() {
        let jar = CookieJar::from_set_cookie(["sid=abc"]);
        assert!(matches!(
            SessionHandle::from_jar(jar),
            Err(ProtocolError::MissingToken)
        ));

        let jar = CookieJar::from_set_cookie(["XSRF-TOKEN=; Path=/"]);
        assert!(SessionHandle::from_jar(jar).is_err());
    }

    #[test]
    fn test_debug_hides_token() {
        let jar = CookieJar::from_set_cookie(["XSRF-TOKEN=secret"]);
        let session = SessionHandle::from_jar(jar).unwrap();

        assert!(!format!("{session:?}").contains("secret"));
    }
}
