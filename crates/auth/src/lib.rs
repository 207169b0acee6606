pub mod env;
pub mod token;

mod error;

pub use error::{AuthError, BoxError};
pub use token::{needs_refresh, AccessToken};

/// Name of the browser cookie the session credential travels in.
pub const SESSION_COOKIE: &str = "__Secure-next-auth.session-token";

/// Long-lived browser session credential. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential(String);

impl SessionCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn cookie_header(&self) -> String {
        format!("{SESSION_COOKIE}={}", self.0)
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionCredential(<redacted>)")
    }
}

/// Explicit value first, then the environment, then the config file.
pub fn resolve_credential(
    explicit: Option<&str>,
    config: &chatgpt_config::ClientConfig,
) -> Result<SessionCredential, AuthError> {
    if let Some(value) = explicit.filter(|v| !v.trim().is_empty()) {
        return Ok(SessionCredential::new(value.trim()));
    }

    if let Ok(cred) = env::from_env() {
        return Ok(cred);
    }

    if let Some(value) = config.session_token.as_deref() {
        if !value.trim().is_empty() {
            tracing::debug!("Using session token from config file");
            return Ok(SessionCredential::new(value.trim()));
        }
    }

    Err(AuthError::NoCredential {
        env_var: env::SESSION_TOKEN_ENV.to_string(),
    })
}

/// Returns the credential source for display.
pub fn credential_source(
    explicit: Option<&str>,
    config: &chatgpt_config::ClientConfig,
) -> &'static str {
    if explicit.is_some_and(|v| !v.trim().is_empty()) {
        return "flag";
    }
    if env::from_env().is_ok() {
        return "env";
    }
    if config.session_token.as_deref().is_some_and(|v| !v.trim().is_empty()) {
        return "config";
    }
    "none"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_value_wins() {
        let mut config = chatgpt_config::ClientConfig::default();
        config.session_token = Some("from-config".to_string());
        let cred = resolve_credential(Some("  from-flag "), &config).unwrap();
        assert_eq!(cred.expose(), "from-flag");
    }

    #[test]
    fn blank_explicit_value_is_ignored() {
        let mut config = chatgpt_config::ClientConfig::default();
        config.session_token = Some("from-config".to_string());
        let cred = resolve_credential(Some("   "), &config).unwrap();
        // The environment may carry a token on a developer machine.
        if std::env::var(env::SESSION_TOKEN_ENV).is_err() {
            assert_eq!(cred.expose(), "from-config");
        }
    }

    #[test]
    fn unset_variable_reports_its_name() {
        let err = env::from_var("CHATGPT_TEST_SURELY_UNSET_VARIABLE").unwrap_err();
        match err {
            AuthError::NoCredential { env_var } => {
                assert_eq!(env_var, "CHATGPT_TEST_SURELY_UNSET_VARIABLE")
            }
            other => panic!("expected NoCredential, got {other:?}"),
        }
    }

    #[test]
    fn cookie_header_uses_session_cookie_name() {
        let cred = SessionCredential::new("abc");
        assert_eq!(
            cred.cookie_header(),
            "__Secure-next-auth.session-token=abc"
        );
    }

    #[test]
    fn debug_is_redacted() {
        let cred = SessionCredential::new("secret");
        assert!(!format!("{cred:?}").contains("secret"));
    }
}
