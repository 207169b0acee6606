use crate::{AuthError, SessionCredential};

pub const SESSION_TOKEN_ENV: &str = "CHATGPT_SESSION_TOKEN";

pub fn from_env() -> Result<SessionCredential, AuthError> {
    from_var(SESSION_TOKEN_ENV)
}

pub(crate) fn from_var(var: &str) -> Result<SessionCredential, AuthError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(SessionCredential::new(value.trim())),
        _ => Err(AuthError::NoCredential {
            env_var: var.to_string(),
        }),
    }
}
