use serde_json::Value;
use sha2::{Digest, Sha256};

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@campusflow.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "password123";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Please enter a valid email.")]
    InvalidEmail,
    #[error("Password is required.")]
    MissingPassword,
    #[error("Invalid email or password.")]
    InvalidCredentials,
}

/// Login check. This gates nothing else in the daemon; it only answers
/// whether a credential pair is accepted.
pub trait Authenticator {
    fn authenticate(&self, email: &str, password: &str) -> Result<(), AuthError>;
}

/// A single admin account, password kept as a SHA-256 hex digest.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    email: String,
    password_sha256: String,
}

impl StaticCredentials {
    pub fn new(email: impl Into<String>, password_sha256: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password_sha256: password_sha256.into(),
        }
    }

    /// Builds from the `security` settings section, falling back to the
    /// built-in account for missing keys.
    pub fn from_security_section(section: &Value) -> Self {
        let email = section
            .get("adminEmail")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_ADMIN_EMAIL);
        let digest = section
            .get("passwordSha256")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| password_digest(DEFAULT_ADMIN_PASSWORD));
        Self::new(email, digest)
    }
}

impl Default for StaticCredentials {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_EMAIL, password_digest(DEFAULT_ADMIN_PASSWORD))
    }
}

impl Authenticator for StaticCredentials {
    fn authenticate(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let email = email.trim();
        if !looks_like_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.is_empty() {
            return Err(AuthError::MissingPassword);
        }
        if email == self.email && password_digest(password) == self.password_sha256 {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

pub fn password_digest(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

pub fn looks_like_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_account_logs_in() {
        let auth = StaticCredentials::default();
        assert_eq!(auth.authenticate("admin@campusflow.com", "password123"), Ok(()));
        assert_eq!(auth.authenticate(" admin@campusflow.com ", "password123"), Ok(()));
        assert_eq!(
            auth.authenticate("Admin@CampusFlow.com", "password123"),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn rejects_bad_input_before_comparing() {
        let auth = StaticCredentials::default();
        assert_eq!(auth.authenticate("admin", "password123"), Err(AuthError::InvalidEmail));
        assert_eq!(
            auth.authenticate("admin@campusflow.com", ""),
            Err(AuthError::MissingPassword)
        );
        assert_eq!(
            auth.authenticate("admin@campusflow.com", "Password123"),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn security_section_overrides_account() {
        let section = json!({
            "adminEmail": "office@school.edu.pk",
            "passwordSha256": password_digest("s3cret")
        });
        let auth = StaticCredentials::from_security_section(&section);
        assert!(auth.authenticate("office@school.edu.pk", "s3cret").is_ok());
        assert!(auth.authenticate("admin@campusflow.com", "password123").is_err());
    }

    #[test]
    fn digest_is_hex_sha256() {
        assert_eq!(
            password_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
