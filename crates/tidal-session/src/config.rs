use reqwest::header::HeaderValue;

use crate::error::ConfigError;

/// API root used when no `base_url` is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.tidal.com/v1";

/// Credentials and endpoint for the login exchange. The application token,
/// username and password have no defaults; an external loader that cannot
/// produce them must not construct a coordinator.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub base_url: String,
    pub token: String,
    pub username: String,
    pub password: String,
}

impl SessionConfig {
    pub fn new(
        token: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            token: token.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builds the configuration from an external lookup, e.g. a config-file
    /// block. Absence of any required value fails construction; the token is
    /// additionally checked to be usable as an HTTP header value, since that
    /// is the only place it ever goes.
    pub fn from_values(
        base_url: Option<String>,
        token: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self, ConfigError> {
        let token = token.ok_or(ConfigError::Missing("token"))?;
        if HeaderValue::from_str(&token).is_err() {
            return Err(ConfigError::Invalid("token"));
        }
        let username = username.ok_or(ConfigError::Missing("username"))?;
        let password = password.ok_or(ConfigError::Missing("password"))?;

        Ok(Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            token,
            username,
            password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_values_applies_default_base_url() {
        let config = SessionConfig::from_values(
            None,
            Some("tok".into()),
            Some("alice".into()),
            Some("secret".into()),
        )
        .expect("complete configuration");

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.token, "tok");
    }

    #[test]
    fn missing_required_values_prevent_construction() {
        let missing_token = SessionConfig::from_values(
            None,
            None,
            Some("alice".into()),
            Some("secret".into()),
        );
        assert_eq!(missing_token.unwrap_err(), ConfigError::Missing("token"));

        let missing_username =
            SessionConfig::from_values(None, Some("tok".into()), None, Some("secret".into()));
        assert_eq!(
            missing_username.unwrap_err(),
            ConfigError::Missing("username")
        );

        let missing_password =
            SessionConfig::from_values(None, Some("tok".into()), Some("alice".into()), None);
        assert_eq!(
            missing_password.unwrap_err(),
            ConfigError::Missing("password")
        );
    }

    #[test]
    fn header_unsafe_token_is_rejected() {
        let config = SessionConfig::from_values(
            None,
            Some("tok\nen".into()),
            Some("alice".into()),
            Some("secret".into()),
        );
        assert_eq!(config.unwrap_err(), ConfigError::Invalid("token"));
    }
}
