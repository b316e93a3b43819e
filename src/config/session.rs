use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Static settings for talking to the identity provider and the auth proxy.
///
/// Loaded once at startup and passed by reference into the sign-in flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSettings {
    /// OAuth client identifier registered with the identity provider.
    pub client_id: String,

    /// Auth proxy host (no scheme), e.g. `nodesource.example-registry.com`.
    /// The team id replaces `registry_placeholder` in this host to form the
    /// team's registry host.
    pub auth_proxy: String,

    /// Redirect URI registered for the client. The provider shows the
    /// authorization code there for the operator to paste back.
    pub redirect_uri: String,

    /// Identity provider domain hosting `/authorize` and `/userinfo`.
    pub auth_domain: String,

    /// Literal segment of `auth_proxy` replaced by the team id.
    #[serde(default = "default_registry_placeholder")]
    pub registry_placeholder: String,

    /// Override for the authorization-code exchange endpoint.
    /// Defaults to `http://{auth_proxy}/api-proxy/v1/oauth/token`.
    #[serde(default)]
    pub token_endpoint: Option<String>,

    /// Override for the email/password sign-in endpoint.
    /// Defaults to `https://{auth_proxy}/-/signin`.
    #[serde(default)]
    pub signin_endpoint: Option<String>,

    /// Timeout for each request to the auth proxy, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_registry_placeholder() -> String {
    "nodesource".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl SessionSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("client_id", &self.client_id),
            ("auth_proxy", &self.auth_proxy),
            ("redirect_uri", &self.redirect_uri),
            ("auth_domain", &self.auth_domain),
            ("registry_placeholder", &self.registry_placeholder),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "session.{name} must not be empty"
                )));
            }
        }

        for (name, value) in [
            ("auth_proxy", &self.auth_proxy),
            ("auth_domain", &self.auth_domain),
        ] {
            if value.contains("://") {
                return Err(ConfigError::Validation(format!(
                    "session.{name} is a host name; remove the scheme"
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "session.timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Endpoint for the authorization-code exchange.
    pub fn token_url(&self) -> String {
        self.token_endpoint
            .clone()
            .unwrap_or_else(|| format!("http://{}/api-proxy/v1/oauth/token", self.auth_proxy))
    }

    /// Endpoint for the email/password exchange.
    pub fn signin_url(&self) -> String {
        self.signin_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}/-/signin", self.auth_proxy))
    }

    /// Audience requested in the authorization URL.
    pub fn audience(&self) -> String {
        format!("https://{}/userinfo", self.auth_domain)
    }
}
