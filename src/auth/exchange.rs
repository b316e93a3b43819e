//! Token exchange with the auth proxy.
//!
//! Both sign-in variants POST JSON and expect a 200 response carrying a JWT
//! and the caller's team memberships:
//!
//! ```json
//! {"jwt": "...", "teams": [{"id": "...", "name": "...", "role": "..."}]}
//! ```

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::SigninError;
use crate::config::SessionSettings;

/// Team membership returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

/// Successful exchange result.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub jwt: String,
    pub teams: Vec<Team>,
}

impl std::fmt::Debug for AuthResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResult")
            .field("jwt", &"<redacted>")
            .field("teams", &self.teams)
            .finish()
    }
}

/// Wire shape of the provider response; `jwt` is checked after parsing.
#[derive(Deserialize)]
struct AuthPayload {
    #[serde(default)]
    jwt: Option<String>,
    #[serde(default)]
    teams: Vec<Team>,
}

#[derive(Serialize)]
struct CodeExchangeRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    code_verifier: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
}

#[derive(Serialize)]
struct CredentialExchangeRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Client for the two exchange endpoints.
pub struct TokenExchanger {
    http_client: reqwest::Client,
    client_id: String,
    redirect_uri: String,
    token_url: String,
    signin_url: String,
}

impl TokenExchanger {
    pub fn new(settings: &SessionSettings) -> Result<Self, SigninError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(SigninError::Transport)?;

        Ok(Self::with_client(settings, http_client))
    }

    /// Create an exchanger with a custom HTTP client.
    pub fn with_client(settings: &SessionSettings, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            client_id: settings.client_id.clone(),
            redirect_uri: settings.redirect_uri.clone(),
            token_url: settings.token_url(),
            signin_url: settings.signin_url(),
        }
    }

    /// Exchange an authorization code, proving possession of `code_verifier`.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<AuthResult, SigninError> {
        let body = CodeExchangeRequest {
            grant_type: "authorization_code",
            client_id: &self.client_id,
            code_verifier,
            code,
            redirect_uri: &self.redirect_uri,
        };

        tracing::debug!(url = %self.token_url, "Exchanging authorization code");
        self.post(&self.token_url, &body).await
    }

    /// Exchange an email and password directly.
    pub async fn exchange_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResult, SigninError> {
        let body = CredentialExchangeRequest { email, password };

        tracing::debug!(url = %self.signin_url, "Exchanging email credentials");
        self.post(&self.signin_url, &body).await
    }

    async fn post<B: Serialize>(&self, url: &str, body: &B) -> Result<AuthResult, SigninError> {
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %url, "Failed to reach auth proxy");
                SigninError::Transport(e)
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            tracing::error!(error = %e, url = %url, "Failed to read auth proxy response");
            SigninError::Transport(e)
        })?;

        parse_auth_response(status, text)
    }
}

/// Classify a provider response into an [`AuthResult`] or a typed failure.
pub fn parse_auth_response(status: StatusCode, body: String) -> Result<AuthResult, SigninError> {
    if status != StatusCode::OK {
        tracing::error!(status = %status, body = %body, "Auth proxy returned error");
        return Err(SigninError::UnexpectedStatus { status, body });
    }

    let payload: AuthPayload = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(source) => {
            tracing::error!(error = %source, "Failed to parse auth proxy response");
            return Err(SigninError::MalformedResponse { source, body });
        }
    };

    match payload.jwt {
        Some(jwt) if !jwt.is_empty() => Ok(AuthResult {
            jwt,
            teams: payload.teams,
        }),
        _ => Err(SigninError::MissingCredential),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    use super::*;

    fn settings(server: &MockServer) -> SessionSettings {
        SessionSettings {
            client_id: "client-123".into(),
            auth_proxy: "nodesource.example-registry.com".into(),
            redirect_uri: "https://login.example.com/callback".into(),
            auth_domain: "login.example.com".into(),
            registry_placeholder: "nodesource".into(),
            token_endpoint: Some(format!("{}/api-proxy/v1/oauth/token", server.uri())),
            signin_endpoint: Some(format!("{}/-/signin", server.uri())),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_parse_success() {
        let body = json!({
            "jwt": "abc",
            "teams": [{"id": "t1", "name": "Acme", "role": "admin"}]
        })
        .to_string();

        let result = parse_auth_response(StatusCode::OK, body).unwrap();
        assert_eq!(result.jwt, "abc");
        assert_eq!(
            result.teams,
            vec![Team {
                id: "t1".into(),
                name: "Acme".into(),
                role: "admin".into(),
            }]
        );
    }

    #[test]
    fn test_parse_unexpected_status_keeps_body() {
        let err = parse_auth_response(StatusCode::FORBIDDEN, "nope".into()).unwrap_err();
        match err {
            SigninError::UnexpectedStatus { status, body } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(body, "nope");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_malformed_body() {
        let err = parse_auth_response(StatusCode::OK, "not json".into()).unwrap_err();
        assert!(matches!(err, SigninError::MalformedResponse { ref body, .. } if body == "not json"));
    }

    #[test]
    fn test_parse_wrong_shape_is_malformed() {
        let body = json!({"jwt": "abc", "teams": "everyone"}).to_string();
        let err = parse_auth_response(StatusCode::OK, body).unwrap_err();
        assert_eq!(err.kind(), "malformed_response");
    }

    #[test]
    fn test_parse_missing_or_empty_jwt() {
        for body in [json!({"teams": []}), json!({"jwt": "", "teams": []}), json!({"jwt": null})] {
            let err = parse_auth_response(StatusCode::OK, body.to_string()).unwrap_err();
            assert!(matches!(err, SigninError::MissingCredential), "{body}");
        }
    }

    #[test]
    fn test_parse_missing_teams_defaults_empty() {
        let result = parse_auth_response(StatusCode::OK, json!({"jwt": "abc"}).to_string()).unwrap();
        assert!(result.teams.is_empty());
    }

    #[test]
    fn test_debug_redacts_jwt() {
        let result = AuthResult {
            jwt: "secret-jwt".into(),
            teams: vec![],
        };
        assert!(!format!("{result:?}").contains("secret-jwt"));
    }

    #[tokio::test]
    async fn test_exchange_code_request_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api-proxy/v1/oauth/token"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "grant_type": "authorization_code",
                "client_id": "client-123",
                "code_verifier": "verifier-xyz",
                "code": "code-456",
                "redirect_uri": "https://login.example.com/callback"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jwt": "abc",
                "teams": [{"id": "t1", "name": "Acme", "role": "admin"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let exchanger = TokenExchanger::new(&settings(&server)).unwrap();
        let result = exchanger
            .exchange_code("code-456", "verifier-xyz")
            .await
            .unwrap();
        assert_eq!(result.jwt, "abc");
        assert_eq!(result.teams.len(), 1);
    }

    #[tokio::test]
    async fn test_exchange_credentials_request_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/-/signin"))
            .and(body_json(json!({"email": "dev@example.com", "password": "hunter2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jwt": "def",
                "teams": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let exchanger = TokenExchanger::new(&settings(&server)).unwrap();
        let result = exchanger
            .exchange_credentials("dev@example.com", "hunter2")
            .await
            .unwrap();
        assert_eq!(result.jwt, "def");
    }

    #[tokio::test]
    async fn test_exchange_surfaces_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/-/signin"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let exchanger = TokenExchanger::new(&settings(&server)).unwrap();
        let err = exchanger
            .exchange_credentials("dev@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad credentials"), "{err}");
    }

    #[tokio::test]
    async fn test_exchange_transport_failure() {
        let server = MockServer::start().await;
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let settings = SessionSettings {
            token_endpoint: Some(format!("http://127.0.0.1:{port}/token")),
            ..settings(&server)
        };

        let exchanger = TokenExchanger::new(&settings).unwrap();
        let err = exchanger.exchange_code("code", "verifier").await.unwrap_err();
        assert_eq!(err.kind(), "transport_failure");
    }
}
