//! Authorization URL for the browser-based SSO branch.

use url::Url;

use super::{PkceSecret, SigninError};
use crate::config::SessionSettings;

const SCOPE: &str = "email offline_access openid";
const DEVICE: &str = "nscm";
const RESPONSE_TYPE: &str = "code";
const CODE_CHALLENGE_METHOD: &str = "S256";

/// Identity provider connection used for SSO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Github,
    Google,
}

impl Connection {
    /// Connection identifier understood by the identity provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Connection::Github => "github",
            Connection::Google => "google-oauth2",
        }
    }
}

impl std::fmt::Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the `/authorize` URL for `connection`, binding it to `pkce`.
///
/// Every dynamic value is percent-encoded into the query string.
pub fn authorization_url(
    connection: Connection,
    settings: &SessionSettings,
    pkce: &PkceSecret,
) -> Result<Url, SigninError> {
    let base = format!("https://{}/authorize", settings.auth_domain);
    let mut url = Url::parse(&base).map_err(|source| SigninError::InvalidUrl {
        url: base.clone(),
        source,
    })?;

    url.query_pairs_mut()
        .append_pair("connection", connection.as_str())
        .append_pair("audience", &settings.audience())
        .append_pair("scope", SCOPE)
        .append_pair("device", DEVICE)
        .append_pair("response_type", RESPONSE_TYPE)
        .append_pair("client_id", &settings.client_id)
        .append_pair("code_challenge", &pkce.challenge)
        .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD)
        .append_pair("redirect_uri", &settings.redirect_uri);

    Ok(url)
}
