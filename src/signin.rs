//! The sign-in flow.
//!
//! ```text
//! Start -> SsoBranch | EmailBranch -> Exchanging -> TeamResolving -> Persisting -> Done
//! ```
//!
//! The first error ends the flow. Each file update is atomic on its own, so a
//! failure while persisting may leave the global file updated and the local
//! one untouched, but never a half-written file.

use std::path::PathBuf;

use url::Url;

use crate::{
    auth::{
        AuthResult, Connection, PkceSecret, SigninError, Team, TokenExchanger,
        authorization_url, resolve_team,
    },
    config::SessionSettings,
    npmrc::{MergeIntent, RcFile},
    prompt::{Browser, Prompter},
};

/// Comment marker used in `.npmrc` files.
pub const COMMENT_MARKER: char = '#';

/// Key of the registry pointer in the local `.npmrc`.
pub const REGISTRY_KEY: &str = "registry";

const SSO_PROMPT: &str = "A browser will launch and ask you to sign in.\n\n\
                          Once you have the authorization code, please enter it here: ";

/// Flags accepted by the `signin` command. At most one is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SigninOptions {
    pub github: bool,
    pub google: bool,
}

impl SigninOptions {
    pub fn method(&self) -> SigninMethod {
        if self.github {
            SigninMethod::Sso(Connection::Github)
        } else if self.google {
            SigninMethod::Sso(Connection::Google)
        } else {
            SigninMethod::Email
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigninMethod {
    /// Browser SSO through an identity connection, then a pasted code.
    Sso(Connection),
    /// Email and password entered at the terminal.
    Email,
}

/// Where the two `.npmrc` files live.
#[derive(Debug, Clone)]
pub struct SigninPaths {
    /// User-level file receiving the auth token.
    pub global_npmrc: PathBuf,
    /// Project-level file receiving the registry pointer.
    pub local_npmrc: PathBuf,
}

impl SigninPaths {
    /// `~/.npmrc` and `./.npmrc`.
    #[cfg(feature = "cli")]
    pub fn from_environment() -> std::io::Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine home directory",
            )
        })?;
        let cwd = std::env::current_dir()?;

        Ok(Self {
            global_npmrc: home.join(".npmrc"),
            local_npmrc: cwd.join(".npmrc"),
        })
    }
}

/// What a successful sign-in produced, for the caller to cache.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionResult {
    pub token: String,
    pub registry: String,
    pub team: Team,
}

impl std::fmt::Debug for SessionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionResult")
            .field("token", &"<redacted>")
            .field("registry", &self.registry)
            .field("team", &self.team)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    SsoBranch,
    EmailBranch,
    Exchanging,
    TeamResolving,
    Persisting,
    Done,
}

/// Run one sign-in attempt to completion.
pub async fn signin(
    method: SigninMethod,
    settings: &SessionSettings,
    paths: &SigninPaths,
    prompter: &mut dyn Prompter,
    browser: &dyn Browser,
) -> Result<SessionResult, SigninError> {
    let exchanger = TokenExchanger::new(settings)?;
    signin_with(method, settings, &exchanger, paths, prompter, browser).await
}

/// [`signin`] with a caller-supplied exchanger.
pub async fn signin_with(
    method: SigninMethod,
    settings: &SessionSettings,
    exchanger: &TokenExchanger,
    paths: &SigninPaths,
    prompter: &mut dyn Prompter,
    browser: &dyn Browser,
) -> Result<SessionResult, SigninError> {
    let mut stage = Stage::Start;
    let result = run(
        &mut stage, method, settings, exchanger, paths, prompter, browser,
    )
    .await;

    if let Err(e) = &result {
        tracing::error!(stage = ?stage, kind = e.kind(), error = %e, "Sign-in failed");
    }
    result
}

async fn run(
    stage: &mut Stage,
    method: SigninMethod,
    settings: &SessionSettings,
    exchanger: &TokenExchanger,
    paths: &SigninPaths,
    prompter: &mut dyn Prompter,
    browser: &dyn Browser,
) -> Result<SessionResult, SigninError> {
    let auth = match method {
        SigninMethod::Sso(connection) => {
            advance(stage, Stage::SsoBranch);
            let pkce = PkceSecret::new();
            let url = authorization_url(connection, settings, &pkce)?;

            if let Err(e) = browser.open(url.as_str()) {
                tracing::warn!(error = %e, "Failed to open browser");
                prompter.say(&format!("Open a browser and navigate to: {url}"));
            }
            let code = prompter.ask(SSO_PROMPT).map_err(SigninError::Prompt)?;

            advance(stage, Stage::Exchanging);
            exchanger.exchange_code(code.trim(), &pkce.verifier).await?
        }
        SigninMethod::Email => {
            advance(stage, Stage::EmailBranch);
            let email = prompter.ask("email: ").map_err(SigninError::Prompt)?;
            let password = prompter
                .ask_masked("password: ")
                .map_err(SigninError::Prompt)?;

            advance(stage, Stage::Exchanging);
            exchanger
                .exchange_credentials(email.trim(), &password)
                .await?
        }
    };

    let AuthResult { jwt, teams } = auth;

    advance(stage, Stage::TeamResolving);
    let team = resolve_team(&teams, prompter)?;

    advance(stage, Stage::Persisting);
    let registry = certified_registry(settings, &team)?;
    let auth_token_key = auth_token_key(&registry)?;

    RcFile::new(&paths.global_npmrc, COMMENT_MARKER)
        .with_mode(0o600)
        .merge(&MergeIntent::replace(auth_token_key, jwt.clone()))
        .await?;

    RcFile::new(&paths.local_npmrc, COMMENT_MARKER)
        .merge(&MergeIntent::comment_and_replace(REGISTRY_KEY, registry.clone()))
        .await?;

    advance(stage, Stage::Done);
    tracing::info!(team_id = %team.id, registry = %registry, "Signed in");

    Ok(SessionResult {
        token: jwt,
        registry,
        team,
    })
}

fn advance(stage: &mut Stage, next: Stage) {
    let from = *stage;
    tracing::debug!(from = ?from, to = ?next, "Sign-in stage");
    *stage = next;
}

/// `https://` URL of the team's certified-modules registry.
///
/// The first occurrence of the placeholder in the auth proxy host is replaced
/// by the team id.
pub fn certified_registry(settings: &SessionSettings, team: &Team) -> Result<String, SigninError> {
    let placeholder = &settings.registry_placeholder;
    if placeholder.is_empty() || !settings.auth_proxy.contains(placeholder.as_str()) {
        return Err(SigninError::SubstitutionFailure {
            host: settings.auth_proxy.clone(),
            placeholder: placeholder.clone(),
        });
    }

    let host = settings.auth_proxy.replacen(placeholder.as_str(), &team.id, 1);
    Ok(format!("https://{host}"))
}

/// `.npmrc` key for the registry's auth token: `//{host}/:_authToken`.
pub fn auth_token_key(registry: &str) -> Result<String, SigninError> {
    let url = Url::parse(registry).map_err(|source| SigninError::InvalidUrl {
        url: registry.to_string(),
        source,
    })?;
    let host = url.host_str().ok_or_else(|| SigninError::InvalidUrl {
        url: registry.to_string(),
        source: url::ParseError::EmptyHost,
    })?;

    Ok(format!("//{host}/:_authToken"))
}
