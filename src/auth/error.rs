use reqwest::StatusCode;

use crate::npmrc::RcError;

/// Failures that terminate a sign-in attempt.
///
/// None of these are retried. A failed sign-in is re-run from the start, which
/// regenerates the PKCE material.
#[derive(Debug, thiserror::Error)]
pub enum SigninError {
    /// The request could not be sent or timed out.
    #[error("unexpected error receiving access token: {0}")]
    Transport(#[source] reqwest::Error),

    /// The provider answered with something other than 200.
    #[error("auth proxy returned {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    /// 200, but the body was not the expected JSON shape.
    #[error("error parsing response from auth proxy ({source}), info: {body}")]
    MalformedResponse {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// The response parsed but carried no `jwt`.
    #[error("did not receive JWT")]
    MissingCredential,

    #[error("no teams are available for this account")]
    NoTeamsAvailable,

    #[error("invalid team selection: {0:?}")]
    InvalidTeamSelection(String),

    /// The auth proxy host does not contain the placeholder the team id replaces.
    #[error("auth proxy host {host:?} does not contain {placeholder:?}; cannot derive registry")]
    SubstitutionFailure { host: String, placeholder: String },

    #[error("could not construct url from {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to read input: {0}")]
    Prompt(#[source] std::io::Error),

    #[error(transparent)]
    FileIo(#[from] RcError),
}

impl SigninError {
    /// Stable identifier for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            SigninError::Transport(_) => "transport_failure",
            SigninError::UnexpectedStatus { .. } => "unexpected_status",
            SigninError::MalformedResponse { .. } => "malformed_response",
            SigninError::MissingCredential => "missing_credential",
            SigninError::NoTeamsAvailable => "no_teams_available",
            SigninError::InvalidTeamSelection(_) => "invalid_team_selection",
            SigninError::SubstitutionFailure { .. } => "substitution_failure",
            SigninError::InvalidUrl { .. } => "invalid_url",
            SigninError::Prompt(_) => "prompt_failure",
            SigninError::FileIo(_) => "file_io_failure",
        }
    }
}
