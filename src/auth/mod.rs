mod authorize;
mod error;
mod exchange;
mod pkce;
mod team;

pub use authorize::{Connection, authorization_url};
pub use error::SigninError;
pub use exchange::{AuthResult, Team, TokenExchanger, parse_auth_response};
pub use pkce::PkceSecret;
pub use team::resolve_team;
