//! Sign in to a certified-modules registry.
//!
//! A sign-in authenticates against the identity provider (browser SSO with
//! PKCE, or email and password), binds the session to one team, and writes
//! the resulting auth token to `~/.npmrc` and the team's registry to
//! `./.npmrc`.

pub mod auth;
pub mod cache;
pub mod config;
pub mod npmrc;
#[cfg(feature = "cli")]
pub mod observability;
pub mod prompt;
pub mod signin;

#[cfg(test)]
mod tests;
