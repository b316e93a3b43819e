//! Cross-module tests.
//!
//! These drive the full sign-in flow against a mock auth proxy.
