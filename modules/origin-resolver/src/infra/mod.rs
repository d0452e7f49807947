//! Infrastructure: the tailscaled LocalAPI client.

pub mod localapi;

pub use localapi::{LocalApiClient, WhoisClient, WhoisOutcome};
