//! Origin Resolver Module
//!
//! Forward-authentication core for a reverse proxy: given an inbound
//! request's claimed origin, decide whether to bypass, deny, or resolve the
//! client through the local `tailscaled` whois API, and translate the
//! outcome into trust headers.
//!
//! Security note: the `X-Forwarded-For` header is trusted verbatim. This
//! module must only be reachable through a proxy that sets the header
//! itself; there is no verification of who wrote it.

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;

pub use config::{OriginResolverConfig, PolicyMode};
pub use domain::{AuthDecision, InboundOrigin, OriginPolicy, OriginResolver, UserProfile};
pub use infra::{LocalApiClient, WhoisClient, WhoisOutcome};
