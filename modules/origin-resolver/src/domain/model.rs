//! Per-request and per-call transient data.

use std::net::SocketAddr;

use serde::Deserialize;

use super::DomainError;

/// The origin signals extracted from one inbound request.
///
/// `forwarded_for` is trusted verbatim. The upstream proxy is the only
/// party allowed to set it; nothing here verifies that it did.
#[derive(Debug, Clone)]
pub struct InboundOrigin {
    /// Actual socket address of the peer, as accepted by the listener.
    pub remote_addr: SocketAddr,
    /// `Host` header value, kept for audit logging.
    pub host: String,
    /// `X-Forwarded-For` header value, if the proxy supplied one.
    pub forwarded_for: Option<String>,
}

impl InboundOrigin {
    /// Address string handed to the whois lookup: the forwarded-for value,
    /// or empty when the proxy sent none (the daemon then rejects it).
    #[must_use]
    pub fn client_addr(&self) -> &str {
        self.forwarded_for.as_deref().unwrap_or("")
    }
}

/// Identity record returned by tailscaled for a known address.
///
/// Decoding mirrors the daemon's own leniency: absent string fields decode
/// as empty and an absent `Id` as 0. Only a missing `UserProfile` key or a
/// type mismatch counts as malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "Id", alias = "ID", default)]
    pub id: i64,
    #[serde(rename = "LoginName", default)]
    pub login_name: String,
    #[serde(rename = "DisplayName", default)]
    pub display_name: String,
    #[serde(rename = "ProfilePicURL", default)]
    pub profile_pic_url: String,
}

/// Outcome of one resolution. Produced exactly once per request and
/// consumed exactly once by the HTTP translation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// The daemon vouched for the address; emit identity headers.
    Identified(UserProfile),
    /// Policy bypass for a trusted caller; pass without identity.
    Anonymous,
    /// Outside the perimeter or unknown to the daemon.
    Denied,
    /// The resolution itself failed.
    Failed(DomainError),
}
