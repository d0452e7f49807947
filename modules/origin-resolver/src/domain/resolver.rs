//! The authorization decision: one origin policy check, at most one whois
//! lookup, one [`AuthDecision`].

use std::net::IpAddr;
use std::sync::Arc;

use ipnet::IpNet;
use tracing::{info, warn};

use crate::config::{OriginResolverConfig, PolicyMode};
use crate::infra::{WhoisClient, WhoisOutcome};

use super::model::{AuthDecision, InboundOrigin};

/// How the configured network prefix gates resolution. Selected once at
/// startup; both variants converge on the same whois path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Perimeter check: the actual socket origin must fall inside the
    /// prefix before anything else happens. The identity resolved is the
    /// one the proxy reports in `X-Forwarded-For`.
    AllowList(IpNet),
    /// Bypass: forwarded-for addresses inside the prefix pass as
    /// anonymous without daemon involvement. Everything else is resolved.
    SkipOrigin(IpNet),
}

impl OriginPolicy {
    #[must_use]
    pub fn from_config(cfg: &OriginResolverConfig) -> Self {
        match cfg.mode {
            PolicyMode::AllowList => Self::AllowList(cfg.prefix),
            PolicyMode::SkipOrigin => Self::SkipOrigin(cfg.prefix),
        }
    }
}

/// Stateless per-request resolver. Shared across all in-flight requests;
/// nothing here is mutated after construction.
pub struct OriginResolver {
    policy: OriginPolicy,
    whois: Arc<dyn WhoisClient>,
}

impl OriginResolver {
    #[must_use]
    pub fn new(policy: OriginPolicy, whois: Arc<dyn WhoisClient>) -> Self {
        Self { policy, whois }
    }

    #[must_use]
    pub fn policy(&self) -> &OriginPolicy {
        &self.policy
    }

    /// Resolve one inbound origin to a decision.
    ///
    /// Pure apart from the single whois call: no state survives the
    /// request, and a policy shortcut produces the decision directly.
    #[tracing::instrument(
        skip_all,
        fields(remote = %origin.remote_addr, host = %origin.host, client = origin.client_addr())
    )]
    pub async fn resolve(&self, origin: &InboundOrigin) -> AuthDecision {
        match &self.policy {
            OriginPolicy::AllowList(prefix) => {
                if !prefix.contains(&origin.remote_addr.ip()) {
                    warn!("socket origin outside allow-list, forbidden");
                    return AuthDecision::Denied;
                }
                self.lookup(origin).await
            }
            OriginPolicy::SkipOrigin(prefix) => {
                // A forwarded-for value that is not an IP is simply not in
                // the skip range; the daemon will reject it downstream.
                let in_skip_range = origin
                    .client_addr()
                    .parse::<IpAddr>()
                    .is_ok_and(|ip| prefix.contains(&ip));
                if in_skip_range {
                    info!("client in skip range, passing as anonymous");
                    return AuthDecision::Anonymous;
                }
                self.lookup(origin).await
            }
        }
    }

    async fn lookup(&self, origin: &InboundOrigin) -> AuthDecision {
        match self.whois.whois(origin.client_addr()).await {
            Ok(WhoisOutcome::Identified(profile)) => {
                info!(
                    id = profile.id,
                    name = %profile.display_name,
                    "whois identified client"
                );
                AuthDecision::Identified(profile)
            }
            Ok(WhoisOutcome::Unknown { status, body }) => {
                // Body is diagnostic only; it never reaches the caller.
                warn!(status = %status, body = %body, "unsuccessful auth");
                AuthDecision::Denied
            }
            Err(e) => {
                tracing::error!(error = %e, "whois lookup failed");
                AuthDecision::Failed(e)
            }
        }
    }
}
