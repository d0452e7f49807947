//! Configuration for the origin resolver.

use std::path::PathBuf;
use std::time::Duration;

use ipnet::IpNet;
use serde::Deserialize;

/// Immutable startup configuration. Built once, shared across all
/// concurrent resolutions without synchronization.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OriginResolverConfig {
    /// Path to the tailscaled control socket.
    pub tailscaled_socket: PathBuf,

    /// How the configured prefix gates resolution.
    pub mode: PolicyMode,

    /// Network prefix consumed by the selected mode: the perimeter
    /// allow-list in `AllowList`, the bypass range in `SkipOrigin`.
    pub prefix: IpNet,

    /// Upper bound on a single whois lookup. Expiry is treated as a
    /// transport failure.
    #[serde(with = "timeout_secs")]
    pub whois_timeout: Duration,
}

/// Origin policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyMode {
    /// The socket origin must fall inside the prefix, else 403 with no
    /// daemon call; the forwarded-for address is the one resolved.
    AllowList,
    /// Forwarded-for addresses inside the prefix bypass resolution
    /// entirely and pass as anonymous.
    SkipOrigin,
}

impl Default for OriginResolverConfig {
    fn default() -> Self {
        Self {
            tailscaled_socket: PathBuf::from("/var/run/tailscale/tailscaled.sock"),
            mode: PolicyMode::AllowList,
            prefix: default_prefix(),
            whois_timeout: Duration::from_secs(5),
        }
    }
}

fn default_prefix() -> IpNet {
    // Loopback only unless deployers widen it explicitly.
    IpNet::new(std::net::Ipv4Addr::LOCALHOST.into(), 32)
        .unwrap_or_else(|_| unreachable!("/32 is a valid IPv4 prefix length"))
}

mod timeout_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_original_deployment() {
        let cfg = OriginResolverConfig::default();
        assert_eq!(
            cfg.tailscaled_socket,
            PathBuf::from("/var/run/tailscale/tailscaled.sock")
        );
        assert_eq!(cfg.mode, PolicyMode::AllowList);
        assert_eq!(cfg.prefix, "127.0.0.1/32".parse::<IpNet>().unwrap());
        assert_eq!(cfg.whois_timeout, Duration::from_secs(5));
    }

    #[test]
    fn deserializes_skip_origin_mode() {
        let cfg: OriginResolverConfig = serde_json::from_value(serde_json::json!({
            "mode": "skip-origin",
            "prefix": "10.0.0.0/8",
            "whois_timeout": 2,
        }))
        .unwrap();
        assert_eq!(cfg.mode, PolicyMode::SkipOrigin);
        assert_eq!(cfg.prefix, "10.0.0.0/8".parse::<IpNet>().unwrap());
        assert_eq!(cfg.whois_timeout, Duration::from_secs(2));
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: Result<OriginResolverConfig, _> =
            serde_json::from_value(serde_json::json!({ "listen": "0.0.0.0:80" }));
        assert!(result.is_err());
    }
}
