//! HTTP/1.1 whois client over the tailscaled Unix socket.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, StatusCode, header};
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use tokio::net::UnixStream;

use crate::config::OriginResolverConfig;
use crate::domain::{DomainError, UserProfile};

/// Hostname the LocalAPI expects on every request, regardless of the
/// socket actually dialed. See
/// <https://github.com/tailscale/tailscale/blob/99b9d7a621c8f094f83bf56b716e6d29dbebbc01/ipn/localapi/localapi.go#L187-L209>
const LOCALAPI_HOST: &str = "local-tailscaled.sock";

/// Port suffix the whois endpoint requires on the queried address. Opaque
/// protocol constant; not derived from the request and not to be changed.
const WHOIS_LOOKUP_PORT: u16 = 12345;

/// One whois lookup against the identity daemon.
#[async_trait]
pub trait WhoisClient: Send + Sync {
    /// Look up `addr`. `Ok(Unknown)` is the daemon's answer for an
    /// unauthenticated address; `Err` means the lookup itself failed.
    async fn whois(&self, addr: &str) -> Result<WhoisOutcome, DomainError>;
}

/// Daemon answer for one lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhoisOutcome {
    /// 200 with a well-formed profile.
    Identified(UserProfile),
    /// Any non-200 status. The body is kept for diagnostic logging only
    /// and must never be returned to the caller.
    Unknown { status: StatusCode, body: String },
}

/// Whois client dialing the tailscaled control socket per lookup.
///
/// No connection reuse: lookups are rare relative to the daemon's
/// capacity and correctness does not depend on pooling.
pub struct LocalApiClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl LocalApiClient {
    #[must_use]
    pub fn new(socket_path: PathBuf, timeout: Duration) -> Self {
        Self {
            socket_path,
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(cfg: &OriginResolverConfig) -> Self {
        Self::new(cfg.tailscaled_socket.clone(), cfg.whois_timeout)
    }

    async fn request(&self, addr: &str) -> Result<WhoisOutcome, DomainError> {
        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            DomainError::transport(format!(
                "connect {}: {e}",
                self.socket_path.display()
            ))
        })?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| DomainError::transport(format!("handshake: {e}")))?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "localapi connection closed with error");
            }
        });

        let request = Request::get(whois_uri(addr))
            .header(header::HOST, LOCALAPI_HOST)
            .body(Empty::<Bytes>::new())
            .map_err(|e| DomainError::transport(format!("build request: {e}")))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| DomainError::transport(format!("send request: {e}")))?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| DomainError::transport(format!("read body: {e}")))?
            .to_bytes();

        if status == StatusCode::OK {
            decode_profile(&body).map(WhoisOutcome::Identified)
        } else {
            Ok(WhoisOutcome::Unknown {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            })
        }
    }
}

#[async_trait]
impl WhoisClient for LocalApiClient {
    async fn whois(&self, addr: &str) -> Result<WhoisOutcome, DomainError> {
        match tokio::time::timeout(self.timeout, self.request(addr)).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::transport(format!(
                "whois lookup timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

fn whois_uri(addr: &str) -> String {
    format!("http://{LOCALAPI_HOST}/localapi/v0/whois?addr={addr}:{WHOIS_LOOKUP_PORT}")
}

/// Envelope around the profile; the whois payload carries other keys
/// (node, capabilities) this adapter has no use for.
#[derive(Debug, Deserialize)]
struct WhoisPayload {
    #[serde(rename = "UserProfile")]
    user_profile: UserProfile,
}

fn decode_profile(body: &[u8]) -> Result<UserProfile, DomainError> {
    serde_json::from_slice::<WhoisPayload>(body)
        .map(|payload| payload.user_profile)
        .map_err(|e| DomainError::malformed(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn whois_uri_appends_the_protocol_port() {
        assert_eq!(
            whois_uri("100.64.0.5"),
            "http://local-tailscaled.sock/localapi/v0/whois?addr=100.64.0.5:12345"
        );
    }

    #[test]
    fn decodes_a_full_profile() {
        let body = br#"{"UserProfile":{"Id":42,"LoginName":"alice","DisplayName":"Alice","ProfilePicURL":""}}"#;
        let profile = decode_profile(body).unwrap();
        assert_eq!(profile.id, 42);
        assert_eq!(profile.login_name, "alice");
        assert_eq!(profile.display_name, "Alice");
        assert_eq!(profile.profile_pic_url, "");
    }

    #[test]
    fn tolerates_extra_top_level_keys() {
        let body = br#"{"Node":{"Name":"host"},"UserProfile":{"Id":7,"LoginName":"bob","DisplayName":"Bob"},"CapMap":{}}"#;
        let profile = decode_profile(body).unwrap();
        assert_eq!(profile.id, 7);
        assert_eq!(profile.profile_pic_url, "", "absent fields decode empty");
    }

    #[test]
    fn missing_user_profile_key_is_malformed() {
        let err = decode_profile(br#"{"Node":{}}"#).unwrap_err();
        assert!(matches!(err, DomainError::Malformed { .. }));
    }

    #[test]
    fn non_numeric_id_is_malformed() {
        let body = br#"{"UserProfile":{"Id":"forty-two","LoginName":"alice","DisplayName":"Alice"}}"#;
        let err = decode_profile(body).unwrap_err();
        assert!(matches!(err, DomainError::Malformed { .. }));
    }

    #[test]
    fn absent_id_decodes_to_zero() {
        let body = br#"{"UserProfile":{"LoginName":"alice","DisplayName":"Alice"}}"#;
        let profile = decode_profile(body).unwrap();
        assert_eq!(profile.id, 0);
    }
}
