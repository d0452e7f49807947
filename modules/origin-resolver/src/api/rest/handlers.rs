use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::ExtensionRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::info;

use crate::domain::{
    AuthDecision, DomainError, InboundOrigin, OriginPolicy, OriginResolver, UserProfile,
};

/// Forwarded client address, set by the trusted upstream proxy.
const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

// Trust headers, allow-list mode.
const TSAUTH_ID: HeaderName = HeaderName::from_static("x-tsauth-id");
const TSAUTH_NAME: HeaderName = HeaderName::from_static("x-tsauth-name");
const TSAUTH_AVATAR: HeaderName = HeaderName::from_static("x-tsauth-avatar");

// Trust headers, skip-origin mode.
const TAILSCALE_USER_LOGIN: HeaderName = HeaderName::from_static("tailscale-user-login");
const TAILSCALE_USER_NAME: HeaderName = HeaderName::from_static("tailscale-user-name");

/// The forward-auth handler. Answers with status only plus trust headers;
/// bodies stay empty so daemon detail never leaks to the caller.
pub async fn authorize(
    State(resolver): State<Arc<OriginResolver>>,
    connect_info: Result<ConnectInfo<SocketAddr>, ExtensionRejection>,
    headers: HeaderMap,
) -> Response {
    let Ok(ConnectInfo(remote_addr)) = connect_info else {
        let err = DomainError::invalid_origin("request carries no connect info");
        tracing::error!(error = %err, "cannot establish socket origin");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let origin = InboundOrigin {
        remote_addr,
        host: header_str(&headers, &header::HOST),
        forwarded_for: headers
            .get(&X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    };

    info!(remote = %origin.remote_addr, host = %origin.host, client = origin.client_addr(), "forward-auth request");

    let decision = resolver.resolve(&origin).await;
    decision_response(resolver.policy(), &origin, decision)
}

fn header_str(headers: &HeaderMap, name: &HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

fn decision_response(
    policy: &OriginPolicy,
    origin: &InboundOrigin,
    decision: AuthDecision,
) -> Response {
    match decision {
        AuthDecision::Identified(profile) => identified_response(policy, &profile),
        AuthDecision::Anonymous => anonymous_response(origin),
        AuthDecision::Denied => StatusCode::FORBIDDEN.into_response(),
        AuthDecision::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// 204 with identity headers in the scheme the policy mode dictates.
fn identified_response(policy: &OriginPolicy, profile: &UserProfile) -> Response {
    let mut builder = Response::builder().status(StatusCode::NO_CONTENT);

    match policy {
        OriginPolicy::AllowList(_) => {
            builder = builder
                .header(TSAUTH_ID, profile.id.to_string())
                .header(TSAUTH_NAME, profile.display_name.as_str());
            if !profile.profile_pic_url.is_empty() {
                builder = builder.header(TSAUTH_AVATAR, profile.profile_pic_url.as_str());
            }
        }
        OriginPolicy::SkipOrigin(_) => {
            builder = builder
                .header(TAILSCALE_USER_LOGIN, profile.login_name.as_str())
                .header(TAILSCALE_USER_NAME, profile.display_name.as_str());
        }
    }

    finish(builder)
}

/// 204 for a skip-range caller: login header carries the raw socket
/// address, name is the fixed "anonymous".
fn anonymous_response(origin: &InboundOrigin) -> Response {
    let builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(TAILSCALE_USER_LOGIN, origin.remote_addr.to_string())
        .header(TAILSCALE_USER_NAME, "anonymous");
    finish(builder)
}

fn finish(builder: axum::http::response::Builder) -> Response {
    match builder.body(axum::body::Body::empty()) {
        Ok(response) => response,
        Err(e) => {
            // A profile field that is not a valid header value is as good
            // as a malformed daemon response.
            tracing::error!(error = %e, "identity produced unencodable trust headers");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
