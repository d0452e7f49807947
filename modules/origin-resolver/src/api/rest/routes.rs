use std::sync::Arc;

use axum::Router;

use crate::api::rest::handlers;
use crate::domain::OriginResolver;

/// Build the adapter router. Every path and method lands on the same
/// authorization handler; the proxy decides which requests to send here.
pub fn router(resolver: Arc<OriginResolver>) -> Router {
    Router::new()
        .fallback(handlers::authorize)
        .with_state(resolver)
}
