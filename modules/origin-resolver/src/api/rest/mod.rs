//! REST surface: one method-agnostic route answering the reverse proxy's
//! forward-auth subrequests.

pub mod handlers;
pub mod routes;

pub use routes::router;
