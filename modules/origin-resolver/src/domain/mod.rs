//! Domain layer for the origin resolver.

pub mod error;
pub mod model;
pub mod resolver;

pub use error::DomainError;
pub use model::{AuthDecision, InboundOrigin, UserProfile};
pub use resolver::{OriginPolicy, OriginResolver};
