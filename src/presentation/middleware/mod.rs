//! Middleware
//!
//! Tower middleware for request processing.

pub mod auth;
pub mod cors;
pub mod logging;

pub use auth::{auth_middleware, authenticate_token, AuthUser, Claims, ACCESS_TOKEN_COOKIE};
pub use cors::create_cors_layer;
pub use logging::{create_trace_layer, track_metrics};
