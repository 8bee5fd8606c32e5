//! HTTP Layer
//!
//! REST routes and request handlers.

pub mod handlers;
pub mod routes;
