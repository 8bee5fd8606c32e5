//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Database repositories (PostgreSQL)
//! - Local-disk attachment storage
//! - Prometheus metrics

pub mod database;
pub mod metrics;
pub mod repositories;
pub mod storage;
