//! # Shellac Server
//!
//! HTTP adapter for the album catalog. Handlers validate input shape, invoke
//! the repository, and translate catalog outcomes into transport responses;
//! all domain logic lives in `shellac-core`.

pub mod handlers;
pub mod infra;
pub mod routes;
