//! Judging desk service
//!
//! HTTP front end over the adjudication core:
//! - `api`: axum routes for scorecard submission, status, detail and recovery
//! - `challonge`: bracket reporter for Challonge-style v1 hosts
//! - `config`: environment-driven server configuration

pub mod api;
pub mod challonge;
pub mod config;

pub use api::{router, ApiError, AppState};
pub use challonge::ChallongeReporter;
pub use config::{ChallongeConfig, ServerConfig, StoreBackend};
