//! Library crate for clicker-back, exposing modules for binaries and integration tests.

/// Runtime configuration loading.
pub mod config;
/// Score storage contract and backends.
pub mod dao;
mod dto;
mod error;
/// HTTP route trees.
pub mod routes;
/// Application services: scores, events, announcements.
pub mod services;
/// Shared application state.
pub mod state;
