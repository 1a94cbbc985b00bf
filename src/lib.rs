//! EquiLend School Equipment Lending System
//!
//! A Rust implementation of the EquiLend server, providing a REST JSON API
//! for managing an equipment catalog and the borrow-request lifecycle. The
//! reservation engine guarantees that units in circulation never exceed
//! what exists, under concurrent approvals.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
