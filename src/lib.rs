//! Project Dashboard Library
//!
//! Core store, services and HTTP surface of the project dashboard, exported
//! for the binary and for integration tests.

pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod logging;
pub mod services;
pub mod signal;
pub mod store;
pub mod types;
pub mod widgets;
