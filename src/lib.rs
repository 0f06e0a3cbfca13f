//! Liberon lending-inventory engine
//!
//! The core of the Liberon library management system: tracks how many
//! copies of a title exist and are loanable, and drives the lifecycle of
//! each loan (issue, renew, return, nightly overdue reconciliation). The
//! surrounding web layer consumes [`services::Services`]; persistence sits
//! behind the narrow traits in [`store`].

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod store;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
