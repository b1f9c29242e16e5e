//! MarketWatch Library
//!
//! Resolves monitored market/economic indicators into a growing CSV history
//! and summarises it for the dashboard.

pub mod config;
pub mod error;
pub mod monitoring_list;
pub mod persistence;
pub mod pipeline;
pub mod resolver;
pub mod summary;
pub mod types;

#[cfg(feature = "dashboard")]
pub mod dashboard;
