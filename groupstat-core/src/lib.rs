//! # groupstat-core
//!
//! Core library for groupstat - daily statistics reports for group chats.
//!
//! This library provides:
//! - Chat message model decoded from OneBot v11 records
//! - Analyzer framework, registry and the single-pass analysis engine
//! - Chat-history windowing over a paginated history API
//! - Rendering, identity and avatar collaborators with built-in implementations
//! - Configuration, logging and the scheduled report service
//!
//! ## Architecture
//!
//! A report flows through four stages:
//! - **Window:** page back through group history until the time range is covered
//! - **Analyze:** every registered analyzer sees every message exactly once
//! - **Collect:** rankings get names and avatars, charts go to scratch storage
//! - **Render:** the report is composed into image frames (retried as a whole)
//!
//! ## Example
//!
//! ```rust,no_run
//! use groupstat_core::{Config, ReportService};
//!
//! # async fn run() -> groupstat_core::Result<()> {
//! let config = Config::load()?;
//! let (service, _client) = ReportService::connect(config)?;
//! let report = service.run("123456", "23:00", 1440).await?;
//! println!("{} frames", report.frames.len());
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{AnalysisEngine, Analyzer, RenderedReport};
pub use config::Config;
pub use error::{Error, Result};
pub use service::ReportService;
pub use types::*;

// Public modules
pub mod analytics;
pub mod avatar;
pub mod config;
pub mod enrich;
pub mod error;
pub mod format;
pub mod history;
pub mod logging;
pub mod onebot;
pub mod render;
pub mod schedule;
pub mod segment;
pub mod service;
pub mod types;
