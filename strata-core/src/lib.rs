//! # Strata Core
//!
//! This crate provides the fundamental building blocks for Strata:
//! - The `Event` record type
//! - Error types
//! - Configuration
//! - Metrics collection
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  strata-core                    │
//! ├─────────────────────────────────────────────────┤
//! │  • event      - Event record type              │
//! │  • error      - Error handling                 │
//! │  • config     - Configuration                  │
//! │  • metrics    - Counters for monitoring        │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;

// Re-export commonly used types
pub use config::StoreConfig;
pub use error::{Error, Result};
pub use event::Event;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
