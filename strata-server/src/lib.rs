//! # Strata Server
//!
//! Collaborator surfaces around the storage core:
//! - `server`    - HTTP ingestion and query endpoints (axum)
//! - `ratelimit` - process-level token-bucket rate limiting middleware
//! - `breaker`   - circuit breaker for outbound publish calls
//! - `bus`       - publisher/consumer seam toward an external message bus

pub mod breaker;
pub mod bus;
pub mod ratelimit;
pub mod server;

pub use breaker::{BreakerConfig, CircuitBreaker};
pub use bus::{BreakerPublisher, MessageSource, Publisher};
pub use ratelimit::RateLimiter;
pub use server::{create_router, AppState, EventDto};
