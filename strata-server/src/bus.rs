//! # Bus Bridge
//!
//! Interface-level seam toward an external message bus. The core never
//! depends on a concrete bus client: outbound publishing goes through the
//! [`Publisher`] trait (usually wrapped in a [`BreakerPublisher`]), and
//! inbound ingestion drains any [`MessageSource`] of JSON event payloads.
//!
//! Redelivery is harmless: `put` is an upsert keyed by `(key, ts)`, so the
//! consumer is idempotent by construction.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use strata_store::Store;

use crate::breaker::{BreakerConfig, CallError, CircuitBreaker};
use crate::server::{dto_to_event, EventDto};

pub type PublishError = Box<dyn std::error::Error + Send + Sync>;

/// Outbound side of the bridge.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, payload: &[u8]) -> Result<(), PublishError>;
}

/// Inbound side: a stream of raw payloads from the bus. `None` ends the
/// bridge.
#[async_trait]
pub trait MessageSource: Send {
    async fn next(&mut self) -> Option<Vec<u8>>;
}

/// [`Publisher`] decorator routing every publish through a circuit breaker.
pub struct BreakerPublisher<P> {
    inner: P,
    breaker: CircuitBreaker,
}

impl<P: Publisher> BreakerPublisher<P> {
    pub fn new(inner: P) -> Self {
        Self::with_config(inner, BreakerConfig::default())
    }

    pub fn with_config(inner: P, config: BreakerConfig) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new(config),
        }
    }
}

#[async_trait]
impl<P: Publisher> Publisher for BreakerPublisher<P> {
    async fn publish(&self, payload: &[u8]) -> Result<(), PublishError> {
        match self.breaker.call(|| self.inner.publish(payload)).await {
            Ok(()) => Ok(()),
            Err(CallError::Rejected(e)) => Err(Box::new(e)),
            Err(CallError::Inner(e)) => Err(e),
        }
    }
}

/// Drain `source` into the store. Undecodable payloads and failed puts are
/// logged and skipped; the bridge never dies on a bad message.
///
/// Returns the number of events applied.
pub async fn run_consumer<S: MessageSource>(mut source: S, store: Arc<Store>) -> usize {
    let mut applied = 0usize;

    while let Some(payload) = source.next().await {
        let dto: EventDto = match serde_json::from_slice(&payload) {
            Ok(dto) => dto,
            Err(e) => {
                warn!(error = %e, "skipping undecodable bus payload");
                continue;
            }
        };
        match store.put(dto_to_event(&dto)).await {
            Ok(()) => applied += 1,
            Err(e) => warn!(key = %dto.key, error = %e, "failed to apply bus event"),
        }
    }

    info!(applied, "bus consumer drained");
    applied
}
