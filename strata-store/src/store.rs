//! # Store
//!
//! The coordinator owning the memtable, the WAL and the manifest, and the
//! only component that touches more than one of them at a time.
//!
//! ## Lock discipline
//!
//! A single reader/writer lock serializes all writers:
//!
//! - `put` and `close` hold the exclusive lock end to end, including any
//!   flush they trigger.
//! - `get` and `replay` hold the shared lock only long enough to probe the
//!   memtable and snapshot the segment list; segment file I/O happens with
//!   no store lock held.
//!
//! ## Flush ordering
//!
//! 1. Snapshot the memtable sorted by key (empty snapshot: no-op).
//! 2. Write the segment and its sidecar index, synced.
//! 3. Append the name to the manifest and persist it via rename.
//! 4. Rotate (truncate) the WAL.
//! 5. Clear the memtable.
//!
//! The segment is durable before the manifest references it, and the
//! manifest references it before the WAL is truncated. A crash at any point
//! leaves either the WAL or the manifest holding every acknowledged event;
//! at worst an unreferenced segment file is left behind, which recovery
//! ignores.

use std::path::PathBuf;

use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use strata_core::config::StoreConfig;
use strata_core::error::{Error, Result};
use strata_core::metrics::Metrics;
use strata_core::Event;

use crate::manifest::Manifest;
use crate::memtable::{sort_by_ts, Memtable};
use crate::sstable;
use crate::wal::Wal;

/// Bound of the replay output channel; the consumer applies backpressure
/// through it.
const REPLAY_CHANNEL_CAPACITY: usize = 128;

pub struct Store {
    sst_dir: PathBuf,
    manifest_path: PathBuf,
    state: RwLock<StoreState>,
    metrics: Metrics,
}

struct StoreState {
    mem: Memtable,
    wal: Wal,
    manifest: Manifest,
}

impl Store {
    /// Open the store at `config.data_dir`, creating the directory layout on
    /// first use and replaying any WAL records left over from a crash.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        let config = config.validated()?;

        let sst_dir = config.data_dir.join("sst");
        std::fs::create_dir_all(&sst_dir).map_err(|e| Error::Io {
            message: format!("failed to create segment directory at {:?}", sst_dir),
            source: e,
        })?;

        let manifest_path = config.data_dir.join("manifest.json");
        let manifest = Manifest::load_or_create(&manifest_path)?;

        let wal = Wal::open(config.data_dir.join("wal.log"))?;
        let mut mem = Memtable::new(config.memtable_max_items);

        // Recovery: every record still in the WAL belongs in the memtable.
        // Records that also made it into a segment before the crash are
        // re-accepted harmlessly by upsert.
        let recovered = wal.replay(|event| mem.upsert(event))?;
        info!(
            data_dir = ?config.data_dir,
            segments = manifest.segments().len(),
            recovered,
            "opened store"
        );

        Ok(Self {
            sst_dir,
            manifest_path,
            state: RwLock::new(StoreState { mem, wal, manifest }),
            metrics: Metrics::new(),
        })
    }

    /// Durably append one event.
    ///
    /// The WAL append completes before the memtable changes, so a failed
    /// append leaves no trace. A full memtable is flushed before returning.
    pub async fn put(&self, event: Event) -> Result<()> {
        if let Err(e) = event.validate() {
            self.metrics.record_put_error();
            return Err(e);
        }

        let mut state = self.state.write().await;

        let bytes = state.wal.append(&event)?;
        self.metrics.record_wal_append(bytes);

        state.mem.upsert(event);

        if state.mem.full() {
            self.flush_locked(&mut state)?;
        }

        self.metrics.record_put();
        Ok(())
    }

    /// Point lookup: memtable first, then segments newest to oldest.
    pub async fn get(&self, key: &str) -> Result<Option<Event>> {
        self.metrics.record_get();

        let segments = {
            let state = self.state.read().await;
            if let Some(event) = state.mem.get(key) {
                return Ok(Some(event.clone()));
            }
            state.manifest.segments().to_vec()
        };

        for name in segments.iter().rev() {
            self.metrics.record_segment_read();
            if let Some(event) = sstable::get(&self.sst_dir.join(name), key)? {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    /// Stream every stored event with `from <= ts <= to`, ascending by
    /// `(ts, key)`.
    ///
    /// The stream is a point-in-time snapshot: memtable matches and the
    /// segment list are captured before this returns; later writes may or may
    /// not appear. Dropping the receiver cancels the producer at its next
    /// send.
    pub async fn replay(&self, from: i64, to: i64) -> Result<mpsc::Receiver<Event>> {
        if from > to {
            return Err(Error::InvalidRange { from, to });
        }
        self.metrics.record_replay();

        let (mut all, segments) = {
            let state = self.state.read().await;
            (
                state.mem.range_by_ts(from, to),
                state.manifest.segments().to_vec(),
            )
        };

        let (tx, rx) = mpsc::channel(REPLAY_CHANNEL_CAPACITY);
        let sst_dir = self.sst_dir.clone();

        tokio::spawn(async move {
            for name in &segments {
                match sstable::scan_range(&sst_dir.join(name), from, to) {
                    Ok(events) => all.extend(events),
                    Err(e) => warn!(segment = %name, error = %e, "skipping segment during replay"),
                }
            }
            sort_by_ts(&mut all);

            for event in all {
                if tx.send(event).await.is_err() {
                    // Receiver dropped: the caller cancelled.
                    return;
                }
            }
        });

        Ok(rx)
    }

    /// Flush any buffered state and close the WAL.
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.mem.is_empty() {
            self.flush_locked(&mut state)?;
        }
        state.wal.close()
    }

    /// Force a flush regardless of memtable fill. An empty memtable is a
    /// no-op and produces no segment.
    pub async fn flush(&self) -> Result<()> {
        let mut state = self.state.write().await;
        self.flush_locked(&mut state)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn flush_locked(&self, state: &mut StoreState) -> Result<()> {
        let items = state.mem.snapshot_sorted_by_key();
        if items.is_empty() {
            return Ok(());
        }

        let name = state.manifest.next_name();
        sstable::write(&self.sst_dir.join(&name), &items)?;

        state.manifest.add(name.clone());
        state.manifest.save(&self.manifest_path)?;

        state.wal.rotate()?;
        state.mem.clear();

        self.metrics.record_flush();
        info!(segment = %name, records = items.len(), "flushed memtable");
        Ok(())
    }
}
