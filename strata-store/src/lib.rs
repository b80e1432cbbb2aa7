//! # Strata Storage Engine
//!
//! LSM-style event storage engine optimized for high write throughput.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Write Path                              │
//! │                                                              │
//! │  put(event) ──> WAL (durable) ──> MemTable                  │
//! │                                      │ full                  │
//! │                                      ▼                       │
//! │                      Segment + sidecar index                 │
//! │                      Manifest update (rename)                │
//! │                      WAL truncate                            │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Read Path                               │
//! │                                                              │
//! │  get(key)  ──> MemTable ──> Segments (newest first)         │
//! │  replay(a,b) > MemTable + every segment, sorted by (ts,key) │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## On-disk layout
//!
//! ```text
//! <data_dir>/
//!   manifest.json           { "segments": ["000001.sst", ...] }
//!   wal.log                 newline-delimited JSON events
//!   sst/
//!     NNNNNN.sst            "SST1\n" header, then key\tts\tbase64(value) lines
//!     NNNNNN.sst.index.json { "offsets": { "<key>": <offset>, ... } }
//! ```

pub mod manifest;
pub mod memtable;
pub mod sstable;
pub mod store;
pub mod wal;

pub use manifest::Manifest;
pub use memtable::Memtable;
pub use store::Store;
pub use wal::Wal;
