//! # Write-Ahead Log
//!
//! A single append-only file making writes durable before they reach the
//! memtable. Records are newline-delimited JSON serializations of [`Event`]
//! (values base64-encoded), so they round-trip losslessly and recovery can
//! skip individual damaged lines without giving up on the rest of the log.
//!
//! The WAL holds everything written since the last successful flush; its
//! contents plus the live memtable are always equivalent under upsert
//! semantics. After a flush persists the memtable as a segment, the log is
//! truncated back to zero via [`Wal::rotate`].
//!
//! The internal mutex guards direct use; in practice every mutating call
//! happens under the store's exclusive lock.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use strata_core::error::{Error, Result};
use strata_core::Event;

pub struct Wal {
    inner: Mutex<WalInner>,
    path: PathBuf,
}

struct WalInner {
    writer: BufWriter<File>,
}

impl Wal {
    /// Open (or create) the log at `path`, positioned for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| Error::Io {
                message: format!("failed to open WAL at {:?}", path),
                source: e,
            })?;
        file.seek(SeekFrom::End(0))?;

        Ok(Self {
            inner: Mutex::new(WalInner {
                writer: BufWriter::new(file),
            }),
            path,
        })
    }

    /// Append one event and flush user-space buffers before returning.
    ///
    /// Returns the number of bytes written, for accounting.
    pub fn append(&self, event: &Event) -> Result<u64> {
        let mut line = serde_json::to_vec(event).map_err(|e| Error::WriteAheadLog {
            message: "failed to serialize event".to_string(),
            source: Some(Box::new(e)),
        })?;
        line.push(b'\n');

        let mut inner = self.inner.lock();
        inner.writer.write_all(&line)?;
        inner.writer.flush()?;
        Ok(line.len() as u64)
    }

    /// Scan the log from the start, invoking `emit` for each well-formed
    /// record with a non-empty key. Malformed lines are skipped; corruption
    /// never aborts a replay.
    ///
    /// Returns the number of records emitted.
    pub fn replay(&self, mut emit: impl FnMut(Event)) -> Result<usize> {
        let _guard = self.inner.lock();

        let file = File::open(&self.path).map_err(|e| Error::Io {
            message: format!("failed to open WAL for replay at {:?}", self.path),
            source: e,
        })?;
        let reader = BufReader::new(file);

        let mut emitted = 0;
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                // Non-UTF-8 garbage: the damaged line is consumed, keep going.
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    debug!("skipping non-UTF-8 WAL line: {}", e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Event>(&line) {
                Ok(event) if !event.key.is_empty() => {
                    emit(event);
                    emitted += 1;
                }
                Ok(_) => debug!("skipping WAL record with empty key"),
                Err(e) => debug!("skipping malformed WAL record: {}", e),
            }
        }

        if emitted > 0 {
            info!(records = emitted, "replayed WAL");
        }
        Ok(emitted)
    }

    /// Truncate the log to zero length and reposition at the start.
    ///
    /// Must only be called while no writer can concurrently append, i.e.
    /// under the store's exclusive lock.
    pub fn rotate(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;
        inner.writer.get_ref().set_len(0)?;
        inner.writer.get_mut().seek(SeekFrom::Start(0))?;
        debug!("rotated WAL at {:?}", self.path);
        Ok(())
    }

    /// Flush buffered records and force them to stable storage.
    pub fn sync(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;
        inner.writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Flush and release the log.
    pub fn close(&self) -> Result<()> {
        self.sync()
    }

    /// Current length in bytes. Test and diagnostics helper.
    pub fn len(&self) -> Result<u64> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;
        Ok(inner.writer.get_ref().metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn event(key: &str, ts: i64, value: &str) -> Event {
        Event::new(key, ts, value.as_bytes().to_vec())
    }

    #[test]
    fn test_append_and_replay() {
        let dir = TempDir::new().unwrap();
        let wal = Wal::open(dir.path().join("wal.log")).unwrap();

        wal.append(&event("a", 1, "one")).unwrap();
        wal.append(&event("b", 2, "two")).unwrap();

        let mut seen = Vec::new();
        let count = wal.replay(|e| seen.push(e)).unwrap();
        assert_eq!(count, 2);
        assert_eq!(seen[0], event("a", 1, "one"));
        assert_eq!(seen[1], event("b", 2, "two"));
    }

    #[test]
    fn test_replay_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wal.log");

        {
            let wal = Wal::open(&path).unwrap();
            wal.append(&event("a", 1, "one")).unwrap();
            wal.close().unwrap();
        }

        let wal = Wal::open(&path).unwrap();
        // Appends after reopen land after the existing records.
        wal.append(&event("b", 2, "two")).unwrap();

        let mut seen = Vec::new();
        wal.replay(|e| seen.push(e)).unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].key, "a");
        assert_eq!(seen[1].key, "b");
    }

    #[test]
    fn test_replay_skips_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wal.log");

        let wal = Wal::open(&path).unwrap();
        wal.append(&event("a", 1, "one")).unwrap();

        // Splice garbage between two valid records.
        {
            use std::io::Write as _;
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(b"{not json}\n").unwrap();
            file.write_all(b"\xff\xfe\xfd\n").unwrap();
        }
        wal.append(&event("b", 2, "two")).unwrap();

        let mut seen = Vec::new();
        let count = wal.replay(|e| seen.push(e)).unwrap();
        assert_eq!(count, 2);
        assert_eq!(seen[0].key, "a");
        assert_eq!(seen[1].key, "b");
    }

    #[test]
    fn test_rotate_truncates() {
        let dir = TempDir::new().unwrap();
        let wal = Wal::open(dir.path().join("wal.log")).unwrap();

        wal.append(&event("a", 1, "one")).unwrap();
        assert!(!wal.is_empty().unwrap());

        wal.rotate().unwrap();
        assert!(wal.is_empty().unwrap());
        assert_eq!(wal.replay(|_| {}).unwrap(), 0);

        // Still usable after rotation.
        wal.append(&event("b", 2, "two")).unwrap();
        let mut seen = Vec::new();
        wal.replay(|e| seen.push(e)).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].key, "b");
    }
}
