//! # Segments (SSTables)
//!
//! Immutable on-disk files produced by memtable flushes and never modified
//! afterwards. A segment holds its events sorted ascending by key, one per
//! line:
//!
//! ```text
//! SST1\n
//! <key>\t<ts>\t<base64(value)>\n
//! ...
//! ```
//!
//! A sidecar `<segment>.index.json` maps each key to the byte offset of its
//! record line, so point lookups are one seek and one line read. Keys never
//! contain the delimiters; [`Event::validate`] rejects them at the door.
//!
//! A final line without a trailing newline is accepted: a record is complete
//! once its three fields decode.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use strata_core::error::{Error, Result};
use strata_core::Event;

const SEGMENT_MAGIC: &[u8] = b"SST1\n";

/// Sidecar index: key -> byte offset of the record line in the segment file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SegmentIndex {
    offsets: HashMap<String, u64>,
}

/// Path of the sidecar index belonging to a segment file.
pub fn index_path(segment: &Path) -> PathBuf {
    let mut name = segment.as_os_str().to_os_string();
    name.push(".index.json");
    PathBuf::from(name)
}

/// Write a segment and its sidecar index.
///
/// `events` must already be sorted ascending by key. Both files are synced
/// before returning: the flush sequence relies on the segment being durable
/// before the manifest references it.
pub fn write(path: &Path, events: &[Event]) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::Io {
        message: format!("failed to create segment at {:?}", path),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);

    writer.write_all(SEGMENT_MAGIC)?;
    let mut offset = SEGMENT_MAGIC.len() as u64;

    let mut index = SegmentIndex {
        offsets: HashMap::with_capacity(events.len()),
    };
    for event in events {
        let line = encode_line(event);
        index.offsets.insert(event.key.clone(), offset);
        offset += line.len() as u64;
        writer.write_all(line.as_bytes())?;
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;

    let sidecar = serde_json::to_vec(&index).map_err(|e| Error::Segment {
        message: "failed to serialize segment index".to_string(),
        source: Some(Box::new(e)),
    })?;
    let mut index_file = File::create(index_path(path))?;
    index_file.write_all(&sidecar)?;
    index_file.sync_all()?;

    debug!(segment = ?path, records = events.len(), "wrote segment");
    Ok(())
}

/// Point lookup through the sidecar index.
///
/// A missing sidecar is an I/O error; a key absent from the index is simply
/// not found.
pub fn get(path: &Path, key: &str) -> Result<Option<Event>> {
    let raw = std::fs::read(index_path(path)).map_err(|e| Error::Io {
        message: format!("failed to read segment index for {:?}", path),
        source: e,
    })?;
    let index: SegmentIndex = serde_json::from_slice(&raw).map_err(|e| Error::Corrupt {
        message: format!("unreadable segment index for {:?}: {}", path, e),
    })?;

    let Some(&offset) = index.offsets.get(key) else {
        return Ok(None);
    };

    let mut file = File::open(path).map_err(|e| Error::Io {
        message: format!("failed to open segment at {:?}", path),
        source: e,
    })?;
    file.seek(SeekFrom::Start(offset))?;

    let mut reader = BufReader::new(file);
    let mut line = String::new();
    reader.read_line(&mut line)?;

    match decode_line(&line) {
        Some(event) => Ok(Some(event)),
        None => Err(Error::Corrupt {
            message: format!("undecodable record at offset {} in {:?}", offset, path),
        }),
    }
}

/// Sequential scan yielding every record with `from <= ts <= to`.
///
/// Malformed lines are skipped. The result is in file order; the store sorts
/// across all sources.
pub fn scan_range(path: &Path, from: i64, to: i64) -> Result<Vec<Event>> {
    let file = File::open(path).map_err(|e| Error::Io {
        message: format!("failed to open segment at {:?}", path),
        source: e,
    })?;
    let mut reader = BufReader::new(file);

    let mut header = [0u8; SEGMENT_MAGIC.len()];
    std::io::Read::read_exact(&mut reader, &mut header)?;
    if header != SEGMENT_MAGIC {
        return Err(Error::Corrupt {
            message: format!("bad segment magic in {:?}", path),
        });
    }

    let mut out = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        match decode_line(&line) {
            Some(event) => {
                if event.ts >= from && event.ts <= to {
                    out.push(event);
                }
            }
            None => debug!(segment = ?path, "skipping malformed segment record"),
        }
    }
    Ok(out)
}

fn encode_line(event: &Event) -> String {
    format!(
        "{}\t{}\t{}\n",
        event.key,
        event.ts,
        STANDARD.encode(&event.value)
    )
}

/// Decode one record line; `None` for anything malformed.
fn decode_line(line: &str) -> Option<Event> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let mut parts = line.splitn(3, '\t');
    let key = parts.next()?;
    let ts: i64 = parts.next()?.parse().ok()?;
    let value = STANDARD.decode(parts.next()?).ok()?;
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some(Event {
        key: key.to_string(),
        ts,
        value: Bytes::from(value),
    })
}
