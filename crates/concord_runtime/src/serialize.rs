//! Action log export and import using `MessagePack`.
//!
//! The log is written as a [`LogSnapshot`]: plain, owned copies of every
//! record with its provenance. A snapshot can be reloaded for inspection but
//! does not restore concept state.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use concord_engine::{ActionRecord, SyncEngine};
use concord_foundation::{Error, ErrorKind, Fields, Result};
use serde::{Deserialize, Serialize};

/// Provenance of an exported record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseEntry {
    /// Rule that dispatched the record.
    pub rule: String,
    /// Wave in which it fired.
    pub wave: u32,
    /// Sequence numbers of the trigger records.
    pub triggers: Vec<u64>,
}

/// One exported action record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordEntry {
    /// Sequence number.
    pub seq: u64,
    /// Flow number.
    pub flow: u64,
    /// `Concept.action`.
    pub action: String,
    /// Realized input.
    pub input: Fields,
    /// Realized output.
    pub output: Fields,
    /// `None` for submitted actions.
    pub cause: Option<CauseEntry>,
}

impl From<&ActionRecord> for RecordEntry {
    fn from(record: &ActionRecord) -> Self {
        Self {
            seq: record.seq,
            flow: record.flow.0,
            action: record.action.to_string(),
            input: record.input.clone(),
            output: record.output.clone(),
            cause: record.cause.as_ref().map(|c| CauseEntry {
                rule: c.rule.to_string(),
                wave: c.wave,
                triggers: c.triggers.clone(),
            }),
        }
    }
}

/// Every retained record of an engine, in sequence order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSnapshot {
    /// Format version.
    pub version: u32,
    /// The records.
    pub records: Vec<RecordEntry>,
}

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

impl LogSnapshot {
    /// Copies the engine's retained records.
    ///
    /// # Errors
    /// Returns an error if the engine lock is poisoned.
    pub fn capture(engine: &SyncEngine) -> Result<Self> {
        let records = engine
            .records()?
            .iter()
            .map(|r| RecordEntry::from(r.as_ref()))
            .collect();
        Ok(Self {
            version: SNAPSHOT_VERSION,
            records,
        })
    }
}

/// Serializes a snapshot to `MessagePack` bytes with named fields.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_bytes(snapshot: &LogSnapshot) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(snapshot)
        .map_err(|e| Error::new(ErrorKind::SerializationError(e.to_string())))
}

/// Deserializes a snapshot from `MessagePack` bytes.
///
/// # Errors
///
/// Returns an error if deserialization fails or the version is unsupported.
pub fn from_bytes(bytes: &[u8]) -> Result<LogSnapshot> {
    let snapshot: LogSnapshot = rmp_serde::from_slice(bytes)
        .map_err(|e| Error::new(ErrorKind::SerializationError(e.to_string())))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(Error::new(ErrorKind::SerializationError(format!(
            "unsupported snapshot version {}",
            snapshot.version
        ))));
    }
    Ok(snapshot)
}

/// Writes the engine's action log to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to,
/// or if serialization fails.
pub fn save_log<P: AsRef<Path>>(engine: &SyncEngine, path: P) -> Result<()> {
    let path = path.as_ref();
    let io_err = |what: &str, e: std::io::Error| {
        Error::new(ErrorKind::IoError(format!(
            "failed to {what} '{}': {e}",
            path.display()
        )))
    };

    let bytes = to_bytes(&LogSnapshot::capture(engine)?)?;
    let file = File::create(path).map_err(|e| io_err("create file", e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&bytes)
        .map_err(|e| io_err("write to file", e))?;
    writer.flush().map_err(|e| io_err("flush file", e))?;
    Ok(())
}

/// Reads a log snapshot from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or if deserialization fails.
pub fn load_log<P: AsRef<Path>>(path: P) -> Result<LogSnapshot> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        Error::new(ErrorKind::IoError(format!(
            "failed to open file '{}': {e}",
            path.display()
        )))
    })?;

    let mut bytes = Vec::new();
    BufReader::new(file).read_to_end(&mut bytes).map_err(|e| {
        Error::new(ErrorKind::IoError(format!(
            "failed to read file '{}': {e}",
            path.display()
        )))
    })?;

    from_bytes(&bytes)
}
