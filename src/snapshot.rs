//! Schema-versioned persistence of the chain state.
//!
//! A [`StateBlob`] wraps a [`ChainState`] with its schema tag, the chain time
//! at capture and a BLAKE2b-256 digest over the canonical JSON encoding of
//! the state. Receive hooks and the oracle adapter are runtime wiring and are
//! not persisted; the sweep marker is never set between transactions.

use crate::chain::{Chain, ChainState};
use crate::oracle::PriceOracle;
use blake2::digest::{consts::U32, Digest};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Schema tag written into every blob.
pub const STATE_SCHEMA: &str = "fee-ledger.state.v1";

type Blake2b256 = blake2::Blake2b<U32>;

/// Errors raised while capturing, writing or reading a state blob.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    /// Filesystem failure.
    Io(String),
    #[error("snapshot encoding error: {0}")]
    /// JSON encode or decode failure.
    Encoding(String),
    #[error("unsupported snapshot schema: {0}")]
    /// The blob was written by an unknown schema version.
    InvalidSchema(String),
    #[error("snapshot digest mismatch: expected {expected}, computed {computed}")]
    /// The state does not hash to the recorded digest.
    DigestMismatch {
        /// Digest stored in the blob.
        expected: String,
        /// Digest of the decoded state.
        computed: String,
    },
}

/// Persisted chain state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBlob {
    /// Schema identifier (`fee-ledger.state.v1`).
    pub schema: String,
    /// Chain time when the blob was captured.
    pub timestamp: u64,
    /// Hex BLAKE2b-256 digest of the encoded state.
    pub digest: String,
    /// The captured state.
    pub state: ChainState,
}

fn state_digest(state: &ChainState) -> Result<String, SnapshotError> {
    let encoded =
        serde_json::to_vec(state).map_err(|err| SnapshotError::Encoding(err.to_string()))?;
    let mut hasher = Blake2b256::new();
    hasher.update(&encoded);
    Ok(hex::encode(hasher.finalize()))
}

impl StateBlob {
    /// Captures `state` at `timestamp`.
    pub fn capture(state: &ChainState, timestamp: u64) -> Result<Self, SnapshotError> {
        Ok(Self {
            schema: STATE_SCHEMA.to_string(),
            timestamp,
            digest: state_digest(state)?,
            state: state.clone(),
        })
    }

    /// Checks the schema tag and the digest.
    pub fn verify(&self) -> Result<(), SnapshotError> {
        if self.schema != STATE_SCHEMA {
            return Err(SnapshotError::InvalidSchema(self.schema.clone()));
        }
        let computed = state_digest(&self.state)?;
        if computed != self.digest {
            return Err(SnapshotError::DigestMismatch {
                expected: self.digest.clone(),
                computed,
            });
        }
        Ok(())
    }
}

/// Upgrades a decoded blob to [`STATE_SCHEMA`].
///
/// Only `fee-ledger.state.v1` exists so far, which passes through unchanged.
/// Older layouts get an arm here that rewrites `state` and re-stamps the
/// digest.
pub fn migrate(blob: StateBlob) -> Result<StateBlob, SnapshotError> {
    if blob.schema == STATE_SCHEMA {
        return Ok(blob);
    }
    Err(SnapshotError::InvalidSchema(blob.schema))
}

/// Writes `blob` to `path` through a temporary sibling file.
pub fn write_state(path: &Path, blob: &StateBlob) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| SnapshotError::Io(err.to_string()))?;
    }
    let contents = serde_json::to_string_pretty(blob)
        .map_err(|err| SnapshotError::Encoding(err.to_string()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents).map_err(|err| SnapshotError::Io(err.to_string()))?;
    fs::rename(&tmp_path, path).map_err(|err| SnapshotError::Io(err.to_string()))?;
    Ok(())
}

/// Reads a blob written by [`write_state`], migrates it to the current
/// schema and verifies it.
pub fn read_state(path: &Path) -> Result<StateBlob, SnapshotError> {
    let contents = fs::read_to_string(path).map_err(|err| SnapshotError::Io(err.to_string()))?;
    let blob: StateBlob =
        serde_json::from_str(&contents).map_err(|err| SnapshotError::Encoding(err.to_string()))?;
    let blob = migrate(blob)?;
    blob.verify()?;
    Ok(blob)
}

impl Chain {
    /// Captures the current state.
    pub fn snapshot(&self) -> Result<StateBlob, SnapshotError> {
        StateBlob::capture(self.state(), self.now())
    }

    /// Rebuilds a chain from a verified blob. Hooks must be reinstalled and
    /// the event log starts empty.
    pub fn restore(
        blob: StateBlob,
        oracle: impl PriceOracle + 'static,
    ) -> Result<Self, SnapshotError> {
        let blob = migrate(blob)?;
        blob.verify()?;
        tracing::info!(timestamp = blob.timestamp, digest = %blob.digest, "restoring chain state");
        Ok(Chain::from_state(blob.state, Box::new(oracle), blob.timestamp))
    }
}
