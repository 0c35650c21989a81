//! Parameter snapshots and persistence sinks
//!
//! The trainer creates a [`Checkpoint`] only when the dev MSE strictly
//! improves on the best value seen, and hands it to a [`CheckpointSink`].
//! The on-disk format beyond the JSON sink is a collaborator concern.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Snapshot of all trainable parameters at a selection point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Epoch that produced this snapshot (0-based)
    pub epoch: usize,
    /// Dev MSE that triggered the save
    pub dev_mse: f32,
    /// Named parameter values, flattened row-major
    pub tensors: Vec<(String, Vec<f32>)>,
}

impl Checkpoint {
    /// Values of a named parameter, if present
    pub fn tensor(&self, name: &str) -> Option<&[f32]> {
        self.tensors
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }
}

/// Destination for checkpoints selected by the trainer
pub trait CheckpointSink {
    fn save(&mut self, checkpoint: &Checkpoint) -> Result<()>;
}

/// In-memory sink, keeping every snapshot in save order
#[derive(Default)]
pub struct MemorySink {
    pub saved: Vec<Checkpoint>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent snapshot, which is always the best-so-far one
    pub fn latest(&self) -> Option<&Checkpoint> {
        self.saved.last()
    }
}

impl CheckpointSink for MemorySink {
    fn save(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        self.saved.push(checkpoint.clone());
        Ok(())
    }
}

/// JSON file sink; each save overwrites the previous best
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Read back the last saved snapshot
    pub fn load(&self) -> Result<Checkpoint> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::Checkpoint(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| Error::Checkpoint(e.to_string()))
    }
}

impl CheckpointSink for JsonFileSink {
    fn save(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        let json = serde_json::to_string(checkpoint).map_err(|e| Error::Checkpoint(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| Error::Checkpoint(e.to_string()))
    }
}
