//! Training configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Training configuration
///
/// `max_sentence`, `n_class`, and the embedding dimensionality are derived
/// from loaded data, never configured here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Hidden state size of the recurrent cell
    pub hidden_size: usize,
    /// Optimizer learning rate
    pub learning_rate: f32,
    /// Mini-batch size
    pub batch_size: usize,
    /// Number of training epochs
    pub epochs: usize,
    /// Dropout keep-probability on the encoder output, in (0, 1]
    pub dropout_keep_prob: f32,
    /// L2 regularization strength λ
    pub l2_reg_strength: f32,
    /// Report training loss every N steps
    pub log_interval: usize,
    /// Optional global-norm gradient clipping
    pub max_grad_norm: Option<f32>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            hidden_size: 100,
            learning_rate: 1e-3,
            batch_size: 32,
            epochs: 10,
            dropout_keep_prob: 0.5,
            l2_reg_strength: 1e-4,
            log_interval: 50,
            max_grad_norm: None,
        }
    }
}

impl TrainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_dropout_keep_prob(mut self, keep_prob: f32) -> Self {
        self.dropout_keep_prob = keep_prob;
        self
    }

    pub fn with_l2_reg_strength(mut self, l2: f32) -> Self {
        self.l2_reg_strength = l2;
        self
    }

    pub fn with_log_interval(mut self, interval: usize) -> Self {
        self.log_interval = interval;
        self
    }

    pub fn with_grad_clip(mut self, max_norm: f32) -> Self {
        self.max_grad_norm = Some(max_norm);
        self
    }

    /// Check every option against its documented domain
    pub fn validate(&self) -> Result<()> {
        if self.hidden_size == 0 {
            return Err(Error::InvalidConfig("hidden_size must be > 0".into()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig("learning_rate must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".into()));
        }
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be >= 1".into()));
        }
        if !(self.dropout_keep_prob > 0.0 && self.dropout_keep_prob <= 1.0) {
            return Err(Error::InvalidConfig(
                "dropout_keep_prob must be in (0, 1]".into(),
            ));
        }
        if !(self.l2_reg_strength >= 0.0) {
            return Err(Error::InvalidConfig("l2_reg_strength must be >= 0".into()));
        }
        if self.log_interval == 0 {
            return Err(Error::InvalidConfig("log_interval must be > 0".into()));
        }
        if let Some(max_norm) = self.max_grad_norm {
            if !(max_norm > 0.0) {
                return Err(Error::InvalidConfig("max_grad_norm must be > 0".into()));
            }
        }
        Ok(())
    }
}
