//! Training loop
//!
//! Loss, evaluation metric, configuration, and the epoch-driving trainer.
//!
//! # Example
//!
//! ```no_run
//! use valorar::data::SequenceDataset;
//! use valorar::checkpoint::MemorySink;
//! use valorar::model::{Embedding, SequenceRegressor};
//! use valorar::optim::Adam;
//! use valorar::train::{TrainConfig, Trainer};
//!
//! # fn run(dataset: SequenceDataset, table: Vec<Vec<f32>>) -> valorar::Result<()> {
//! let config = TrainConfig::new().with_hidden_size(64).with_epochs(20);
//! let embedding = Embedding::from_pretrained(&table)?;
//! let model = SequenceRegressor::new(
//!     embedding,
//!     config.hidden_size,
//!     dataset.n_class(),
//!     dataset.max_sentence(),
//!     &mut rand::rng(),
//! )?;
//!
//! let optimizer = Adam::default_params(config.learning_rate);
//! let mut trainer = Trainer::new(model, Box::new(optimizer), config)?;
//!
//! let mut sink = MemorySink::new();
//! let result = trainer.fit(&dataset, &mut sink)?;
//! println!("best dev MSE: {:.4}", result.best_dev_mse);
//! # Ok(())
//! # }
//! ```

mod batch;
mod config;
mod loss;
mod metrics;
mod trainer;

pub use batch::Batch;
pub use config::TrainConfig;
pub use loss::{RegularizedSquaredError, DEFAULT_PREDICTION_SCALE};
pub use metrics::{Metric, SquaredError};
pub use trainer::{EpochReport, FitResult, ModelSelector, Trainer};
