//! Training loop orchestration

use crate::checkpoint::CheckpointSink;
use crate::data::{BatchSampler, SequenceDataset};
use crate::error::{Error, Result};
use crate::model::SequenceRegressor;
use crate::optim::{clip_grad_norm, Optimizer};
use crate::train::{Batch, Metric, RegularizedSquaredError, SquaredError, TrainConfig};
use rand::Rng;

/// Best-so-far tracker for checkpoint selection.
///
/// A checkpoint is warranted exactly when the observed dev MSE strictly
/// improves on the best value seen; ties and regressions never save.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    best: f32,
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelSelector {
    pub fn new() -> Self {
        Self { best: f32::INFINITY }
    }

    /// Record a dev MSE; returns true when it improves the best
    pub fn observe(&mut self, dev_mse: f32) -> bool {
        if dev_mse < self.best {
            self.best = dev_mse;
            true
        } else {
            false
        }
    }

    pub fn best(&self) -> f32 {
        self.best
    }
}

/// Outcome of one epoch
#[derive(Debug, Clone)]
pub struct EpochReport {
    /// Epoch index (0-based)
    pub epoch: usize,
    /// Training MSE, accumulated post-update per batch (optimistic relative
    /// to the loss that drove each step)
    pub train_mse: f32,
    /// Dev MSE from the parameter-frozen pass
    pub dev_mse: f32,
    /// Whether this epoch improved the best dev MSE and saved a checkpoint
    pub checkpointed: bool,
}

/// Outcome of a full training run
#[derive(Debug, Clone)]
pub struct FitResult {
    pub epochs_run: usize,
    pub best_dev_mse: f32,
    pub checkpoints_saved: usize,
    pub reports: Vec<EpochReport>,
}

/// Orchestrates training epochs over a dataset.
///
/// Per epoch: exactly `ceil(num_train / batch_size)` update steps, each
/// followed by evaluation-metric accumulation on the same batch; then a
/// parameter-frozen dev pass (dropout disabled) whose MSE drives checkpoint
/// selection. All randomness (shuffling, dropout) uses process-global state.
pub struct Trainer {
    model: SequenceRegressor,
    optimizer: Box<dyn Optimizer>,
    loss_fn: RegularizedSquaredError,
    config: TrainConfig,
    params: Vec<crate::autograd::Tensor>,
    selector: ModelSelector,
    checkpoints_saved: usize,
}

impl std::fmt::Debug for Trainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trainer")
            .field("config", &self.config)
            .field("params", &self.params)
            .field("selector", &self.selector)
            .field("checkpoints_saved", &self.checkpoints_saved)
            .finish_non_exhaustive()
    }
}

impl Trainer {
    /// Create a trainer; the model must match the configured hidden size
    pub fn new(
        model: SequenceRegressor,
        optimizer: Box<dyn Optimizer>,
        config: TrainConfig,
    ) -> Result<Self> {
        config.validate()?;
        if model.hidden_size() != config.hidden_size {
            return Err(Error::ShapeMismatch {
                context: "model hidden size",
                expected: config.hidden_size,
                got: model.hidden_size(),
            });
        }
        let params = model.parameters();
        Ok(Self {
            model,
            optimizer,
            loss_fn: RegularizedSquaredError::default(),
            config,
            params,
            selector: ModelSelector::new(),
            checkpoints_saved: 0,
        })
    }

    pub fn model(&self) -> &SequenceRegressor {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut SequenceRegressor {
        &mut self.model
    }

    pub fn best_dev_mse(&self) -> f32 {
        self.selector.best()
    }

    fn check_targets(&self, batch: &Batch) -> Result<()> {
        let expected = batch.len() * self.model.n_class();
        if batch.targets.len() != expected {
            return Err(Error::ShapeMismatch {
                context: "batch targets",
                expected,
                got: batch.targets.len(),
            });
        }
        Ok(())
    }

    /// One parameter-update step on a batch; returns the training loss
    pub fn train_step(&mut self, batch: &Batch) -> Result<f32> {
        self.check_targets(batch)?;
        self.optimizer.zero_grad(&mut self.params);

        let predictions =
            self.model
                .forward(batch, self.config.dropout_keep_prob, &mut rand::rng())?;
        let targets = crate::autograd::Tensor::from_vec(batch.targets.clone(), false);
        let loss = self.loss_fn.forward(
            &predictions,
            &targets,
            batch.len(),
            self.config.l2_reg_strength,
            &self.params,
        );

        let loss_val = loss.item();
        if !loss_val.is_finite() {
            return Err(Error::NumericInstability {
                context: "training loss",
                value: loss_val,
            });
        }

        if let Some(op) = loss.backward_op() {
            op.backward();
        }
        if let Some(max_norm) = self.config.max_grad_norm {
            clip_grad_norm(&mut self.params, max_norm);
        }
        self.optimizer.step(&mut self.params);

        Ok(loss_val)
    }

    /// Squared-error sum on a batch with frozen parameters and no dropout
    pub fn evaluate_batch(&self, batch: &Batch) -> Result<f32> {
        self.check_targets(batch)?;
        let predictions = self.model.forward(batch, 1.0, &mut rand::rng())?;
        let targets = crate::autograd::Tensor::from_vec(batch.targets.clone(), false);
        Ok(SquaredError.compute(&predictions, &targets))
    }

    /// Train for the configured number of epochs, checkpointing on every
    /// strict dev-MSE improvement
    pub fn fit<S: CheckpointSink>(
        &mut self,
        data: &SequenceDataset,
        sink: &mut S,
    ) -> Result<FitResult> {
        if self.model.max_sentence() != data.max_sentence() {
            return Err(Error::ShapeMismatch {
                context: "dataset padded width",
                expected: self.model.max_sentence(),
                got: data.max_sentence(),
            });
        }
        if self.model.n_class() != data.n_class() {
            return Err(Error::ShapeMismatch {
                context: "dataset class count",
                expected: self.model.n_class(),
                got: data.n_class(),
            });
        }

        let mut train_sampler = BatchSampler::new(data.train(), self.config.batch_size);
        let mut dev_sampler = BatchSampler::new(data.dev(), self.config.batch_size);

        let mut reports = Vec::with_capacity(self.config.epochs);
        for epoch in 0..self.config.epochs {
            println!("Epoch {}/{}", epoch + 1, self.config.epochs);
            let report =
                self.run_epoch(epoch, &mut train_sampler, &mut dev_sampler, data, sink)?;
            reports.push(report);
        }

        Ok(FitResult {
            epochs_run: reports.len(),
            best_dev_mse: self.selector.best(),
            checkpoints_saved: self.checkpoints_saved,
            reports,
        })
    }

    fn run_epoch<S: CheckpointSink, R1: Rng, R2: Rng>(
        &mut self,
        epoch: usize,
        train_sampler: &mut BatchSampler<'_, R1>,
        dev_sampler: &mut BatchSampler<'_, R2>,
        data: &SequenceDataset,
        sink: &mut S,
    ) -> Result<EpochReport> {
        let steps = train_sampler.batches_per_pass();
        let mut train_se = 0.0;
        for step in 0..steps {
            let batch = train_sampler.next().expect("sampler is infinite");
            let loss = self.train_step(&batch)?;
            // Same batch, post-update parameters
            train_se += self.evaluate_batch(&batch)?;

            if (step + 1) % self.config.log_interval == 0 {
                println!("  step {}/{}: loss={:.4}", step + 1, steps, loss);
            }
        }
        let train_mse = train_se / data.train().num_observations() as f32;

        let dev_steps = dev_sampler.batches_per_pass();
        let mut dev_se = 0.0;
        for _ in 0..dev_steps {
            let batch = dev_sampler.next().expect("sampler is infinite");
            dev_se += self.evaluate_batch(&batch)?;
        }
        let dev_mse = dev_se / data.dev().num_observations() as f32;
        if !dev_mse.is_finite() {
            return Err(Error::NumericInstability {
                context: "dev MSE",
                value: dev_mse,
            });
        }

        println!("  train MSE: {train_mse:.4} - dev MSE: {dev_mse:.4}");

        let checkpointed = self.selector.observe(dev_mse);
        if checkpointed {
            println!("  new best dev MSE, saving checkpoint");
            sink.save(&self.model.snapshot(epoch, dev_mse))?;
            self.checkpoints_saved += 1;
        }

        Ok(EpochReport {
            epoch,
            train_mse,
            dev_mse,
            checkpointed,
        })
    }
}
