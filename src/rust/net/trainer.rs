use std::time::{Duration, Instant};

use log::{debug, info};

use crate::data::{DataSet, DataSetSource};
use crate::error::NeuralError;

/// What the trainer needs from a model toolkit.
pub trait TrainableModel: Clone {
    /// Topology descriptor a fresh model is built from.
    type Configuration;

    fn from_configuration(configuration: &Self::Configuration) -> Result<Self, NeuralError>;

    /// Runs one training step on a data set.
    fn fit(&mut self, data_set: &DataSet) -> Result<(), NeuralError>;

    /// Loss computed by the most recent `fit`, if any.
    fn score(&self) -> Option<f64>;

    /// Loss against a data set without training on it.
    fn loss(&self, data_set: &DataSet) -> Result<f64, NeuralError>;

    fn num_params(&self) -> usize;

    fn summary(&self) -> String;
}

/// Invoked with every new best model, and once more with the final best model.
pub type BestModelSaver<'a, M> = Box<dyn FnMut(&M) -> Result<(), NeuralError> + 'a>;

/// How a training run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingOutcome {
    /// The configured epoch limit was reached.
    Succeeded,
    /// The wall-clock budget ran out.
    TimedOutWithBestModel,
}

/// The best model observed during a run plus bookkeeping about the run.
#[derive(Debug, Clone)]
pub struct TrainingResult<M> {
    pub best_model: M,
    pub best_model_score: f64,
    /// `None` when no epoch improved on the initial model.
    pub best_model_epoch: Option<usize>,
    pub initial_score: f64,
    pub total_epochs: usize,
    pub outcome: TrainingOutcome,
    pub elapsed: Duration,
}

/// A builder for constructing a [`Trainer`] with a fluent interface.
pub struct TrainerBuilder<'a, M: TrainableModel> {
    configuration: Option<M::Configuration>,
    initial_model: Option<M>,
    max_time: Option<Duration>,
    max_epochs: Option<usize>,
    training_data: Option<&'a dyn DataSetSource>,
    evaluation_data: Option<&'a dyn DataSetSource>,
    best_model_saver: Option<BestModelSaver<'a, M>>,
}

impl<'a, M: TrainableModel> Default for TrainerBuilder<'a, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, M: TrainableModel> TrainerBuilder<'a, M> {
    pub fn new() -> Self {
        Self {
            configuration: None,
            initial_model: None,
            max_time: None,
            max_epochs: None,
            training_data: None,
            evaluation_data: None,
            best_model_saver: None,
        }
    }

    /// Configuration used to build a fresh model when no initial model is given.
    pub fn configuration(mut self, configuration: M::Configuration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// A model to continue training. Takes precedence over `configuration`.
    pub fn initial_model(mut self, model: M) -> Self {
        self.initial_model = Some(model);
        self
    }

    /// Wall-clock budget, checked between epochs.
    pub fn max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    pub fn max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = Some(max_epochs);
        self
    }

    pub fn training_data(mut self, data: &'a dyn DataSetSource) -> Self {
        self.training_data = Some(data);
        self
    }

    /// Held-out data to score against. Without it the model's own training
    /// loss is the score.
    pub fn evaluation_data(mut self, data: &'a dyn DataSetSource) -> Self {
        self.evaluation_data = Some(data);
        self
    }

    pub fn best_model_saver(mut self, saver: impl FnMut(&M) -> Result<(), NeuralError> + 'a) -> Self {
        self.best_model_saver = Some(Box::new(saver));
        self
    }

    /// Validates the specification and initialises the model.
    ///
    /// # Errors
    /// `InvalidConfiguration` if neither a configuration nor an initial model
    /// was given, or if the time budget or training data is missing or empty.
    pub fn build(self) -> Result<Trainer<'a, M>, NeuralError> {
        let max_time = self
            .max_time
            .ok_or_else(|| NeuralError::InvalidConfiguration("Must specify 'max_time'".into()))?;
        let training_data = self.training_data.ok_or_else(|| {
            NeuralError::InvalidConfiguration("Must specify 'training_data'".into())
        })?;
        if training_data.data_sets().next().is_none() {
            return Err(NeuralError::InvalidConfiguration("Training data is empty".into()));
        }
        if let Some(evaluation_data) = self.evaluation_data {
            if evaluation_data.data_sets().all(|d| d.num_examples() == 0) {
                return Err(NeuralError::InvalidConfiguration("Evaluation data is empty".into()));
            }
        }

        let model = match (self.initial_model, self.configuration) {
            (Some(model), _) => model,
            (None, Some(configuration)) => M::from_configuration(&configuration)?,
            (None, None) => {
                return Err(NeuralError::InvalidConfiguration(
                    "Must specify one of 'configuration' or 'initial_model'".into(),
                ))
            }
        };
        info!("Network has {} parameters", model.num_params());
        info!("\n{}", model.summary());

        Ok(Trainer {
            model,
            max_time,
            max_epochs: self.max_epochs,
            training_data,
            evaluation_data: self.evaluation_data,
            best_model_saver: self.best_model_saver,
        })
    }
}

/// Time-bounded training loop that keeps the lowest-scoring model it has seen.
pub struct Trainer<'a, M: TrainableModel> {
    model: M,
    max_time: Duration,
    max_epochs: Option<usize>,
    training_data: &'a dyn DataSetSource,
    evaluation_data: Option<&'a dyn DataSetSource>,
    best_model_saver: Option<BestModelSaver<'a, M>>,
}

impl<'a, M: TrainableModel> Trainer<'a, M> {
    pub fn builder() -> TrainerBuilder<'a, M> {
        TrainerBuilder::new()
    }

    /// The model training will start from.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Trains until the time budget or epoch limit is exhausted.
    ///
    /// The saver runs synchronously on each improvement and once more after
    /// the loop, so every run persists at least one model. Errors from the
    /// toolkit or the saver abort the run.
    pub fn fit(mut self) -> Result<TrainingResult<M>, NeuralError> {
        let start = Instant::now();
        let mut model = self.model.clone();
        let initial_score = self.calculate_score(&model)?;
        info!("Initial score {:.6}", initial_score);

        let mut best_model = model.clone();
        let mut best_model_score = initial_score;
        let mut best_model_epoch = None;
        let mut epochs = 0;

        let outcome = loop {
            if start.elapsed() >= self.max_time {
                break TrainingOutcome::TimedOutWithBestModel;
            }
            if self.max_epochs.is_some_and(|max| epochs >= max) {
                break TrainingOutcome::Succeeded;
            }

            for data_set in self.training_data.data_sets() {
                model.fit(data_set)?;
            }
            epochs += 1;

            let score = self.calculate_score(&model)?;
            debug!("Epoch {} score {:.6} (best {:.6})", epochs, score, best_model_score);
            if improves(score, best_model_score) {
                info!("New best score {:.6} at epoch {}", score, epochs);
                best_model = model.clone();
                best_model_score = score;
                best_model_epoch = Some(epochs);
                if let Some(saver) = self.best_model_saver.as_mut() {
                    saver(&best_model)?;
                }
            }
        };

        if let Some(saver) = self.best_model_saver.as_mut() {
            saver(&best_model)?;
        }

        let elapsed = start.elapsed();
        info!(
            "Training finished ({:?}) after {} epochs in {:.2?}, best score {:.6}",
            outcome, epochs, elapsed, best_model_score
        );
        Ok(TrainingResult {
            best_model,
            best_model_score,
            best_model_epoch,
            initial_score,
            total_epochs: epochs,
            outcome,
            elapsed,
        })
    }

    fn calculate_score(&self, model: &M) -> Result<f64, NeuralError> {
        match (self.evaluation_data, model.score()) {
            (Some(evaluation_data), _) => average_loss(model, evaluation_data),
            (None, Some(score)) => Ok(score),
            (None, None) => average_loss(model, self.training_data),
        }
    }
}

/// Example-weighted mean loss over a source.
fn average_loss<M: TrainableModel>(model: &M, source: &dyn DataSetSource) -> Result<f64, NeuralError> {
    let mut total = 0.0;
    let mut examples = 0;
    for data_set in source.data_sets() {
        let n = data_set.num_examples();
        if n > 0 {
            total += model.loss(data_set)? * n as f64;
            examples += n;
        }
    }
    if examples == 0 {
        return Ok(f64::NAN);
    }
    Ok(total / examples as f64)
}

/// Lower is better; any real score beats NaN.
fn improves(score: f64, best: f64) -> bool {
    score < best || (best.is_nan() && !score.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_improves() {
        assert!(improves(0.5, 1.0));
        assert!(!improves(1.0, 1.0));
        assert!(!improves(2.0, 1.0));
        assert!(improves(3.0, f64::NAN));
        assert!(!improves(f64::NAN, 1.0));
        assert!(!improves(f64::NAN, f64::NAN));
    }
}
