use ndarray::{Array2, ArrayViewD};

use super::{Evaluation, ModelTrainer, Reporter, TrainingSummary};
use crate::{
    Result,
    arch::{Model, ParamManager, loss::LossFn},
    data::BatchSource,
    optimization::Optimizer,
};

/// The object safe face of a `ModelTrainer`, so trainers of any model, optimizer and loss can be
/// handled alike.
pub trait Trainer {
    /// Trains the model, see `ModelTrainer::train`.
    fn train(
        &mut self,
        source: &mut dyn BatchSource,
        reporter: &mut dyn Reporter,
    ) -> Result<TrainingSummary>;

    fn evaluate(&self, source: &mut dyn BatchSource) -> Result<Evaluation>;

    fn predict_proba(&self, inputs: ArrayViewD<'_, f32>) -> Result<Array2<f32>>;

    /// The parameters of the trained model.
    fn params(&self) -> &ParamManager;
}

impl<M, O, L> Trainer for ModelTrainer<M, O, L>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    fn train(
        &mut self,
        source: &mut dyn BatchSource,
        reporter: &mut dyn Reporter,
    ) -> Result<TrainingSummary> {
        self.train(source, reporter)
    }

    fn evaluate(&self, source: &mut dyn BatchSource) -> Result<Evaluation> {
        self.evaluate(source)
    }

    fn predict_proba(&self, inputs: ArrayViewD<'_, f32>) -> Result<Array2<f32>> {
        self.predict_proba(inputs)
    }

    fn params(&self) -> &ParamManager {
        self.model().params()
    }
}
