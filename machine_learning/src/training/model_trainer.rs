use std::num::NonZeroUsize;

use log::{debug, info, warn};
use ndarray::{Array2, ArrayViewD};

use super::{GradStep, Report, Reporter};
use crate::{
    MlErr, Result,
    arch::{Model, loss::LossFn, ops},
    data::{self, BatchRef, BatchSource},
    optimization::Optimizer,
};

/// What's left after a `ModelTrainer::train` run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSummary {
    /// Every report emitted, in order.
    pub reports: Vec<Report>,
    /// The mean loss of every epoch, `None` for epochs in which the source yielded no batches.
    pub epoch_losses: Vec<Option<f32>>,
    /// The total amount of optimization steps taken.
    pub steps: usize,
}

/// The result of evaluating a model over a whole pass of a batch source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// The sample-weighted mean loss.
    pub loss: f32,
    /// The fraction of samples whose highest scoring class is their label.
    pub accuracy: f32,
    pub samples: usize,
}

/// A model trainer. Contains the relevant components needed for training a model, including the
/// model itself.
pub struct ModelTrainer<M, O, L>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    model: M,
    optimizer: O,
    loss_fn: L,

    epochs: NonZeroUsize,
    report_every: NonZeroUsize,
}

impl<M, O, L> ModelTrainer<M, O, L>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    /// Returns a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `optimizer` - The optimizer, bound to the model's parameters.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output and
    ///   the expected one.
    /// * `epochs` - The amount of passes over the batch source per `train` call.
    /// * `report_every` - The amount of steps between reports.
    pub fn new(
        model: M,
        optimizer: O,
        loss_fn: L,
        epochs: NonZeroUsize,
        report_every: NonZeroUsize,
    ) -> Self {
        Self {
            model,
            optimizer,
            loss_fn,
            epochs,
            report_every,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Performs `epochs` epochs of training the model.
    ///
    /// Every epoch restarts the source and the running loss. Every `report_every` steps the mean
    /// loss of those steps is handed to `reporter`.
    ///
    /// # Arguments
    /// * `source` - The batches to train with.
    /// * `reporter` - The sink of the running-average loss reports.
    ///
    /// # Returns
    /// A summary of the run, or the first error encountered. Training stops at the failing step.
    pub fn train<S, R>(&mut self, source: &mut S, reporter: &mut R) -> Result<TrainingSummary>
    where
        S: BatchSource + ?Sized,
        R: Reporter + ?Sized,
    {
        let epochs = self.epochs.get();
        let report_every = self.report_every.get();

        if let Some(batches) = source.len_hint().filter(|&batches| batches < report_every) {
            warn!(
                batches, report_every;
                "the report interval is longer than an epoch, no reports will be emitted"
            );
        }

        let mut summary = TrainingSummary::default();

        for epoch in 1..=epochs {
            source.reset();

            let mut step = 0;
            let mut running_loss = 0.;
            let mut epoch_loss = 0.;

            while let Some(batch) = source.next_batch() {
                let loss = self.step(batch, epoch, step + 1)?;

                running_loss += loss;
                epoch_loss += loss;
                step += 1;

                if step % report_every == 0 {
                    let report = Report {
                        epoch,
                        epochs,
                        step,
                        avg_loss: running_loss / report_every as f32,
                    };

                    reporter.report(&report);
                    summary.reports.push(report);
                    running_loss = 0.;
                }
            }

            summary.steps += step;

            if step == 0 {
                warn!(epoch; "the batch source yielded no batches");
                summary.epoch_losses.push(None);
                continue;
            }

            let mean_loss = epoch_loss / step as f32;
            info!(epoch, steps = step, mean_loss; "finished epoch {epoch}/{epochs}");
            summary.epoch_losses.push(Some(mean_loss));
        }

        Ok(summary)
    }

    /// Trains on a single batch.
    ///
    /// # Returns
    /// The loss of the batch before the update.
    fn step(&mut self, batch: BatchRef<'_>, epoch: usize, step: usize) -> Result<f32> {
        let BatchRef { inputs, labels } = batch;
        let x = data::flatten_to(inputs, self.model.input_size())?;

        let mut grad_step = GradStep::begin(&mut self.model);
        let y_pred = grad_step.forward(x)?;

        let loss = self.loss_fn.loss(y_pred.view(), labels)?;
        if !loss.is_finite() {
            return Err(MlErr::NonFiniteLoss {
                epoch,
                step,
                value: loss,
            });
        }

        let d = self.loss_fn.loss_prime(y_pred.view(), labels)?;
        grad_step.backward(d)?;
        grad_step.apply(&mut self.optimizer)?;

        debug!(epoch, step, batch = labels.len(), loss; "optimization step");
        Ok(loss)
    }

    /// Evaluates the model over a full pass of `source` without touching its parameters.
    ///
    /// # Returns
    /// The mean loss and accuracy, or an error if the source is empty or a batch doesn't fit the
    /// model.
    pub fn evaluate<S>(&self, source: &mut S) -> Result<Evaluation>
    where
        S: BatchSource + ?Sized,
    {
        source.reset();

        let mut total_loss = 0.;
        let mut correct = 0;
        let mut samples = 0;

        while let Some(BatchRef { inputs, labels }) = source.next_batch() {
            let x = data::flatten_to(inputs, self.model.input_size())?;
            let y_pred = self.model.predict(x)?;

            total_loss += self.loss_fn.loss(y_pred.view(), labels)? * labels.len() as f32;
            correct += ops::argmax(y_pred.view())
                .iter()
                .zip(labels)
                .filter(|(pred, label)| pred == label)
                .count();
            samples += labels.len();
        }

        if samples == 0 {
            return Err(MlErr::EmptyDataset);
        }

        Ok(Evaluation {
            loss: total_loss / samples as f32,
            accuracy: correct as f32 / samples as f32,
            samples,
        })
    }

    /// Computes the class probabilities of every sample in `inputs`.
    ///
    /// # Arguments
    /// * `inputs` - A batch of samples of any shape whose leading dimension is the batch size.
    ///
    /// # Returns
    /// A `batch × classes` matrix whose rows sum up to one.
    pub fn predict_proba(&self, inputs: ArrayViewD<'_, f32>) -> Result<Array2<f32>> {
        let x = data::flatten_to(inputs, self.model.input_size())?;
        let y = self.model.predict(x)?;

        if self.model.emits_log_probs() {
            Ok(y.mapv_into(f32::exp))
        } else {
            Ok(ops::softmax(y.view()))
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{ArrayD, IxDyn, array};

    use super::*;
    use crate::{
        arch::{Sequential, layers::Layer, loss::Mse},
        data::{DataLoader, InMemoryDataset},
        optimization::GradientDescent,
    };

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    /// Four samples of a single feature, all labelled as class 0 of 2.
    fn loader(batch_size: usize) -> DataLoader {
        let inputs = ArrayD::from_shape_vec(IxDyn(&[4, 1]), vec![1., 2., 3., 4.]).unwrap();
        let dataset = InMemoryDataset::new(inputs, vec![0; 4]).unwrap();
        DataLoader::new(dataset, nz(batch_size))
    }

    fn trainer(
        lr: f32,
        epochs: usize,
        report_every: usize,
    ) -> ModelTrainer<Sequential, GradientDescent, Mse> {
        let model =
            Sequential::with_params([Layer::dense((1, 2), None)], vec![0., 0., 0., 0.]).unwrap();
        ModelTrainer::new(
            model,
            GradientDescent::new(lr),
            Mse,
            nz(epochs),
            nz(report_every),
        )
    }

    #[test]
    fn reports_every_r_steps_and_resets_per_epoch() {
        let mut trainer = trainer(0.01, 2, 3);
        let mut reports: Vec<Report> = Vec::new();

        // 4 batches per epoch: a report at step 3, the 4th step is never reported
        let summary = trainer.train(&mut loader(1), &mut reports).unwrap();
        assert_eq!(summary.steps, 8);
        assert_eq!(summary.reports, reports);

        let positions: Vec<_> = reports.iter().map(|r| (r.epoch, r.step)).collect();
        assert_eq!(positions, [(1, 3), (2, 3)]);
        assert!(reports.iter().all(|r| r.epochs == 2));
    }

    #[test]
    fn running_average_covers_the_interval() {
        let mut trainer = trainer(0., 1, 2);
        let mut reports: Vec<Report> = Vec::new();

        // With a zero learning rate every step costs the same: mse of [0, 0] against [1, 0]
        let summary = trainer.train(&mut loader(1), &mut reports).unwrap();

        assert_eq!(reports.len(), 2);
        for report in &reports {
            assert!((report.avg_loss - 0.5).abs() < 1e-6);
        }
        assert_eq!(summary.epoch_losses.len(), 1);
        assert!((summary.epoch_losses[0].unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn invalid_labels_stop_training() {
        let inputs = ArrayD::from_shape_vec(IxDyn(&[3, 1]), vec![1., 2., 3.]).unwrap();
        let dataset = InMemoryDataset::new(inputs, vec![0, 5, 1]).unwrap();
        let mut source = DataLoader::new(dataset, nz(1));

        let mut trainer = trainer(0.1, 3, 1);
        let mut reports: Vec<Report> = Vec::new();

        let err = trainer.train(&mut source, &mut reports).unwrap_err();

        assert!(matches!(
            err,
            MlErr::InvalidLabel {
                label: 5,
                classes: 2,
                ..
            }
        ));
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn evaluate_leaves_the_model_untouched() {
        let model = Sequential::with_params(
            [Layer::dense((1, 2), None)],
            // class 0 scores x, class 1 scores 2.5
            vec![1., 0., 0., 2.5],
        )
        .unwrap();
        let trainer = ModelTrainer::new(model, GradientDescent::new(1.), Mse, nz(1), nz(1));

        let before = trainer.model().params().params().to_vec();
        let eval = trainer.evaluate(&mut loader(3)).unwrap();

        assert_eq!(eval.samples, 4);
        // x = 3 and x = 4 beat 2.5
        assert!((eval.accuracy - 0.5).abs() < 1e-6);
        assert_eq!(trainer.model().params().params(), before);
        assert!(trainer.model().params().grad().iter().all(|&g| g == 0.));
    }

    #[test]
    fn predict_proba_rows_sum_to_one() {
        let trainer = trainer(0.1, 1, 1);
        let inputs = array![[1.], [-3.]].into_dyn();

        let proba = trainer.predict_proba(inputs.view()).unwrap();
        assert_eq!(proba.shape(), [2, 2]);
        for row in proba.rows() {
            assert!((row.sum() - 1.).abs() < 1e-6);
        }
    }

    #[test]
    fn batches_of_the_wrong_width_are_shape_errors() {
        let inputs = ArrayD::zeros(IxDyn(&[2, 3]));
        let dataset = InMemoryDataset::new(inputs, vec![0, 1]).unwrap();
        let mut source = DataLoader::new(dataset, nz(2));

        let err = trainer(0.1, 1, 1)
            .train(&mut source, &mut Vec::<Report>::new())
            .unwrap_err();

        assert!(matches!(
            err,
            MlErr::ShapeMismatch { got, expected, .. } if got == [2, 3] && expected == [2, 1]
        ));
    }
}
