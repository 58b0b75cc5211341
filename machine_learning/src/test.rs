#![cfg(test)]

use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayD, IxDyn, array};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    MlErr,
    arch::{
        Model, Sequential,
        activations::ActFn,
        layers::Layer,
        loss::{CrossEntropy, LossFn, Mse, Nll},
    },
    data::{self, BatchSource, DataLoader, InMemoryDataset, SyntheticDigits},
    initialization::{ChainedParamGen, ConstParamGen, ParamGen, RandParamGen},
    optimization::GradientDescent,
    specs::TrainerSpec,
    training::{ModelTrainer, Report, TrainerBuilder},
};

fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

/// LeCun uniform weights and zero biases for every dense layer.
fn build_model(layers: Vec<Layer>, seed: u64) -> Sequential {
    let mut param_gens: Vec<Box<dyn ParamGen<StdRng>>> = Vec::new();
    for (fan_in, fan_out) in layers.iter().filter_map(Layer::dim) {
        param_gens.push(Box::new(
            RandParamGen::lecun_uniform(fan_in * fan_out, fan_in).unwrap(),
        ));
        param_gens.push(Box::new(ConstParamGen::new(0., fan_out)));
    }

    let mut param_gen = ChainedParamGen::new(param_gens);
    let mut rng = StdRng::seed_from_u64(seed);
    Sequential::new(layers, &mut param_gen, &mut rng).unwrap()
}

fn synthetic(samples: usize, side: usize, classes: usize, seed: u64) -> InMemoryDataset {
    SyntheticDigits {
        samples,
        side,
        classes,
        noise: 0.3,
    }
    .generate(&mut StdRng::seed_from_u64(seed))
    .unwrap()
}

fn first_batch(dataset: &InMemoryDataset, n: usize) -> (Array2<f32>, Vec<usize>) {
    let mut loader = DataLoader::new(dataset.clone(), nz(n));
    loader.reset();

    let batch = loader.next_batch().unwrap();
    let x = data::flatten(batch.inputs).unwrap().to_owned();
    (x, batch.labels.to_vec())
}

#[test]
fn test_full_batch_training_converges() {
    let dataset = synthetic(30, 4, 3, 1);
    let mut source = DataLoader::new(dataset, nz(30));

    let model = build_model(
        vec![
            Layer::dense((16, 8), Some(ActFn::tanh())),
            Layer::dense((8, 3), None),
        ],
        2,
    );
    let mut trainer =
        ModelTrainer::new(model, GradientDescent::new(0.3), CrossEntropy, nz(200), nz(1));

    let mut reports: Vec<Report> = Vec::new();
    trainer.train(&mut source, &mut reports).unwrap();

    let losses: Vec<f32> = reports.iter().map(|r| r.avg_loss).collect();
    let decreasing = losses.windows(2).filter(|w| w[1] < w[0]).count();

    assert_eq!(losses.len(), 200);
    assert!(decreasing * 10 >= (losses.len() - 1) * 8);
    assert!(losses[199] < losses[0] * 0.5);
}

#[test]
fn test_zero_grad_is_idempotent() {
    let dataset = synthetic(8, 3, 2, 3);
    let (x, labels) = first_batch(&dataset, 8);
    let mut model = build_model(vec![Layer::dense((9, 2), Some(ActFn::sigmoid(1.)))], 4);

    let y = model.forward(x.view()).unwrap();
    model.backward(Mse.loss_prime(y.view(), &labels).unwrap()).unwrap();
    assert!(model.params().grad().iter().any(|&g| g != 0.));

    model.zero_grad();
    let once = model.params().grad().to_vec();
    model.zero_grad();

    assert_eq!(model.params().grad(), once);
    assert!(once.iter().all(|&g| g == 0.));
}

#[test]
fn test_gradients_accumulate_without_clearing() {
    let dataset = synthetic(16, 3, 3, 5);
    let (x, labels) = first_batch(&dataset, 16);
    let (xa, xb) = x.view().split_at(ndarray::Axis(0), 8);
    let (la, lb) = labels.split_at(8);

    let mut model = build_model(
        vec![
            Layer::dense((9, 5), Some(ActFn::relu())),
            Layer::dense((5, 3), None),
            Layer::log_softmax(),
        ],
        6,
    );

    let grad_of = |model: &mut Sequential, x, labels: &[usize]| {
        let y = model.forward(x).unwrap();
        model.backward(Nll.loss_prime(y.view(), labels).unwrap()).unwrap();
    };

    grad_of(&mut model, xa, la);
    let ga = model.params().grad().to_vec();
    model.zero_grad();

    grad_of(&mut model, xb, lb);
    let gb = model.params().grad().to_vec();
    model.zero_grad();

    grad_of(&mut model, xa, la);
    grad_of(&mut model, xb, lb);

    for ((g, a), b) in model.params().grad().iter().zip(&ga).zip(&gb) {
        assert!((g - (a + b)).abs() < 1e-5);
    }
}

#[test]
fn test_label_equal_to_the_class_count_stops_training() {
    let inputs = ArrayD::from_shape_vec(IxDyn(&[3, 2]), vec![0.; 6]).unwrap();
    let dataset = InMemoryDataset::new(inputs, vec![1, 0, 3]).unwrap();
    let mut source = DataLoader::new(dataset, nz(2));

    let model = build_model(vec![Layer::dense((2, 3), None)], 7);
    let mut trainer =
        ModelTrainer::new(model, GradientDescent::new(0.1), CrossEntropy, nz(5), nz(1));

    let mut reports: Vec<Report> = Vec::new();
    let err = trainer.train(&mut source, &mut reports).unwrap_err();

    assert!(matches!(
        err,
        MlErr::InvalidLabel {
            index: 0,
            label: 3,
            classes: 3
        }
    ));
    assert_eq!(reports.len(), 1);
}

#[test]
fn test_digit_classifier_two_batches_end_to_end() {
    let dataset = synthetic(128, 28, 10, 8);
    let mut source = DataLoader::new(dataset, nz(64));

    let model = build_model(
        vec![
            Layer::dense((784, 128), Some(ActFn::relu())),
            Layer::dense((128, 64), Some(ActFn::relu())),
            Layer::dense((64, 10), None),
            Layer::log_softmax(),
        ],
        9,
    );
    let before = model.params().params().to_vec();

    let mut trainer = ModelTrainer::new(model, GradientDescent::new(0.003), Nll, nz(1), nz(1));
    let mut reports: Vec<Report> = Vec::new();
    let summary = trainer.train(&mut source, &mut reports).unwrap();

    assert_eq!(summary.steps, 2);
    assert_eq!(reports.len(), 2);
    assert!(
        reports
            .iter()
            .all(|r| r.avg_loss.is_finite() && r.avg_loss >= 0.)
    );

    let params = trainer.model().params();
    let tensors: Vec<_> = params.tensors().collect();
    assert_eq!(tensors.len(), 6);

    let mut offset = 0;
    for tensor in tensors {
        let old = &before[offset..offset + tensor.value.len()];
        assert!(
            tensor.value.iter().zip(old).any(|(new, old)| new != old),
            "{} did not change",
            tensor.name
        );
        offset += tensor.value.len();
    }
}

#[test]
fn test_flatten_round_trip_of_a_batch() {
    let dataset = synthetic(5, 28, 10, 10);
    let mut loader = DataLoader::new(dataset, nz(5));
    loader.reset();
    let batch = loader.next_batch().unwrap();

    let flat = data::flatten(batch.inputs.view()).unwrap();
    assert_eq!(flat.shape(), [5, 784]);

    let images = data::unflatten(flat, &[28, 28]).unwrap();
    assert_eq!(images, batch.inputs);
}

/// Compares the analytic gradient with central differences of the loss.
fn check_gradient<L: LossFn>(mut model: Sequential, loss_fn: L) {
    let x = array![[0.2, -0.5, 0.9], [1.0, 0.3, -0.7], [-0.4, 0.8, 0.1]];
    let labels = [1, 0, 1];
    let h = 1e-2;

    let y = model.forward(x.view()).unwrap();
    model.backward(loss_fn.loss_prime(y.view(), &labels).unwrap()).unwrap();
    let grad = model.params().grad().to_vec();

    for (i, &analytic) in grad.iter().enumerate() {
        let mut loss_at = |delta: f32| {
            model.params_mut().params_mut()[i] += delta;
            let y = model.predict(x.view()).unwrap();
            model.params_mut().params_mut()[i] -= delta;
            loss_fn.loss(y.view(), &labels).unwrap()
        };

        let numeric = (loss_at(h) - loss_at(-h)) / (2. * h);
        assert!(
            (numeric - analytic).abs() < 2e-3,
            "param {i}: numeric {numeric}, analytic {analytic}"
        );
    }
}

#[test]
fn test_gradients_match_finite_differences() {
    let tanh = build_model(
        vec![
            Layer::dense((3, 4), Some(ActFn::tanh())),
            Layer::dense((4, 2), None),
        ],
        11,
    );
    check_gradient(tanh, CrossEntropy);

    let sigmoid = build_model(
        vec![
            Layer::dense((3, 4), Some(ActFn::sigmoid(1.))),
            Layer::dense((4, 2), None),
            Layer::log_softmax(),
        ],
        12,
    );
    check_gradient(sigmoid, Nll);

    let squashed = build_model(
        vec![
            Layer::dense((3, 4), Some(ActFn::sigmoid(2.))),
            Layer::dense((4, 2), Some(ActFn::tanh())),
        ],
        13,
    );
    check_gradient(squashed, Mse);
}

#[test]
fn test_non_finite_loss_leaves_params_untouched() {
    let inputs = ArrayD::from_shape_vec(IxDyn(&[1, 1]), vec![f32::INFINITY]).unwrap();
    let dataset = InMemoryDataset::new(inputs, vec![0]).unwrap();
    let mut source = DataLoader::new(dataset, nz(1));

    let model =
        Sequential::with_params([Layer::dense((1, 2), None)], vec![1., 1., 0., 0.]).unwrap();
    let mut trainer = ModelTrainer::new(model, GradientDescent::new(0.1), Mse, nz(1), nz(1));

    let err = trainer
        .train(&mut source, &mut Vec::<Report>::new())
        .unwrap_err();

    assert!(matches!(
        err,
        MlErr::NonFiniteLoss {
            epoch: 1,
            step: 1,
            ..
        }
    ));
    assert_eq!(trainer.model().params().params(), [1., 1., 0., 0.]);
    assert!(trainer.model().params().grad().iter().all(|&g| g == 0.));
}

#[test]
fn test_walkthrough_config_trains() {
    let spec = TrainerSpec::walkthrough();
    let builder = TrainerBuilder::new();

    let mut trainer = builder.build(&spec).unwrap();
    let mut source = builder.build_source(&spec).unwrap();
    let mut reports: Vec<Report> = Vec::new();

    let summary = trainer.train(&mut source, &mut reports).unwrap();

    // 640 samples in batches of 64, a report every 5 steps
    assert_eq!(summary.steps, 30);
    assert_eq!(reports.len(), 6);
    assert!(summary.epoch_losses.iter().all(|l| l.is_some_and(f32::is_finite)));

    let sample = source.dataset().get(0).unwrap();
    let proba = trainer.predict_proba(sample.inputs).unwrap();
    assert_eq!(proba.shape(), [1, 10]);
    assert!((proba.sum() - 1.).abs() < 1e-4);
}
