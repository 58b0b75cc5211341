//! Serializable descriptions of everything a training run is built from.

use std::{num::NonZeroUsize, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{MlErr, Result};

/// The specification for the `ActFn` enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnSpec {
    Sigmoid { amp: f32 },
    Relu,
    Tanh,
}

/// The specification for the initialization of a dense layer's weights.
///
/// The variants named after an initialization scheme take the fans from the layer's dimensions.
/// Biases always start at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamGenSpec {
    Const {
        value: f32,
    },
    Uniform {
        low: f32,
        high: f32,
    },
    UniformInclusive {
        low: f32,
        high: f32,
    },
    Normal {
        mean: f32,
        std_dev: f32,
    },
    XavierUniform,
    #[default]
    LecunUniform,
    Kaiming,
    Xavier,
    Lecun,
}

/// The specification for the `Layer` enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Dense {
        dim: (usize, usize),
        #[serde(default)]
        act_fn: Option<ActFnSpec>,
        #[serde(default)]
        init: ParamGenSpec,
    },
    LogSoftmax,
}

/// The specification for the `Model` trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSpec {
    Sequential { layers: Vec<LayerSpec> },
}

/// The specification for the `Optimizer` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
    GradientDescent {
        learning_rate: f32,
    },
    GradientDescentWithMomentum {
        learning_rate: f32,
        momentum: f32,
    },
}

/// The specification for the `LossFn` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossFnSpec {
    Mse,
    CrossEntropy,
    Nll,
}

/// The specification for the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSpec {
    /// Noisy copies of a random prototype per class.
    Synthetic {
        samples: usize,
        side: usize,
        classes: usize,
        noise: f32,
    },
    /// A pair of uncompressed IDX files.
    Idx { images: PathBuf, labels: PathBuf },
}

/// The specification for a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerSpec {
    pub model: ModelSpec,
    pub optimizer: OptimizerSpec,
    pub loss: LossFnSpec,
    pub dataset: DatasetSpec,
    pub epochs: NonZeroUsize,
    pub report_every: NonZeroUsize,
    pub batch_size: NonZeroUsize,
    #[serde(default)]
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl TrainerSpec {
    /// Parses and validates a JSON spec.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: Self =
            serde_json::from_str(json).map_err(|e| MlErr::InvalidConfig(e.to_string()))?;

        spec.validate()?;
        Ok(spec)
    }

    /// The classic digit classifier walkthrough: a 784-128-64-10 relu network ending in a log
    /// softmax, trained with plain gradient descent on 28×28 images.
    pub fn walkthrough() -> Self {
        let relu = Some(ActFnSpec::Relu);
        let init = ParamGenSpec::default();

        Self {
            model: ModelSpec::Sequential {
                layers: vec![
                    LayerSpec::Dense {
                        dim: (784, 128),
                        act_fn: relu,
                        init,
                    },
                    LayerSpec::Dense {
                        dim: (128, 64),
                        act_fn: relu,
                        init,
                    },
                    LayerSpec::Dense {
                        dim: (64, 10),
                        act_fn: None,
                        init,
                    },
                    LayerSpec::LogSoftmax,
                ],
            },
            optimizer: OptimizerSpec::GradientDescent {
                learning_rate: 0.003,
            },
            loss: LossFnSpec::Nll,
            dataset: DatasetSpec::Synthetic {
                samples: 640,
                side: 28,
                classes: 10,
                noise: 0.3,
            },
            epochs: NonZeroUsize::MIN.saturating_add(2),
            report_every: NonZeroUsize::MIN.saturating_add(4),
            batch_size: NonZeroUsize::MIN.saturating_add(63),
            shuffle: false,
            seed: Some(7),
        }
    }

    /// The `(input, output)` widths of the model, if its dense layers chain.
    pub fn model_dims(&self) -> Result<(usize, usize)> {
        let ModelSpec::Sequential { layers } = &self.model;

        let mut dims = layers.iter().filter_map(|layer| match layer {
            LayerSpec::Dense { dim, .. } => Some(*dim),
            LayerSpec::LogSoftmax => None,
        });

        let Some((input, mut output)) = dims.next() else {
            return Err(invalid("the model has no dense layers"));
        };

        for (n, m) in dims {
            if n != output {
                return Err(invalid(format!(
                    "a dense layer takes {n} inputs but the previous one outputs {output}"
                )));
            }
            output = m;
        }

        Ok((input, output))
    }

    /// Checks the spec is coherent before anything is built out of it.
    pub fn validate(&self) -> Result<()> {
        let (input, output) = self.model_dims()?;
        let ModelSpec::Sequential { layers } = &self.model;

        if input == 0 || output == 0 {
            return Err(invalid("dense layers must have non zero dimensions"));
        }

        self.validate_optimizer()?;

        if self.loss == LossFnSpec::Nll && layers.last() != Some(&LayerSpec::LogSoftmax) {
            return Err(invalid(
                "the nll loss expects log-probabilities, end the model with a log_softmax layer",
            ));
        }

        if let DatasetSpec::Synthetic {
            samples,
            side,
            classes,
            ..
        } = self.dataset
        {
            if samples == 0 {
                return Err(invalid("the synthetic dataset must have samples"));
            }

            if side.checked_mul(side) != Some(input) {
                return Err(invalid(format!(
                    "{side}×{side} images don't fit a model with {input} inputs"
                )));
            }

            if classes == 0 || classes > output {
                return Err(invalid(format!(
                    "{classes} classes don't fit a model with {output} outputs"
                )));
            }
        }

        Ok(())
    }

    fn validate_optimizer(&self) -> Result<()> {
        let learning_rate = match self.optimizer {
            OptimizerSpec::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => {
                if ![beta1, beta2].iter().all(|b| (0. ..1.).contains(b)) || epsilon <= 0. {
                    return Err(invalid("adam needs betas in [0, 1) and a positive epsilon"));
                }
                learning_rate
            }
            OptimizerSpec::GradientDescent { learning_rate } => learning_rate,
            OptimizerSpec::GradientDescentWithMomentum {
                learning_rate,
                momentum,
            } => {
                if !(0. ..1.).contains(&momentum) {
                    return Err(invalid(format!("momentum must be in [0, 1), got {momentum}")));
                }
                learning_rate
            }
        };

        if !learning_rate.is_finite() || learning_rate <= 0. {
            return Err(invalid(format!(
                "the learning rate must be positive, got {learning_rate}"
            )));
        }

        Ok(())
    }
}

fn invalid<S: Into<String>>(msg: S) -> MlErr {
    MlErr::InvalidConfig(msg.into())
}
