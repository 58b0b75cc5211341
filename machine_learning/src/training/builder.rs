use log::info;
use rand::{SeedableRng, rngs::StdRng};

use super::{ModelTrainer, Trainer};
use crate::{
    Result,
    arch::{
        Model, Sequential,
        activations::ActFn,
        layers::Layer,
        loss::{CrossEntropy, LossFn, Mse, Nll},
    },
    data::{DataLoader, SyntheticDigits, idx},
    initialization::{ChainedParamGen, ConstParamGen, ParamGen, RandParamGen},
    optimization::{Adam, GradientDescent, GradientDescentWithMomentum, Optimizer},
    specs::{
        ActFnSpec, DatasetSpec, LayerSpec, LossFnSpec, ModelSpec, OptimizerSpec, ParamGenSpec,
        TrainerSpec,
    },
};

/// Builds `Trainer`s and their batch sources given a specification.
#[derive(Debug, Default)]
pub struct TrainerBuilder;

impl TrainerBuilder {
    /// Creates a new `TrainerBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `Trainer` following a spec.
    ///
    /// # Arguments
    /// * `spec` - The specification for the trainer.
    ///
    /// # Returns
    /// A new trainer, or an error if the spec is invalid.
    pub fn build(&self, spec: &TrainerSpec) -> Result<Box<dyn Trainer>> {
        spec.validate()?;
        self.resolve_model(spec)
    }

    /// Builds the `DataLoader` the spec's trainer should be trained with.
    ///
    /// # Arguments
    /// * `spec` - The specification for the trainer.
    ///
    /// # Returns
    /// A new data loader, or an error if the dataset can't be generated or read.
    pub fn build_source(&self, spec: &TrainerSpec) -> Result<DataLoader> {
        let dataset = match spec.dataset {
            DatasetSpec::Synthetic {
                samples,
                side,
                classes,
                noise,
            } => {
                // Offset the seed so the data doesn't share a stream with the initialization
                let mut rng = self.generate_rng(spec.seed.map(|seed| seed.wrapping_add(1)));
                let synthetic = SyntheticDigits {
                    samples,
                    side,
                    classes,
                    noise,
                };
                synthetic.generate(&mut rng)?
            }
            DatasetSpec::Idx {
                ref images,
                ref labels,
            } => idx::load(images, labels)?,
        };

        info!(
            samples = dataset.len(),
            classes = dataset.num_classes();
            "built dataset"
        );

        let loader = DataLoader::new(dataset, spec.batch_size);
        if !spec.shuffle {
            return Ok(loader);
        }

        let seed = spec
            .seed
            .map_or_else(rand::random, |seed| seed.wrapping_add(2));
        Ok(loader.with_shuffle(seed))
    }

    fn resolve_model(&self, spec: &TrainerSpec) -> Result<Box<dyn Trainer>> {
        match &spec.model {
            ModelSpec::Sequential {
                layers: layer_specs,
            } => {
                let layers = layer_specs.iter().map(|ls| self.resolve_layer(*ls));

                let mut rng = self.generate_rng(spec.seed);
                let mut param_gen = self.resolve_param_gens(layer_specs)?;
                let model = Sequential::new(layers, &mut param_gen, &mut rng)?;

                self.resolve_optimizer(spec, model)
            }
        }
    }

    fn resolve_layer(&self, spec: LayerSpec) -> Layer {
        match spec {
            LayerSpec::Dense { dim, act_fn, .. } => {
                let factory = |act_fn| Layer::dense(dim, act_fn);
                self.resolve_act_fn(act_fn, factory)
            }
            LayerSpec::LogSoftmax => Layer::log_softmax(),
        }
    }

    fn resolve_act_fn<F>(&self, spec: Option<ActFnSpec>, layer_factory: F) -> Layer
    where
        F: FnOnce(Option<ActFn>) -> Layer,
    {
        let Some(act_fn) = spec else {
            return layer_factory(None);
        };

        let act_fn = match act_fn {
            ActFnSpec::Sigmoid { amp } => ActFn::sigmoid(amp),
            ActFnSpec::Relu => ActFn::relu(),
            ActFnSpec::Tanh => ActFn::tanh(),
        };

        layer_factory(Some(act_fn))
    }

    /// Resolves one generator for the weights and one for the biases of every dense layer, chained
    /// in the order the model stores its parameters.
    fn resolve_param_gens(&self, layer_specs: &[LayerSpec]) -> Result<ChainedParamGen<StdRng>> {
        let mut param_gens: Vec<Box<dyn ParamGen<StdRng>>> = Vec::new();

        for spec in layer_specs {
            let &LayerSpec::Dense { dim, init, .. } = spec else {
                continue;
            };

            let (fan_in, fan_out) = dim;
            param_gens.push(self.resolve_param_gen(init, fan_in, fan_out)?);
            param_gens.push(Box::new(ConstParamGen::new(0., fan_out)));
        }

        Ok(ChainedParamGen::new(param_gens))
    }

    fn resolve_param_gen(
        &self,
        spec: ParamGenSpec,
        fan_in: usize,
        fan_out: usize,
    ) -> Result<Box<dyn ParamGen<StdRng>>> {
        let limit = fan_in * fan_out;

        let param_gen: Box<dyn ParamGen<StdRng>> = match spec {
            ParamGenSpec::Const { value } => Box::new(ConstParamGen::new(value, limit)),
            ParamGenSpec::Uniform { low, high } => {
                Box::new(RandParamGen::uniform(limit, low, high)?)
            }
            ParamGenSpec::UniformInclusive { low, high } => {
                Box::new(RandParamGen::uniform_inclusive(limit, low, high)?)
            }
            ParamGenSpec::Normal { mean, std_dev } => {
                Box::new(RandParamGen::normal(limit, mean, std_dev)?)
            }
            ParamGenSpec::XavierUniform => {
                Box::new(RandParamGen::xavier_uniform(limit, fan_in, fan_out)?)
            }
            ParamGenSpec::LecunUniform => Box::new(RandParamGen::lecun_uniform(limit, fan_in)?),
            ParamGenSpec::Kaiming => Box::new(RandParamGen::kaiming(limit, fan_in)?),
            ParamGenSpec::Xavier => Box::new(RandParamGen::xavier(limit, fan_in, fan_out)?),
            ParamGenSpec::Lecun => Box::new(RandParamGen::lecun(limit, fan_in)?),
        };

        Ok(param_gen)
    }

    fn resolve_optimizer<M>(&self, spec: &TrainerSpec, model: M) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
    {
        let len = model.size();

        match spec.optimizer {
            OptimizerSpec::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => {
                let optimizer = Adam::new(len, learning_rate, beta1, beta2, epsilon);
                self.resolve_loss(spec, model, optimizer)
            }
            OptimizerSpec::GradientDescent { learning_rate } => {
                let optimizer = GradientDescent::new(learning_rate);
                self.resolve_loss(spec, model, optimizer)
            }
            OptimizerSpec::GradientDescentWithMomentum {
                learning_rate,
                momentum,
            } => {
                let optimizer = GradientDescentWithMomentum::new(len, learning_rate, momentum);
                self.resolve_loss(spec, model, optimizer)
            }
        }
    }

    fn resolve_loss<M, O>(
        &self,
        spec: &TrainerSpec,
        model: M,
        optimizer: O,
    ) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
        O: Optimizer + 'static,
    {
        match spec.loss {
            LossFnSpec::Mse => Ok(self.terminate_build(spec, model, optimizer, Mse::new())),
            LossFnSpec::CrossEntropy => {
                Ok(self.terminate_build(spec, model, optimizer, CrossEntropy::new()))
            }
            LossFnSpec::Nll => Ok(self.terminate_build(spec, model, optimizer, Nll::new())),
        }
    }

    fn terminate_build<M, O, L>(
        &self,
        spec: &TrainerSpec,
        model: M,
        optimizer: O,
        loss: L,
    ) -> Box<dyn Trainer>
    where
        M: Model + 'static,
        O: Optimizer + 'static,
        L: LossFn + 'static,
    {
        info!(
            params = model.size(),
            epochs = spec.epochs.get(),
            batch_size = spec.batch_size.get();
            "built trainer"
        );

        let trainer = ModelTrainer::new(model, optimizer, loss, spec.epochs, spec.report_every);
        Box::new(trainer)
    }

    /// Generates a random number generator given (or not) a seed.
    fn generate_rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
