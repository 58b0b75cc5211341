use log::debug;
use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Model, ParamManager, layers::Layer};
use crate::{MlErr, Result, initialization::ParamGen};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
    params: ParamManager,
    input_size: usize,
    output_size: usize,
}

impl Sequential {
    /// Creates a new `Sequential` whose parameters are sampled from a generator.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    /// * `param_gen` - The generator of the initial parameters, consumed in layer order.
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// A new `Sequential` instance, or an error if the layers don't chain or the generator runs
    /// out of values.
    pub fn new<I, G, R>(layers: I, param_gen: &mut G, rng: &mut R) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
        G: ParamGen<R> + ?Sized,
        R: Rng,
    {
        let layers: Vec<Layer> = layers.into_iter().collect();
        let size = layers.iter().map(Layer::size).sum();
        let mut params = Vec::with_capacity(size);

        while params.len() < size {
            match param_gen.sample(rng, size - params.len()) {
                Some(sample) if !sample.is_empty() => params.extend(sample),
                _ => break,
            }
        }

        if params.len() != size {
            return Err(MlErr::InvalidInit(format!(
                "the parameter generator ran out after {} of {size} values",
                params.len()
            )));
        }

        Self::with_params(layers, params)
    }

    /// Creates a new `Sequential` with the given parameters.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    /// * `params` - Every parameter of the model, layer by layer.
    ///
    /// # Returns
    /// A new `Sequential` instance, or an error if the layers don't chain or `params` has the
    /// wrong length.
    pub fn with_params<I>(layers: I, params: Vec<f32>) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<Layer> = layers.into_iter().collect();
        let (input_size, output_size) = Self::validate(&layers)?;
        let params = ParamManager::new(params, &layers)?;

        debug!(
            layers = layers.len(),
            params = params.len();
            "built sequential model"
        );

        Ok(Self {
            layers,
            params,
            input_size,
            output_size,
        })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Checks that adjacent dense layers have compatible dimensions.
    ///
    /// # Returns
    /// The input and output widths of the model.
    fn validate(layers: &[Layer]) -> Result<(usize, usize)> {
        let mut dims = layers.iter().filter_map(Layer::dim);

        let Some((input_size, mut output_size)) = dims.next() else {
            return Err(MlErr::InvalidModel(
                "model must have at least one dense layer".into(),
            ));
        };

        for (i, (n, m)) in dims.enumerate() {
            if n != output_size {
                return Err(MlErr::InvalidModel(format!(
                    "dense layer {}: input size ({n}) does not match previous layer output size ({output_size})",
                    i + 1
                )));
            }
            output_size = m;
        }

        Ok((input_size, output_size))
    }

    fn check_input(&self, x: &ArrayView2<f32>) -> Result<()> {
        if x.ncols() != self.input_size {
            return Err(MlErr::ShapeMismatch {
                what: "model input",
                got: x.shape().to_vec(),
                expected: vec![x.nrows(), self.input_size],
            });
        }

        Ok(())
    }

    fn forward_layers(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_input(&x)?;

        let nlayers = self.layers.len();
        let mut front = self.params.front();
        let mut out = x.to_owned();

        for (i, layer) in self.layers.iter_mut().enumerate() {
            let params = front.next().ok_or(MlErr::SizeMismatch {
                what: "layers",
                got: i,
                expected: nlayers,
            })?;

            out = layer.forward(params, out.view())?;
        }

        Ok(out)
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.params.len()
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.output_size
    }

    fn emits_log_probs(&self) -> bool {
        matches!(self.layers.last(), Some(Layer::LogSoftmax(_)))
    }

    fn forward(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let out = self.forward_layers(x);
        if out.is_err() {
            // A failed pass must not leave older caches behind for `backward`.
            self.layers.iter_mut().for_each(Layer::clear_cache);
        }

        out
    }

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_input(&x)?;

        let mut out = x.to_owned();
        for (layer, params) in self.layers.iter().zip(self.params.front()) {
            out = layer.predict(params, out.view())?;
        }

        Ok(out)
    }

    fn backward(&mut self, d: Array2<f32>) -> Result<()> {
        if d.ncols() != self.output_size {
            return Err(MlErr::ShapeMismatch {
                what: "output delta",
                got: d.shape().to_vec(),
                expected: vec![d.nrows(), self.output_size],
            });
        }

        if self.layers.iter().any(|layer| !layer.is_primed()) {
            return Err(MlErr::MissingForwardPass);
        }

        let nlayers = self.layers.len();
        let mut back = self.params.back();
        let mut d = d;

        for (i, layer) in self.layers.iter_mut().rev().enumerate() {
            let (params, grad) = back.next().ok_or(MlErr::SizeMismatch {
                what: "layers",
                got: i,
                expected: nlayers,
            })?;

            d = layer.backward(params, grad, d)?;
        }

        Ok(())
    }

    fn zero_grad(&mut self) {
        self.params.zero_grad();
    }

    fn params(&self) -> &ParamManager {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamManager {
        &mut self.params
    }
}
