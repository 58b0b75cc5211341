use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use rand_distr::{NormalError, uniform::Error as UniformError};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    /// An array doesn't have the shape an operation requires.
    ShapeMismatch {
        what: &'static str,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    /// A flat buffer doesn't have the length an operation requires.
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// A label is not a valid class index for the model's output.
    InvalidLabel {
        index: usize,
        label: usize,
        classes: usize,
    },
    /// A batch without samples reached a loss function.
    EmptyBatch,
    /// A dataset was built without samples.
    EmptyDataset,
    /// The loss of a training step is NaN or infinite.
    NonFiniteLoss {
        epoch: usize,
        step: usize,
        value: f32,
    },
    /// `backward` was called on a layer that has no cached forward pass.
    MissingForwardPass,
    InvalidModel(String),
    InvalidConfig(String),
    InvalidInit(String),
    InvalidIdx(String),
    Io(io::Error),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a shape mismatch in {what}, got {got:?} and expected {expected:?}"
            ),
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::InvalidLabel {
                index,
                label,
                classes,
            } => write!(
                f,
                "Label {label} of sample {index} is out of range, the model has {classes} classes"
            ),
            MlErr::EmptyBatch => write!(f, "Tried to compute the loss of an empty batch"),
            MlErr::EmptyDataset => write!(f, "The dataset has no samples"),
            MlErr::NonFiniteLoss { epoch, step, value } => {
                write!(f, "The loss became {value} at epoch {epoch}, step {step}")
            }
            MlErr::MissingForwardPass => {
                write!(f, "Called backward without a preceding forward pass")
            }
            MlErr::InvalidModel(msg) => write!(f, "The model is invalid, {msg}"),
            MlErr::InvalidConfig(msg) => write!(f, "The config is invalid, {msg}"),
            MlErr::InvalidInit(msg) => write!(f, "The initialization is invalid, {msg}"),
            MlErr::InvalidIdx(msg) => write!(f, "The idx file is invalid, {msg}"),
            MlErr::Io(e) => write!(f, "There was an io error, {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MlErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<NormalError> for MlErr {
    fn from(value: NormalError) -> Self {
        Self::InvalidInit(value.to_string())
    }
}

impl From<UniformError> for MlErr {
    fn from(value: UniformError) -> Self {
        Self::InvalidInit(value.to_string())
    }
}
