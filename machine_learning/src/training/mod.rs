mod builder;
mod model_trainer;
mod report;
mod step;
mod trainer;

pub use builder::TrainerBuilder;
pub use model_trainer::{Evaluation, ModelTrainer, TrainingSummary};
pub use report::{LogReporter, Report, Reporter};
pub use step::GradStep;
pub use trainer::Trainer;
