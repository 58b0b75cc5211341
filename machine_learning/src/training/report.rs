use log::info;

/// A running-average loss report, emitted every `report_every` steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    /// The current epoch, starting at 1.
    pub epoch: usize,
    /// The total amount of epochs.
    pub epochs: usize,
    /// The step within the epoch, starting at 1.
    pub step: usize,
    /// The mean loss of the steps since the previous report.
    pub avg_loss: f32,
}

/// A sink for training reports.
pub trait Reporter {
    fn report(&mut self, report: &Report);
}

/// Logs every report at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, report: &Report) {
        let &Report {
            epoch,
            epochs,
            step,
            avg_loss,
        } = report;

        info!(
            epoch, step, avg_loss;
            "epoch {epoch}/{epochs} step {step} loss {avg_loss:.4}"
        );
    }
}

impl Reporter for Vec<Report> {
    fn report(&mut self, report: &Report) {
        self.push(*report);
    }
}
