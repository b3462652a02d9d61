//! Cooperative progress reporting and cancellation for refiner construction

use std::fmt;

use log::info;

use super::error::RefinerError;

/// Construction stage being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Filtering identification results
    Ingestion,
    /// Reading spectrum metadata and matching fragments
    Enrichment,
    /// Fitting a binned model
    BinnedFit,
}

impl Stage {
    /// Stage name for logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ingestion => "identification ingestion",
            Stage::Enrichment => "spectrum enrichment",
            Stage::BinnedFit => "binned model fitting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A progress update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Stage being reported
    pub stage: Stage,
    /// Items processed so far
    pub current: usize,
    /// Items in the stage
    pub total: usize,
}

/// What the callback wants construction to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going
    Continue,
    /// Stop; construction fails with [`RefinerError::Cancelled`]
    Cancel,
}

type Callback<'a> = Box<dyn FnMut(&Progress) -> Flow + 'a>;

/// Forwards progress to an optional callback and to the log
pub struct ProgressReporter<'a> {
    callback: Option<Callback<'a>>,
    log_interval: usize,
}

impl<'a> ProgressReporter<'a> {
    /// A reporter that only logs
    pub fn silent() -> Self {
        Self {
            callback: None,
            log_interval: 0,
        }
    }

    /// A reporter that calls `callback` on every update
    pub fn new(callback: impl FnMut(&Progress) -> Flow + 'a) -> Self {
        Self {
            callback: Some(Box::new(callback)),
            log_interval: 0,
        }
    }

    /// Log at info level every `interval` items (0 disables)
    pub fn with_log_interval(mut self, interval: usize) -> Self {
        self.log_interval = interval;
        self
    }

    /// Report an update, failing if the callback cancels
    pub fn report(&mut self, stage: Stage, current: usize, total: usize) -> Result<(), RefinerError> {
        if self.log_interval > 0 && current > 0 && current % self.log_interval == 0 {
            info!("{}: {}/{}", stage, current, total);
        }
        let progress = Progress {
            stage,
            current,
            total,
        };
        match self.callback.as_mut().map(|cb| cb(&progress)) {
            Some(Flow::Cancel) => Err(RefinerError::Cancelled {
                stage: stage.as_str(),
            }),
            _ => Ok(()),
        }
    }
}

impl Default for ProgressReporter<'_> {
    fn default() -> Self {
        Self::silent()
    }
}

impl fmt::Debug for ProgressReporter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("callback", &self.callback.is_some())
            .field("log_interval", &self.log_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_after_limit() {
        let mut seen = 0;
        let mut reporter = ProgressReporter::new(|p: &Progress| {
            seen += 1;
            if p.current >= 3 {
                Flow::Cancel
            } else {
                Flow::Continue
            }
        });
        assert!(reporter.report(Stage::Ingestion, 1, 10).is_ok());
        assert!(reporter.report(Stage::Ingestion, 2, 10).is_ok());
        let err = reporter.report(Stage::Ingestion, 3, 10).unwrap_err();
        assert!(matches!(err, RefinerError::Cancelled { stage: "identification ingestion" }));
        drop(reporter);
        assert_eq!(seen, 3);
    }

    #[test]
    fn test_silent_never_cancels() {
        let mut reporter = ProgressReporter::silent().with_log_interval(2);
        for i in 0..5 {
            assert!(reporter.report(Stage::BinnedFit, i, 5).is_ok());
        }
    }
}
