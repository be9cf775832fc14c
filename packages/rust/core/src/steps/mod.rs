//! Step executors.
//!
//! Each executor turns validated input into validated output and owns its
//! fallback policy: a capability error or contract violation never escapes
//! as `Err`, it becomes a safe default plus a [`StepStatus`] and diagnostics.

pub mod chart;
pub mod competitors;
pub mod insights;
pub mod reviews;
pub mod summary;
pub mod trends;
pub mod urls;

use marketscope_shared::{StepKind, StepRecord, StepStatus};

/// Output of one step together with how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome<T> {
    pub value: T,
    pub status: StepStatus,
    pub diagnostics: Vec<String>,
}

impl<T> StepOutcome<T> {
    pub fn succeeded(value: T) -> Self {
        Self {
            value,
            status: StepStatus::Succeeded,
            diagnostics: Vec::new(),
        }
    }

    pub fn degraded(value: T, diagnostics: Vec<String>) -> Self {
        Self {
            value,
            status: StepStatus::Degraded,
            diagnostics,
        }
    }

    /// A safe default standing in for output that could not be produced.
    pub fn failed(value: T, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            value,
            status: StepStatus::Failed {
                reason: reason.clone(),
            },
            diagnostics: vec![reason],
        }
    }

    pub fn skipped(value: T, reason: impl Into<String>) -> Self {
        Self {
            value,
            status: StepStatus::Skipped {
                reason: reason.into(),
            },
            diagnostics: Vec::new(),
        }
    }

    /// Succeeded when nothing was logged, otherwise degraded.
    pub fn from_diagnostics(value: T, diagnostics: Vec<String>) -> Self {
        if diagnostics.is_empty() {
            Self::succeeded(value)
        } else {
            Self::degraded(value, diagnostics)
        }
    }

    /// Split into the value and a ledger record.
    pub fn into_record(self, step: StepKind, elapsed_ms: u64) -> (T, StepRecord) {
        let record = StepRecord {
            step,
            status: self.status,
            diagnostics: self.diagnostics,
            elapsed_ms,
        };
        (self.value, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_decide_between_succeeded_and_degraded() {
        let clean = StepOutcome::from_diagnostics(1, Vec::new());
        assert_eq!(clean.status, StepStatus::Succeeded);

        let noisy = StepOutcome::from_diagnostics(1, vec!["widget empty".into()]);
        assert_eq!(noisy.status, StepStatus::Degraded);
    }

    #[test]
    fn failed_outcome_records_reason_as_diagnostic() {
        let (value, record) =
            StepOutcome::failed(Vec::<u8>::new(), "no reply").into_record(StepKind::Narrative, 12);
        assert!(value.is_empty());
        assert_eq!(
            record.status,
            StepStatus::Failed {
                reason: "no reply".into()
            }
        );
        assert_eq!(record.diagnostics, vec!["no reply"]);
        assert_eq!(record.elapsed_ms, 12);
    }
}
