#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a submission during the judging lifecycle.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    /// Waiting to be picked up by a worker.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "PENDING"))]
    Pending,
    /// Currently being compiled.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "COMPILING"))]
    Compiling,
    /// Currently running test cases.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "RUNNING"))]
    Running,
    /// All test cases passed.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "ACCEPTED"))]
    Accepted,
    /// Output did not match the expected output.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "WRONG_ANSWER"))]
    WrongAnswer,
    /// Output matches only after stripping all whitespace.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "PRESENTATION_ERROR"))]
    PresentationError,
    /// Exceeded the wall-clock limit.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "TIME_LIMIT_EXCEEDED"))]
    TimeLimitExceeded,
    /// Exceeded the memory limit.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "MEMORY_LIMIT_EXCEEDED"))]
    MemoryLimitExceeded,
    /// Program crashed or exited with a non-zero code.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "RUNTIME_ERROR"))]
    RuntimeError,
    /// Failed to compile.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "COMPILATION_ERROR"))]
    CompilationError,
    /// Wrote more output than the judge accepts.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "OUTPUT_LIMIT_EXCEEDED"))]
    OutputLimitExceeded,
    /// Platform failure while judging. Not a participant fault.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "JUDGEMENT_FAILED"))]
    JudgementFailed,
}

impl SubmissionStatus {
    /// Returns true if this is a final verdict (judging is complete).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Compiling | Self::Running)
    }

    /// Returns true if this is a successful verdict.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Returns true if this verdict accrues a wrong-attempt penalty.
    ///
    /// `JudgementFailed` records a platform failure, so it never counts
    /// against the participant.
    pub fn counts_as_penalty(&self) -> bool {
        self.is_terminal() && !matches!(self, Self::Accepted | Self::JudgementFailed)
    }

    /// All possible status values.
    pub const ALL: &'static [SubmissionStatus] = &[
        Self::Pending,
        Self::Compiling,
        Self::Running,
        Self::Accepted,
        Self::WrongAnswer,
        Self::PresentationError,
        Self::TimeLimitExceeded,
        Self::MemoryLimitExceeded,
        Self::RuntimeError,
        Self::CompilationError,
        Self::OutputLimitExceeded,
        Self::JudgementFailed,
    ];

    /// All terminal verdict statuses.
    pub const TERMINAL: &'static [SubmissionStatus] = &[
        Self::Accepted,
        Self::WrongAnswer,
        Self::PresentationError,
        Self::TimeLimitExceeded,
        Self::MemoryLimitExceeded,
        Self::RuntimeError,
        Self::CompilationError,
        Self::OutputLimitExceeded,
        Self::JudgementFailed,
    ];

    /// Returns the persisted string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Compiling => "COMPILING",
            Self::Running => "RUNNING",
            Self::Accepted => "ACCEPTED",
            Self::WrongAnswer => "WRONG_ANSWER",
            Self::PresentationError => "PRESENTATION_ERROR",
            Self::TimeLimitExceeded => "TIME_LIMIT_EXCEEDED",
            Self::MemoryLimitExceeded => "MEMORY_LIMIT_EXCEEDED",
            Self::RuntimeError => "RUNTIME_ERROR",
            Self::CompilationError => "COMPILATION_ERROR",
            Self::OutputLimitExceeded => "OUTPUT_LIMIT_EXCEEDED",
            Self::JudgementFailed => "JUDGEMENT_FAILED",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            SubmissionStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubmissionStatus::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| ParseStatusError {
                invalid: s.to_string(),
            })
    }
}

/// Outcome of running a single test case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestCaseStatus {
    Passed,
    WrongAnswer,
    PresentationError,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    RuntimeError,
    OutputLimitExceeded,
    /// Skipped because an earlier test case already failed.
    NotExecuted,
}

impl TestCaseStatus {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// The submission-level status this test case outcome maps to.
    ///
    /// `Passed` and `NotExecuted` never decide the overall verdict, so they
    /// fall back to `JudgementFailed` if asked.
    pub fn submission_status(&self) -> SubmissionStatus {
        match self {
            Self::WrongAnswer => SubmissionStatus::WrongAnswer,
            Self::PresentationError => SubmissionStatus::PresentationError,
            Self::TimeLimitExceeded => SubmissionStatus::TimeLimitExceeded,
            Self::MemoryLimitExceeded => SubmissionStatus::MemoryLimitExceeded,
            Self::RuntimeError => SubmissionStatus::RuntimeError,
            Self::OutputLimitExceeded => SubmissionStatus::OutputLimitExceeded,
            Self::Passed | Self::NotExecuted => SubmissionStatus::JudgementFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_roundtrip() {
        for status in SubmissionStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            let parsed: SubmissionStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(*status, parsed);
        }
    }

    #[test]
    fn test_wire_values() {
        assert_eq!(
            serde_json::to_string(&SubmissionStatus::WrongAnswer).unwrap(),
            "\"WRONG_ANSWER\""
        );
        assert_eq!(
            serde_json::to_string(&SubmissionStatus::JudgementFailed).unwrap(),
            "\"JUDGEMENT_FAILED\""
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "ACCEPTED".parse::<SubmissionStatus>().unwrap(),
            SubmissionStatus::Accepted
        );
        assert!("Invalid".parse::<SubmissionStatus>().is_err());
    }

    #[test]
    fn test_terminality() {
        assert!(!SubmissionStatus::Pending.is_terminal());
        assert!(!SubmissionStatus::Compiling.is_terminal());
        assert!(!SubmissionStatus::Running.is_terminal());
        for status in SubmissionStatus::TERMINAL {
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn test_penalty_accrual() {
        assert!(SubmissionStatus::WrongAnswer.counts_as_penalty());
        assert!(SubmissionStatus::CompilationError.counts_as_penalty());
        assert!(!SubmissionStatus::Accepted.counts_as_penalty());
        assert!(!SubmissionStatus::JudgementFailed.counts_as_penalty());
        assert!(!SubmissionStatus::Running.counts_as_penalty());
    }

    #[test]
    fn test_test_case_status_mapping() {
        assert_eq!(
            TestCaseStatus::TimeLimitExceeded.submission_status(),
            SubmissionStatus::TimeLimitExceeded
        );
        assert_eq!(
            TestCaseStatus::PresentationError.submission_status(),
            SubmissionStatus::PresentationError
        );
    }
}
