pub mod contest;
pub mod execution;
pub mod submission_status;
pub mod worker;

pub use contest::{ContestState, Language, ProblemStatus, ProblemTag};
pub use execution::{ExecutionRequest, ExecutionResult, TestCaseData, TestCaseResult};
pub use submission_status::{SubmissionStatus, TestCaseStatus};
pub use worker::WorkerStatus;
