use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contest::Language;
use crate::submission_status::{SubmissionStatus, TestCaseStatus};

/// Test case data shipped to the worker inside a job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCaseData {
    /// Input fed to the program on stdin.
    pub input: String,
    /// Expected output for comparison.
    pub expected_output: String,
    /// Position within the problem's ordered test case list.
    pub test_order: i32,
}

/// A judge job published on the jobs channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Job identifier (UUID), fresh per enqueue.
    pub job_id: String,
    pub submission_id: i32,
    pub contest_id: i32,
    pub participant_id: i32,
    pub problem_id: i32,
    /// Source code to judge.
    pub code: String,
    pub language: Language,
    /// Test cases in ascending `test_order`.
    pub test_cases: Vec<TestCaseData>,
    /// Per-test-case wall-clock limit in milliseconds.
    pub time_limit_ms: i32,
    /// Peak memory limit in megabytes.
    pub memory_limit_mb: i32,
    pub created_at: DateTime<Utc>,
}

impl ExecutionRequest {
    /// Create a request with a generated job id.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        submission_id: i32,
        contest_id: i32,
        participant_id: i32,
        problem_id: i32,
        code: String,
        language: Language,
        test_cases: Vec<TestCaseData>,
        time_limit_ms: i32,
        memory_limit_mb: i32,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            submission_id,
            contest_id,
            participant_id,
            problem_id,
            code,
            language,
            test_cases,
            time_limit_ms,
            memory_limit_mb,
            created_at: Utc::now(),
        }
    }
}

/// Result for a single executed test case.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub test_order: i32,
    pub status: TestCaseStatus,
    pub actual_output: String,
    pub expected_output: String,
    pub execution_time_ms: i32,
    pub memory_used_kb: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TestCaseResult {
    /// Placeholder for a test case skipped after an earlier failure.
    pub fn not_executed(tc: &TestCaseData) -> Self {
        Self {
            test_order: tc.test_order,
            status: TestCaseStatus::NotExecuted,
            actual_output: String::new(),
            expected_output: tc.expected_output.clone(),
            execution_time_ms: 0,
            memory_used_kb: 0,
            error_message: None,
        }
    }
}

/// Verdict published on the results channel after judging a submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Original job id.
    pub job_id: String,
    pub submission_id: i32,
    /// Final submission status.
    pub status: SubmissionStatus,
    /// Human-readable verdict, names the failing test case if any.
    pub verdict_message: String,
    pub test_case_results: Vec<TestCaseResult>,
    pub total_test_cases: i32,
    pub passed_test_cases: i32,
    /// Summed execution time across executed test cases (milliseconds).
    pub execution_time_ms: i32,
    /// Peak memory across executed test cases (kilobytes).
    pub memory_used_kb: i32,
    /// Truncated compiler output, set on compilation errors.
    #[serde(default)]
    pub compiler_output: String,
    pub processed_at: DateTime<Utc>,
    pub worker_id: String,
}

impl ExecutionResult {
    /// Result recording a platform failure. Carries no test case detail and
    /// never accrues a penalty.
    pub fn judgement_failed(
        job_id: impl Into<String>,
        submission_id: i32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            submission_id,
            status: SubmissionStatus::JudgementFailed,
            verdict_message: message.into(),
            test_case_results: vec![],
            total_test_cases: 0,
            passed_test_cases: 0,
            execution_time_ms: 0,
            memory_used_kb: 0,
            compiler_output: String::new(),
            processed_at: Utc::now(),
            worker_id: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> ExecutionRequest {
        ExecutionRequest::new(
            7,
            1,
            2,
            3,
            "print(input())".into(),
            Language::Python,
            vec![TestCaseData {
                input: "2 3".into(),
                expected_output: "5".into(),
                test_order: 1,
            }],
            1000,
            256,
        )
    }

    #[test]
    fn test_request_roundtrip() {
        let req = sample_request();
        let json = serde_json::to_string(&req).unwrap();
        let parsed: ExecutionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.job_id, req.job_id);
        assert_eq!(parsed.submission_id, 7);
        assert_eq!(parsed.test_cases.len(), 1);
        assert_eq!(parsed.language, Language::Python);
    }

    #[test]
    fn test_fresh_job_ids() {
        assert_ne!(sample_request().job_id, sample_request().job_id);
    }

    #[test]
    fn test_judgement_failed_result() {
        let result = ExecutionResult::judgement_failed("job-1", 7, "broker unavailable");
        assert_eq!(result.status, SubmissionStatus::JudgementFailed);
        assert!(result.test_case_results.is_empty());
        assert_eq!(result.passed_test_cases, 0);
    }
}
