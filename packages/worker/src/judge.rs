//! The judge pipeline: stage the code, compile it, run the test cases in
//! order inside the sandbox, classify each outcome, and aggregate a
//! submission verdict.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tokio::fs;
use tracing::{debug, warn};

use common::execution::{ExecutionRequest, ExecutionResult, TestCaseData, TestCaseResult};
use common::{Language, SubmissionStatus, TestCaseStatus};

use crate::error::WorkerError;
use crate::sandbox::{RunLimits, RunOutcome, RunSpec, Sandbox};

/// Cap on combined compiler stdout+stderr carried in the verdict.
pub const COMPILER_OUTPUT_CAP: usize = 2048;

/// Cap on program stdout per test case.
pub const OUTPUT_LIMIT_BYTES: usize = 1 << 20;

/// Grace added to the problem's time limit before the sandbox kills.
const WALL_CLOCK_BUFFER_MS: u64 = 50;

const COMPILE_WALL_TIME: Duration = Duration::from_secs(30);
const COMPILE_MEMORY_KB: i64 = 1024 * 1024;

const ARTIFACT_NAME: &str = "solution";

/// Judge one request to completion. Never fails: pipeline errors become a
/// `JUDGEMENT_FAILED` verdict.
pub async fn judge_submission(
    request: &ExecutionRequest,
    sandbox: &dyn Sandbox,
    worker_id: &str,
) -> ExecutionResult {
    let mut result = match run_pipeline(request, sandbox).await {
        Ok(result) => result,
        Err(e) => {
            warn!(
                job_id = %request.job_id,
                submission_id = request.submission_id,
                error = %e,
                "Judging failed"
            );
            ExecutionResult::judgement_failed(
                request.job_id.clone(),
                request.submission_id,
                format!("Execution failed: {e}"),
            )
        }
    };
    result.worker_id = worker_id.to_string();
    result.processed_at = Utc::now();
    result
}

async fn run_pipeline(
    request: &ExecutionRequest,
    sandbox: &dyn Sandbox,
) -> Result<ExecutionResult, WorkerError> {
    let workdir = stage_job(request).await?;
    let result = execute_staged(request, sandbox, &workdir).await;
    if let Err(e) = fs::remove_dir_all(&workdir).await {
        warn!(workdir = %workdir.display(), error = %e, "Failed to remove job directory");
    }
    result
}

/// Write the source into a fresh per-job working directory.
async fn stage_job(request: &ExecutionRequest) -> Result<PathBuf, WorkerError> {
    let dir = std::env::temp_dir().join(format!(
        "judge-{}-{}",
        request.submission_id, request.job_id
    ));
    fs::create_dir_all(&dir).await?;
    fs::write(dir.join(request.language.source_filename()), &request.code).await?;
    Ok(dir)
}

async fn execute_staged(
    request: &ExecutionRequest,
    sandbox: &dyn Sandbox,
    workdir: &Path,
) -> Result<ExecutionResult, WorkerError> {
    if request.language.requires_compilation() {
        let outcome = compile(request, sandbox, workdir).await?;
        if !outcome.succeeded() {
            return Ok(compilation_error(request, &outcome));
        }
    }

    let wall_time =
        Duration::from_millis(request.time_limit_ms.max(0) as u64 + WALL_CLOCK_BUFFER_MS);
    let memory_limit_kb = i64::from(request.memory_limit_mb) * 1024;

    let mut results: Vec<TestCaseResult> = Vec::with_capacity(request.test_cases.len());
    let mut passed = 0;
    let mut total_time_ms = 0;
    let mut max_memory_kb = 0;
    let mut failed = false;

    for tc in &request.test_cases {
        if failed {
            results.push(TestCaseResult::not_executed(tc));
            continue;
        }

        let outcome = run_test_case(request, sandbox, workdir, tc, wall_time).await?;
        let result = classify(tc, &outcome, memory_limit_kb);

        total_time_ms += result.execution_time_ms;
        max_memory_kb = max_memory_kb.max(result.memory_used_kb);

        if result.status.is_passed() {
            passed += 1;
        } else {
            debug!(
                job_id = %request.job_id,
                test_order = tc.test_order,
                status = ?result.status,
                "Test case failed, skipping the rest"
            );
            failed = true;
        }
        results.push(result);
    }

    let (status, verdict_message) = aggregate_verdict(&results);

    Ok(ExecutionResult {
        job_id: request.job_id.clone(),
        submission_id: request.submission_id,
        status,
        verdict_message,
        total_test_cases: request.test_cases.len() as i32,
        passed_test_cases: passed,
        execution_time_ms: total_time_ms,
        memory_used_kb: max_memory_kb,
        compiler_output: String::new(),
        test_case_results: results,
        processed_at: Utc::now(),
        worker_id: String::new(),
    })
}

async fn compile(
    request: &ExecutionRequest,
    sandbox: &dyn Sandbox,
    workdir: &Path,
) -> Result<RunOutcome, WorkerError> {
    let argv = vec![
        "g++".to_string(),
        "-std=c++20".to_string(),
        "-O2".to_string(),
        "-o".to_string(),
        ARTIFACT_NAME.to_string(),
        request.language.source_filename().to_string(),
    ];

    Ok(sandbox
        .run(RunSpec {
            argv,
            workdir: workdir.to_path_buf(),
            stdin_file: None,
            outputs: vec![ARTIFACT_NAME.to_string()],
            limits: RunLimits {
                wall_time: COMPILE_WALL_TIME,
                memory_kb: Some(COMPILE_MEMORY_KB),
            },
        })
        .await?)
}

fn compilation_error(request: &ExecutionRequest, outcome: &RunOutcome) -> ExecutionResult {
    ExecutionResult {
        job_id: request.job_id.clone(),
        submission_id: request.submission_id,
        status: SubmissionStatus::CompilationError,
        verdict_message: "Compilation failed".to_string(),
        total_test_cases: request.test_cases.len() as i32,
        passed_test_cases: 0,
        execution_time_ms: 0,
        memory_used_kb: 0,
        compiler_output: truncate_compiler_output(&outcome.stdout, &outcome.stderr),
        test_case_results: vec![],
        processed_at: Utc::now(),
        worker_id: String::new(),
    }
}

/// Run one test case in an isolated subdirectory holding only the artifact
/// and `input.txt`.
async fn run_test_case(
    request: &ExecutionRequest,
    sandbox: &dyn Sandbox,
    workdir: &Path,
    tc: &TestCaseData,
    wall_time: Duration,
) -> Result<RunOutcome, WorkerError> {
    let test_dir = workdir.join(format!("test_{}", tc.test_order));
    fs::create_dir_all(&test_dir).await?;

    let artifact = match request.language {
        Language::Cpp => ARTIFACT_NAME,
        Language::Python => request.language.source_filename(),
    };
    fs::copy(workdir.join(artifact), test_dir.join(artifact)).await?;
    fs::write(test_dir.join("input.txt"), &tc.input).await?;

    let argv = match request.language {
        Language::Cpp => vec![format!("./{ARTIFACT_NAME}")],
        Language::Python => vec![
            "python3".to_string(),
            request.language.source_filename().to_string(),
        ],
    };

    let outcome = sandbox
        .run(RunSpec {
            argv,
            workdir: test_dir.clone(),
            stdin_file: Some("input.txt".to_string()),
            outputs: vec![],
            limits: RunLimits {
                wall_time,
                memory_kb: Some(i64::from(request.memory_limit_mb) * 1024),
            },
        })
        .await?;

    let _ = fs::remove_dir_all(&test_dir).await;
    Ok(outcome)
}

/// Classify a run outcome against the expected output and limits.
fn classify(tc: &TestCaseData, outcome: &RunOutcome, memory_limit_kb: i64) -> TestCaseResult {
    let mut result = TestCaseResult {
        test_order: tc.test_order,
        status: TestCaseStatus::Passed,
        actual_output: outcome.stdout.trim().to_string(),
        expected_output: tc.expected_output.clone(),
        execution_time_ms: outcome.wall_time_ms as i32,
        memory_used_kb: outcome.memory_kb.unwrap_or(0) as i32,
        error_message: None,
    };

    if outcome.timed_out {
        result.status = TestCaseStatus::TimeLimitExceeded;
        result.actual_output = String::new();
        return result;
    }

    if outcome.memory_kb.is_some_and(|kb| kb > memory_limit_kb) {
        result.status = TestCaseStatus::MemoryLimitExceeded;
        return result;
    }

    if !outcome.succeeded() {
        result.status = TestCaseStatus::RuntimeError;
        result.error_message = Some(match (outcome.exit_code, outcome.signal) {
            (Some(code), _) => format!("Process exited with code {code}"),
            (None, Some(signal)) => format!("Process killed by signal {signal}"),
            (None, None) => "Process terminated abnormally".to_string(),
        });
        return result;
    }

    if outcome.stdout.len() > OUTPUT_LIMIT_BYTES {
        result.status = TestCaseStatus::OutputLimitExceeded;
        result.actual_output = String::new();
        return result;
    }

    result.status = classify_output(&outcome.stdout, &tc.expected_output);
    result
}

/// Compare program output against the expectation: equal after trimming is
/// a pass; equal after stripping all spaces and newlines is a presentation
/// error; anything else is a wrong answer.
fn classify_output(actual: &str, expected: &str) -> TestCaseStatus {
    if actual.trim() == expected.trim() {
        return TestCaseStatus::Passed;
    }
    if strip_whitespace(actual) == strip_whitespace(expected) {
        return TestCaseStatus::PresentationError;
    }
    TestCaseStatus::WrongAnswer
}

fn strip_whitespace(s: &str) -> String {
    s.replace(' ', "").replace('\n', "")
}

/// The overall verdict is the first failing test case's classification.
fn aggregate_verdict(results: &[TestCaseResult]) -> (SubmissionStatus, String) {
    for result in results {
        if matches!(
            result.status,
            TestCaseStatus::Passed | TestCaseStatus::NotExecuted
        ) {
            continue;
        }
        return (
            result.status.submission_status(),
            format!(
                "{} on test case {}",
                status_label(result.status),
                result.test_order
            ),
        );
    }
    (
        SubmissionStatus::Accepted,
        "All test cases passed".to_string(),
    )
}

fn status_label(status: TestCaseStatus) -> &'static str {
    match status {
        TestCaseStatus::WrongAnswer => "Wrong Answer",
        TestCaseStatus::PresentationError => "Presentation Error",
        TestCaseStatus::TimeLimitExceeded => "Time Limit Exceeded",
        TestCaseStatus::MemoryLimitExceeded => "Memory Limit Exceeded",
        TestCaseStatus::RuntimeError => "Runtime Error",
        TestCaseStatus::OutputLimitExceeded => "Output Limit Exceeded",
        TestCaseStatus::Passed | TestCaseStatus::NotExecuted => "Unknown error",
    }
}

fn truncate_compiler_output(stdout: &str, stderr: &str) -> String {
    let combined = format!("{stderr}{stdout}");
    if combined.len() <= COMPILER_OUTPUT_CAP {
        return combined;
    }
    let mut cut = COMPILER_OUTPUT_CAP;
    while !combined.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... (output truncated)", &combined[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_case(order: i32, expected: &str) -> TestCaseData {
        TestCaseData {
            input: String::new(),
            expected_output: expected.to_string(),
            test_order: order,
        }
    }

    fn clean_outcome(stdout: &str) -> RunOutcome {
        RunOutcome {
            exit_code: Some(0),
            signal: None,
            timed_out: false,
            wall_time_ms: 12,
            memory_kb: Some(2048),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    fn result_with(order: i32, status: TestCaseStatus) -> TestCaseResult {
        TestCaseResult {
            test_order: order,
            status,
            actual_output: String::new(),
            expected_output: String::new(),
            execution_time_ms: 0,
            memory_used_kb: 0,
            error_message: None,
        }
    }

    #[test]
    fn test_trailing_newline_passes() {
        assert_eq!(classify_output("answer\n", "answer"), TestCaseStatus::Passed);
    }

    #[test]
    fn test_spaced_output_is_presentation_error() {
        assert_eq!(
            classify_output(" a n s w e r", "answer"),
            TestCaseStatus::PresentationError
        );
    }

    #[test]
    fn test_line_split_output_is_presentation_error() {
        assert_eq!(
            classify_output("1 2 3", "1\n2\n3"),
            TestCaseStatus::PresentationError
        );
    }

    #[test]
    fn test_wrong_output_is_wrong_answer() {
        assert_eq!(classify_output("4", "5"), TestCaseStatus::WrongAnswer);
    }

    #[test]
    fn test_classify_timeout_wins() {
        let outcome = RunOutcome {
            timed_out: true,
            exit_code: None,
            ..clean_outcome("")
        };
        let result = classify(&test_case(1, "5"), &outcome, 256 * 1024);
        assert_eq!(result.status, TestCaseStatus::TimeLimitExceeded);
    }

    #[test]
    fn test_classify_memory_over_limit() {
        let outcome = RunOutcome {
            memory_kb: Some(300 * 1024),
            ..clean_outcome("5")
        };
        let result = classify(&test_case(1, "5"), &outcome, 256 * 1024);
        assert_eq!(result.status, TestCaseStatus::MemoryLimitExceeded);
    }

    #[test]
    fn test_classify_nonzero_exit_is_runtime_error() {
        let outcome = RunOutcome {
            exit_code: Some(1),
            ..clean_outcome("")
        };
        let result = classify(&test_case(1, "5"), &outcome, 256 * 1024);
        assert_eq!(result.status, TestCaseStatus::RuntimeError);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Process exited with code 1")
        );
    }

    #[test]
    fn test_classify_oversized_output() {
        let outcome = clean_outcome(&"x".repeat(OUTPUT_LIMIT_BYTES + 1));
        let result = classify(&test_case(1, "5"), &outcome, 256 * 1024);
        assert_eq!(result.status, TestCaseStatus::OutputLimitExceeded);
    }

    #[test]
    fn test_classify_pass() {
        let result = classify(&test_case(1, "5"), &clean_outcome("5\n"), 256 * 1024);
        assert_eq!(result.status, TestCaseStatus::Passed);
        assert_eq!(result.actual_output, "5");
    }

    #[test]
    fn test_aggregate_all_passed() {
        let results = vec![
            result_with(1, TestCaseStatus::Passed),
            result_with(2, TestCaseStatus::Passed),
        ];
        let (status, message) = aggregate_verdict(&results);
        assert_eq!(status, SubmissionStatus::Accepted);
        assert_eq!(message, "All test cases passed");
    }

    #[test]
    fn test_aggregate_first_failure_decides() {
        let results = vec![
            result_with(1, TestCaseStatus::Passed),
            result_with(2, TestCaseStatus::TimeLimitExceeded),
            result_with(3, TestCaseStatus::NotExecuted),
        ];
        let (status, message) = aggregate_verdict(&results);
        assert_eq!(status, SubmissionStatus::TimeLimitExceeded);
        assert_eq!(message, "Time Limit Exceeded on test case 2");
    }

    #[test]
    fn test_aggregate_wrong_answer_names_test() {
        let results = vec![
            result_with(1, TestCaseStatus::WrongAnswer),
            result_with(2, TestCaseStatus::NotExecuted),
        ];
        let (status, message) = aggregate_verdict(&results);
        assert_eq!(status, SubmissionStatus::WrongAnswer);
        assert_eq!(message, "Wrong Answer on test case 1");
    }

    #[test]
    fn test_truncate_compiler_output() {
        let short = truncate_compiler_output("out", "err");
        assert_eq!(short, "errout");

        let long = truncate_compiler_output(&"x".repeat(COMPILER_OUTPUT_CAP * 2), "");
        assert!(long.ends_with("... (output truncated)"));
        assert!(long.len() < COMPILER_OUTPUT_CAP + 32);
    }
}
