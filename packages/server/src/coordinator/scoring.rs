//! ICPC-style scoring rules.
//!
//! Pure functions over persisted scoring records; the coordinator's verdict
//! ingestion is their only production caller.

use std::cmp::Reverse;

use common::ProblemStatus;

use crate::entity::{participant, problem_result};

/// Flat penalty for each wrong submission on a problem that is eventually
/// solved, in seconds.
pub const WRONG_ATTEMPT_PENALTY_SECS: i32 = 60;

/// Fold one terminal verdict into a scoring record.
///
/// An accepted record is frozen: later verdicts for the same
/// (participant, problem) pair change nothing. Returns whether the record
/// was mutated, so callers can skip redundant writes.
pub fn apply_verdict(
    result: &mut problem_result::Model,
    accepted: bool,
    elapsed_seconds: i32,
) -> bool {
    if result.status.is_accepted() {
        return false;
    }

    if accepted {
        result.status = ProblemStatus::Accepted;
        result.penalty_seconds = elapsed_seconds.max(0);
    } else {
        if result.status == ProblemStatus::NonTried {
            result.status = ProblemStatus::Tried;
        }
        result.penalty_count += 1;
    }
    true
}

/// Recompute participant aggregates from scratch across all their scoring
/// records. Only solved problems contribute penalty.
pub fn aggregate_stats(results: &[problem_result::Model]) -> (i32, i32) {
    let mut solved = 0;
    let mut total_penalty_seconds = 0;

    for result in results {
        if result.status.is_accepted() {
            solved += 1;
            total_penalty_seconds +=
                result.penalty_seconds + result.penalty_count * WRONG_ATTEMPT_PENALTY_SECS;
        }
    }

    (solved, total_penalty_seconds)
}

/// Leaderboard order: solved DESC, total penalty ASC, id ASC.
pub fn order_participants(participants: &mut [participant::Model]) {
    participants.sort_by_key(|p| (Reverse(p.solved), p.total_penalty_seconds, p.id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fresh_result() -> problem_result::Model {
        problem_result::Model {
            participant_id: 1,
            problem_id: 1,
            status: ProblemStatus::NonTried,
            penalty_count: 0,
            penalty_seconds: 0,
        }
    }

    fn participant(id: i32, solved: i32, penalty: i32) -> participant::Model {
        let now = Utc::now();
        participant::Model {
            id,
            contest_id: 1,
            model_name: format!("model-{id}"),
            solved,
            total_penalty_seconds: penalty,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_first_accept_records_elapsed_seconds() {
        let mut result = fresh_result();
        assert!(apply_verdict(&mut result, true, 42));
        assert_eq!(result.status, ProblemStatus::Accepted);
        assert_eq!(result.penalty_seconds, 42);
        assert_eq!(result.penalty_count, 0);
    }

    #[test]
    fn test_wrong_then_right() {
        // A wrong submission at t=10s, then a correct one at t=40s.
        let mut result = fresh_result();
        assert!(apply_verdict(&mut result, false, 10));
        assert_eq!(result.status, ProblemStatus::Tried);
        assert_eq!(result.penalty_count, 1);

        assert!(apply_verdict(&mut result, true, 40));
        assert_eq!(result.status, ProblemStatus::Accepted);
        assert_eq!(result.penalty_seconds, 40);

        let (solved, penalty) = aggregate_stats(&[result]);
        assert_eq!(solved, 1);
        assert_eq!(penalty, 100);
    }

    #[test]
    fn test_failed_attempt_without_accept_scores_nothing() {
        // A compile error counts an attempt but contributes no penalty
        // until the problem is solved.
        let mut result = fresh_result();
        apply_verdict(&mut result, false, 25);
        assert_eq!(result.status, ProblemStatus::Tried);
        assert_eq!(result.penalty_count, 1);

        let (solved, penalty) = aggregate_stats(&[result]);
        assert_eq!(solved, 0);
        assert_eq!(penalty, 0);
    }

    #[test]
    fn test_accepted_record_is_frozen() {
        let mut result = fresh_result();
        apply_verdict(&mut result, true, 30);

        // Repeated or late verdicts change nothing.
        assert!(!apply_verdict(&mut result, true, 99));
        assert!(!apply_verdict(&mut result, false, 120));
        assert_eq!(result.penalty_seconds, 30);
        assert_eq!(result.penalty_count, 0);
    }

    #[test]
    fn test_elapsed_seconds_clamped_to_zero() {
        let mut result = fresh_result();
        apply_verdict(&mut result, true, -3);
        assert_eq!(result.penalty_seconds, 0);
    }

    #[test]
    fn test_aggregate_across_problems() {
        let mut a = fresh_result();
        apply_verdict(&mut a, false, 10);
        apply_verdict(&mut a, true, 40);

        let mut b = problem_result::Model {
            problem_id: 2,
            ..fresh_result()
        };
        apply_verdict(&mut b, true, 200);

        let mut c = problem_result::Model {
            problem_id: 3,
            ..fresh_result()
        };
        apply_verdict(&mut c, false, 50);

        let (solved, penalty) = aggregate_stats(&[a, b, c]);
        assert_eq!(solved, 2);
        assert_eq!(penalty, 100 + 200);
    }

    #[test]
    fn test_leaderboard_order() {
        let mut rows = vec![
            participant(3, 1, 500),
            participant(1, 2, 300),
            participant(2, 2, 100),
        ];
        order_participants(&mut rows);
        let ids: Vec<i32> = rows.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_leaderboard_tie_break_is_deterministic() {
        // Equal solved and penalty resolve by id ascending, every time.
        let mut rows = vec![
            participant(9, 2, 120),
            participant(4, 2, 120),
            participant(7, 2, 120),
        ];
        order_participants(&mut rows);
        let ids: Vec<i32> = rows.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![4, 7, 9]);

        rows.reverse();
        order_participants(&mut rows);
        let again: Vec<i32> = rows.iter().map(|p| p.id).collect();
        assert_eq!(again, vec![4, 7, 9]);
    }
}
