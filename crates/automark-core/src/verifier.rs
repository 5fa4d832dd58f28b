//! Grading of challenge answers against held-out outputs.

use tracing::{debug, warn};

use crate::array::NdArray;
use crate::error::{GradeError, GradeResult};
use crate::held_out::HeldOutSet;
use crate::progress::ProgressStore;
use crate::tolerance::Tolerance;

/// Outcome of one graded answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub correct: bool,
    /// The answer flipped the user's record to completed.
    pub newly_completed: bool,
}

/// Parse a JSON-encoded answer (number or nested list).
pub fn parse_answer(answer: &str) -> GradeResult<NdArray> {
    NdArray::parse(answer).map_err(|e| GradeError::malformed(e.to_string()))
}

/// Grade `answer` for the case behind `token`.
///
/// The attempt is recorded before the token and answer are examined, so even
/// a rejected request leaves an "attempted" trace. Completion is written only
/// on the first correct answer.
pub fn verify_answer(
    held_out: &HeldOutSet,
    progress: &ProgressStore,
    user: &str,
    assignment: &str,
    token: u32,
    answer: &str,
) -> GradeResult<Verdict> {
    progress.record_attempt(user, assignment)?;

    let case = held_out.resolve(assignment, token)?;
    let submitted = parse_answer(answer)?;
    let correct = Tolerance::REMOTE
        .all_close(&submitted, &case.expected)
        .map_err(|e| GradeError::malformed(e.to_string()))?;

    let newly_completed = if correct {
        progress.record_completion(user, assignment)?
    } else {
        false
    };

    if correct {
        debug!(user, assignment, token, newly_completed, "answer accepted");
    } else {
        warn!(user, assignment, token, "answer rejected");
    }

    Ok(Verdict {
        correct,
        newly_completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::held_out::HeldOutCase;
    use crate::progress::{MemoryProgressBackend, ProgressState};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn fixture() -> (HeldOutSet, ProgressStore, Arc<MemoryProgressBackend>) {
        let held_out = HeldOutSet::new(BTreeMap::from([(
            "pair".to_string(),
            vec![HeldOutCase {
                token: 17,
                inputs: BTreeMap::new(),
                expected: NdArray::from_vec(vec![1.0, 2.0]),
            }],
        )]))
        .unwrap();
        let backend = Arc::new(MemoryProgressBackend::new());
        let progress = ProgressStore::open(backend.clone(), ["alice"]).unwrap();
        (held_out, progress, backend)
    }

    #[test]
    fn wrong_answer_leaves_attempted_trace() {
        let (held_out, progress, _) = fixture();
        let verdict =
            verify_answer(&held_out, &progress, "alice", "pair", 17, "[1.001, 2.0]").unwrap();
        assert!(!verdict.correct);
        assert_eq!(
            progress.state("alice", "pair").unwrap(),
            ProgressState::Attempted
        );
    }

    #[test]
    fn repeated_correct_answer_is_a_no_op() {
        let (held_out, progress, backend) = fixture();
        let first =
            verify_answer(&held_out, &progress, "alice", "pair", 17, "[1.00001, 2.0]").unwrap();
        assert!(first.correct && first.newly_completed);
        let saves = backend.save_count();

        let second =
            verify_answer(&held_out, &progress, "alice", "pair", 17, "[1.0, 2.0]").unwrap();
        assert!(second.correct && !second.newly_completed);
        assert_eq!(backend.save_count(), saves);
    }

    #[test]
    fn unknown_token_is_a_protocol_error_after_attempt() {
        let (held_out, progress, _) = fixture();
        let err = verify_answer(&held_out, &progress, "alice", "pair", 18, "[1, 2]").unwrap_err();
        assert!(matches!(err, GradeError::UnknownChallenge { token: 18, .. }));
        assert_eq!(
            progress.state("alice", "pair").unwrap(),
            ProgressState::Attempted
        );
    }

    #[test]
    fn unparsable_or_misshaped_answers_are_malformed() {
        let (held_out, progress, _) = fixture();
        for answer in ["not json", "[[1, 2], [3]]", "[1, 2, 3]"] {
            let err =
                verify_answer(&held_out, &progress, "alice", "pair", 17, answer).unwrap_err();
            assert!(
                matches!(err, GradeError::MalformedAnswer { .. }),
                "{answer}: {err:?}"
            );
        }
    }

    fn unbounded_fixture() -> (HeldOutSet, ProgressStore) {
        let held_out = HeldOutSet::new(BTreeMap::from([(
            "overflow".to_string(),
            vec![HeldOutCase {
                token: 3,
                inputs: BTreeMap::new(),
                expected: NdArray::from_vec(vec![f64::INFINITY, 1.0]),
            }],
        )]))
        .unwrap();
        let progress =
            ProgressStore::open(Arc::new(MemoryProgressBackend::new()), ["alice"]).unwrap();
        (held_out, progress)
    }

    #[test]
    fn infinite_answer_matches_infinite_expected() {
        let (held_out, progress) = unbounded_fixture();
        let answer = NdArray::from_vec(vec![f64::INFINITY, 1.0]).to_json().to_string();
        let verdict =
            verify_answer(&held_out, &progress, "alice", "overflow", 3, &answer).unwrap();
        assert!(verdict.correct && verdict.newly_completed);
        assert_eq!(
            progress.state("alice", "overflow").unwrap(),
            ProgressState::Completed
        );
    }

    #[test]
    fn nan_or_wrong_sign_answer_is_incorrect_not_malformed() {
        let (held_out, progress) = unbounded_fixture();
        for answer in [r#"["NaN", 1.0]"#, r#"["-Infinity", 1.0]"#] {
            let verdict =
                verify_answer(&held_out, &progress, "alice", "overflow", 3, answer).unwrap();
            assert!(!verdict.correct, "{answer}");
        }
        assert_eq!(
            progress.state("alice", "overflow").unwrap(),
            ProgressState::Attempted
        );
    }

    #[test]
    fn scalar_answer_broadcasts_against_expected() {
        let (held_out, progress, _) = fixture();
        let verdict = verify_answer(&held_out, &progress, "alice", "pair", 17, "1.0").unwrap();
        assert!(!verdict.correct);
    }
}
