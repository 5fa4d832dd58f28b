//! End-to-end checks of the verification protocol over a file-backed context.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use automark_core::{
    ArgValue, BundleArtifact, FileProgressBackend, FixtureBundle, GradeError, GradingContext,
    HeldOutCase, HeldOutSet, ManualClock, NdArray, ProgressState, ServerConfig, TestCase,
    ThrottleGuard, UserDirectory, UserInfo,
};

const WINDOW: Duration = Duration::from_secs(30);

fn held_out() -> HeldOutSet {
    HeldOutSet::new(BTreeMap::from([
        (
            "pair".to_string(),
            vec![HeldOutCase {
                token: 17,
                inputs: BTreeMap::from([(
                    "x".to_string(),
                    ArgValue::NdArray(NdArray::from_vec(vec![0.5, 1.0])),
                )]),
                expected: NdArray::from_vec(vec![1.0, 2.0]),
            }],
        ),
        (
            "sigmoid".to_string(),
            vec![HeldOutCase {
                token: 4,
                inputs: BTreeMap::from([("x".to_string(), ArgValue::Scalar(0.0))]),
                expected: NdArray::scalar(0.5),
            }],
        ),
    ]))
    .unwrap()
}

fn bundle() -> BundleArtifact {
    BundleArtifact::from_bundle(&FixtureBundle::new().with_assignment(
        "pair",
        vec![TestCase::new(NdArray::from_vec(vec![2.0, 4.0]))
            .with_input("x", NdArray::from_vec(vec![1.0, 2.0]))],
    ))
    .unwrap()
}

fn users() -> UserDirectory {
    UserDirectory::new()
        .with_user(
            "alice",
            UserInfo {
                name: "Alice".into(),
                mail: "alice@example.org".into(),
            },
        )
        .with_user(
            "bob",
            UserInfo {
                name: "Bob".into(),
                mail: "bob@example.org".into(),
            },
        )
}

fn context(progress_dir: &Path) -> (GradingContext, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let throttle = ThrottleGuard::with_clock(WINDOW, clock.clone());
    let backend = Arc::new(FileProgressBackend::new(progress_dir));
    let ctx = GradingContext::new(users(), held_out(), bundle(), throttle, backend).unwrap();
    (ctx, clock)
}

fn state(ctx: &GradingContext, user: &str, assignment: &str) -> ProgressState {
    ctx.progress_report(user).unwrap().progress[assignment]
}

#[test]
fn unregistered_user_is_rejected_everywhere_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _) = context(dir.path());

    assert!(matches!(
        ctx.issue_challenge("ghost", "pair"),
        Err(GradeError::UnknownUser { .. })
    ));
    assert!(matches!(
        ctx.verify_answer("ghost", "pair", 17, "[1.0, 2.0]"),
        Err(GradeError::UnknownUser { .. })
    ));
    assert!(matches!(
        ctx.load_tests("ghost"),
        Err(GradeError::UnknownUser { .. })
    ));
    assert!(matches!(
        ctx.progress_report("ghost"),
        Err(GradeError::UnknownUser { .. })
    ));

    assert_eq!(ctx.throttle().remaining_secs("ghost"), None);
    assert_eq!(std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
}

#[test]
fn progress_moves_from_not_attempted_to_attempted_to_completed() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, clock) = context(dir.path());

    let report = ctx.progress_report("alice").unwrap();
    assert_eq!(report.name, "Alice");
    assert!(report
        .progress
        .values()
        .all(|s| *s == ProgressState::NotAttempted));

    assert!(!ctx.verify_answer("alice", "pair", 17, "[1.001, 2.0]").unwrap());
    assert_eq!(state(&ctx, "alice", "pair"), ProgressState::Attempted);

    clock.advance(WINDOW);
    assert!(ctx.verify_answer("alice", "pair", 17, "[1.00001, 2.0]").unwrap());
    assert_eq!(state(&ctx, "alice", "pair"), ProgressState::Completed);

    clock.advance(WINDOW);
    assert!(!ctx.verify_answer("alice", "pair", 17, "[9.0, 9.0]").unwrap());
    assert_eq!(state(&ctx, "alice", "pair"), ProgressState::Completed);
    assert_eq!(state(&ctx, "alice", "sigmoid"), ProgressState::NotAttempted);
}

#[test]
fn cooldown_follows_every_verification_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, clock) = context(dir.path());

    for answer in ["[0.0, 0.0]", "[1.0, 2.0]"] {
        ctx.verify_answer("alice", "pair", 17, answer).unwrap();

        match ctx.verify_answer("alice", "pair", 17, answer) {
            Err(GradeError::CooldownActive { seconds_remaining }) => {
                assert!(seconds_remaining > 0 && seconds_remaining <= 30)
            }
            other => panic!("expected cooldown, got {:?}", other),
        }
        assert!(matches!(
            ctx.issue_challenge("alice", "pair"),
            Err(GradeError::CooldownActive { .. })
        ));
        assert!(matches!(
            ctx.load_tests("alice"),
            Err(GradeError::CooldownActive { .. })
        ));
        assert!(ctx.issue_challenge("bob", "pair").is_ok());
        assert!(ctx.load_tests("bob").is_ok());

        clock.advance(WINDOW);
        assert!(ctx.issue_challenge("alice", "pair").is_ok());
        assert!(ctx.load_tests("alice").is_ok());
    }
}

#[test]
fn challenges_do_not_arm_the_cooldown() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _) = context(dir.path());

    let first = ctx.issue_challenge("alice", "pair").unwrap();
    let second = ctx.issue_challenge("alice", "pair").unwrap();
    assert_eq!(first.ipd, 17);
    assert_eq!(second.username, "alice");
    assert!(ctx.load_tests("alice").is_ok());
    assert_eq!(
        state(&ctx, "alice", "pair"),
        ProgressState::NotAttempted,
        "issuing a challenge must not touch progress"
    );
}

#[test]
fn cooldown_is_reported_before_unknown_assignment() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _) = context(dir.path());

    ctx.verify_answer("alice", "pair", 17, "[1.0, 2.0]").unwrap();
    assert!(matches!(
        ctx.verify_answer("alice", "conv", 1, "[1.0]"),
        Err(GradeError::CooldownActive { .. })
    ));
    assert!(matches!(
        ctx.issue_challenge("bob", "conv"),
        Err(GradeError::UnknownAssignment { .. })
    ));
}

#[test]
fn unknown_assignment_does_not_arm_the_cooldown() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _) = context(dir.path());

    assert!(matches!(
        ctx.verify_answer("alice", "conv", 1, "[1.0]"),
        Err(GradeError::UnknownAssignment { .. })
    ));
    assert!(ctx.verify_answer("alice", "pair", 17, "[1.0, 2.0]").unwrap());
}

#[test]
fn second_correct_answer_leaves_record_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, clock) = context(dir.path());
    let record_path = dir.path().join("alice.json");

    assert!(ctx.verify_answer("alice", "pair", 17, "[1.0, 2.0]").unwrap());
    let before = std::fs::read(&record_path).unwrap();
    let modified = std::fs::metadata(&record_path).unwrap().modified().unwrap();

    clock.advance(WINDOW);
    assert!(ctx.verify_answer("alice", "pair", 17, "[1.0, 2.0]").unwrap());
    assert_eq!(std::fs::read(&record_path).unwrap(), before);
    assert_eq!(
        std::fs::metadata(&record_path).unwrap().modified().unwrap(),
        modified
    );
}

#[test]
fn rejected_token_still_counts_as_an_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _) = context(dir.path());

    assert!(matches!(
        ctx.verify_answer("alice", "pair", 4, "[1.0, 2.0]"),
        Err(GradeError::UnknownChallenge { token: 4, .. })
    ));
    assert_eq!(state(&ctx, "alice", "pair"), ProgressState::Attempted);
    assert!(ctx.throttle().remaining_secs("alice").is_some());
}

#[test]
fn concurrent_attempts_by_one_user_grade_only_once() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _) = context(dir.path());
    let ctx = Arc::new(ctx);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            std::thread::spawn(move || ctx.verify_answer("alice", "pair", 17, "[1.0, 2.0]"))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| matches!(r, Ok(true))).count(), 1);
    assert!(results
        .iter()
        .filter(|r| !matches!(r, Ok(true)))
        .all(|r| matches!(r, Err(GradeError::CooldownActive { .. }))));
}

#[test]
fn concurrent_completions_for_one_user_keep_both_assignments() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _) = context(dir.path());

    // Different assignments race on the same whole-user record.
    std::thread::scope(|s| {
        s.spawn(|| ctx.progress().record_completion("alice", "pair").unwrap());
        s.spawn(|| ctx.progress().record_completion("alice", "sigmoid").unwrap());
    });

    let stored: BTreeMap<String, bool> =
        serde_json::from_slice(&std::fs::read(dir.path().join("alice.json")).unwrap()).unwrap();
    assert_eq!(stored.get("pair"), Some(&true));
    assert_eq!(stored.get("sigmoid"), Some(&true));
}

#[test]
fn context_loads_from_data_layout() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig::default().with_data_dir(dir.path());

    std::fs::create_dir_all(config.user_info_dir()).unwrap();
    std::fs::create_dir_all(config.bundle_path().parent().unwrap()).unwrap();
    std::fs::write(
        config.user_info_dir().join("carol.json"),
        r#"{"name": "Carol", "mail": "carol@example.org"}"#,
    )
    .unwrap();
    std::fs::write(config.bundle_path(), bundle().bytes()).unwrap();
    std::fs::write(
        config.held_out_path(),
        serde_json::to_vec(&held_out()).unwrap(),
    )
    .unwrap();

    let ctx = GradingContext::load(&config).unwrap();
    assert!(ctx.check_sum(bundle().digest()));
    assert!(!ctx.check_sum("sha256:deadbeef"));
    assert!(ctx.verify_answer("carol", "sigmoid", 4, "0.5").unwrap());

    let reloaded = GradingContext::load(&config).unwrap();
    assert_eq!(
        reloaded.progress_report("carol").unwrap().progress["sigmoid"],
        ProgressState::Completed
    );
}
