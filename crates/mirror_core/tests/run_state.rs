use mirror_core::{Bucket, FailureKey, Outcome, Report, RunState};
use pretty_assertions::assert_eq;

fn init_logging() {
    mirror_logging::initialize_for_tests();
}

#[test]
fn each_url_lands_in_exactly_one_bucket() {
    init_logging();
    let mut state = RunState::new();
    state.record("https://e.test/a", &Outcome::Success);
    state.record("https://e.test/b", &Outcome::NotFound);
    state.record("https://e.test/c", &Outcome::Failed(FailureKey::Status(500)));
    state.record("https://e.test/d", &Outcome::Failed(FailureKey::Status(500)));
    state.record("https://e.test/e", &Outcome::Failed(FailureKey::AccessDenied));

    assert_eq!(state.settled_count(), 5);
    assert_eq!(state.bucket_of("https://e.test/a"), Some(Bucket::Success));
    assert_eq!(state.bucket_of("https://e.test/b"), Some(Bucket::NotFound));
    assert_eq!(
        state.bucket_of("https://e.test/d"),
        Some(Bucket::Other(FailureKey::Status(500)))
    );
    assert_eq!(state.bucket_of("https://e.test/zzz"), None);
}

#[test]
fn re_recording_moves_the_url() {
    let mut state = RunState::new();
    state.record("https://e.test/a", &Outcome::Failed(FailureKey::Status(503)));
    state.record("https://e.test/a", &Outcome::Success);

    assert_eq!(state.settled_count(), 1);
    assert!(state.other().is_empty());
    assert!(state.success().contains("https://e.test/a"));
}

#[test]
fn report_counts_every_bucket() {
    let mut state = RunState::new();
    state.record("https://e.test/a", &Outcome::Success);
    state.record("https://e.test/b", &Outcome::Success);
    state.record("https://e.test/c", &Outcome::NotFound);
    state.record("https://e.test/d", &Outcome::Failed(FailureKey::Status(502)));
    state.record("https://e.test/e", &Outcome::Failed(FailureKey::Status(502)));
    state.record(
        "https://e.test/f",
        &Outcome::Failed(FailureKey::reason("connection reset")),
    );

    let report = Report::from_state(&state);
    assert_eq!(report.success, 2);
    assert_eq!(report.not_found, 1);
    assert_eq!(
        report.other,
        vec![
            (FailureKey::Status(502), 2),
            (FailureKey::reason("connection reset"), 1),
        ]
    );
    assert_eq!(report.failed(), 3);
    assert_eq!(report.total(), state.settled_count());

    let text = report.to_string();
    assert!(text.contains("downloaded: 2"));
    assert!(text.contains("error 502: 2"));
    assert!(text.contains("error connection reset: 1"));
}

#[test]
fn empty_state_reports_zeroes() {
    let report = Report::from_state(&RunState::new());
    assert_eq!(report, Report::default());
    assert_eq!(report.total(), 0);
}
