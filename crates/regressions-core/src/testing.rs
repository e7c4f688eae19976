//! Helpers for exercising fixtures from tests.
//!
//! These panic on unexpected outcomes, so they belong in `#[test]` bodies.

use crate::domain::{RegressionError, RegressionResult};
use crate::protocol::CheckOutcome;
use std::fmt::Debug;
use std::path::PathBuf;

/// Asserts that a check failed because its baseline was missing and returns
/// the baseline path that was written.
#[track_caller]
pub fn expect_baseline_created(result: RegressionResult<CheckOutcome>) -> PathBuf {
    match result {
        Err(RegressionError::BaselineCreated { path, .. }) => path,
        Err(error) => panic!("expected a missing baseline failure, got: {error}"),
        Ok(outcome) => panic!("expected a missing baseline failure, got {outcome:?}"),
    }
}

/// Drives a fixture through the full snapshot lifecycle.
///
/// `run(data, force_regen)` performs one check. `read_baseline` loads the
/// stored baseline in whatever form the caller wants to compare, which must
/// equal `expected_first` after recording `first` and `expected_second` after
/// `second` is force-regenerated.
///
/// Sequence: the first run fails and records, the same data then passes,
/// `second` fails and leaves the baseline untouched, `second` with
/// force-regen fails and rewrites it, and `second` finally passes.
#[track_caller]
pub fn check_regression_fixture_workflow<T, R>(
    run: impl Fn(&T, bool) -> RegressionResult<CheckOutcome>,
    first: &T,
    second: &T,
    read_baseline: impl Fn() -> R,
    expected_first: &R,
    expected_second: &R,
) where
    T: ?Sized,
    R: PartialEq + Debug,
{
    expect_baseline_created(run(first, false));
    assert_eq!(&read_baseline(), expected_first, "recorded baseline");

    match run(first, false) {
        Ok(CheckOutcome::Matched) => {}
        other => panic!("recorded data should match its baseline, got {other:?}"),
    }

    match run(second, false) {
        Err(RegressionError::Mismatch(_)) => {}
        other => panic!("changed data should mismatch, got {other:?}"),
    }
    assert_eq!(&read_baseline(), expected_first, "baseline after a mismatch");

    match run(second, true) {
        Err(RegressionError::BaselineRegenerated { .. }) => {}
        other => panic!("force-regen should rewrite the baseline, got {other:?}"),
    }
    assert_eq!(&read_baseline(), expected_second, "regenerated baseline");

    match run(second, false) {
        Ok(CheckOutcome::Matched) => {}
        other => panic!("regenerated baseline should match, got {other:?}"),
    }
}
