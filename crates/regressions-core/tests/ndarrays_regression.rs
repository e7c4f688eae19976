#![cfg(feature = "ndarrays")]

use num_complex::Complex64;
use regressions_core::arrays::archive::read_archive;
use regressions_core::testing::{check_regression_fixture_workflow, expect_baseline_created};
use regressions_core::{
    CheckOutcome, DataDirectory, NdArray, NdArraysCheck, Regression, RegressionErrorCategory,
    RegressionSettings, TestIdentity, Tolerance, ToleranceSpec,
};
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;

fn regression(dir: &Path, name: &str) -> Regression {
    Regression::new(TestIdentity::new(name), DataDirectory::new(dir))
        .with_settings(RegressionSettings::default())
}

#[test]
fn mixed_arrays_round_trip_through_archive() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_mixed");
    let arrays = || {
        vec![
            ("floats", NdArray::from(vec![1.0, f64::NAN, f64::INFINITY])),
            ("ints", NdArray::from(vec![1_i32, -2, 3])),
            ("flags", NdArray::from(vec![true, false])),
            ("names", NdArray::from(vec!["alpha", "beta"])),
            ("waves", NdArray::from(vec![Complex64::new(1.0, -1.0)])),
            (
                "grid",
                NdArray::from_shape_vec(vec![2, 3], vec![0.5_f32; 6]).expect("grid should build"),
            ),
            ("scalar", NdArray::from(42_u64)),
        ]
    };

    expect_baseline_created(check.ndarrays().check(arrays()));
    assert!(temp.path().join("test_mixed.ndz").is_file());
    let outcome = check
        .ndarrays()
        .check(arrays())
        .expect("same arrays should match");
    assert_eq!(outcome, CheckOutcome::Matched);
}

#[test]
fn tolerance_boundary_is_inclusive() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_tolerance");
    let options = || NdArraysCheck {
        tolerances: ToleranceSpec::new().with_key("data", Tolerance::new(0.5, 0.0)),
        ..NdArraysCheck::default()
    };

    expect_baseline_created(
        check
            .ndarrays()
            .check_with(vec![("data", NdArray::from(vec![1.0, 2.0]))], options()),
    );
    check
        .ndarrays()
        .check_with(vec![("data", NdArray::from(vec![1.5, 1.5]))], options())
        .expect("differences equal to the tolerance should pass");

    let message = check
        .ndarrays()
        .check_with(vec![("data", NdArray::from(vec![1.5, 2.75]))], options())
        .expect_err("difference above tolerance should fail")
        .to_string();
    assert!(message.starts_with("Values are not sufficiently close.\n\ndata:\n"));
    assert!(message.contains("  Number of differences: 1 / 2 (50.0%)\n"));
    assert!(message.contains("2.75"));
    assert!(message.ends_with("To update values, use --force-regen option."));
}

#[test]
fn scalar_mismatch_reports_single_difference() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_scalar");
    expect_baseline_created(check.ndarrays().check(vec![("x", NdArray::from(1.0))]));

    let message = check
        .ndarrays()
        .check(vec![("x", NdArray::from(2.0))])
        .expect_err("scalar should differ")
        .to_string();
    assert!(message.contains("  Shape: ()\n"));
    assert!(message.contains("  Number of differences: 1 / 1 (100.0%)\n"));
    assert!(!message.contains("Stats for"));
    assert!(message.contains("             ()"));
}

#[test]
fn lifecycle_records_fails_and_regenerates() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_lifecycle");
    let baseline = temp.path().join("test_lifecycle.ndz");
    let named = |values: Vec<f64>| vec![("data".to_string(), NdArray::from(values))];

    check_regression_fixture_workflow(
        |arrays: &Vec<(String, NdArray)>, force_regen: bool| {
            check.ndarrays().force_regen(force_regen).check(arrays.clone())
        },
        &named(vec![1.0, 2.0]),
        &named(vec![1.0, 3.0]),
        || read_archive(&baseline).expect("baseline archive should load"),
        &BTreeMap::from([("data".to_string(), NdArray::from(vec![1.0, 2.0]))]),
        &BTreeMap::from([("data".to_string(), NdArray::from(vec![1.0, 3.0]))]),
    );
}

#[test]
fn mixed_scalars_report_each_key() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_scalars");
    expect_baseline_created(check.ndarrays().check(vec![
        ("data1", NdArray::from(4.0)),
        ("data2", NdArray::from(42_i64)),
    ]));

    let message = check
        .ndarrays()
        .check(vec![
            ("data1", NdArray::from(5.0)),
            ("data2", NdArray::from(21_i64)),
        ])
        .expect_err("both scalars changed")
        .to_string();
    let row = |index: &str, obtained: &str, expected: &str, difference: &str| {
        format!("{index:>15}  {obtained:>20}  {expected:>20}  {difference:>20}\n")
    };
    let key_report = |key: &str, obtained: &str, expected: &str, difference: &str| {
        format!(
            "{key}:\n  Shape: ()\n  Number of differences: 1 / 1 (100.0%)\n  Individual errors:\n{}{}",
            row("Index", "Obtained", "Expected", "Difference"),
            row("()", obtained, expected, difference)
        )
    };

    assert_eq!(
        message,
        format!(
            "Values are not sufficiently close.\n\n{}\n{}\nTo update values, use --force-regen option.",
            key_report("data1", "5.0", "4.0", "1.0"),
            key_report("data2", "21", "42", "-21")
        )
    );
    assert!(!message.contains("Stats for"));
}

#[test]
fn shape_change_is_reported_before_values() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_shape");
    expect_baseline_created(check.ndarrays().check(vec![("k", NdArray::from(vec![0.0; 11]))]));

    let message = check
        .ndarrays()
        .check(vec![("k", NdArray::from(vec![0.0; 10]))])
        .expect_err("shape should differ")
        .to_string();
    assert!(message.starts_with("Shapes are not the same.\nKey: k\nObtained: (10,)\nExpected: (11,)"));
}

#[test]
fn dtype_change_between_text_and_numbers_fails() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_dtype");
    expect_baseline_created(check.ndarrays().check(vec![("k", NdArray::from(vec![1.0]))]));

    check
        .ndarrays()
        .check(vec![("k", NdArray::from(vec![1_i64]))])
        .expect("numeric kinds compare by value");
    let message = check
        .ndarrays()
        .check(vec![("k", NdArray::from(vec!["1"]))])
        .expect_err("text against floats should fail")
        .to_string();
    assert!(message.starts_with("Data types are not the same.\nKey: k\nObtained: <U1\nExpected: float64"));
}

#[test]
fn key_set_change_lists_every_side() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_keys");
    expect_baseline_created(check.ndarrays().check(vec![
        ("ar1", NdArray::from(vec![1.0])),
        ("ar2", NdArray::from(vec![2.0])),
    ]));

    let message = check
        .ndarrays()
        .check(vec![
            ("ar1", NdArray::from(vec![1.0])),
            ("ar3", NdArray::from(vec![3.0])),
        ])
        .expect_err("key sets should differ")
        .to_string();
    assert!(message.contains("  Matching keys: ['ar1']\n"));
    assert!(message.contains("  New in obtained: ['ar3']\n"));
    assert!(message.contains("  Missing from obtained: ['ar2']\n"));
    assert!(message.ends_with("To update values, use --force-regen option."));
}

#[test]
fn large_mismatch_table_is_capped() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_capped");
    expect_baseline_created(check.ndarrays().check(vec![("v", NdArray::from(vec![0_i64; 150]))]));

    let message = check
        .ndarrays()
        .check(vec![("v", NdArray::from((1..=150).collect::<Vec<i64>>()))])
        .expect_err("every element differs")
        .to_string();
    assert!(message.contains("  Number of differences: 150 / 150 (100.0%)\n"));
    assert!(message.contains("    Only showing first 100 mismatches.\n"));
    assert!(message.contains("    Max:     150\n"));
    assert!(message.contains("Relative errors are not reported because all expected values are zero."));
    assert!(!message.contains("\n            100  "));
}

#[test]
fn unsupported_dtype_is_rejected_before_writing() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_unsupported");
    let stamps = NdArray::datetime64(vec![2], vec![0, 1]).expect("datetime array should build");

    let error = check
        .ndarrays()
        .check(vec![("when", stamps)])
        .expect_err("datetime arrays are not supported");
    assert_eq!(error.category(), RegressionErrorCategory::InvalidInput);
    assert!(error.to_string().contains("Array 'when' with type 'datetime64' was given."));
    assert!(!temp.path().join("test_unsupported.ndz").exists());
}
