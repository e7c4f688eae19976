use regressions_core::testing::{check_regression_fixture_workflow, expect_baseline_created};
use regressions_core::text_diff::Encoding;
use regressions_core::{
    CheckOutcome, Contents, DataDirectory, FileCheck, Regression, RegressionErrorCategory,
    RegressionResult, RegressionSettings, TestIdentity,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn regression(dir: &Path, name: &str) -> Regression {
    Regression::new(TestIdentity::new(name), DataDirectory::new(dir))
        .with_settings(RegressionSettings::default())
}

#[test]
fn text_contents_round_trip_with_custom_extension() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_text");
    let options = || FileCheck {
        extension: ".md".to_string(),
        ..FileCheck::default()
    };

    expect_baseline_created(check.file().check_with(Contents::Text("# Title\nbody\n"), options()));
    assert!(temp.path().join("test_text.md").is_file());
    let outcome = check
        .file()
        .check_with(Contents::Text("# Title\nbody\n"), options())
        .expect("same text should match");
    assert_eq!(outcome, CheckOutcome::Matched);

    let message = check
        .file()
        .check_with(Contents::Text("# Title\nchanged\n"), options())
        .expect_err("edited text should mismatch")
        .to_string();
    assert!(message.contains("-body"));
    assert!(message.contains("+changed"));
}

#[test]
fn binary_with_encoding_is_a_configuration_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_binary_encoding");
    let error = check
        .file()
        .check_with(
            Contents::Binary(&[1, 2, 3]),
            FileCheck {
                encoding: Some(Encoding::Latin1),
                ..FileCheck::default()
            },
        )
        .expect_err("encoding with binary contents should be rejected");
    assert_eq!(error.category(), RegressionErrorCategory::Configuration);
    assert!(fs::read_dir(temp.path())
        .expect("tempdir should be listable")
        .next()
        .is_none());
}

#[test]
fn binary_mismatch_names_both_files() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_binary");
    let options = || FileCheck {
        extension: ".bin".to_string(),
        ..FileCheck::default()
    };

    expect_baseline_created(check.file().check_with(Contents::Binary(&[0, 159, 146, 150]), options()));
    check
        .file()
        .check_with(Contents::Binary(&[0, 159, 146, 150]), options())
        .expect("same bytes should match");

    let message = check
        .file()
        .check_with(Contents::Binary(&[0, 1]), options())
        .expect_err("different bytes should mismatch")
        .to_string();
    assert!(message.starts_with("Binary files "));
    assert!(message.contains("test_binary.obtained.bin"));
    assert!(message.ends_with(" differ."));
}

#[test]
fn newline_and_latin1_are_applied_on_write() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_newline");
    let options = || FileCheck {
        encoding: Some(Encoding::Latin1),
        newline: Some("\r\n".to_string()),
        ..FileCheck::default()
    };

    expect_baseline_created(check.file().check_with(Contents::Text("café\nbar\n"), options()));
    let bytes = fs::read(temp.path().join("test_newline.txt")).expect("baseline should exist");
    assert_eq!(bytes, b"caf\xe9\r\nbar\r\n");
    check
        .file()
        .check_with(Contents::Text("café\nbar\n"), options())
        .expect("same text should match");
}

#[test]
fn custom_comparator_replaces_default_check() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_custom");
    let same_length = |obtained: &Path, expected: &Path| -> RegressionResult<()> {
        let obtained = fs::metadata(obtained).expect("obtained should exist").len();
        let expected = fs::metadata(expected).expect("expected should exist").len();
        assert_eq!(obtained, expected);
        Ok(())
    };
    let options = || FileCheck {
        check_fn: Some(&same_length),
        ..FileCheck::default()
    };

    expect_baseline_created(check.file().check_with(Contents::Text("abc"), options()));
    check
        .file()
        .check_with(Contents::Text("xyz"), options())
        .expect("custom comparator only checks length");
}

#[test]
fn obtained_filename_override_is_used() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_obtained_override");
    let obtained = temp.path().join("elsewhere").join("result.txt");
    fs::create_dir_all(obtained.parent().expect("parent should exist"))
        .expect("directory should be created");
    let options = || FileCheck {
        obtained_filename: Some(obtained.clone()),
        ..FileCheck::default()
    };

    expect_baseline_created(check.file().check_with(Contents::Text("one\n"), options()));
    check
        .file()
        .check_with(Contents::Text("one\n"), options())
        .expect("same text should match");
    assert!(obtained.is_file());
    assert!(!temp.path().join("test_obtained_override.obtained.txt").exists());
}

#[test]
fn extension_without_dot_is_rejected() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_bad_extension");
    let error = check
        .file()
        .check_with(
            Contents::Text("x"),
            FileCheck {
                extension: "txt".to_string(),
                ..FileCheck::default()
            },
        )
        .expect_err("extension must start with a dot");
    assert_eq!(error.category(), RegressionErrorCategory::Configuration);
}

#[test]
fn lifecycle_records_fails_and_regenerates() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_file_lifecycle");
    let baseline = temp.path().join("test_file_lifecycle.txt");

    check_regression_fixture_workflow(
        |text: &str, force_regen: bool| {
            check.file().force_regen(force_regen).check(Contents::Text(text))
        },
        "foo\n",
        "bar\n",
        || fs::read_to_string(&baseline).expect("baseline should be readable"),
        &"foo\n".to_string(),
        &"bar\n".to_string(),
    );
}
