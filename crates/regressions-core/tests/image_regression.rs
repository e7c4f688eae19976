#![cfg(feature = "image")]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use regressions_core::testing::{check_regression_fixture_workflow, expect_baseline_created};
use regressions_core::{
    CheckOutcome, DataDirectory, ImageCheck, Regression, RegressionErrorCategory,
    RegressionSettings, TestIdentity,
};
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

fn regression(dir: &Path, name: &str) -> Regression {
    Regression::new(TestIdentity::new(name), DataDirectory::new(dir))
        .with_settings(RegressionSettings::default())
}

fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("png should encode");
    bytes
}

#[test]
fn identical_images_match() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_same_image");
    expect_baseline_created(check.image().check(&png(8, 8, [10, 20, 30])));
    assert!(temp.path().join("test_same_image.png").is_file());

    let outcome = check
        .image()
        .check(&png(8, 8, [10, 20, 30]))
        .expect("identical image should match");
    assert_eq!(outcome, CheckOutcome::Matched);
}

#[test]
fn different_image_fails_and_writes_diff() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_changed_image");
    expect_baseline_created(check.image().check(&png(4, 4, [0, 0, 0])));

    let message = check
        .image()
        .check(&png(4, 4, [255, 255, 255]))
        .expect_err("white against black should fail")
        .to_string();
    assert!(message.starts_with("Difference between images too high: 100.00 %\n"));
    assert!(temp.path().join("test_changed_image.obtained.diff.png").is_file());
}

#[test]
fn small_difference_stays_under_threshold() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_threshold");
    let options = || ImageCheck {
        diff_threshold: 1.0,
        ..ImageCheck::default()
    };

    expect_baseline_created(check.image().check_with(&png(10, 10, [100, 100, 100]), options()));
    check
        .image()
        .check_with(&png(10, 10, [101, 101, 101]), options())
        .expect("0.39 % difference is under a 1 % threshold");
}

#[test]
fn expect_different_inverts_the_verdict() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_expect_different");
    let options = || ImageCheck {
        expect_equal: false,
        ..ImageCheck::default()
    };

    expect_baseline_created(check.image().check(&png(4, 4, [0, 0, 0])));
    let message = check
        .image()
        .check_with(&png(4, 4, [0, 0, 0]), options())
        .expect_err("identical image should fail when a difference is expected")
        .to_string();
    assert!(message.starts_with("Difference between images too small: 0.00 %\n"));

    check
        .image()
        .check_with(&png(4, 4, [200, 0, 0]), options())
        .expect("a clearly different image satisfies expect_equal=false");
}

#[test]
fn resized_image_is_maximally_different() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_resized");
    expect_baseline_created(check.image().check(&png(4, 4, [1, 2, 3])));

    let message = check
        .image()
        .check(&png(5, 4, [1, 2, 3]))
        .expect_err("different dimensions should fail")
        .to_string();
    assert!(message.contains("100.00 %"));
}

#[test]
fn undecodable_bytes_are_invalid_input() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_garbage_image");
    let error = check
        .image()
        .check(b"not an image")
        .expect_err("garbage bytes should be rejected");
    assert_eq!(error.category(), RegressionErrorCategory::InvalidInput);
}

#[test]
fn lifecycle_records_fails_and_regenerates() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_image_lifecycle");
    let baseline = temp.path().join("test_image_lifecycle.png");
    let first_pixel = || {
        let bytes = std::fs::read(&baseline).expect("baseline should be readable");
        image::load_from_memory(&bytes)
            .expect("baseline should decode")
            .to_rgb8()
            .get_pixel(0, 0)
            .0
    };

    check_regression_fixture_workflow(
        |bytes: &[u8], force_regen: bool| check.image().force_regen(force_regen).check(bytes),
        png(4, 4, [0, 0, 0]).as_slice(),
        png(4, 4, [255, 255, 255]).as_slice(),
        first_pixel,
        &[0, 0, 0],
        &[255, 255, 255],
    );
}
