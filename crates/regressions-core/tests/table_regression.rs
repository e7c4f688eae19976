#![cfg(feature = "table")]

use regressions_core::testing::{check_regression_fixture_workflow, expect_baseline_created};
use regressions_core::{
    DataDirectory, NdArray, Regression, RegressionErrorCategory, RegressionSettings, TableCheck,
    TestIdentity, Tolerance, ToleranceSpec,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn regression(dir: &Path, name: &str) -> Regression {
    Regression::new(TestIdentity::new(name), DataDirectory::new(dir))
        .with_settings(RegressionSettings::default())
}

#[test]
fn csv_baseline_uses_index_column_and_full_precision() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_csv");
    let columns = || {
        vec![
            ("x", NdArray::from(vec![0.1, 2.0])),
            ("n", NdArray::from(vec![1_i64, 2])),
            ("ok", NdArray::from(vec![true, false])),
            ("label", NdArray::from(vec!["a", "b"])),
        ]
    };

    expect_baseline_created(check.table().check(columns()));
    let csv = fs::read_to_string(temp.path().join("test_csv.csv")).expect("baseline should exist");
    assert_eq!(
        csv,
        ",x,n,ok,label\n0,0.10000000000000001,1,True,a\n1,2.0,2,False,b\n"
    );
    check
        .table()
        .check(columns())
        .expect("same table should match");
}

#[test]
fn per_column_tolerances_apply() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_table_tolerance");
    let options = || TableCheck {
        tolerances: ToleranceSpec::new().with_key("loose", Tolerance::absolute(0.1)),
        ..TableCheck::default()
    };

    expect_baseline_created(check.table().check_with(
        vec![
            ("loose", NdArray::from(vec![1.0, 2.0])),
            ("tight", NdArray::from(vec![1.0, 2.0])),
        ],
        options(),
    ));
    check
        .table()
        .check_with(
            vec![
                ("loose", NdArray::from(vec![1.05, 2.0])),
                ("tight", NdArray::from(vec![1.0, 2.0])),
            ],
            options(),
        )
        .expect("loose column absorbs the drift");

    let message = check
        .table()
        .check_with(
            vec![
                ("loose", NdArray::from(vec![1.0, 2.0])),
                ("tight", NdArray::from(vec![1.05, 2.0])),
            ],
            options(),
        )
        .expect_err("tight column should fail")
        .to_string();
    assert!(message.contains("tight:\n"));
    assert!(!message.contains("loose:\n"));
}

#[test]
fn report_uses_data_index_labels() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_labels");
    let options = || TableCheck {
        data_index: Some(vec!["first".to_string(), "second".to_string()]),
        ..TableCheck::default()
    };

    expect_baseline_created(
        check
            .table()
            .check_with(vec![("v", NdArray::from(vec![1_i64, 2]))], options()),
    );
    let message = check
        .table()
        .check_with(vec![("v", NdArray::from(vec![1_i64, 5]))], options())
        .expect_err("second row should differ")
        .to_string();
    assert!(message.contains("         second"));
    assert!(!message.contains("          first"));
}

#[test]
fn nan_padding_round_trips() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_padding");
    let options = || TableCheck {
        fill_different_shape_with_nan: true,
        ..TableCheck::default()
    };
    let columns = || {
        vec![
            ("long", NdArray::from(vec![1.0, 2.0, 3.0])),
            ("short", NdArray::from(vec![4.0])),
        ]
    };

    expect_baseline_created(check.table().check_with(columns(), options()));
    let csv =
        fs::read_to_string(temp.path().join("test_padding.csv")).expect("baseline should exist");
    assert_eq!(csv, ",long,short\n0,1.0,4.0\n1,2.0,\n2,3.0,\n");
    check
        .table()
        .check_with(columns(), options())
        .expect("padded table should match");

    let error = check
        .table()
        .check(columns())
        .expect_err("uneven columns need the padding switch");
    assert_eq!(error.category(), RegressionErrorCategory::InvalidInput);
}

#[test]
fn missing_column_is_a_key_set_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_table_keys");
    expect_baseline_created(check.table().check(vec![
        ("a", NdArray::from(vec![1.0])),
        ("b", NdArray::from(vec![2.0])),
    ]));

    let message = check
        .table()
        .check(vec![("a", NdArray::from(vec![1.0]))])
        .expect_err("column b is gone")
        .to_string();
    assert!(message.contains("  Missing from obtained: ['b']\n"));
}

#[test]
fn lifecycle_records_fails_and_regenerates() {
    let temp = TempDir::new().expect("tempdir should be created");
    let check = regression(temp.path(), "test_table_lifecycle");
    let baseline = temp.path().join("test_table_lifecycle.csv");
    let column = |values: Vec<f64>| vec![("x".to_string(), NdArray::from(values))];

    check_regression_fixture_workflow(
        |columns: &Vec<(String, NdArray)>, force_regen: bool| {
            check.table().force_regen(force_regen).check(columns.clone())
        },
        &column(vec![1.0, 2.0]),
        &column(vec![1.0, 3.0]),
        || fs::read_to_string(&baseline).expect("baseline should be readable"),
        &",x\n0,1.0\n1,2.0\n".to_string(),
        &",x\n0,1.0\n1,3.0\n".to_string(),
    );
}
