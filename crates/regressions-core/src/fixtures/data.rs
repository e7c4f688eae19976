use super::switch_setters;
use crate::domain::{RegressionError, RegressionResult};
use crate::protocol::{CheckOutcome, SnapshotStrategy, SnapshotTarget};
use crate::regression::{Regression, Switches};
use crate::text_diff::{TextCompareOptions, compare_text};
use serde::Serialize;
use serde_yaml::{Mapping, Number, Value};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

pub const DATA_EXTENSION: &str = ".yml";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataCheck {
    pub basename: Option<String>,
    pub fullpath: Option<PathBuf>,
    /// Round every float to this many decimal places before dumping.
    pub round_digits: Option<i32>,
}

pub struct DataRegression<'a> {
    regression: &'a Regression,
    switches: Switches,
}

impl<'a> DataRegression<'a> {
    pub(crate) fn new(regression: &'a Regression) -> Self {
        Self {
            regression,
            switches: Switches::default(),
        }
    }

    switch_setters!();

    pub fn check<T: Serialize + ?Sized>(&self, data: &T) -> RegressionResult<CheckOutcome> {
        self.check_with(data, DataCheck::default())
    }

    pub fn check_with<T: Serialize + ?Sized>(
        &self,
        data: &T,
        options: DataCheck,
    ) -> RegressionResult<CheckOutcome> {
        let target = SnapshotTarget {
            basename: options.basename,
            fullpath: options.fullpath,
            obtained_filename: None,
        };
        let snapshot = DataSnapshot {
            document: to_yaml_document(data, options.round_digits)?,
        };
        self.regression
            .run(&target, DATA_EXTENSION, self.switches, &snapshot)
    }
}

struct DataSnapshot {
    document: String,
}

impl SnapshotStrategy for DataSnapshot {
    fn dump(&self, path: &Path) -> RegressionResult<()> {
        fs::write(path, &self.document).map_err(|source| RegressionError::io("write", path, source))
    }

    fn compare(&self, obtained: &Path, expected: &Path) -> RegressionResult<()> {
        compare_text(obtained, expected, &TextCompareOptions::default())
    }
}

/// Canonical YAML text for `data`: block style, sorted keys, no aliases.
pub fn to_yaml_document<T: Serialize + ?Sized>(
    data: &T,
    round_digits: Option<i32>,
) -> RegressionResult<String> {
    let tree = serde_yaml::to_value(data)
        .map_err(|error| RegressionError::Serialization(error.to_string()))?;
    let tree = canonicalize(tree, round_digits);
    serde_yaml::to_string(&tree).map_err(|error| RegressionError::Serialization(error.to_string()))
}

fn canonicalize(value: Value, round_digits: Option<i32>) -> Value {
    match value {
        Value::Mapping(mapping) => {
            let mut entries: Vec<(Value, Value)> = mapping
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value, round_digits)))
                .collect();
            entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));
            Value::Mapping(entries.into_iter().collect::<Mapping>())
        }
        Value::Sequence(items) => Value::Sequence(
            items
                .into_iter()
                .map(|item| canonicalize(item, round_digits))
                .collect(),
        ),
        Value::Number(number) => match (number.as_f64(), round_digits) {
            (Some(float), Some(digits)) if number.is_f64() => {
                Value::Number(Number::from(round_to(float, digits)))
            }
            _ => Value::Number(number),
        },
        Value::Tagged(mut tagged) => {
            tagged.value = canonicalize(tagged.value, round_digits);
            Value::Tagged(tagged)
        }
        other => other,
    }
}

fn round_to(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(digits);
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / scale
}

fn key_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Sequence(_) => 4,
        Value::Mapping(_) => 5,
        Value::Tagged(_) => 6,
    }
}

fn compare_keys(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => key_rank(a).cmp(&key_rank(b)),
    }
}
