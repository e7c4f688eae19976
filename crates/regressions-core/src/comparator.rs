use crate::arrays::{ArrayData, DType, ElementKind, NdArray, Scalar, format_index, format_shape};
use crate::numerics::{
    ErrorStats, Tolerance, ToleranceSpec, format_f32_repr, format_f64_repr, summarize,
};
use num_complex::Complex64;
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter, Write as _};
use std::path::PathBuf;

pub const FORCE_REGEN_HINT: &str = "To update values, use --force-regen option.";
pub const MAX_REPORTED_MISMATCHES: usize = 100;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MismatchError {
    #[error("{0}")]
    Text(String),
    #[error("Binary files {} and {} differ.", obtained.display(), expected.display())]
    Binary { obtained: PathBuf, expected: PathBuf },
    #[error("Data types are not the same.\nKey: {key}\nObtained: {obtained}\nExpected: {expected}\n")]
    DType {
        key: String,
        obtained: DType,
        expected: DType,
    },
    #[error(
        "Shapes are not the same.\nKey: {key}\nObtained: {}\nExpected: {}\n",
        format_shape(.obtained),
        format_shape(.expected)
    )]
    Shape {
        key: String,
        obtained: Vec<usize>,
        expected: Vec<usize>,
    },
    #[error("{0}")]
    KeySet(KeySetMismatch),
    #[error("{0}")]
    Values(ValuesReport),
    #[error(
        "Difference between images too {}: {distance:.2} %\n{}\n{}",
        image_verdict(*expect_equal),
        expected.display(),
        obtained.display()
    )]
    Image {
        distance: f64,
        expect_equal: bool,
        obtained: PathBuf,
        expected: PathBuf,
    },
}

fn image_verdict(expect_equal: bool) -> &'static str {
    if expect_equal { "high" } else { "small" }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySetMismatch {
    pub matching: Vec<String>,
    pub new_in_obtained: Vec<String>,
    pub missing_from_obtained: Vec<String>,
}

impl Display for KeySetMismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "The keys in the obtained results differ from the expected results.")?;
        writeln!(f, "  Matching keys: {}", python_list(&self.matching))?;
        writeln!(f, "  New in obtained: {}", python_list(&self.new_in_obtained))?;
        writeln!(f, "  Missing from obtained: {}", python_list(&self.missing_from_obtained))?;
        write!(f, "{FORCE_REGEN_HINT}")
    }
}

fn python_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("'{item}'")).collect();
    format!("[{}]", quoted.join(", "))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyReport {
    pub key: String,
    pub differences: usize,
    pub size: usize,
    text: String,
}

/// Aggregated mismatch report across all keys that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuesReport {
    pub keys: Vec<KeyReport>,
}

impl Display for ValuesReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Values are not sufficiently close.")?;
        writeln!(f)?;
        for key in &self.keys {
            writeln!(f, "{}", key.text)?;
        }
        write!(f, "{FORCE_REGEN_HINT}")
    }
}

/// Compares named arrays key by key.
///
/// `row_labels` replaces positional indices in the mismatch table, used by
/// tabular data whose rows carry their own index.
pub fn compare_named_arrays(
    obtained: &[(&str, &NdArray)],
    expected: &[(&str, &NdArray)],
    tolerances: &ToleranceSpec,
    row_labels: Option<&[String]>,
) -> Result<(), MismatchError> {
    check_key_sets(obtained, expected)?;

    let mut reports = Vec::new();
    for (key, obtained_array) in obtained {
        let Some((_, expected_array)) = expected.iter().find(|(name, _)| name == key) else {
            continue;
        };
        if let Some(report) = compare_array(
            key,
            obtained_array,
            expected_array,
            tolerances.tolerance_for(key),
            row_labels,
        )? {
            reports.push(report);
        }
    }

    if reports.is_empty() {
        Ok(())
    } else {
        Err(MismatchError::Values(ValuesReport { keys: reports }))
    }
}

fn check_key_sets(
    obtained: &[(&str, &NdArray)],
    expected: &[(&str, &NdArray)],
) -> Result<(), MismatchError> {
    let obtained_keys: BTreeSet<&str> = obtained.iter().map(|(key, _)| *key).collect();
    let expected_keys: BTreeSet<&str> = expected.iter().map(|(key, _)| *key).collect();
    if obtained_keys == expected_keys {
        return Ok(());
    }
    let to_vec = |keys: Vec<&&str>| -> Vec<String> { keys.into_iter().map(|key| key.to_string()).collect() };
    Err(MismatchError::KeySet(KeySetMismatch {
        matching: to_vec(obtained_keys.intersection(&expected_keys).collect()),
        new_in_obtained: to_vec(obtained_keys.difference(&expected_keys).collect()),
        missing_from_obtained: to_vec(expected_keys.difference(&obtained_keys).collect()),
    }))
}

/// Compares one pair of arrays; `Ok(None)` when every element matches.
pub fn compare_array(
    key: &str,
    obtained: &NdArray,
    expected: &NdArray,
    tolerance: Tolerance,
    row_labels: Option<&[String]>,
) -> Result<Option<KeyReport>, MismatchError> {
    if !obtained.dtype().is_compatible_with(&expected.dtype()) {
        return Err(MismatchError::DType {
            key: key.to_string(),
            obtained: obtained.dtype(),
            expected: expected.dtype(),
        });
    }
    if obtained.shape() != expected.shape() {
        return Err(MismatchError::Shape {
            key: key.to_string(),
            obtained: obtained.shape().to_vec(),
            expected: expected.shape().to_vec(),
        });
    }

    let mismatches: Vec<usize> = (0..obtained.size())
        .filter(|&index| !elements_match(obtained, expected, index, tolerance))
        .collect();
    if mismatches.is_empty() {
        return Ok(None);
    }

    let text = render_key_report(key, obtained, expected, &mismatches, row_labels);
    Ok(Some(KeyReport {
        key: key.to_string(),
        differences: mismatches.len(),
        size: obtained.size(),
        text,
    }))
}

#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i128),
    Float(f64),
    Complex(Complex64),
}

impl Numeric {
    fn to_f64(self) -> f64 {
        match self {
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
            Self::Complex(value) => value.re,
        }
    }

    fn to_complex(self) -> Complex64 {
        match self {
            Self::Complex(value) => value,
            other => Complex64::new(other.to_f64(), 0.0),
        }
    }
}

fn numeric_at(array: &NdArray, index: usize) -> Option<Numeric> {
    match array.data() {
        ArrayData::Int(values) => values.get(index).map(|value| Numeric::Int(i128::from(*value))),
        ArrayData::UInt(values) => values.get(index).map(|value| Numeric::Int(i128::from(*value))),
        ArrayData::Float(values) => values.get(index).map(|value| Numeric::Float(*value)),
        ArrayData::Complex(values) => values.get(index).map(|value| Numeric::Complex(*value)),
        _ => None,
    }
}

fn elements_match(obtained: &NdArray, expected: &NdArray, index: usize, tolerance: Tolerance) -> bool {
    match (obtained.data(), expected.data()) {
        (ArrayData::Bool(a), ArrayData::Bool(b)) => a.get(index) == b.get(index),
        (ArrayData::Unicode(a), ArrayData::Unicode(b)) => a.get(index) == b.get(index),
        (ArrayData::Raw(a), ArrayData::Raw(b)) => a.get(index) == b.get(index),
        (ArrayData::Ticks(a), ArrayData::Ticks(b)) => a.get(index) == b.get(index),
        _ => match (numeric_at(obtained, index), numeric_at(expected, index)) {
            (Some(Numeric::Int(a)), Some(Numeric::Int(b))) => a == b,
            (Some(a @ Numeric::Complex(_)), Some(b)) | (Some(a), Some(b @ Numeric::Complex(_))) => {
                tolerance.is_close_complex(a.to_complex(), b.to_complex())
            }
            (Some(a), Some(b)) => tolerance.is_close(a.to_f64(), b.to_f64()),
            _ => false,
        },
    }
}

struct Difference {
    shown: Scalar,
    absolute: f64,
    relative: Option<f64>,
}

fn difference(obtained: &NdArray, expected: &NdArray, index: usize) -> Option<Difference> {
    let single_precision = is_single_precision(obtained, expected);
    let diff = match (numeric_at(obtained, index)?, numeric_at(expected, index)?) {
        (Numeric::Int(a), Numeric::Int(b)) => {
            let delta = a - b;
            let shown = i64::try_from(delta)
                .map(Scalar::Int)
                .unwrap_or(Scalar::Float(delta as f64));
            Difference {
                shown,
                absolute: delta.unsigned_abs() as f64,
                relative: (b != 0).then(|| (delta as f64 / b as f64).abs()),
            }
        }
        (a @ Numeric::Complex(_), b) | (a, b @ Numeric::Complex(_)) => {
            let (a, b) = (a.to_complex(), b.to_complex());
            let delta = a - b;
            Difference {
                shown: Scalar::Complex(delta),
                absolute: delta.norm(),
                relative: (b != Complex64::new(0.0, 0.0)).then(|| delta.norm() / b.norm()),
            }
        }
        (a, b) => {
            let (a, b) = (a.to_f64(), b.to_f64());
            let delta = a - b;
            let shown = if single_precision {
                Scalar::Float32(delta as f32)
            } else {
                Scalar::Float(delta)
            };
            Difference {
                shown,
                absolute: delta.abs(),
                relative: (b != 0.0).then(|| (delta / b).abs()),
            }
        }
    };
    Some(diff)
}

/// Float differences of two arrays this narrow are reported as float32.
fn is_single_precision(obtained: &NdArray, expected: &NdArray) -> bool {
    obtained.dtype().item_size <= 4 && expected.dtype().item_size <= 4
}

fn row(index: &str, obtained: &str, expected: &str, difference: &str) -> String {
    format!("{index:>15}  {obtained:>20}  {expected:>20}  {difference:>20}\n")
}

fn render_key_report(
    key: &str,
    obtained: &NdArray,
    expected: &NdArray,
    mismatches: &[usize],
    row_labels: Option<&[String]>,
) -> String {
    let size = obtained.size();
    let count = mismatches.len();
    let mut text = String::new();
    let _ = writeln!(text, "{key}:");
    let _ = writeln!(text, "  Shape: {}", format_shape(obtained.shape()));
    let _ = writeln!(
        text,
        "  Number of differences: {count} / {size} ({:.1}%)",
        percent(count, size)
    );

    let numeric = obtained.dtype().kind.is_numeric() && expected.dtype().kind.is_numeric();
    let differences: Vec<Option<Difference>> = mismatches
        .iter()
        .map(|&index| if numeric { difference(obtained, expected, index) } else { None })
        .collect();

    if numeric && count > 1 {
        let integer = !obtained.dtype().kind.is_inexact() && !expected.dtype().kind.is_inexact();
        let precision = if integer {
            StatsPrecision::Integer
        } else if is_single_precision(obtained, expected) {
            StatsPrecision::Single
        } else {
            StatsPrecision::Double
        };
        let absolute: Vec<f64> = differences.iter().flatten().map(|diff| diff.absolute).collect();
        let relative: Vec<f64> = differences.iter().flatten().filter_map(|diff| diff.relative).collect();

        text.push_str("  Statistics are computed for differing elements only.\n");
        text.push_str("  Stats for abs(obtained - expected):\n");
        if let Some(stats) = summarize(&absolute) {
            write_stats(&mut text, stats, precision);
        }
        if relative.is_empty() {
            text.push_str("  Relative errors are not reported because all expected values are zero.\n");
        } else {
            text.push_str("  Stats for abs(obtained - expected) / abs(expected):\n");
            if relative.len() != count {
                let _ = writeln!(
                    text,
                    "    Number of (differing) non-zero expected results: {} / {count} ({:.1}%)",
                    relative.len(),
                    percent(relative.len(), count)
                );
                text.push_str("    Relative errors are computed for the non-zero expected results.\n");
            }
            if let Some(stats) = summarize(&relative) {
                write_stats(&mut text, stats, precision.for_ratios());
            }
        }
    }

    text.push_str("  Individual errors:\n");
    if count > MAX_REPORTED_MISMATCHES {
        let _ = writeln!(text, "    Only showing first {MAX_REPORTED_MISMATCHES} mismatches.");
    }
    text.push_str(&row("Index", "Obtained", "Expected", "Difference"));
    for (&flat, diff) in mismatches.iter().zip(&differences).take(MAX_REPORTED_MISMATCHES) {
        let index = match row_labels.and_then(|labels| labels.get(flat)) {
            Some(label) => label.clone(),
            None => format_index(&obtained.unravel(flat)),
        };
        let shown = |array: &NdArray| {
            array
                .scalar_at(flat)
                .map(|scalar| scalar.to_string())
                .unwrap_or_default()
        };
        let diff_text = diff
            .as_ref()
            .map(|diff| diff.shown.to_string())
            .unwrap_or_default();
        text.push_str(&row(&index, &shown(obtained), &shown(expected), &diff_text));
    }
    text
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatsPrecision {
    Integer,
    Single,
    Double,
}

impl StatsPrecision {
    /// Relative errors are never integral.
    fn for_ratios(self) -> Self {
        match self {
            Self::Integer => Self::Double,
            other => other,
        }
    }

    fn format(self, value: f64) -> String {
        match self {
            Self::Single => format_f32_repr(value as f32),
            Self::Integer | Self::Double => format_f64_repr(value),
        }
    }
}

fn write_stats(text: &mut String, stats: ErrorStats, precision: StatsPrecision) {
    let max = if precision == StatsPrecision::Integer && stats.max.is_finite() {
        format!("{}", stats.max as i128)
    } else {
        precision.format(stats.max)
    };
    let _ = writeln!(text, "    Max:     {max}");
    let _ = writeln!(text, "    Mean:    {}", precision.format(stats.mean));
    let _ = writeln!(text, "    Median:  {}", precision.format(stats.median));
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

/// Rejects arrays whose element kind the fixtures cannot compare.
pub fn ensure_supported(key: &str, array: &NdArray, fixture: &str) -> Result<(), String> {
    if array.dtype().kind.is_supported() {
        Ok(())
    } else {
        Err(format!(
            "Only numeric or unicode data is supported on {fixture} fixture.\nArray '{key}' with type '{}' was given.",
            array.dtype()
        ))
    }
}

pub(crate) fn is_float_kind(array: &NdArray) -> bool {
    array.dtype().kind == ElementKind::Float
}
