mod format;

pub use format::{format_f32_repr, format_f64_repr, format_g17};

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ABS_TOL: f64 = 1e-8;
pub const DEFAULT_REL_TOL: f64 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Tolerance {
    #[serde(rename = "absTol", default = "default_abs_tol")]
    pub abs_tol: f64,
    #[serde(rename = "relTol", default = "default_rel_tol")]
    pub rel_tol: f64,
}

fn default_abs_tol() -> f64 {
    DEFAULT_ABS_TOL
}

fn default_rel_tol() -> f64 {
    DEFAULT_REL_TOL
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            abs_tol: DEFAULT_ABS_TOL,
            rel_tol: DEFAULT_REL_TOL,
        }
    }
}

impl Tolerance {
    pub fn new(abs_tol: f64, rel_tol: f64) -> Self {
        Self { abs_tol, rel_tol }
    }

    pub fn absolute(abs_tol: f64) -> Self {
        Self {
            abs_tol,
            ..Self::default()
        }
    }

    pub fn relative(rel_tol: f64) -> Self {
        Self {
            rel_tol,
            ..Self::default()
        }
    }

    /// `|obtained - expected| <= abs_tol + rel_tol * |expected|`, with NaN
    /// matching NaN and equal infinities matching each other.
    pub fn is_close(&self, obtained: f64, expected: f64) -> bool {
        if obtained.is_nan() || expected.is_nan() {
            return obtained.is_nan() && expected.is_nan();
        }
        if obtained.is_infinite() || expected.is_infinite() {
            return obtained == expected;
        }
        (obtained - expected).abs() <= self.abs_tol + self.rel_tol * expected.abs()
    }

    pub fn is_close_complex(&self, obtained: Complex64, expected: Complex64) -> bool {
        if obtained.is_nan() || expected.is_nan() {
            return obtained.is_nan() && expected.is_nan();
        }
        if obtained.is_infinite() || expected.is_infinite() {
            return obtained == expected;
        }
        (obtained - expected).norm() <= self.abs_tol + self.rel_tol * expected.norm()
    }
}

/// Per-key tolerances with an optional fallback.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ToleranceSpec {
    #[serde(default)]
    pub default: Option<Tolerance>,
    #[serde(default)]
    pub keys: BTreeMap<String, Tolerance>,
}

impl ToleranceSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, tolerance: Tolerance) -> Self {
        self.default = Some(tolerance);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>, tolerance: Tolerance) -> Self {
        self.keys.insert(key.into(), tolerance);
        self
    }

    pub fn tolerance_for(&self, key: &str) -> Tolerance {
        self.keys
            .get(key)
            .copied()
            .or(self.default)
            .unwrap_or_default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TolerancePolicyError {
    #[error("failed to read tolerance policy '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse tolerance policy '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub fn load_tolerance_spec(policy_path: impl AsRef<Path>) -> Result<ToleranceSpec, TolerancePolicyError> {
    let policy_path = policy_path.as_ref();
    let source = fs::read_to_string(policy_path).map_err(|source| TolerancePolicyError::Read {
        path: policy_path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| TolerancePolicyError::Parse {
        path: policy_path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorStats {
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

/// Max, mean and median of `values`; NaN propagates to every statistic.
pub fn summarize(values: &[f64]) -> Option<ErrorStats> {
    if values.is_empty() {
        return None;
    }
    if values.iter().any(|value| value.is_nan()) {
        return Some(ErrorStats {
            max: f64::NAN,
            mean: f64::NAN,
            median: f64::NAN,
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let count = sorted.len();
    let median = if count % 2 == 1 {
        sorted[count / 2]
    } else {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    };

    Some(ErrorStats {
        max: sorted[count - 1],
        mean: stable_sum(&sorted) / count as f64,
        median,
    })
}

pub fn stable_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut compensation = 0.0;
    for value in values {
        let adjusted = value - compensation;
        let next = sum + adjusted;
        compensation = (next - sum) - adjusted;
        sum = next;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn closeness_includes_the_boundary() {
        let tolerance = Tolerance::new(0.5, 0.0);
        assert!(tolerance.is_close(1.5, 1.0));
        assert!(!tolerance.is_close(1.5000001, 1.0));
    }

    #[test]
    fn relative_part_scales_with_expected() {
        let tolerance = Tolerance::new(0.0, 0.25);
        assert!(tolerance.is_close(5.0, 4.0));
        assert!(!tolerance.is_close(5.1, 4.0));
    }

    #[test]
    fn nan_and_infinities_compare_by_identity() {
        let tolerance = Tolerance::default();
        assert!(tolerance.is_close(f64::NAN, f64::NAN));
        assert!(!tolerance.is_close(f64::NAN, 1.0));
        assert!(tolerance.is_close(f64::INFINITY, f64::INFINITY));
        assert!(!tolerance.is_close(f64::INFINITY, f64::NEG_INFINITY));
    }

    #[test]
    fn spec_lookup_prefers_key_then_default() {
        let spec = ToleranceSpec::new()
            .with_default(Tolerance::absolute(1e-2))
            .with_key("energy", Tolerance::relative(1e-3));

        assert_eq!(spec.tolerance_for("energy"), Tolerance::new(DEFAULT_ABS_TOL, 1e-3));
        assert_eq!(spec.tolerance_for("other"), Tolerance::new(1e-2, DEFAULT_REL_TOL));
        assert_eq!(ToleranceSpec::new().tolerance_for("x"), Tolerance::default());
    }

    #[test]
    fn policy_file_fills_missing_members() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("policy.json");
        fs::write(&path, r#"{ "keys": { "data1": { "absTol": 0.1 } } }"#)
            .expect("policy should be written");

        let spec = load_tolerance_spec(&path).expect("policy should parse");
        assert_eq!(spec.tolerance_for("data1"), Tolerance::new(0.1, DEFAULT_REL_TOL));
        assert_eq!(spec.default, None);
    }

    #[test]
    fn missing_policy_reports_path() {
        let error = load_tolerance_spec("/nonexistent/policy.json").expect_err("read should fail");
        assert!(error.to_string().contains("/nonexistent/policy.json"));
    }

    #[test]
    fn summary_uses_midpoint_median() {
        let stats = summarize(&[4.0, 1.0, 3.0, 2.0]).expect("stats should exist");
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert!(summarize(&[]).is_none());
    }
}
