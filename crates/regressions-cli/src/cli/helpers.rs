use super::CliError;
use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use regressions_core::RegressionError;
use regressions_core::numerics::{ToleranceSpec, load_tolerance_spec};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const OBTAINED_MARKER: &str = ".obtained";
/// Suffixes of companion artifacts written next to obtained files.
const AUXILIARY_SUFFIXES: &[&str] = &[".diff.html", ".diff.png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum SnapshotKind {
    Data,
    Text,
    Binary,
    Table,
    Ndarrays,
    Image,
}

impl SnapshotKind {
    pub(super) fn detect(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "yml" | "yaml" => Self::Data,
            "csv" => Self::Table,
            "ndz" => Self::Ndarrays,
            "png" => Self::Image,
            _ => Self::Text,
        }
    }
}

pub(super) fn load_tolerances(path: Option<&Path>) -> Result<ToleranceSpec, CliError> {
    match path {
        Some(path) => load_tolerance_spec(path)
            .map_err(|error| CliError::Check(RegressionError::Configuration(error.to_string()))),
        None => Ok(ToleranceSpec::default()),
    }
}

pub(super) fn build_filter(patterns: &[String]) -> Result<Option<GlobSet>, CliError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|error| CliError::Usage(format!("invalid glob '{pattern}': {error}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|error| CliError::Usage(format!("invalid glob set: {error}")))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PendingSnapshot {
    pub(super) obtained: PathBuf,
    pub(super) expected: PathBuf,
    pub(super) expected_exists: bool,
}

/// `dir/x.obtained.yml` -> `dir/x.yml`. Companion artifacts such as
/// `x.obtained.diff.html` are not snapshots.
pub(super) fn expected_for_obtained(path: &Path) -> Option<PathBuf> {
    let file_name = path.file_name()?.to_str()?;
    let at = file_name.rfind(OBTAINED_MARKER)?;
    let (stem, rest) = (&file_name[..at], &file_name[at + OBTAINED_MARKER.len()..]);
    if stem.is_empty() || !(rest.is_empty() || rest.starts_with('.')) {
        return None;
    }
    if AUXILIARY_SUFFIXES.iter().any(|suffix| rest.ends_with(suffix)) {
        return None;
    }
    Some(path.with_file_name(format!("{stem}{rest}")))
}

pub(super) fn find_pending(
    dir: &Path,
    filter: Option<&GlobSet>,
) -> Result<Vec<PendingSnapshot>, CliError> {
    if !dir.is_dir() {
        return Err(CliError::Check(RegressionError::io(
            "read directory",
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        )));
    }

    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    let pending = files
        .into_iter()
        .filter(|path| match filter {
            Some(filter) => filter.is_match(path.strip_prefix(dir).unwrap_or(path)),
            None => true,
        })
        .filter_map(|obtained| {
            let expected = expected_for_obtained(&obtained)?;
            Some(PendingSnapshot {
                expected_exists: expected.is_file(),
                obtained,
                expected,
            })
        })
        .collect();
    Ok(pending)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), CliError> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to list directory '{}'", dir.display()))?;
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in '{}'", dir.display()))?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obtained_names_map_to_expected() {
        assert_eq!(
            expected_for_obtained(Path::new("data/test_a.obtained.yml")),
            Some(PathBuf::from("data/test_a.yml"))
        );
        assert_eq!(
            expected_for_obtained(Path::new("test_b.obtained")),
            Some(PathBuf::from("test_b"))
        );
        assert_eq!(expected_for_obtained(Path::new("test_a.yml")), None);
        assert_eq!(expected_for_obtained(Path::new("test_a.obtained.diff.html")), None);
        assert_eq!(expected_for_obtained(Path::new("test_a.obtainedx.yml")), None);
    }

    #[test]
    fn kind_follows_extension() {
        assert_eq!(SnapshotKind::detect(Path::new("a.yml")), SnapshotKind::Data);
        assert_eq!(SnapshotKind::detect(Path::new("a.YAML")), SnapshotKind::Data);
        assert_eq!(SnapshotKind::detect(Path::new("a.csv")), SnapshotKind::Table);
        assert_eq!(SnapshotKind::detect(Path::new("a.ndz")), SnapshotKind::Ndarrays);
        assert_eq!(SnapshotKind::detect(Path::new("a.png")), SnapshotKind::Image);
        assert_eq!(SnapshotKind::detect(Path::new("a.txt")), SnapshotKind::Text);
        assert_eq!(SnapshotKind::detect(Path::new("noext")), SnapshotKind::Text);
    }

    #[test]
    fn invalid_glob_is_a_usage_error() {
        let error = build_filter(&["a[".to_string()]).expect_err("glob should be invalid");
        assert!(matches!(error, CliError::Usage(_)));
    }
}
