use super::CliError;
use super::helpers::*;
use anyhow::Context;
use regressions_core::fixtures::file::compare_binary;
use regressions_core::fixtures::image::{DEFAULT_DIFF_THRESHOLD, compare_image_files};
use regressions_core::fixtures::ndarrays::compare_archives;
use regressions_core::fixtures::table::compare_table_files;
use regressions_core::text_diff::{TextCompareOptions, compare_text};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(clap::Args)]
pub(super) struct CompareArgs {
    /// Obtained snapshot file
    obtained: PathBuf,

    /// Expected baseline file
    expected: PathBuf,

    /// Snapshot kind; detected from the expected file's extension when omitted
    #[arg(long, value_enum)]
    kind: Option<SnapshotKind>,

    /// JSON tolerance policy for table and array snapshots
    #[arg(long)]
    tolerances: Option<PathBuf>,

    /// Image difference threshold in percent
    #[arg(long, default_value_t = DEFAULT_DIFF_THRESHOLD)]
    diff_threshold: f64,

    /// Require images to differ by more than the threshold
    #[arg(long)]
    expect_different: bool,
}

#[derive(clap::Args)]
pub(super) struct PendingArgs {
    /// Directory searched recursively for obtained files
    dir: PathBuf,

    /// Only include paths (relative to DIR) matching one of these globs
    #[arg(long = "glob")]
    globs: Vec<String>,

    /// Print the listing as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
pub(super) struct AcceptArgs {
    /// Directory searched recursively for obtained files
    dir: PathBuf,

    /// Only accept paths (relative to DIR) matching one of these globs
    #[arg(long = "glob")]
    globs: Vec<String>,

    /// Show what would be accepted without touching any file
    #[arg(long)]
    dry_run: bool,
}

pub(super) fn run_compare_command(args: CompareArgs) -> Result<i32, CliError> {
    let kind = args
        .kind
        .unwrap_or_else(|| SnapshotKind::detect(&args.expected));
    let tolerances = load_tolerances(args.tolerances.as_deref())?;
    debug!(?kind, obtained = %args.obtained.display(), expected = %args.expected.display(), "comparing");

    let result = match kind {
        SnapshotKind::Data | SnapshotKind::Text => {
            compare_text(&args.obtained, &args.expected, &TextCompareOptions::default())
        }
        SnapshotKind::Binary => compare_binary(&args.obtained, &args.expected),
        SnapshotKind::Table => compare_table_files(&args.obtained, &args.expected, &tolerances),
        SnapshotKind::Ndarrays => compare_archives(&args.obtained, &args.expected, &tolerances),
        SnapshotKind::Image => compare_image_files(
            &args.obtained,
            &args.expected,
            args.diff_threshold,
            !args.expect_different,
        ),
    };

    match result {
        Ok(()) => {
            println!("PASS");
            Ok(0)
        }
        Err(error) if error.is_mismatch() => {
            println!("FAIL");
            println!("{error}");
            Ok(error.exit_code())
        }
        Err(error) => Err(CliError::Check(error)),
    }
}

pub(super) fn run_pending_command(args: PendingArgs) -> Result<i32, CliError> {
    let filter = build_filter(&args.globs)?;
    let pending = find_pending(&args.dir, filter.as_ref())?;

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&pending).context("failed to render pending list")?;
        println!("{rendered}");
        return Ok(0);
    }

    for snapshot in &pending {
        let marker = if snapshot.expected_exists { "changed" } else { "new" };
        println!(
            "{marker:>7}  {} -> {}",
            snapshot.obtained.display(),
            snapshot.expected.display()
        );
    }
    println!("{} pending snapshot(s)", pending.len());
    Ok(0)
}

pub(super) fn run_accept_command(args: AcceptArgs) -> Result<i32, CliError> {
    let filter = build_filter(&args.globs)?;
    let pending = find_pending(&args.dir, filter.as_ref())?;

    for snapshot in &pending {
        if args.dry_run {
            println!(
                "would accept {} -> {}",
                snapshot.obtained.display(),
                snapshot.expected.display()
            );
            continue;
        }
        if snapshot.expected_exists {
            fs::remove_file(&snapshot.expected).with_context(|| {
                format!("failed to replace '{}'", snapshot.expected.display())
            })?;
        }
        fs::rename(&snapshot.obtained, &snapshot.expected).with_context(|| {
            format!(
                "failed to move '{}' to '{}'",
                snapshot.obtained.display(),
                snapshot.expected.display()
            )
        })?;
        info!(expected = %snapshot.expected.display(), "accepted snapshot");
        println!("accepted {}", snapshot.expected.display());
    }

    let verb = if args.dry_run { "would be accepted" } else { "accepted" };
    println!("{} snapshot(s) {verb}", pending.len());
    Ok(0)
}
