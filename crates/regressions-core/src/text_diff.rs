use crate::comparator::MismatchError;
use crate::domain::{RegressionError, RegressionResult};
use similar::{DiffTag, TextDiff};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const MAX_DIFF_LINES: usize = 500;
const CONTEXT_LINES: usize = 3;

pub type LineFixer<'a> = &'a dyn Fn(Vec<String>) -> Vec<String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
}

impl Encoding {
    pub fn decode(self, path: &Path, bytes: Vec<u8>) -> RegressionResult<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes).map_err(|error| {
                RegressionError::io(
                    "decode",
                    path,
                    std::io::Error::new(std::io::ErrorKind::InvalidData, error),
                )
            }),
            Self::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
        }
    }

    pub fn encode(self, text: &str) -> RegressionResult<Vec<u8>> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Latin1 => text
                .chars()
                .map(|ch| {
                    u8::try_from(u32::from(ch)).map_err(|_| {
                        RegressionError::InvalidInput(format!(
                            "character {ch:?} cannot be encoded as latin-1"
                        ))
                    })
                })
                .collect(),
        }
    }
}

#[derive(Default)]
pub struct TextCompareOptions<'a> {
    /// Applied to the obtained lines before comparing.
    pub fix_callback: Option<LineFixer<'a>>,
    pub encoding: Encoding,
}

pub fn read_text(path: &Path, encoding: Encoding) -> RegressionResult<String> {
    let bytes = fs::read(path).map_err(|source| RegressionError::io("read", path, source))?;
    encoding.decode(path, bytes)
}

fn is_line_boundary(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Splits on every universal line boundary, treating `\r\n` as one. A
/// trailing boundary does not produce an empty last line.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let Some(at) = rest.find(is_line_boundary) else {
            lines.push(rest.to_string());
            break;
        };
        lines.push(rest[..at].to_string());
        let tail = &rest[at..];
        let width = if tail.starts_with("\r\n") {
            2
        } else {
            tail.chars().next().map_or(1, char::len_utf8)
        };
        rest = &tail[width..];
    }
    lines
}

pub fn compare_text(
    obtained: &Path,
    expected: &Path,
    options: &TextCompareOptions<'_>,
) -> RegressionResult<()> {
    let mut obtained_lines = split_lines(&read_text(obtained, options.encoding)?);
    let expected_lines = split_lines(&read_text(expected, options.encoding)?);
    if let Some(fix) = options.fix_callback {
        obtained_lines = fix(obtained_lines);
    }

    if obtained_lines == expected_lines {
        return Ok(());
    }

    let diff_lines = unified_diff(&expected_lines, &obtained_lines);
    if diff_lines.len() > MAX_DIFF_LINES {
        return Err(MismatchError::Text(format!(
            "Files are different, but diff is too big ({} lines)\n- obtained: {}\n- expected: {}",
            diff_lines.len(),
            obtained.display(),
            expected.display()
        ))
        .into());
    }

    let html_path = html_diff_path(obtained);
    let html_note = match write_html_diff(
        &html_path,
        expected,
        obtained,
        &expected_lines,
        &obtained_lines,
    ) {
        Ok(()) => html_path.display().to_string(),
        Err(error) => {
            warn!(path = %html_path.display(), %error, "html diff was not written");
            format!("(failed to generate html diff: {error})")
        }
    };

    let mut message = format!(
        "FILES DIFFER:\n{}\n{}\nHTML DIFF: {}\n",
        expected.display(),
        obtained.display(),
        html_note
    );
    message.push_str(&diff_lines.join("\n"));
    Err(MismatchError::Text(message).into())
}

/// Unified diff lines from `expected` to `obtained`, without line terminators.
pub fn unified_diff(expected: &[String], obtained: &[String]) -> Vec<String> {
    let expected_refs: Vec<&str> = expected.iter().map(String::as_str).collect();
    let obtained_refs: Vec<&str> = obtained.iter().map(String::as_str).collect();
    let diff = TextDiff::from_slices(&expected_refs, &obtained_refs);

    let groups = diff.grouped_ops(CONTEXT_LINES);
    if groups.is_empty() {
        return Vec::new();
    }

    let mut lines = vec!["--- ".to_string(), "+++ ".to_string()];
    for group in groups {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_start = first.old_range().start;
        let old_len = last.old_range().end - old_start;
        let new_start = first.new_range().start;
        let new_len = last.new_range().end - new_start;
        lines.push(format!(
            "@@ -{} +{} @@",
            hunk_range(old_start, old_len),
            hunk_range(new_start, new_len)
        ));

        for op in &group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    similar::ChangeTag::Equal => ' ',
                    similar::ChangeTag::Delete => '-',
                    similar::ChangeTag::Insert => '+',
                };
                lines.push(format!("{sign}{}", change.value()));
            }
        }
    }
    lines
}

fn hunk_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, len),
    }
}

fn write_html_diff(
    html_path: &Path,
    expected_path: &Path,
    obtained_path: &Path,
    expected: &[String],
    obtained: &[String],
) -> RegressionResult<()> {
    let html = render_html_diff(expected_path, obtained_path, expected, obtained);
    fs::write(html_path, html).map_err(|source| RegressionError::io("write", html_path, source))
}

pub fn render_html_diff(
    expected_path: &Path,
    obtained_path: &Path,
    expected: &[String],
    obtained: &[String],
) -> String {
    let expected_refs: Vec<&str> = expected.iter().map(String::as_str).collect();
    let obtained_refs: Vec<&str> = obtained.iter().map(String::as_str).collect();
    let diff = TextDiff::from_slices(&expected_refs, &obtained_refs);

    let mut rows = String::new();
    for op in diff.ops() {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        let class = match tag {
            DiffTag::Equal => "equal",
            DiffTag::Delete => "delete",
            DiffTag::Insert => "insert",
            DiffTag::Replace => "replace",
        };
        let height = old_range.len().max(new_range.len());
        for offset in 0..height {
            let left = old_range
                .start
                .checked_add(offset)
                .filter(|index| *index < old_range.end);
            let right = new_range
                .start
                .checked_add(offset)
                .filter(|index| *index < new_range.end);
            let _ = writeln!(
                rows,
                "<tr class=\"{class}\">{}{}</tr>",
                html_cells("old", left, expected),
                html_cells("new", right, obtained)
            );
        }
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>\n\
         table {{ border-collapse: collapse; font-family: monospace; }}\n\
         td {{ padding: 0 6px; white-space: pre; vertical-align: top; }}\n\
         td.lineno {{ color: #888; text-align: right; }}\n\
         tr.delete td.old, tr.replace td.old {{ background: #fdd; }}\n\
         tr.insert td.new, tr.replace td.new {{ background: #dfd; }}\n\
         </style>\n</head>\n<body>\n<table>\n<thead><tr><th colspan=\"2\">{expected}</th><th colspan=\"2\">{obtained}</th></tr></thead>\n<tbody>\n{rows}</tbody>\n</table>\n</body>\n</html>\n",
        title = escape_html(&format!("{} vs {}", expected_path.display(), obtained_path.display())),
        expected = escape_html(&expected_path.display().to_string()),
        obtained = escape_html(&obtained_path.display().to_string()),
    )
}

fn html_cells(side: &str, index: Option<usize>, lines: &[String]) -> String {
    match index.and_then(|index| lines.get(index).map(|line| (index, line))) {
        Some((index, line)) => format!(
            "<td class=\"lineno\">{}</td><td class=\"{side}\">{}</td>",
            index + 1,
            escape_html(line)
        ),
        None => format!("<td class=\"lineno\"></td><td class=\"{side}\"></td>"),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Path of the HTML report produced for an obtained file.
pub fn html_diff_path(obtained: &Path) -> PathBuf {
    obtained.with_extension("diff.html")
}
