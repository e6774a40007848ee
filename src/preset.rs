//! Literal boolean toggles in build preset files.
//!
//! Preset files are declarative option lists consumed by a project generator,
//! one option per line, e.g.
//!
//! ```text
//! <cmakeSwitch name="PX_GENERATE_STATIC_LIBRARIES" value="False" comment="..." />
//! ```
//!
//! This is not a parser. A line is targeted when one of its
//! whitespace-separated tokens contains a key, and the toggle is a literal
//! `value="<opposite>"` → `value="<desired>"` substitution. When the opposite
//! literal is not on the line (already correct, or an unexpected format) the
//! line is left untouched and no error is raised; [`PatchReport`] counts those
//! lines so callers can mention them.
//!
//! Line terminators are carried through unchanged, so the line count and order
//! of a patched file always match the original.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A key and the boolean value it must end up with.
pub type Toggle = (&'static str, bool);

/// What a patch pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PatchReport {
    /// Total lines seen.
    pub lines: usize,
    /// Lines that contained a targeted key.
    pub matched: usize,
    /// Lines that were rewritten.
    pub changed: usize,
}

impl PatchReport {
    /// Targeted lines where the opposite literal was not found.
    pub fn untouched(&self) -> usize {
        self.matched - self.changed
    }
}

/// Rendering used in preset files.
pub fn bool_literal(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// True when any whitespace-delimited token of `line` contains `key`.
pub fn line_contains_key(line: &str, key: &str) -> bool {
    line.split_whitespace().any(|token| token.contains(key))
}

/// Replace every `value="<from>"` with `value="<to>"`.
///
/// The boolean word is compared ASCII case-insensitively. Returns `None` when
/// nothing was replaced.
fn replace_value_literal(line: &str, from: bool, to: bool) -> Option<String> {
    const PREFIX: &str = "value=\"";
    let word = if from { "true" } else { "false" };

    let mut out = String::with_capacity(line.len());
    let mut copied = 0;
    let mut cursor = 0;
    let mut replaced = false;

    while let Some(pos) = line[cursor..].find(PREFIX) {
        let start = cursor + pos;
        let word_start = start + PREFIX.len();
        let word_end = word_start + word.len();

        let is_match = line
            .get(word_start..word_end)
            .is_some_and(|w| w.eq_ignore_ascii_case(word))
            && line[word_end..].starts_with('"');

        if is_match {
            out.push_str(&line[copied..start]);
            out.push_str(PREFIX);
            out.push_str(bool_literal(to));
            out.push('"');
            copied = word_end + 1;
            cursor = copied;
            replaced = true;
        } else {
            cursor = word_start;
        }
    }

    if !replaced {
        return None;
    }
    out.push_str(&line[copied..]);
    Some(out)
}

/// Apply `toggles` to preset text.
///
/// Only the first toggle (in slice order) whose key appears on a line is
/// applied to that line.
pub fn patch_preset_text(text: &str, toggles: &[Toggle]) -> (String, PatchReport) {
    let mut report = PatchReport::default();
    let mut out = String::with_capacity(text.len());

    for line in text.split_inclusive('\n') {
        report.lines += 1;

        let Some(&(_, desired)) = toggles
            .iter()
            .find(|(key, _)| line_contains_key(line, key))
        else {
            out.push_str(line);
            continue;
        };

        report.matched += 1;
        match replace_value_literal(line, !desired, desired) {
            Some(patched) => {
                report.changed += 1;
                out.push_str(&patched);
            }
            None => out.push_str(line),
        }
    }

    (out, report)
}

/// Apply `toggles` to one preset file in place.
///
/// The file is only rewritten when at least one line changed.
pub fn patch_preset_file(path: &Path, toggles: &[Toggle]) -> Result<PatchReport> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading preset file '{}'", path.display()))?;

    let (patched, report) = patch_preset_text(&text, toggles);
    if report.changed > 0 {
        fs::write(path, patched)
            .with_context(|| format!("writing preset file '{}'", path.display()))?;
    }
    Ok(report)
}

/// Apply `toggles` to every regular file directly inside `dir`, in name order.
pub fn patch_preset_dir(dir: &Path, toggles: &[Toggle]) -> Result<Vec<(PathBuf, PatchReport)>> {
    let mut reports = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry =
            entry.with_context(|| format!("reading preset directory '{}'", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let report = patch_preset_file(entry.path(), toggles)?;
        reports.push((entry.into_path(), report));
    }

    Ok(reports)
}

/// Remove the first occurrence of `token` on each line, together with the
/// whitespace directly before it.
///
/// Returns the number of lines changed. The file is left alone when the
/// token does not occur.
pub fn strip_token_occurrences(path: &Path, token: &str) -> Result<usize> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading '{}'", path.display()))?;

    let mut changed = 0;
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        match line.find(token) {
            Some(pos) => {
                let head = line[..pos].trim_end_matches([' ', '\t']);
                out.push_str(head);
                out.push_str(&line[pos + token.len()..]);
                changed += 1;
            }
            None => out.push_str(line),
        }
    }

    if changed > 0 {
        fs::write(path, out).with_context(|| format!("writing '{}'", path.display()))?;
    }
    Ok(changed)
}
