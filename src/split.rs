//! Recording-length survey and fixed-length splitting.
//!
//! Long resting-state recordings are cut into consecutive segments of at
//! least `min_length` time-points so every segment is analysable on its
//! own. Segment files are named `<subject><suffix>.tsv` with suffix
//! letters A, B, … in recording order.
use anyhow::{bail, ensure, Context, Result};
use std::fs;
use std::path::Path;

use crate::io::subject_name;

/// One surveyed recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingLength {
    pub file_name: String,
    pub subject: String,
    /// Number of time-points (non-empty lines).
    pub length: usize,
    /// Cohort flag derived from the subject name (`PAT` substring).
    pub pathological: bool,
}

/// Survey every `.tsv` recording in `dir`, longest first.
pub fn survey_lengths(dir: &Path) -> Result<Vec<RecordingLength>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(String::from)
        else {
            continue;
        };
        if !path.is_file() || !file_name.ends_with(".tsv") {
            continue;
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let length = text.lines().filter(|l| !l.trim().is_empty()).count();
        let subject = subject_name(&file_name);
        let pathological = subject.contains("PAT");
        out.push(RecordingLength { file_name, subject, length, pathological });
    }
    out.sort_by(|a, b| b.length.cmp(&a.length).then_with(|| a.file_name.cmp(&b.file_name)));
    Ok(out)
}

/// Split every recording of `source` into `destination`.
///
/// Hard precondition: `destination` must not exist yet; the run aborts
/// before writing anything if it does. Each segment spans `min_length`
/// rows except the last, which absorbs the remainder (so every segment is
/// at least `min_length` rows); a recording shorter than `2·min_length`
/// becomes a single segment.
pub fn split_all(source: &Path, destination: &Path, min_length: usize) -> Result<Vec<RecordingLength>> {
    ensure!(min_length > 0, "min_length must be positive");
    if destination.exists() {
        bail!(
            "destination directory {} already exists; remove it before splitting",
            destination.display()
        );
    }
    let survey = survey_lengths(source)?;
    fs::create_dir_all(destination)
        .with_context(|| format!("creating {}", destination.display()))?;

    for rec in &survey {
        split_one(rec, source, destination, min_length)?;
    }
    survey_lengths(destination)
}

fn split_one(
    rec: &RecordingLength,
    source: &Path,
    destination: &Path,
    min_length: usize,
) -> Result<()> {
    let text = fs::read_to_string(source.join(&rec.file_name))
        .with_context(|| format!("reading {}", rec.file_name))?;
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let length = lines.len();

    let mut suffix = b'A';
    let write_segment = |start: usize, end: usize, suffix: u8| -> Result<()> {
        let name = format!("{}{}.tsv", rec.subject, suffix as char);
        let mut buf = String::new();
        for line in &lines[start..=end] {
            buf.push_str(line);
            buf.push('\n');
        }
        fs::write(destination.join(&name), buf).with_context(|| format!("writing {name}"))
    };

    if length < 2 * min_length {
        write_segment(0, length.saturating_sub(1), suffix)?;
        return Ok(());
    }

    let mut start = 0;
    let mut end = min_length - 1;
    write_segment(start, end, suffix)?;
    suffix += 1;
    while end + 2 * min_length < length {
        start += min_length;
        end += min_length;
        write_segment(start, end, suffix)?;
        suffix += 1;
    }
    start += min_length;
    write_segment(start, length - 1, suffix)?;
    Ok(())
}
