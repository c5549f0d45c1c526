//! Line-level diff sizes between corrupted inputs and repaired outputs.
//!
//! The size of a repair is the number of inserted plus deleted lines needed to
//! turn the corrupted file into the repaired one (the edit distance without
//! substitutions, `n + m - 2 * LCS`).
//!
//! Results carry no file IDs: they are a multiset of sizes meant for
//! distribution summaries. IDs missing a file on either side are skipped and
//! only counted.

use crate::checkstyle::{ErrorTypes, Linter};
use crate::error::{Error, Result};
use crate::layout::Experiment;
use crate::models::FileId;
use crate::repaired;
use crate::utils;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffOutcome {
    pub sizes: Vec<usize>,
    pub skipped: usize,
}

impl DiffOutcome {
    pub fn extend(&mut self, other: DiffOutcome) {
        self.sizes.extend(other.sizes);
        self.skipped += other.skipped;
    }
}

/// Diff sizes for every file repaired by `tool` in `experiment`.
pub fn diff_sizes(
    experiment: &Experiment,
    tool: &str,
    linter: &dyn Linter,
    types: &ErrorTypes,
) -> Result<DiffOutcome> {
    let repaired = repaired::get_repaired(tool, experiment, linter, types, true)?;
    diff_sizes_for(experiment, tool, &repaired)
}

/// Diff sizes for the given repaired IDs.
pub fn diff_sizes_for(
    experiment: &Experiment,
    tool: &str,
    repaired: &BTreeSet<FileId>,
) -> Result<DiffOutcome> {
    let errored_dir = experiment.level_dir();
    let repaired_dir = experiment.tool_dir(tool);
    let mut out = DiffOutcome::default();
    for id in repaired {
        let original_folder = errored_dir.join(id.to_string());
        let repaired_folder = repaired_dir.join(id.to_string());
        let Some(original) = first_source(&original_folder, &experiment.extension) else {
            debug!(project = %experiment.project, tool, id, "no corrupted source file");
            out.skipped += 1;
            continue;
        };
        let Some(fixed) = first_source(&repaired_folder, &experiment.extension) else {
            debug!(project = %experiment.project, tool, id, "no repaired source file");
            out.skipped += 1;
            continue;
        };
        out.sizes
            .push(line_edit_distance(&read_lossy(&original)?, &read_lossy(&fixed)?));
    }
    Ok(out)
}

fn first_source(folder: &Path, extension: &str) -> Option<std::path::PathBuf> {
    utils::files_with_extension(folder, extension).into_iter().next()
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Inserted plus deleted lines between `a` and `b`.
pub fn line_edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<&str> = a.lines().collect();
    let b: Vec<&str> = b.lines().collect();

    // Common prefix and suffix never contribute
    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let (a, b) = (&a[prefix..], &b[prefix..]);
    let suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let (a, b) = (&a[..a.len() - suffix], &b[..b.len() - suffix]);

    if a.is_empty() || b.is_empty() {
        return a.len() + b.len();
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            cur[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    let lcs = prev[b.len()];
    a.len() + b.len() - 2 * lcs
}

/// Five-number style summary of a list of diff sizes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffSummary {
    pub samples: usize,
    pub min: usize,
    pub median: f64,
    pub mean: f64,
    pub max: usize,
}

pub fn summarize(sizes: &[usize]) -> Option<DiffSummary> {
    if sizes.is_empty() {
        return None;
    }
    let mut sorted = sizes.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    let median = if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
    };
    Some(DiffSummary {
        samples: n,
        min: sorted[0],
        median,
        mean: sorted.iter().sum::<usize>() as f64 / n as f64,
        max: sorted[n - 1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::stage;
    use crate::layout::tests::{seed_project, test_layout};
    use tempfile::tempdir;

    #[test]
    fn test_line_edit_distance() {
        assert_eq!(line_edit_distance("a\nb\nc", "a\nb\nc"), 0);
        assert_eq!(line_edit_distance("a\nb\nc", "a\nc"), 1);
        assert_eq!(line_edit_distance("a\nb\nc", "a\nB\nc"), 2);
        assert_eq!(line_edit_distance("", "x\ny"), 2);
        assert_eq!(line_edit_distance("x {\n  y;\n}", "x {\ny;\n  z;\n}"), 3);
    }

    #[test]
    fn test_diff_sizes_skip_missing_files() {
        let tmp = tempdir().unwrap();
        let layout = test_layout(tmp.path());
        seed_project(&layout, "demo", &[1, 2, 3]);
        let exp = stage(&layout, "demo").unwrap();
        // 1: repaired with one line changed; 2: no repaired file; 3: no corrupted source
        let out1 = exp.tool_dir("t").join("1");
        fs::create_dir_all(&out1).unwrap();
        fs::write(out1.join("Foo.java"), "class Foo {\n    int x;\n}\n").unwrap();
        fs::create_dir_all(exp.tool_dir("t").join("2")).unwrap();
        fs::remove_file(exp.level_dir().join("3/Foo.java")).unwrap();
        let out3 = exp.tool_dir("t").join("3");
        fs::create_dir_all(&out3).unwrap();
        fs::write(out3.join("Foo.java"), "class Foo {}\n").unwrap();

        let outcome = diff_sizes_for(&exp, "t", &BTreeSet::from([1, 2, 3])).unwrap();
        assert_eq!(outcome.sizes, vec![2]);
        assert_eq!(outcome.skipped, 2);
    }

    #[test]
    fn test_summarize() {
        assert_eq!(summarize(&[]), None);
        let s = summarize(&[4, 1, 3, 2]).unwrap();
        assert_eq!(s.samples, 4);
        assert_eq!(s.min, 1);
        assert_eq!(s.max, 4);
        assert_eq!(s.median, 2.5);
        assert_eq!(s.mean, 2.5);
    }
}
