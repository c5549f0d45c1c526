//! Checkstyle boundary: running the linter jar, parsing its plain output,
//! caching verdicts per tool, and mapping error sources to coarse types.
//!
//! Checkstyle's plain formatter prints one violation per line:
//!
//! ```text
//! [ERROR] /r/p/styler/12/Foo.java:41:9: '}' is not preceded with whitespace. [WhitespaceAround]
//! ```
//!
//! Every linted file appears in `CheckstyleResults`, with an empty error
//! list when clean, so "no entry" and "no errors" stay distinguishable. A run
//! that never reaches `Audit done.` or reports an exception is an error and
//! is never cached.

use crate::error::{Error, Result};
use crate::layout::Experiment;
use crate::models::{CheckstyleResults, FileResult, InstanceMetadata, LintError};
use crate::utils;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

const AUDIT_DONE: &str = "Audit done.";
const EXCEPTION_MARKER: &str = "Got an exception";

/// Runs the linter over a directory tree.
pub trait Linter {
    fn check(&self, config: &Path, dir: &Path, jar: &str) -> Result<CheckstyleResults>;
}

#[derive(Debug, Clone)]
/// Checkstyle launched as `<java> -jar <jars_dir>/<jar> -c <config> <dir>`.
pub struct CheckstyleJar {
    pub java: String,
    pub jars_dir: PathBuf,
    pub extension: String,
}

impl Linter for CheckstyleJar {
    fn check(&self, config: &Path, dir: &Path, jar: &str) -> Result<CheckstyleResults> {
        let files = source_files(dir, &self.extension);
        let mut results = CheckstyleResults::default();
        if files.is_empty() {
            debug!(dir = %dir.display(), "nothing to lint");
            return Ok(results);
        }

        let jar_path = self.jars_dir.join(jar);
        debug!(dir = %dir.display(), jar = %jar_path.display(), files = files.len(), "running checkstyle");
        // Checkstyle exits with the violation count, so the status says nothing
        let out = Command::new(&self.java)
            .arg("-jar")
            .arg(&jar_path)
            .arg("-c")
            .arg(config)
            .arg(dir)
            .output()
            .map_err(|e| Error::Spawn {
                program: self.java.clone(),
                source: e,
            })?;
        let stdout = String::from_utf8_lossy(&out.stdout);
        let stderr = String::from_utf8_lossy(&out.stderr);
        if let Err(message) = verify_run(&stdout, &stderr) {
            warn!(dir = %dir.display(), message = %message, "checkstyle failed");
            return Err(Error::Lint {
                dir: dir.to_path_buf(),
                message,
            });
        }

        // Files without a reported violation were linted clean
        for f in &files {
            results
                .checkstyle_results
                .insert(canonical(f), FileResult::default());
        }
        for (path, err) in parse_plain_output(&stdout) {
            results
                .checkstyle_results
                .entry(canonical(Path::new(&path)))
                .or_default()
                .errors
                .push(err);
        }
        Ok(results)
    }
}

/// A completed audit ends with `Audit done.` and reports no exception.
/// Violation messages may mention exception types, so only stderr is
/// searched for a bare `Exception`.
pub fn verify_run(stdout: &str, stderr: &str) -> std::result::Result<(), String> {
    let failed = stdout
        .lines()
        .find(|l| l.contains(EXCEPTION_MARKER))
        .or_else(|| {
            stderr
                .lines()
                .find(|l| l.contains(EXCEPTION_MARKER) || l.contains("Exception"))
        });
    if let Some(line) = failed {
        return Err(line.trim().to_string());
    }
    if !stdout.lines().any(|l| l.trim() == AUDIT_DONE) {
        let last = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("audit did not finish");
        return Err(last.trim().to_string());
    }
    Ok(())
}

fn canonical(p: &Path) -> String {
    std::fs::canonicalize(p)
        .unwrap_or_else(|_| p.to_path_buf())
        .to_string_lossy()
        .to_string()
}

/// All files below `dir` with the given extension, sorted.
pub fn source_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let pattern = dir
        .join("**")
        .join(format!("*.{}", extension))
        .to_string_lossy()
        .to_string();
    let mut out: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(paths) => paths.flatten().filter(|p| p.is_file()).collect(),
        Err(_) => Vec::new(),
    };
    out.sort();
    out
}

fn plain_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\[(?P<sev>[A-Z]+)\]\s+(?P<path>.+?):(?P<line>\d+)(?::(?P<col>\d+))?:\s*(?P<msg>.*?)\s*\[(?P<module>[\w.]+)\]\s*$",
        )
        .expect("valid checkstyle line regex")
    })
}

/// Parse checkstyle plain output into `(path, error)` pairs.
/// Banner lines ("Starting audit...", "Audit done.") are ignored.
pub fn parse_plain_output(stdout: &str) -> Vec<(String, LintError)> {
    let re = plain_line_re();
    stdout
        .lines()
        .filter_map(|line| {
            let caps = re.captures(line.trim_end())?;
            let err = LintError {
                source: caps["module"].to_string(),
                severity: caps["sev"].to_ascii_lowercase(),
                line: caps["line"].parse().ok(),
                column: caps.name("col").and_then(|c| c.as_str().parse().ok()),
                message: caps["msg"].to_string(),
            };
            Some((caps["path"].to_string(), err))
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
/// Lookup table from an error source to its coarse error type.
pub struct ErrorTypes {
    overrides: HashMap<String, String>,
}

impl ErrorTypes {
    pub fn new(overrides: HashMap<String, String>) -> Self {
        ErrorTypes { overrides }
    }

    /// `com.puppycrawl...WhitespaceAroundCheck` and `WhitespaceAround` both map
    /// to `WhitespaceAround` unless overridden.
    pub fn label(&self, source: &str) -> String {
        if let Some(l) = self.overrides.get(source) {
            return l.clone();
        }
        let last = source.rsplit('.').next().unwrap_or(source);
        let base = last.strip_suffix("Check").unwrap_or(last);
        if let Some(l) = self.overrides.get(base) {
            return l.clone();
        }
        base.to_string()
    }

    /// Coarse types of every injected error, duplicates kept.
    pub fn injected(&self, meta: &InstanceMetadata) -> Vec<String> {
        meta.errors.iter().map(|e| self.label(&e.source)).collect()
    }

    /// Errors whose type was deliberately injected.
    pub fn targeted(&self, errors: &[LintError], injected: &BTreeSet<String>) -> Vec<LintError> {
        errors
            .iter()
            .filter(|e| injected.contains(&self.label(&e.source)))
            .cloned()
            .collect()
    }
}

/// Linter verdicts for a tool's output, read from the experiment cache when
/// present. Fresh results are cached only when the tool produced files, so
/// out-of-band outputs that arrive later still get linted.
pub fn tool_results(
    experiment: &Experiment,
    tool: &str,
    linter: &dyn Linter,
) -> Result<CheckstyleResults> {
    let cache = experiment.linter_results_path(tool);
    if cache.is_file() {
        debug!(project = %experiment.project, tool, "using cached linter results");
        return utils::read_json(&cache);
    }
    let dir = experiment.tool_dir(tool);
    if source_files(&dir, &experiment.extension).is_empty() {
        debug!(project = %experiment.project, tool, "no tool output to lint");
        return Ok(CheckstyleResults::default());
    }
    info!(project = %experiment.project, tool, "linting tool output");
    let results = linter.check(&experiment.linter_config(), &dir, &experiment.checkstyle_jar)?;
    utils::write_json(&cache, &results)?;
    Ok(results)
}

/// Cached results for a tool, without running the linter.
pub fn cached_results(experiment: &Experiment, tool: &str) -> Result<CheckstyleResults> {
    let cache = experiment.linter_results_path(tool);
    if !cache.is_file() {
        return Err(Error::LinterResultsMissing {
            tool: tool.to_string(),
            path: cache,
        });
    }
    utils::read_json(&cache)
}
