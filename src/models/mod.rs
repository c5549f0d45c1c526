//! Shared data models for datasets, linter results and reports.

pub mod tool;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;

/// Numeric name of a corrupted file instance folder (`errored/1/<id>`).
pub type FileId = u32;

#[derive(Debug, Clone, Deserialize)]
/// `info.json` at the root of a project's real dataset.
pub struct DatasetInfo {
    pub checkstyle_jar: String,
    #[serde(flatten)]
    pub extra: Map<String, Json>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// One deliberately injected violation recorded for a file instance.
pub struct InjectedError {
    pub source: String,
    #[serde(flatten)]
    pub extra: Map<String, Json>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// `metadata.json` inside a file instance folder.
pub struct InstanceMetadata {
    #[serde(default)]
    pub errors: Vec<InjectedError>,
    #[serde(flatten)]
    pub extra: Map<String, Json>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A single violation reported by the linter.
pub struct LintError {
    pub source: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileResult {
    #[serde(default)]
    pub errors: Vec<LintError>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// Linter verdicts keyed by linted file path; the on-disk cache shape.
pub struct CheckstyleResults {
    #[serde(default)]
    pub checkstyle_results: BTreeMap<String, FileResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Per-file report record: the original targeted errors plus each tool's leftovers.
///
/// A tool maps to `None` when it produced no result for the file.
pub struct ReportEntry {
    pub information: FileResult,
    pub results: BTreeMap<String, Option<Vec<LintError>>>,
}

pub type Report = BTreeMap<FileId, ReportEntry>;

/// Cross-experiment report keyed by a dense sequence starting at zero.
pub type MergedReport = BTreeMap<usize, ReportEntry>;

/// File instance ID encoded in a linted path: the name of its parent directory.
pub fn file_id_of(path: &str) -> Option<FileId> {
    std::path::Path::new(path)
        .parent()?
        .file_name()?
        .to_str()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_of_parent_dir() {
        assert_eq!(file_id_of("/x/errored/1/42/Foo.java"), Some(42));
        assert_eq!(file_id_of("styler/7/Bar.java"), Some(7));
        assert_eq!(file_id_of("clean/Foo.java"), None);
        assert_eq!(file_id_of("Foo.java"), None);
    }

    #[test]
    fn test_report_roundtrip_keeps_null_results() {
        let raw = r#"{"3": {"information": {"errors": []}, "results": {"naturalize": null, "styler": []}}}"#;
        let report: Report = serde_json::from_str(raw).unwrap();
        let entry = &report[&3];
        assert_eq!(entry.results["naturalize"], None);
        assert_eq!(entry.results["styler"], Some(vec![]));
        let back = serde_json::to_value(&report).unwrap();
        assert!(back["3"]["results"]["naturalize"].is_null());
    }

    #[test]
    fn test_instance_metadata_keeps_unknown_fields() {
        let raw = r#"{"errors": [{"source": "a.b.IndentationCheck", "line": 4}], "type": "insertion"}"#;
        let meta: InstanceMetadata = serde_json::from_str(raw).unwrap();
        assert_eq!(meta.errors.len(), 1);
        assert_eq!(meta.errors[0].extra["line"], 4);
        assert_eq!(meta.extra["type"], "insertion");
    }
}
