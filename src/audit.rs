//! Extraction of checkstyle findings from raw CI build logs.
//!
//! Maven prints checkstyle findings between a plugin banner and the audit
//! markers:
//!
//! ```text
//! [INFO] --- maven-checkstyle-plugin:3.1.0:check (validate) @ app ---
//! Starting audit...
//! src/main/java/A.java:12: warning: Line is longer than 100 characters.
//! Audit done.
//! ```
//!
//! The extractor is a three-state machine fed one line at a time. The banner
//! only arms it for the very next line; "Audit done." closes the section and
//! is not captured.

use serde::Serialize;

const PLUGIN_BANNER: &str = "--- maven-checkstyle-plugin:";
const AUDIT_START: &str = "Starting audit...";
const AUDIT_END: &str = "Audit done.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditState {
    #[default]
    Outside,
    /// The previous line was the plugin banner.
    Pending,
    InAudit,
}

#[derive(Debug, Default)]
pub struct AuditExtractor {
    state: AuditState,
}

impl AuditExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AuditState {
        self.state
    }

    /// Advance by one line; returns the line when it belongs to an audit body.
    pub fn feed<'l>(&mut self, line: &'l str) -> Option<&'l str> {
        match self.state {
            AuditState::Outside | AuditState::Pending if line.contains(PLUGIN_BANNER) => {
                self.state = AuditState::Pending;
                None
            }
            AuditState::Outside => None,
            AuditState::Pending => {
                self.state = if line.contains(AUDIT_START) {
                    AuditState::InAudit
                } else {
                    AuditState::Outside
                };
                None
            }
            AuditState::InAudit => {
                if line.contains(AUDIT_END) {
                    self.state = AuditState::Outside;
                    None
                } else {
                    Some(line)
                }
            }
        }
    }
}

/// Raw lines inside every audit section of a log, in order.
pub fn audit_lines<'l, I>(lines: I) -> Vec<&'l str>
where
    I: IntoIterator<Item = &'l str>,
{
    let mut extractor = AuditExtractor::new();
    lines
        .into_iter()
        .filter_map(|l| extractor.feed(l))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One checkstyle finding taken from a build log.
pub struct AuditRecord {
    #[serde(rename = "type")]
    pub severity: Severity,
    pub file: String,
    pub error: String,
    pub plain_text: String,
}

/// First two `": "`-separated segments; a missing segment is empty.
fn split_two(line: &str) -> (String, String) {
    let mut parts = line.split(": ");
    let file = parts.next().unwrap_or_default().to_string();
    let error = parts.next().unwrap_or_default().to_string();
    (file, error)
}

/// Classify a captured audit line.
///
/// Checked in order: `: warning:`, `: error:`, `[ERROR]`, `[WARNING]`, then
/// anything else. Maven's `[WARNING]` tag is filed under `Error`.
pub fn classify(line: &str) -> AuditRecord {
    let (severity, (file, error)) = if let Some((f, e)) = line.split_once(": warning:") {
        (Severity::Warning, (f.to_string(), e.to_string()))
    } else if let Some((f, e)) = line.split_once(": error:") {
        (Severity::Error, (f.to_string(), e.to_string()))
    } else if line.contains("[ERROR]") || line.contains("[WARNING]") {
        (Severity::Error, split_two(line))
    } else {
        (Severity::Unknown, split_two(line))
    };
    AuditRecord {
        severity,
        file,
        error,
        plain_text: line.to_string(),
    }
}

/// Checkstyle findings of one log.
pub fn find_audit_records<'l, I>(lines: I) -> Vec<AuditRecord>
where
    I: IntoIterator<Item = &'l str>,
{
    audit_lines(lines).into_iter().map(classify).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub unknown: usize,
}

impl SeverityCounts {
    pub fn total(&self) -> usize {
        self.error + self.warning + self.unknown
    }
}

pub fn count_severities(records: &[AuditRecord]) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for r in records {
        match r.severity {
            Severity::Error => counts.error += 1,
            Severity::Warning => counts.warning += 1,
            Severity::Unknown => counts.unknown += 1,
        }
    }
    counts
}
