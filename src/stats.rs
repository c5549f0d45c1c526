//! Aggregation of repaired sets across tools and projects.
//!
//! - `count_summary`: repaired-set sizes per project and tool plus a total row.
//! - `error_type_summary`: per tool, the share of injected errors of each type
//!   that ended up in repaired files, including a synthetic `all_tools` tool.
//! - `venn`: overlap of three tools over `(project, id)` pairs.
//! - `compare_protocols`: overlap of two protocol variants of one tool.

use crate::checkstyle::ErrorTypes;
use crate::error::{Error, Result};
use crate::experiment::ExperimentResult;
use crate::layout::Experiment;
use crate::models::FileId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::AddAssign;

pub const ALL_TOOLS: &str = "all_tools";
pub const OUT_OF: &str = "out_of";
pub const TOTAL: &str = "total";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountRow {
    pub label: String,
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Table of repaired counts: one column per tool then `out_of`, one row per
/// project then `total`.
pub struct CountSummary {
    pub columns: Vec<String>,
    pub rows: Vec<CountRow>,
}

pub fn count_summary(results: &[ExperimentResult]) -> CountSummary {
    let mut columns: Vec<String> = results
        .first()
        .map(|r| r.tool_names())
        .unwrap_or_default();
    columns.push(OUT_OF.to_string());

    let mut rows: Vec<CountRow> = results
        .iter()
        .map(|r| {
            let counts = columns
                .iter()
                .map(|c| {
                    if c == OUT_OF {
                        r.out_of.len()
                    } else {
                        r.repaired(c).map(|s| s.len()).unwrap_or(0)
                    }
                })
                .collect();
            CountRow {
                label: r.project.clone(),
                counts,
            }
        })
        .collect();

    let mut total = vec![0usize; columns.len()];
    for row in &rows {
        for (t, c) in total.iter_mut().zip(&row.counts) {
            *t += c;
        }
    }
    rows.push(CountRow {
        label: TOTAL.to_string(),
        counts: total,
    });
    CountSummary { columns, rows }
}

/// Coarse error types injected into each originally flagged instance.
pub fn error_types_by_id(
    experiment: &Experiment,
    types: &ErrorTypes,
) -> BTreeMap<FileId, Vec<String>> {
    experiment
        .out_of()
        .into_iter()
        .map(|id| {
            let labels = experiment
                .instance_metadata(id)
                .map(|m| types.injected(&m))
                .unwrap_or_default();
            (id, labels)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolErrorRates {
    pub tool: String,
    /// Injected errors per type found in the tool's repaired files.
    pub repaired: BTreeMap<String, usize>,
    /// `repaired / out_of * 100` for every type with a non-zero `out_of`.
    pub relative: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorTypeSummary {
    pub out_of: BTreeMap<String, usize>,
    pub tools: Vec<ToolErrorRates>,
}

fn count_types<'a>(
    ids: impl IntoIterator<Item = &'a FileId>,
    types_by_id: &BTreeMap<FileId, Vec<String>>,
    into: &mut BTreeMap<String, usize>,
) {
    for id in ids {
        for label in types_by_id.get(id).into_iter().flatten() {
            *into.entry(label.clone()).or_default() += 1;
        }
    }
}

/// Relative repair rate per tool and error type across all given projects.
///
/// Each input pairs a project's result with the injected error types of its
/// instances (see `error_types_by_id`). Error types never injected are absent;
/// a tool that repaired none of a type gets `0.0`.
pub fn error_type_summary(
    inputs: &[(&ExperimentResult, &BTreeMap<FileId, Vec<String>>)],
) -> ErrorTypeSummary {
    let mut tools: Vec<String> = inputs
        .first()
        .map(|(r, _)| r.tool_names())
        .unwrap_or_default();

    let mut out_of: BTreeMap<String, usize> = BTreeMap::new();
    let mut repaired: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for (result, types_by_id) in inputs {
        count_types(&result.out_of, types_by_id, &mut out_of);
        let mut union: BTreeSet<FileId> = BTreeSet::new();
        for tool in &tools {
            if let Some(set) = result.repaired(tool) {
                count_types(set, types_by_id, repaired.entry(tool.clone()).or_default());
                union.extend(set.iter().copied());
            }
        }
        count_types(
            &union,
            types_by_id,
            repaired.entry(ALL_TOOLS.to_string()).or_default(),
        );
    }
    tools.push(ALL_TOOLS.to_string());

    let rates = tools
        .into_iter()
        .map(|tool| {
            let counts = repaired.remove(&tool).unwrap_or_default();
            let relative = out_of
                .iter()
                .filter(|(_, total)| **total > 0)
                .map(|(label, total)| {
                    let n = counts.get(label).copied().unwrap_or(0);
                    (label.clone(), n as f64 / *total as f64 * 100.0)
                })
                .collect();
            ToolErrorRates {
                tool,
                repaired: counts,
                relative,
            }
        })
        .collect();

    ErrorTypeSummary {
        out_of,
        tools: rates,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Intersection cardinalities of three repaired sets.
pub struct VennCounts {
    pub tools: [String; 3],
    pub a: usize,
    pub b: usize,
    pub c: usize,
    pub ab: usize,
    pub ac: usize,
    pub bc: usize,
    pub abc: usize,
}

impl VennCounts {
    /// Exclusive region sizes: only a, only b, only c, a&b only, a&c only, b&c only, all.
    pub fn regions(&self) -> [usize; 7] {
        [
            self.a + self.abc - self.ab - self.ac,
            self.b + self.abc - self.ab - self.bc,
            self.c + self.abc - self.ac - self.bc,
            self.ab - self.abc,
            self.ac - self.abc,
            self.bc - self.abc,
            self.abc,
        ]
    }
}

/// The three configured overlap tools.
pub fn venn_tools(tools: &[String]) -> Result<[&str; 3]> {
    match tools {
        [a, b, c] => Ok([a.as_str(), b.as_str(), c.as_str()]),
        other => Err(Error::Config(format!(
            "venn_tools must name exactly three tools (got {})",
            other.len()
        ))),
    }
}

pub fn venn(results: &[ExperimentResult], tools: [&str; 3]) -> VennCounts {
    let flat = |tool: &str| -> BTreeSet<(String, FileId)> {
        results
            .iter()
            .flat_map(|r| {
                r.repaired(tool)
                    .into_iter()
                    .flatten()
                    .map(move |id| (r.project.clone(), *id))
            })
            .collect()
    };
    let (a, b, c) = (flat(tools[0]), flat(tools[1]), flat(tools[2]));
    let ab: BTreeSet<_> = a.intersection(&b).cloned().collect();
    VennCounts {
        tools: tools.map(|t| t.to_string()),
        a: a.len(),
        b: b.len(),
        c: c.len(),
        ab: ab.len(),
        ac: a.intersection(&c).count(),
        bc: b.intersection(&c).count(),
        abc: ab.intersection(&c).count(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProtocolComparison {
    pub only_left: usize,
    pub only_right: usize,
    pub both: usize,
}

impl AddAssign for ProtocolComparison {
    fn add_assign(&mut self, rhs: Self) {
        self.only_left += rhs.only_left;
        self.only_right += rhs.only_right;
        self.both += rhs.both;
    }
}

/// Compare two protocol variants of one project. A variant that was not run
/// counts as an empty set.
pub fn compare_protocols(result: &ExperimentResult, left: &str, right: &str) -> ProtocolComparison {
    let empty = BTreeSet::new();
    let l = result.repaired(left).unwrap_or(&empty);
    let r = result.repaired(right).unwrap_or(&empty);
    ProtocolComparison {
        only_left: l.difference(r).count(),
        only_right: r.difference(l).count(),
        both: l.intersection(r).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::ToolOutcome;
    use crate::tools::Invocation;

    fn result(project: &str, tools: &[(&str, &[FileId])], out_of: &[FileId]) -> ExperimentResult {
        ExperimentResult {
            project: project.into(),
            tools: tools
                .iter()
                .map(|(t, ids)| ToolOutcome {
                    tool: t.to_string(),
                    invocation: Invocation::Reused,
                    repaired: ids.iter().copied().collect(),
                })
                .collect(),
            out_of: out_of.iter().copied().collect(),
        }
    }

    #[test]
    fn test_count_summary_total_row() {
        let r1 = result("p1", &[("a", &[1, 2]), ("b", &[2])], &[1, 2, 3]);
        let r2 = result("p2", &[("a", &[7]), ("b", &[])], &[7, 8]);
        let s = count_summary(&[r1, r2]);
        assert_eq!(s.columns, vec!["a", "b", "out_of"]);
        assert_eq!(s.rows.len(), 3);
        assert_eq!(s.rows[0].counts, vec![2, 1, 3]);
        assert_eq!(s.rows[2].label, "total");
        assert_eq!(s.rows[2].counts, vec![3, 1, 5]);
    }

    #[test]
    fn test_error_type_summary_relative_rates() {
        let r = result("p", &[("a", &[1, 2]), ("b", &[3])], &[1, 2, 3, 4]);
        let types: BTreeMap<FileId, Vec<String>> = BTreeMap::from([
            (1, vec!["Indent".to_string()]),
            (2, vec!["Indent".to_string(), "Space".to_string()]),
            (3, vec!["Space".to_string()]),
            (4, vec!["Indent".to_string()]),
        ]);
        let s = error_type_summary(&[(&r, &types)]);
        assert_eq!(s.out_of["Indent"], 3);
        assert_eq!(s.out_of["Space"], 2);
        let names: Vec<_> = s.tools.iter().map(|t| t.tool.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "all_tools"]);

        let a = &s.tools[0];
        assert!((a.relative["Indent"] - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(a.relative["Space"], 50.0);
        // Zero repairs of a type is 0.0, not a missing cell
        let b = &s.tools[1];
        assert_eq!(b.relative["Indent"], 0.0);
        assert_eq!(b.relative["Space"], 50.0);
        let all = &s.tools[2];
        assert!((all.relative["Indent"] - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(all.relative["Space"], 100.0);
    }

    #[test]
    fn test_error_type_summary_never_divides_by_zero() {
        let r = result("p", &[("a", &[])], &[]);
        let s = error_type_summary(&[(&r, &BTreeMap::new())]);
        assert!(s.out_of.is_empty());
        assert!(s.tools.iter().all(|t| t.relative.is_empty()));
        assert!(s
            .tools
            .iter()
            .flat_map(|t| t.relative.values())
            .all(|v| v.is_finite()));
    }

    #[test]
    fn test_venn_tools_requires_three() {
        let three: Vec<String> = ["a", "b", "c"].map(String::from).to_vec();
        assert_eq!(venn_tools(&three).unwrap(), ["a", "b", "c"]);
        let two: Vec<String> = ["a", "b"].map(String::from).to_vec();
        assert!(matches!(venn_tools(&two), Err(Error::Config(_))));
    }

    #[test]
    fn test_venn_over_project_id_pairs() {
        let r1 = result("p1", &[("a", &[1, 2, 3]), ("b", &[2, 3]), ("c", &[3, 4])], &[1, 2, 3, 4]);
        // Same IDs in another project are distinct elements
        let r2 = result("p2", &[("a", &[1]), ("b", &[]), ("c", &[1])], &[1]);
        let v = venn(&[r1, r2], ["a", "b", "c"]);
        assert_eq!((v.a, v.b, v.c), (4, 2, 3));
        assert_eq!((v.ab, v.ac, v.bc, v.abc), (2, 2, 1, 1));
        assert_eq!(v.regions(), [1, 0, 1, 1, 1, 0, 1]);
    }

    #[test]
    fn test_compare_protocols_sums() {
        let r1 = result("p1", &[("l", &[1, 2]), ("r", &[2, 3, 4])], &[1, 2, 3, 4]);
        let r2 = result("p2", &[("l", &[5])], &[5]);
        let mut total = ProtocolComparison::default();
        total += compare_protocols(&r1, "l", "r");
        total += compare_protocols(&r2, "l", "r");
        assert_eq!(
            total,
            ProtocolComparison {
                only_left: 2,
                only_right: 2,
                both: 1
            }
        );
    }
}
