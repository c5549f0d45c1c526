//! Per-experiment JSON reports and their cross-experiment merge.
//!
//! A report maps each corrupted instance ID to its original targeted errors
//! and, per tool, the errors left in that tool's output (`null` when the tool
//! has no result for the instance). Merging concatenates reports in project
//! order under fresh keys `0..n`; the numbering is only stable within one merge.

use crate::checkstyle::{self, ErrorTypes, Linter};
use crate::error::{Error, Result};
use crate::layout::{Experiment, Layout, REPORT_FILE};
use crate::models::{file_id_of, FileResult, MergedReport, Report, ReportEntry};
use crate::utils;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Build the report of one staged experiment.
///
/// Tools are read from their cached linter results only; a tool without a
/// cache has not been run and stays `null` for every file.
pub fn build_report(
    experiment: &Experiment,
    tools: &[String],
    linter: &dyn Linter,
    types: &ErrorTypes,
) -> Result<Report> {
    debug!(project = %experiment.project, "getting the original errors");
    let errored = linter.check(
        &experiment.linter_config(),
        &experiment.level_dir(),
        &experiment.checkstyle_jar,
    )?;

    let mut report: Report = BTreeMap::new();
    for (path, file) in &errored.checkstyle_results {
        let Some(id) = file_id_of(path) else {
            continue;
        };
        let errors = match experiment.instance_metadata(id) {
            Some(meta) => {
                let injected: BTreeSet<String> = types.injected(&meta).into_iter().collect();
                types.targeted(&file.errors, &injected)
            }
            None => file.errors.clone(),
        };
        let entry = report.entry(id).or_insert_with(|| ReportEntry {
            information: FileResult::default(),
            results: tools.iter().map(|t| (t.clone(), None)).collect(),
        });
        entry.information.errors.extend(errors);
    }

    debug!(project = %experiment.project, "getting the results from the tools");
    for tool in tools {
        let results = match checkstyle::cached_results(experiment, tool) {
            Ok(r) => r,
            Err(Error::LinterResultsMissing { .. }) => {
                warn!(project = %experiment.project, tool = %tool, "tool has no linter results");
                continue;
            }
            Err(e) => return Err(e),
        };
        for (path, file) in results.checkstyle_results {
            let Some(id) = file_id_of(&path) else {
                continue;
            };
            if let Some(entry) = report.get_mut(&id) {
                entry.results.insert(tool.clone(), Some(file.errors));
            }
        }
    }
    Ok(report)
}

/// Build and persist `report.json` in the experiment root.
pub fn write_report(
    experiment: &Experiment,
    tools: &[String],
    linter: &dyn Linter,
    types: &ErrorTypes,
) -> Result<Report> {
    let report = build_report(experiment, tools, linter, types)?;
    utils::write_json(&experiment.report_path(), &report)?;
    Ok(report)
}

/// Concatenate reports in the given order under dense keys starting at zero.
pub fn merge(reports: Vec<(String, Report)>) -> MergedReport {
    reports
        .into_iter()
        .flat_map(|(_, report)| report.into_values())
        .enumerate()
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub included: Vec<String>,
    pub skipped: Vec<String>,
    pub files: usize,
    #[serde(skip)]
    pub merged: MergedReport,
}

/// Merge the reports of `experiments` and write `<results_dir>/report.json`.
/// Experiments without a persisted report are skipped.
pub fn merge_reports(layout: &Layout, experiments: &[String]) -> Result<MergeOutcome> {
    let mut reports = Vec::new();
    let mut skipped = Vec::new();
    for name in experiments {
        let path = layout.experiment_dir(name).join(REPORT_FILE);
        if !path.is_file() {
            debug!(experiment = %name, "no report to merge");
            skipped.push(name.clone());
            continue;
        }
        let report: Report = utils::read_json(&path)?;
        reports.push((name.clone(), report));
    }
    let included: Vec<String> = reports.iter().map(|(n, _)| n.clone()).collect();
    debug!(
        count = included.len(),
        experiments = %included.join(", "),
        "merging reports"
    );
    let merged = merge(reports);
    utils::write_json(&layout.results_dir.join(REPORT_FILE), &merged)?;
    Ok(MergeOutcome {
        included,
        skipped,
        files: merged.len(),
        merged,
    })
}
