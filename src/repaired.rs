//! Repaired-set resolution.
//!
//! A file instance counts as repaired by a tool when the tool produced a file
//! for it and linting that file leaves no targeted violation. Only IDs of the
//! experiment's `out_of` set are ever considered, so the result is always a
//! subset of it.

use crate::checkstyle::{self, ErrorTypes, Linter};
use crate::error::Result;
use crate::layout::Experiment;
use crate::models::{file_id_of, CheckstyleResults, FileId, LintError};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Lint (or read the cached lint of) `tool`'s output and return the repaired IDs.
///
/// With `only_targeted`, violations of types that were not injected into an
/// instance are ignored when judging that instance.
pub fn get_repaired(
    tool: &str,
    experiment: &Experiment,
    linter: &dyn Linter,
    types: &ErrorTypes,
    only_targeted: bool,
) -> Result<BTreeSet<FileId>> {
    let results = checkstyle::tool_results(experiment, tool, linter)?;
    let repaired = resolve_repaired(experiment, &results, types, only_targeted);
    debug!(
        project = %experiment.project,
        tool,
        repaired = repaired.len(),
        "resolved repaired set"
    );
    Ok(repaired)
}

/// Errors per instance ID. An ID present with an empty list was linted clean.
pub fn errors_by_id(results: &CheckstyleResults) -> BTreeMap<FileId, Vec<LintError>> {
    let mut by_id: BTreeMap<FileId, Vec<LintError>> = BTreeMap::new();
    for (path, file) in &results.checkstyle_results {
        match file_id_of(path) {
            Some(id) => by_id.entry(id).or_default().extend(file.errors.iter().cloned()),
            None => debug!(path = %path, "linted file outside an instance folder"),
        }
    }
    by_id
}

pub fn resolve_repaired(
    experiment: &Experiment,
    results: &CheckstyleResults,
    types: &ErrorTypes,
    only_targeted: bool,
) -> BTreeSet<FileId> {
    let by_id = errors_by_id(results);
    experiment
        .out_of()
        .into_iter()
        .filter(|id| {
            let Some(errors) = by_id.get(id) else {
                return false;
            };
            if !only_targeted {
                return errors.is_empty();
            }
            match experiment.instance_metadata(*id) {
                Some(meta) => {
                    let injected: BTreeSet<String> = types.injected(&meta).into_iter().collect();
                    types.targeted(errors, &injected).is_empty()
                }
                // Without metadata every remaining violation counts
                None => errors.is_empty(),
            }
        })
        .collect()
}
