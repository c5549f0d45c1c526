//! Experiment runner: stage a project, run every tool, resolve repaired sets.

use crate::checkstyle::{ErrorTypes, Linter};
use crate::error::{Error, Result};
use crate::layout::{self, Experiment, Layout};
use crate::models::tool::Tool;
use crate::models::FileId;
use crate::repaired;
use crate::tools::{CachePolicy, Invocation, ToolInvoker};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct ToolOutcome {
    pub tool: String,
    pub invocation: Invocation,
    pub repaired: BTreeSet<FileId>,
}

#[derive(Debug, Clone, Serialize)]
/// Repaired sets of one project, in configured tool order.
pub struct ExperimentResult {
    pub project: String,
    pub tools: Vec<ToolOutcome>,
    pub out_of: BTreeSet<FileId>,
}

impl ExperimentResult {
    pub fn repaired(&self, tool: &str) -> Option<&BTreeSet<FileId>> {
        self.tools
            .iter()
            .find(|t| t.tool == tool)
            .map(|t| &t.repaired)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.tool.clone()).collect()
    }
}

/// Everything an experiment run needs, wired once per command.
pub struct Pipeline<'a> {
    pub layout: &'a Layout,
    pub linter: &'a dyn Linter,
    pub cache: &'a dyn CachePolicy,
    pub types: &'a ErrorTypes,
    pub tools: Vec<Tool>,
}

impl<'a> Pipeline<'a> {
    /// Stage `project`, then for each tool in order invoke or reuse it and
    /// resolve its repaired set (targeted violations only).
    pub fn run(&self, project: &str) -> Result<(Experiment, ExperimentResult)> {
        let experiment = layout::stage(self.layout, project)?;
        let invoker = ToolInvoker::new(self.layout, self.cache);
        let mut outcomes = Vec::with_capacity(self.tools.len());
        for tool in &self.tools {
            debug!(project, tool = tool.name(), "start tool");
            let invocation = invoker.invoke(&experiment, tool)?;
            let repaired =
                repaired::get_repaired(tool.name(), &experiment, self.linter, self.types, true)?;
            outcomes.push(ToolOutcome {
                tool: tool.name().to_string(),
                invocation,
                repaired,
            });
        }
        let result = ExperimentResult {
            project: project.to_string(),
            tools: outcomes,
            out_of: experiment.out_of(),
        };
        Ok((experiment, result))
    }

    /// Run several projects strictly in the given order. Projects without a
    /// dataset are skipped.
    pub fn run_all(&self, projects: &[String]) -> Result<Vec<(Experiment, ExperimentResult)>> {
        let mut runs = Vec::with_capacity(projects.len());
        for project in projects {
            match self.run(project) {
                Ok(run) => runs.push(run),
                Err(Error::DatasetInfoMissing(path)) => {
                    warn!(project = %project, path = %path.display(), "no dataset; skipping project");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(runs)
    }
}
