//! Tool invocation: produce one output directory per repair tool.
//!
//! Each tool writes `<experiment>/<tool>/<id>/*`. Whether a tool needs to run
//! at all is decided by a `CachePolicy`; the default trusts any existing output
//! directory as-is, without checking its content or the tool's inputs.

use crate::error::{Error, Result};
use crate::layout::{Experiment, Layout};
use crate::models::tool::{
    Tool, ERRORED_PLACEHOLDER, METADATA_PLACEHOLDER, ORIG_PLACEHOLDER, OUTPUT_PLACEHOLDER,
};
use crate::utils;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

/// Decides whether an existing tool output can be reused.
pub trait CachePolicy {
    fn is_cached(&self, output_dir: &Path) -> bool;
}

/// Reuse any output directory that exists. Never invalidated.
pub struct DirExists;

impl CachePolicy for DirExists {
    fn is_cached(&self, output_dir: &Path) -> bool {
        output_dir.exists()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
/// What happened when a tool's output was requested.
pub enum Invocation {
    Reused,
    Copied,
    /// Precomputed repairs were not found; nothing was created.
    MissingRepairs,
    Placeholder,
    Ran { success: bool },
}

pub struct ToolInvoker<'a> {
    pub layout: &'a Layout,
    pub cache: &'a dyn CachePolicy,
}

impl<'a> ToolInvoker<'a> {
    pub fn new(layout: &'a Layout, cache: &'a dyn CachePolicy) -> Self {
        ToolInvoker { layout, cache }
    }

    /// Produce or reuse the output directory of `tool` inside `experiment`.
    pub fn invoke(&self, experiment: &Experiment, tool: &Tool) -> Result<Invocation> {
        let out_dir = experiment.tool_dir(tool.name());
        if self.cache.is_cached(&out_dir) {
            debug!(project = %experiment.project, tool = tool.name(), "reusing tool output");
            return Ok(Invocation::Reused);
        }
        match tool {
            Tool::Precomputed { protocol, .. } => {
                let src = self
                    .layout
                    .precomputed_repairs(&experiment.project, protocol.as_deref());
                if !src.is_dir() {
                    warn!(
                        project = %experiment.project,
                        tool = tool.name(),
                        path = %src.display(),
                        "precomputed repairs not found"
                    );
                    return Ok(Invocation::MissingRepairs);
                }
                utils::copy_dir(&src, &out_dir)?;
                info!(project = %experiment.project, tool = tool.name(), "copied precomputed repairs");
                Ok(Invocation::Copied)
            }
            Tool::IdePlaceholder { .. } => {
                fs::create_dir_all(&out_dir).map_err(|e| Error::io(&out_dir, e))?;
                debug!(project = %experiment.project, tool = tool.name(), "created placeholder output");
                Ok(Invocation::Placeholder)
            }
            Tool::Adapter { command, .. } => {
                let argv = render_command(command, experiment, &out_dir);
                info!(project = %experiment.project, tool = tool.name(), "running repair tool");
                let success = run_adapter(&argv);
                if !success {
                    warn!(project = %experiment.project, tool = tool.name(), "repair tool failed");
                }
                Ok(Invocation::Ran { success })
            }
        }
    }
}

/// Substitute experiment paths into an adapter argv template.
pub fn render_command(template: &[String], experiment: &Experiment, out_dir: &Path) -> Vec<String> {
    let orig = experiment.clean_dir.to_string_lossy();
    let errored = experiment.level_dir().to_string_lossy().to_string();
    let output = out_dir.to_string_lossy();
    let metadata = experiment.metadata_path().to_string_lossy().to_string();
    template
        .iter()
        .map(|arg| {
            arg.replace(ORIG_PLACEHOLDER, &orig)
                .replace(ERRORED_PLACEHOLDER, &errored)
                .replace(OUTPUT_PLACEHOLDER, &output)
                .replace(METADATA_PLACEHOLDER, &metadata)
        })
        .collect()
}

/// Run once and wait. Launch failures count as a failed run.
fn run_adapter(argv: &[String]) -> bool {
    let Some((program, args)) = argv.split_first() else {
        return false;
    };
    match Command::new(program).args(args).status() {
        Ok(status) => status.success(),
        Err(e) => {
            warn!(program = %program, error = %e, "failed to launch repair tool");
            false
        }
    }
}
