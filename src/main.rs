//! Styleval CLI binary entry point.
//! Resolves configuration, delegates to library modules and prints results.

use clap::Parser;
use std::collections::BTreeMap;
use styleval::checkstyle::{CheckstyleJar, ErrorTypes};
use styleval::ci::{self, CiStore};
use styleval::cli::{Cli, Commands, Common};
use styleval::config::{self, Effective};
use styleval::diff::{self, DiffOutcome};
use styleval::error::Result;
use styleval::experiment::Pipeline;
use styleval::layout::{self, Layout};
use styleval::models::tool::Tool;
use styleval::stats::{self, ProtocolComparison};
use styleval::{output, report, utils};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Long-lived collaborators shared by the experiment commands.
struct Context {
    eff: Effective,
    layout: Layout,
    linter: CheckstyleJar,
    types: ErrorTypes,
}

impl Context {
    fn new(common: &Common) -> Self {
        let eff = config::resolve_effective(common.root.as_deref(), common.output.as_deref());
        Context {
            layout: Layout::from_effective(&eff),
            linter: CheckstyleJar {
                java: eff.java.clone(),
                jars_dir: eff.jars_dir.clone(),
                extension: eff.extension.clone(),
            },
            types: ErrorTypes::new(eff.error_types.clone()),
            eff,
        }
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline {
            layout: &self.layout,
            linter: &self.linter,
            cache: &styleval::tools::DirExists,
            types: &self.types,
            tools: self
                .eff
                .tools
                .iter()
                .map(|t| Tool::classify(t, &self.eff.adapters))
                .collect(),
        }
    }

    fn display(&self, p: &std::path::Path) -> String {
        utils::rel_to_root(&self.eff.root, p)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("styleval=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.cmd) {
        error!(error = %e, "command failed");
        eprintln!("{} {}", utils::error_prefix(), e);
        std::process::exit(2);
    }
}

fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Exp { projects, common } => {
            let ctx = Context::new(&common);
            let results: Vec<_> = ctx
                .pipeline()
                .run_all(&projects)?
                .into_iter()
                .map(|(_, r)| r)
                .collect();
            output::print_counts(&stats::count_summary(&results), &ctx.eff.output);
        }
        Commands::Report { project, common } => {
            let ctx = Context::new(&common);
            let experiment = layout::open(&ctx.layout, &project)?;
            let report =
                report::write_report(&experiment, &ctx.eff.tools, &ctx.linter, &ctx.types)?;
            output::print_report_written(
                &project,
                report.len(),
                &ctx.display(&experiment.report_path()),
                &ctx.eff.output,
            );
        }
        Commands::MergeReports { common } => {
            let ctx = Context::new(&common);
            let experiments = ctx.layout.experiments();
            debug!(
                count = experiments.len(),
                experiments = %experiments.join(", "),
                "found experiments"
            );
            let outcome = report::merge_reports(&ctx.layout, &experiments)?;
            let path = ctx.display(&ctx.layout.results_dir.join(layout::REPORT_FILE));
            output::print_merge(&outcome, &path, &ctx.eff.output);
        }
        Commands::StylerProtocols { common } => {
            let ctx = Context::new(&common);
            let experiments = ctx.layout.experiments();
            debug!(count = experiments.len(), "found experiments");
            let pipeline = ctx.pipeline();
            let mut total = ProtocolComparison::default();
            for name in &experiments {
                let (_, result) = pipeline.run(name)?;
                total += stats::compare_protocols(
                    &result,
                    &ctx.eff.protocol_left,
                    &ctx.eff.protocol_right,
                );
            }
            output::print_protocols(
                &ctx.eff.protocol_left,
                &ctx.eff.protocol_right,
                &total,
                &ctx.eff.output,
            );
        }
        Commands::ExpStats { projects, common } => {
            let ctx = Context::new(&common);
            let runs = ctx.pipeline().run_all(&projects)?;
            let types_by_id: Vec<_> = runs
                .iter()
                .map(|(exp, _)| stats::error_types_by_id(exp, &ctx.types))
                .collect();
            let inputs: Vec<_> = runs
                .iter()
                .zip(&types_by_id)
                .map(|((_, r), t)| (r, t))
                .collect();
            output::print_error_types(&stats::error_type_summary(&inputs), &ctx.eff.output);
        }
        Commands::ExpVenn { projects, common } => {
            let ctx = Context::new(&common);
            let tools = stats::venn_tools(&ctx.eff.venn_tools)?;
            let results: Vec<_> = ctx
                .pipeline()
                .run_all(&projects)?
                .into_iter()
                .map(|(_, r)| r)
                .collect();
            output::print_venn(&stats::venn(&results, tools), &ctx.eff.output);
        }
        Commands::Diff { projects, common } => {
            let ctx = Context::new(&common);
            let mut per_tool: BTreeMap<String, DiffOutcome> = BTreeMap::new();
            for name in &projects {
                let experiment = layout::open(&ctx.layout, name)?;
                for tool in &ctx.eff.diff_tools {
                    let outcome = diff::diff_sizes(&experiment, tool, &ctx.linter, &ctx.types)?;
                    per_tool.entry(tool.clone()).or_default().extend(outcome);
                }
            }
            // Keep the configured tool order
            let ordered: Vec<(String, DiffOutcome)> = ctx
                .eff
                .diff_tools
                .iter()
                .filter_map(|t| per_tool.remove(t).map(|o| (t.clone(), o)))
                .collect();
            output::print_diff(&ordered, &ctx.eff.output);
        }
        Commands::CiAudit { repos, common } => {
            let ctx = Context::new(&common);
            let store = CiStore::new(&ctx.eff.logs_dir);
            let repos = if repos.is_empty() {
                store.repos()
            } else {
                repos
            };
            let cancel = ci::interrupt_flag();
            let outcome = ci::analyse(&store, &repos, &cancel);
            output::print_ci(&outcome, &ctx.eff.output);
        }
    }
    Ok(())
}
