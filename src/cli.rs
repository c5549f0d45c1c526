//! CLI argument parsing via `clap`.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "styleval",
    version,
    about = "Evaluate code-style repair tools against corrupted corpora",
    long_about = "Styleval stages corrupted Java corpora, runs repair tools on them, re-lints their output with checkstyle and aggregates which files each tool repaired.\n\nConfiguration precedence: CLI > styleval.toml > defaults.",
    after_help = "Examples:\n  styleval exp dataverse h2database\n  styleval exp-stats dataverse --output json\n  styleval report dataverse && styleval merge-reports\n  styleval ci-audit acme/app",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Args, Clone)]
/// Options shared by every subcommand.
pub struct Common {
    #[arg(long, help = "Workspace root (default: current dir)")]
    pub root: Option<String>,
    #[arg(long, help = "Output mode: human|json (default: human)")]
    pub output: Option<String>,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current styleval version.")]
    Version,
    /// Run experiments and print repaired counts
    #[command(
        about = "Run experiments",
        long_about = "Stage each project, run every configured tool (reusing existing outputs) and print how many files each tool repaired.",
        after_help = "Examples:\n  styleval exp dataverse h2database"
    )]
    Exp {
        #[arg(required = true, help = "Project names")]
        projects: Vec<String>,
        #[command(flatten)]
        common: Common,
    },
    /// Write the JSON report of one experiment
    #[command(
        about = "Build report.json for a project",
        long_about = "Lint the corrupted files, collect every tool's cached linter results and write report.json into the experiment directory."
    )]
    Report {
        #[arg(help = "Project name")]
        project: String,
        #[command(flatten)]
        common: Common,
    },
    /// Merge every experiment report
    #[command(
        about = "Merge experiment reports",
        long_about = "Concatenate the report.json of every experiment under fresh sequential keys into <results_dir>/report.json."
    )]
    MergeReports {
        #[command(flatten)]
        common: Common,
    },
    /// Compare two protocol variants
    #[command(
        about = "Compare styler protocols",
        long_about = "For every experiment, count files repaired only by one protocol variant or by both, summed across experiments."
    )]
    StylerProtocols {
        #[command(flatten)]
        common: Common,
    },
    /// Relative repair rate per error type
    #[command(
        about = "Per error-type repair rates",
        long_about = "Run experiments and print, per tool, the percentage of injected errors of each type found in repaired files."
    )]
    ExpStats {
        #[arg(required = true, help = "Project names")]
        projects: Vec<String>,
        #[command(flatten)]
        common: Common,
    },
    /// Overlap between three tools
    #[command(
        about = "Repaired-set overlap",
        long_about = "Run experiments and print the overlap of the repaired sets of three tools over (project, file) pairs."
    )]
    ExpVenn {
        #[arg(required = true, help = "Project names")]
        projects: Vec<String>,
        #[command(flatten)]
        common: Common,
    },
    /// Diff sizes of repaired files
    #[command(
        about = "Diff size distribution",
        long_about = "For staged experiments, compute line-level diff sizes between each corrupted file and its repaired version, per tool."
    )]
    Diff {
        #[arg(required = true, help = "Project names")]
        projects: Vec<String>,
        #[command(flatten)]
        common: Common,
    },
    /// Checkstyle findings in archived CI logs
    #[command(
        about = "Analyse CI build logs",
        long_about = "Extract checkstyle audit sections from archived CI build logs and count findings per severity. Ctrl-C stops early and still prints partial results.",
        after_help = "Examples:\n  styleval ci-audit\n  styleval ci-audit acme/app --output json"
    )]
    CiAudit {
        #[arg(help = "Repositories as owner/repo (default: all in logs_dir)")]
        repos: Vec<String>,
        #[command(flatten)]
        common: Common,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exp_with_common_flags() {
        let cli = Cli::try_parse_from(["styleval", "exp", "a", "b", "--output", "json"]).unwrap();
        match cli.cmd {
            Commands::Exp { projects, common } => {
                assert_eq!(projects, vec!["a", "b"]);
                assert_eq!(common.output.as_deref(), Some("json"));
                assert!(common.root.is_none());
            }
            _ => panic!("expected exp"),
        }
    }

    #[test]
    fn test_parse_kebab_case_subcommands() {
        assert!(matches!(
            Cli::try_parse_from(["styleval", "merge-reports"]).unwrap().cmd,
            Commands::MergeReports { .. }
        ));
        assert!(matches!(
            Cli::try_parse_from(["styleval", "styler-protocols"]).unwrap().cmd,
            Commands::StylerProtocols { .. }
        ));
        assert!(matches!(
            Cli::try_parse_from(["styleval", "ci-audit"]).unwrap().cmd,
            Commands::CiAudit { .. }
        ));
        assert!(Cli::try_parse_from(["styleval", "exp-stats"]).is_err());
    }
}
