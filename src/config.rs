//! Configuration discovery and effective settings resolution.
//!
//! Styleval reads `styleval.toml|yaml|yml` from the workspace root (or closest
//! ancestor) and merges it with CLI flags to produce an `Effective` config.
//! Defaults:
//! - `results_dir`: `results`
//! - `datasets_dir`: `datasets/real-errors`
//! - `corpora_dir`: `corpora`
//! - `repairs_dir`: `styler-repairs`
//! - `jars_dir`: `jars`
//! - `logs_dir`: `ci-logs`
//! - `java`: `java`
//! - `extension`: `java`
//! - `output`: `human`
//! - `tools`: naturalize, codebuff, intellij, styler and two styler protocols
//!
//! Overrides precedence: CLI > config file > defaults.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_TOOLS: &[&str] = &[
    "naturalize",
    "codebuff",
    "intellij",
    "styler",
    "styler_random",
    "styler_three_grams",
];
pub const DEFAULT_DIFF_TOOLS: &[&str] = &["naturalize", "codebuff", "styler", "intellij"];
pub const DEFAULT_VENN_TOOLS: &[&str] = &["naturalize", "styler", "codebuff"];

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `styleval.toml|yaml`.
pub struct StylevalConfig {
    pub results_dir: Option<String>,
    pub datasets_dir: Option<String>,
    pub corpora_dir: Option<String>,
    pub repairs_dir: Option<String>,
    pub jars_dir: Option<String>,
    pub logs_dir: Option<String>,
    pub java: Option<String>,
    pub extension: Option<String>,
    pub output: Option<String>,
    pub tools: Option<Vec<String>>,
    pub diff_tools: Option<Vec<String>>,
    pub venn_tools: Option<Vec<String>>,
    #[serde(default)]
    pub protocols: Option<ProtocolsCfg>,
    #[serde(default)]
    pub adapters: Option<HashMap<String, AdapterCfg>>, // [adapters.<tool>].command
    #[serde(default)]
    pub error_types: Option<HashMap<String, String>>, // source -> label
}

#[derive(Debug, Default, Deserialize, Clone)]
/// The two protocol variants compared by `styler-protocols`.
pub struct ProtocolsCfg {
    pub left: Option<String>,
    pub right: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct AdapterCfg {
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub root: PathBuf,
    pub results_dir: PathBuf,
    pub datasets_dir: PathBuf,
    pub corpora_dir: PathBuf,
    pub repairs_dir: PathBuf,
    pub jars_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub java: String,
    pub extension: String,
    pub output: String,
    pub tools: Vec<String>,
    pub diff_tools: Vec<String>,
    pub venn_tools: Vec<String>,
    pub protocol_left: String,
    pub protocol_right: String,
    pub adapters: HashMap<String, Vec<String>>, // tool -> argv template
    pub error_types: HashMap<String, String>,
}

/// Walk upward from `start` to detect the workspace root.
///
/// Stops when a `styleval.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if cur.join("styleval.toml").exists()
            || cur.join("styleval.yaml").exists()
            || cur.join("styleval.yml").exists()
        {
            return cur.to_path_buf();
        }
        if cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `StylevalConfig` from `styleval.toml` or `styleval.yaml|yml` if present.
///
/// A file that exists but cannot be read or parsed is reported and ignored,
/// leaving the defaults in effect.
pub fn load_config(root: &Path) -> Option<StylevalConfig> {
    let toml_path = root.join("styleval.toml");
    if toml_path.exists() {
        return parse_config(&toml_path, |s| toml::from_str(s).map_err(|e| e.to_string()));
    }
    for yml in ["styleval.yaml", "styleval.yml"] {
        let p = root.join(yml);
        if p.exists() {
            return parse_config(&p, |s| serde_yaml::from_str(s).map_err(|e| e.to_string()));
        }
    }
    None
}

fn parse_config(
    path: &Path,
    parse: impl Fn(&str) -> Result<StylevalConfig, String>,
) -> Option<StylevalConfig> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read config; using defaults");
            return None;
        }
    };
    match parse(&text) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid config; using defaults");
            None
        }
    }
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(cli_root: Option<&str>, cli_output: Option<&str>) -> Effective {
    let start = PathBuf::from(cli_root.unwrap_or("."));
    // Walking up needs an absolute start
    let start = if start.is_absolute() {
        start
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&start))
            .unwrap_or(start)
    };
    let root = detect_root(&start);
    let cfg = load_config(&root).unwrap_or_default();

    // Relative directories are anchored at the detected root
    let dir = |v: Option<String>, default: &str| -> PathBuf {
        let p = PathBuf::from(v.unwrap_or_else(|| default.to_string()));
        if p.is_absolute() {
            p
        } else {
            root.join(p)
        }
    };

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());

    let adapters = cfg
        .adapters
        .unwrap_or_default()
        .into_iter()
        .map(|(tool, a)| (tool, a.command))
        .collect::<HashMap<_, _>>();

    let protocol_left = cfg
        .protocols
        .as_ref()
        .and_then(|p| p.left.clone())
        .unwrap_or_else(|| "styler_random".to_string());
    let protocol_right = cfg
        .protocols
        .as_ref()
        .and_then(|p| p.right.clone())
        .unwrap_or_else(|| "styler_three_grams".to_string());

    Effective {
        results_dir: dir(cfg.results_dir, "results"),
        datasets_dir: dir(cfg.datasets_dir, "datasets/real-errors"),
        corpora_dir: dir(cfg.corpora_dir, "corpora"),
        repairs_dir: dir(cfg.repairs_dir, "styler-repairs"),
        jars_dir: dir(cfg.jars_dir, "jars"),
        logs_dir: dir(cfg.logs_dir, "ci-logs"),
        java: cfg.java.unwrap_or_else(|| "java".to_string()),
        extension: cfg
            .extension
            .map(|e| e.trim_start_matches('.').to_string())
            .unwrap_or_else(|| "java".to_string()),
        output,
        tools: cfg.tools.unwrap_or_else(|| owned(DEFAULT_TOOLS)),
        diff_tools: cfg.diff_tools.unwrap_or_else(|| owned(DEFAULT_DIFF_TOOLS)),
        venn_tools: cfg.venn_tools.unwrap_or_else(|| owned(DEFAULT_VENN_TOOLS)),
        protocol_left,
        protocol_right,
        adapters,
        error_types: cfg.error_types.unwrap_or_default(),
        root,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_config() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        let eff = resolve_effective(root.to_str(), None);
        assert_eq!(eff.results_dir, root.join("results"));
        assert_eq!(eff.datasets_dir, root.join("datasets/real-errors"));
        assert_eq!(eff.output, "human");
        assert_eq!(eff.extension, "java");
        assert_eq!(eff.tools.len(), DEFAULT_TOOLS.len());
        assert_eq!(eff.protocol_left, "styler_random");
    }

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("styleval.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
results_dir = "out/results"
jars_dir = "/opt/jars"
output = "json"
extension = ".java"
tools = ["codebuff", "styler"]
[protocols]
left = "styler_a"
[adapters.codebuff]
command = ["java", "-jar", "codebuff.jar", "{orig}", "{errored}", "{output}"]
[error_types]
"com.puppycrawl.tools.checkstyle.checks.indentation.IndentationCheck" = "Indent"
    "#
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), None);
        assert_eq!(eff.results_dir, root.join("out/results"));
        assert_eq!(eff.jars_dir, PathBuf::from("/opt/jars"));
        assert_eq!(eff.output, "json");
        assert_eq!(eff.extension, "java");
        assert_eq!(eff.tools, vec!["codebuff".to_string(), "styler".to_string()]);
        assert_eq!(eff.protocol_left, "styler_a");
        assert_eq!(eff.protocol_right, "styler_three_grams");
        assert_eq!(eff.adapters["codebuff"][2], "codebuff.jar");
        assert_eq!(eff.error_types.len(), 1);
    }

    #[test]
    fn test_yaml_and_cli_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("styleval.yaml"),
            "output: json\nlogs_dir: logs\nvenn_tools: [a, b, c]\n",
        )
        .unwrap();
        let eff = resolve_effective(root.to_str(), Some("human"));
        assert_eq!(eff.output, "human");
        assert_eq!(eff.logs_dir, root.join("logs"));
        assert_eq!(eff.venn_tools, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_detect_root_walks_up() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("styleval.toml"), "").unwrap();
        let nested = root.join("a/b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(detect_root(&nested), root.to_path_buf());
    }

    #[test]
    fn test_malformed_config_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("styleval.toml"), "results_dir = [unclosed\n").unwrap();
        assert!(load_config(root).is_none());
        let eff = resolve_effective(root.to_str(), None);
        assert_eq!(eff.results_dir, root.join("results"));
        assert_eq!(eff.output, "human");
    }
}
