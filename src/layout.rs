//! On-disk experiment layout and idempotent staging.
//!
//! ```text
//! <results_dir>/<project>/
//!   clean/                       baseline corpus files
//!   errored/1/<id>/*             corrupted instances (copied once)
//!   <tool>/<id>/*                one output tree per repair tool
//!   checkstyle.xml               linter configuration
//!   metadata.json                corpus metadata
//!   checkstyle_results_<tool>.json
//!   report.json
//! ```
//!
//! Staging copies inputs only when the experiment directory does not exist
//! yet. An existing tree is reused verbatim, stale content included.

use crate::config::Effective;
use crate::error::{Error, Result};
use crate::models::{DatasetInfo, FileId, InstanceMetadata};
use crate::utils;
use serde_json::Value as Json;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The only corruption level materialized in experiments.
pub const CORRUPTION_LEVEL: u32 = 1;

pub const LINTER_CONFIG: &str = "checkstyle.xml";
pub const METADATA_FILE: &str = "metadata.json";
pub const REPORT_FILE: &str = "report.json";
const CORPUS_METADATA: &str = "corpus.json";
const DATASET_INFO: &str = "info.json";

#[derive(Debug, Clone)]
/// Where experiments and their inputs live.
pub struct Layout {
    pub results_dir: PathBuf,
    pub datasets_dir: PathBuf,
    pub corpora_dir: PathBuf,
    pub repairs_dir: PathBuf,
    pub extension: String,
}

impl Layout {
    pub fn from_effective(eff: &Effective) -> Self {
        Layout {
            results_dir: eff.results_dir.clone(),
            datasets_dir: eff.datasets_dir.clone(),
            corpora_dir: eff.corpora_dir.clone(),
            repairs_dir: eff.repairs_dir.clone(),
            extension: eff.extension.clone(),
        }
    }

    pub fn experiment_dir(&self, project: &str) -> PathBuf {
        self.results_dir.join(project)
    }

    pub fn dataset_dir(&self, project: &str) -> PathBuf {
        self.datasets_dir.join(project)
    }

    pub fn corpus_dir(&self, project: &str) -> PathBuf {
        self.corpora_dir.join(project)
    }

    /// Precomputed repaired files for a project, optionally for one protocol variant.
    pub fn precomputed_repairs(&self, project: &str, protocol: Option<&str>) -> PathBuf {
        let base = match protocol {
            Some(p) => self.repairs_dir.join(p).join(project),
            None => self.repairs_dir.join(project),
        };
        base.join("files-repaired")
    }

    /// Names of every experiment directory under the results root.
    pub fn experiments(&self) -> Vec<String> {
        utils::list_folders(&self.results_dir)
    }

    fn checkstyle_jar(&self, project: &str) -> Result<String> {
        let info_path = self.dataset_dir(project).join(DATASET_INFO);
        if !info_path.is_file() {
            return Err(Error::DatasetInfoMissing(info_path));
        }
        let info: DatasetInfo = utils::read_json(&info_path)?;
        Ok(info.checkstyle_jar)
    }
}

#[derive(Debug, Clone)]
/// A staged, mutable working copy for one project.
pub struct Experiment {
    pub project: String,
    pub dir: PathBuf,
    pub clean_dir: PathBuf,
    pub errored_dir: PathBuf,
    pub metadata: Json,
    pub checkstyle_jar: String,
    pub extension: String,
}

impl Experiment {
    /// `errored/1`: one folder per corrupted file instance.
    pub fn level_dir(&self) -> PathBuf {
        self.errored_dir.join(CORRUPTION_LEVEL.to_string())
    }

    pub fn tool_dir(&self, tool: &str) -> PathBuf {
        self.dir.join(tool)
    }

    pub fn linter_config(&self) -> PathBuf {
        self.dir.join(LINTER_CONFIG)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    pub fn linter_results_path(&self, tool: &str) -> PathBuf {
        self.dir.join(format!("checkstyle_results_{}.json", tool))
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(REPORT_FILE)
    }

    /// Every originally flagged instance ID at corruption level 1.
    pub fn out_of(&self) -> BTreeSet<FileId> {
        folder_ids(&self.level_dir())
    }

    /// Injected-error metadata of one instance; `None` when absent or unreadable.
    pub fn instance_metadata(&self, id: FileId) -> Option<InstanceMetadata> {
        let p = self.level_dir().join(id.to_string()).join(METADATA_FILE);
        match utils::read_json(&p) {
            Ok(m) => Some(m),
            Err(e) => {
                debug!(project = %self.project, id, error = %e, "no instance metadata");
                None
            }
        }
    }
}

/// Numeric subfolder names of `dir`; non-numeric folders are ignored.
pub fn folder_ids(dir: &Path) -> BTreeSet<FileId> {
    utils::list_folders(dir)
        .into_iter()
        .filter_map(|name| match name.parse::<FileId>() {
            Ok(id) => Some(id),
            Err(_) => {
                debug!(dir = %dir.display(), folder = %name, "skipping non-numeric folder");
                None
            }
        })
        .collect()
}

/// Create the experiment tree for `project` if it does not exist yet.
///
/// Dataset and corpus inputs are validated before anything is created, and a
/// copy that fails midway removes the directory again, so an existing
/// experiment directory is always complete. It is reused without any copy.
pub fn stage(layout: &Layout, project: &str) -> Result<Experiment> {
    debug!(project, "staging experiment");
    let dataset_dir = layout.dataset_dir(project);
    let checkstyle_jar = layout.checkstyle_jar(project)?;
    debug!(project, jar = %checkstyle_jar, "checkstyle jar version");

    let experiment = experiment_paths(layout, project, checkstyle_jar);
    if !experiment.dir.exists() {
        let level = CORRUPTION_LEVEL.to_string();
        let from_level = dataset_dir.join(&level);
        if !from_level.is_dir() {
            return Err(Error::CorruptionLevelMissing(from_level));
        }
        let corpus_dir = layout.corpus_dir(project);
        let corpus_data = corpus_dir.join("data");
        let corpus_config = corpus_dir.join(LINTER_CONFIG);
        let corpus_metadata = corpus_dir.join(CORPUS_METADATA);
        if !corpus_data.is_dir() {
            return Err(Error::CorpusMissing(corpus_data));
        }
        for file in [&corpus_config, &corpus_metadata] {
            if !file.is_file() {
                return Err(Error::CorpusMissing(file.clone()));
            }
        }

        let copied = (|| -> Result<()> {
            fs::create_dir_all(&experiment.dir).map_err(|e| Error::io(&experiment.dir, e))?;
            utils::copy_dir(&from_level, &experiment.errored_dir.join(&level))?;
            utils::copy_dir(&corpus_data, &experiment.clean_dir)?;
            utils::copy_file(&corpus_config, &experiment.linter_config())?;
            utils::copy_file(&corpus_metadata, &experiment.metadata_path())
        })();
        // Existence of the directory means fully staged
        if let Err(e) = copied {
            if let Err(rm) = fs::remove_dir_all(&experiment.dir) {
                warn!(project, dir = %experiment.dir.display(), error = %rm, "failed to remove partial experiment");
            }
            return Err(e);
        }
        debug!(project, dir = %experiment.dir.display(), "experiment staged");
    } else {
        debug!(project, dir = %experiment.dir.display(), "reusing staged experiment");
    }

    let metadata = utils::read_json(&experiment.metadata_path())?;
    Ok(Experiment {
        metadata,
        ..experiment
    })
}

/// Open an experiment that was staged by an earlier run.
pub fn open(layout: &Layout, project: &str) -> Result<Experiment> {
    let checkstyle_jar = layout.checkstyle_jar(project)?;
    let experiment = experiment_paths(layout, project, checkstyle_jar);
    if !experiment.dir.is_dir() {
        return Err(Error::NotStaged(project.to_string()));
    }
    let metadata = utils::read_json(&experiment.metadata_path()).unwrap_or(Json::Null);
    Ok(Experiment {
        metadata,
        ..experiment
    })
}

fn experiment_paths(layout: &Layout, project: &str, checkstyle_jar: String) -> Experiment {
    let dir = layout.experiment_dir(project);
    Experiment {
        project: project.to_string(),
        clean_dir: dir.join("clean"),
        errored_dir: dir.join("errored"),
        dir,
        metadata: Json::Null,
        checkstyle_jar,
        extension: layout.extension.clone(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::tempdir;

    pub(crate) fn test_layout(root: &Path) -> Layout {
        Layout {
            results_dir: root.join("results"),
            datasets_dir: root.join("datasets"),
            corpora_dir: root.join("corpora"),
            repairs_dir: root.join("repairs"),
            extension: "java".to_string(),
        }
    }

    /// Seed a dataset and corpus for `project` with the given instance IDs.
    pub(crate) fn seed_project(layout: &Layout, project: &str, ids: &[FileId]) {
        let ds = layout.dataset_dir(project);
        fs::create_dir_all(&ds).unwrap();
        fs::write(
            ds.join("info.json"),
            r#"{"checkstyle_jar": "checkstyle-8.12-all.jar"}"#,
        )
        .unwrap();
        for id in ids {
            let inst = ds.join("1").join(id.to_string());
            fs::create_dir_all(&inst).unwrap();
            fs::write(inst.join("Foo.java"), "class Foo {\n  int x;\n}\n").unwrap();
            fs::write(
                inst.join("metadata.json"),
                r#"{"errors": [{"source": "com.puppycrawl.tools.checkstyle.checks.whitespace.WhitespaceAroundCheck"}]}"#,
            )
            .unwrap();
        }
        let corpus = layout.corpus_dir(project);
        fs::create_dir_all(corpus.join("data")).unwrap();
        fs::write(corpus.join("data/Foo.java"), "class Foo {}\n").unwrap();
        fs::write(corpus.join("checkstyle.xml"), "<module name=\"Checker\"/>").unwrap();
        fs::write(corpus.join("corpus.json"), r#"{"name": "demo"}"#).unwrap();
    }

    #[test]
    fn test_stage_copies_inputs() {
        let tmp = tempdir().unwrap();
        let layout = test_layout(tmp.path());
        seed_project(&layout, "demo", &[1, 2]);

        let exp = stage(&layout, "demo").unwrap();
        assert_eq!(exp.checkstyle_jar, "checkstyle-8.12-all.jar");
        assert_eq!(exp.metadata["name"], "demo");
        assert!(exp.level_dir().join("1/Foo.java").is_file());
        assert!(exp.clean_dir.join("Foo.java").is_file());
        assert!(exp.linter_config().is_file());
        assert_eq!(exp.out_of(), BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_stage_is_idempotent() {
        let tmp = tempdir().unwrap();
        let layout = test_layout(tmp.path());
        seed_project(&layout, "demo", &[1]);
        let first = stage(&layout, "demo").unwrap();

        // Changes to the inputs after the first staging are not picked up
        let ds = layout.dataset_dir("demo");
        fs::create_dir_all(ds.join("1/9")).unwrap();
        fs::write(ds.join("1/1/Foo.java"), "changed").unwrap();
        fs::write(layout.corpus_dir("demo").join("corpus.json"), r#"{"name": "other"}"#).unwrap();

        let second = stage(&layout, "demo").unwrap();
        assert_eq!(second.out_of(), first.out_of());
        assert_eq!(second.metadata["name"], "demo");
        assert_eq!(
            fs::read_to_string(second.level_dir().join("1/Foo.java")).unwrap(),
            "class Foo {\n  int x;\n}\n"
        );
    }

    #[test]
    fn test_stage_missing_info_fails_without_creating_dir() {
        let tmp = tempdir().unwrap();
        let layout = test_layout(tmp.path());
        let err = stage(&layout, "ghost").unwrap_err();
        assert!(matches!(err, Error::DatasetInfoMissing(_)));
        assert!(!layout.experiment_dir("ghost").exists());
    }

    #[test]
    fn test_stage_missing_corpus_fails_cleanly_and_recovers() {
        let tmp = tempdir().unwrap();
        let layout = test_layout(tmp.path());
        seed_project(&layout, "demo", &[1]);
        let corpus = layout.corpus_dir("demo");
        let saved = tmp.path().join("saved-corpus");
        fs::rename(&corpus, &saved).unwrap();

        let err = stage(&layout, "demo").unwrap_err();
        assert!(matches!(err, Error::CorpusMissing(_)));
        assert!(!layout.experiment_dir("demo").exists());

        fs::rename(&saved, &corpus).unwrap();
        fs::remove_file(corpus.join("corpus.json")).unwrap();
        let err = stage(&layout, "demo").unwrap_err();
        assert!(matches!(err, Error::CorpusMissing(p) if p.ends_with("corpus.json")));
        assert!(!layout.experiment_dir("demo").exists());

        fs::write(corpus.join("corpus.json"), r#"{"name": "demo"}"#).unwrap();
        let exp = stage(&layout, "demo").unwrap();
        assert_eq!(exp.metadata["name"], "demo");
        assert!(exp.clean_dir.join("Foo.java").is_file());
    }

    #[test]
    fn test_stage_missing_level_fails() {
        let tmp = tempdir().unwrap();
        let layout = test_layout(tmp.path());
        let ds = layout.dataset_dir("demo");
        fs::create_dir_all(&ds).unwrap();
        fs::write(ds.join("info.json"), r#"{"checkstyle_jar": "x.jar"}"#).unwrap();
        let err = stage(&layout, "demo").unwrap_err();
        assert!(matches!(err, Error::CorruptionLevelMissing(_)));
        assert!(!layout.experiment_dir("demo").exists());
    }

    #[test]
    fn test_open_requires_staged_experiment() {
        let tmp = tempdir().unwrap();
        let layout = test_layout(tmp.path());
        seed_project(&layout, "demo", &[1]);
        assert!(matches!(open(&layout, "demo"), Err(Error::NotStaged(_))));
        stage(&layout, "demo").unwrap();
        let exp = open(&layout, "demo").unwrap();
        assert_eq!(exp.out_of(), BTreeSet::from([1]));
    }

    #[test]
    fn test_precomputed_repairs_paths() {
        let layout = test_layout(Path::new("/w"));
        assert_eq!(
            layout.precomputed_repairs("p", None),
            PathBuf::from("/w/repairs/p/files-repaired")
        );
        assert_eq!(
            layout.precomputed_repairs("p", Some("random")),
            PathBuf::from("/w/repairs/random/p/files-repaired")
        );
    }
}
