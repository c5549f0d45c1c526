//! CI build-log analysis over archived builds.
//!
//! Store layout: `<logs_dir>/<owner>/<repo>/<build>.tar.bz`, each archive
//! expanding to `<job>/log.txt`. A build is extracted next to its archive for
//! the duration of its analysis; the returned `ExtractedBuild` removes the
//! extracted tree when closed or dropped, so an error or an interrupt never
//! leaves it behind.

use crate::audit::{self, AuditRecord, SeverityCounts};
use crate::error::{Error, Result};
use crate::utils;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const ARCHIVE_EXT: &str = "tar.bz";
const JOB_LOG: &str = "log.txt";

#[derive(Debug, Clone)]
pub struct CiStore {
    pub logs_dir: PathBuf,
}

impl CiStore {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        CiStore {
            logs_dir: logs_dir.into(),
        }
    }

    pub fn repo_dir(&self, repo: &str) -> PathBuf {
        self.logs_dir.join(repo)
    }

    /// Every `<owner>/<repo>` directory in the store.
    pub fn repos(&self) -> Vec<String> {
        let mut repos = Vec::new();
        for owner in utils::list_folders(&self.logs_dir) {
            for repo in utils::list_folders(&self.logs_dir.join(&owner)) {
                repos.push(format!("{}/{}", owner, repo));
            }
        }
        repos
    }

    /// Build IDs of a repo: archive names up to their first `.`.
    pub fn builds(&self, repo: &str) -> Vec<String> {
        let pattern = self
            .repo_dir(repo)
            .join(format!("*.{}", ARCHIVE_EXT))
            .to_string_lossy()
            .to_string();
        let mut builds: Vec<String> = match glob::glob(&pattern) {
            Ok(paths) => paths
                .flatten()
                .filter_map(|p| {
                    let name = p.file_name()?.to_str()?.to_string();
                    name.split('.').next().map(|s| s.to_string())
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        builds.sort();
        builds
    }

    pub fn archive_path(&self, repo: &str, build: &str) -> PathBuf {
        self.repo_dir(repo).join(format!("{}.{}", build, ARCHIVE_EXT))
    }

    /// Extract one build archive with `tar -xjf`.
    pub fn open_build(&self, repo: &str, build: &str) -> Result<ExtractedBuild> {
        let archive = self.archive_path(repo, build);
        let dir = self.repo_dir(repo).join(build);
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        // Owns the directory from here on, so a failed extraction is cleaned up too
        let handle = ExtractedBuild {
            dir,
            released: false,
        };
        let out = Command::new("tar")
            .arg("-xjf")
            .arg(&archive)
            .arg("-C")
            .arg(&handle.dir)
            .output()
            .map_err(|e| Error::Spawn {
                program: "tar".to_string(),
                source: e,
            })?;
        if !out.status.success() {
            return Err(Error::Extract {
                archive,
                message: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        debug!(repo, build, "build extracted");
        Ok(handle)
    }
}

/// An extracted build directory, deleted on `close` or drop.
#[derive(Debug)]
pub struct ExtractedBuild {
    dir: PathBuf,
    released: bool,
}

impl ExtractedBuild {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Job IDs: folders holding a `log.txt`, sorted.
    pub fn job_ids(&self) -> Vec<String> {
        utils::list_folders(&self.dir)
            .into_iter()
            .filter(|job| self.dir.join(job).join(JOB_LOG).is_file())
            .collect()
    }

    pub fn job_log(&self, job: &str) -> Result<String> {
        let p = self.dir.join(job).join(JOB_LOG);
        let bytes = fs::read(&p).map_err(|e| Error::io(&p, e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn close(mut self) -> Result<()> {
        self.released = true;
        fs::remove_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))
    }
}

impl Drop for ExtractedBuild {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "failed to clean extracted build");
        }
    }
}

/// Checkstyle findings of every job of every build of `repo`.
pub fn analyse_repo(store: &CiStore, repo: &str, cancel: &AtomicBool) -> Result<Vec<AuditRecord>> {
    let mut records = Vec::new();
    for build in store.builds(repo) {
        if cancel.load(Ordering::SeqCst) {
            return Err(Error::Interrupted);
        }
        let extracted = store.open_build(repo, &build)?;
        for job in extracted.job_ids() {
            if cancel.load(Ordering::SeqCst) {
                return Err(Error::Interrupted);
            }
            let log = extracted.job_log(&job)?;
            let found = audit::find_audit_records(log.split('\n'));
            debug!(repo, build = %build, job = %job, records = found.len(), "job analysed");
            records.extend(found);
        }
        extracted.close()?;
    }
    Ok(records)
}

#[derive(Debug, Default, Serialize)]
pub struct CiOutcome {
    /// Completed repos only.
    pub repos: BTreeMap<String, Vec<AuditRecord>>,
    pub interrupted: bool,
    pub failure: Option<String>,
}

impl CiOutcome {
    /// Severity counts for repos with at least one finding.
    pub fn summary(&self) -> BTreeMap<String, SeverityCounts> {
        self.repos
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(repo, records)| (repo.clone(), audit::count_severities(records)))
            .collect()
    }
}

/// Analyse repos in order. The first failure or an interrupt stops the run;
/// repos finished before that are kept.
pub fn analyse(store: &CiStore, repos: &[String], cancel: &AtomicBool) -> CiOutcome {
    let mut outcome = CiOutcome::default();
    for repo in repos {
        info!(repo = %repo, "analyse");
        match analyse_repo(store, repo, cancel) {
            Ok(records) => {
                outcome.repos.insert(repo.clone(), records);
            }
            Err(_) if cancel.load(Ordering::SeqCst) => {
                warn!(repo = %repo, "analysis interrupted");
                outcome.interrupted = true;
                break;
            }
            Err(e) => {
                error!(repo = %repo, error = %e, "analysis failed");
                outcome.failure = Some(e.to_string());
                break;
            }
        }
    }
    outcome
}

/// Flag set by Ctrl-C. Installing the handler twice only logs a warning.
pub fn interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst)) {
        warn!(error = %e, "could not install interrupt handler");
    }
    flag
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const LOG: &str = "[INFO] --- maven-checkstyle-plugin:3.1.0:check (validate) @ app ---\n\
Starting audit...\n\
src/A.java:3: warning: Missing a Javadoc comment.\n\
[ERROR] src/B.java:[4,1] (imports) UnusedImports: Unused import.\n\
Audit done.\n\
[INFO] BUILD SUCCESS\n";

    /// Write `<logs>/<repo>/<build>.tar.bz` holding the given jobs.
    fn make_build(logs: &Path, repo: &str, build: &str, jobs: &[(&str, &str)]) {
        let staging = logs.join("staging").join(build);
        for (job, log) in jobs {
            fs::create_dir_all(staging.join(job)).unwrap();
            fs::write(staging.join(job).join("log.txt"), log).unwrap();
        }
        let repo_dir = logs.join(repo);
        fs::create_dir_all(&repo_dir).unwrap();
        let archive = repo_dir.join(format!("{}.tar.bz", build));
        let status = Command::new("tar")
            .current_dir(&staging)
            .args(["-cjf", archive.to_str().unwrap(), "."])
            .status()
            .expect("tar exec");
        assert!(status.success());
        fs::remove_dir_all(logs.join("staging")).unwrap();
    }

    #[test]
    fn test_repos_and_builds_listing() {
        let tmp = tempdir().unwrap();
        let logs = tmp.path();
        make_build(logs, "acme/app", "102", &[("9", LOG)]);
        make_build(logs, "acme/app", "101", &[("8", LOG)]);
        let store = CiStore::new(logs);
        assert_eq!(store.repos(), vec!["acme/app"]);
        assert_eq!(store.builds("acme/app"), vec!["101", "102"]);
    }

    #[test]
    fn test_extracted_build_is_removed_on_close_and_drop() {
        let tmp = tempdir().unwrap();
        let logs = tmp.path();
        make_build(logs, "acme/app", "7", &[("70", LOG), ("71", "no audit here\n")]);
        let store = CiStore::new(logs);

        let build = store.open_build("acme/app", "7").unwrap();
        let dir = build.dir().to_path_buf();
        assert_eq!(build.job_ids(), vec!["70", "71"]);
        assert!(build.job_log("70").unwrap().contains("Starting audit..."));
        build.close().unwrap();
        assert!(!dir.exists());

        {
            let _build = store.open_build("acme/app", "7").unwrap();
            assert!(dir.exists());
        }
        assert!(!dir.exists());
    }

    #[test]
    fn test_failed_extraction_cleans_up() {
        let tmp = tempdir().unwrap();
        let store = CiStore::new(tmp.path());
        fs::create_dir_all(store.repo_dir("acme/app")).unwrap();
        fs::write(store.archive_path("acme/app", "5"), "not an archive").unwrap();
        let err = store.open_build("acme/app", "5").unwrap_err();
        assert!(matches!(err, Error::Extract { .. }));
        assert!(!store.repo_dir("acme/app").join("5").exists());
    }

    #[test]
    fn test_analyse_counts_per_repo() {
        let tmp = tempdir().unwrap();
        let logs = tmp.path();
        make_build(logs, "acme/app", "1", &[("10", LOG), ("11", LOG)]);
        make_build(logs, "acme/quiet", "2", &[("20", "nothing\n")]);
        let store = CiStore::new(logs);
        let cancel = AtomicBool::new(false);
        let outcome = analyse(&store, &store.repos(), &cancel);
        assert!(!outcome.interrupted);
        assert!(outcome.failure.is_none());
        assert_eq!(outcome.repos.len(), 2);
        let summary = outcome.summary();
        assert_eq!(summary.len(), 1);
        assert_eq!(
            summary["acme/app"],
            SeverityCounts {
                error: 2,
                warning: 2,
                unknown: 0
            }
        );
        assert!(!logs.join("acme/app/1").exists());
    }

    #[test]
    fn test_analyse_stops_on_interrupt() {
        let tmp = tempdir().unwrap();
        let logs = tmp.path();
        make_build(logs, "acme/app", "1", &[("10", LOG)]);
        let store = CiStore::new(logs);
        let cancel = AtomicBool::new(true);
        let outcome = analyse(&store, &store.repos(), &cancel);
        assert!(outcome.interrupted);
        assert!(outcome.repos.is_empty());
    }

    #[test]
    fn test_analyse_keeps_completed_repos_on_failure() {
        let tmp = tempdir().unwrap();
        let logs = tmp.path();
        make_build(logs, "a/ok", "1", &[("10", LOG)]);
        let store = CiStore::new(logs);
        fs::create_dir_all(store.repo_dir("b/bad")).unwrap();
        fs::write(store.archive_path("b/bad", "3"), "garbage").unwrap();
        let cancel = AtomicBool::new(false);
        let outcome = analyse(&store, &store.repos(), &cancel);
        assert!(outcome.failure.is_some());
        assert_eq!(outcome.repos.keys().collect::<Vec<_>>(), vec!["a/ok"]);
    }
}
