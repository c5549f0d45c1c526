//! Styleval core library.
//!
//! This crate evaluates code-style repair tools: it stages corrupted corpora,
//! runs each tool, re-lints the outputs with checkstyle and aggregates which
//! files every tool repaired. It also extracts checkstyle findings from
//! archived CI build logs.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `layout`: Experiment directory layout and idempotent staging.
//! - `tools`: Repair tool invocation with a pluggable cache policy.
//! - `checkstyle`: Linter runner, plain-output parsing and result cache.
//! - `repaired`: Repaired-set resolution from linter verdicts.
//! - `experiment`: Stage, invoke and resolve for one project.
//! - `diff`: Line-level diff sizes of repairs.
//! - `report`: Per-experiment JSON reports and their merge.
//! - `stats`: Counts, error-type rates, overlaps and protocol comparison.
//! - `audit`: Audit-section state machine for CI logs.
//! - `ci`: Build archive handling and per-repo log analysis.
//! - `models`: Serde data models.
//! - `output`: Human/JSON printers.
//! - `utils`: Supporting helpers.
pub mod audit;
pub mod checkstyle;
pub mod ci;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod experiment;
pub mod layout;
pub mod models;
pub mod output;
pub mod repaired;
pub mod report;
pub mod stats;
pub mod tools;
pub mod utils;
