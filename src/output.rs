//! Output rendering for experiment, statistics, report and CI commands.
//!
//! Supports `human` (default) and `json` outputs. Human output renders
//! markdown or boxed tables; the JSON form is composed by pure `compose_*`
//! functions so it can be asserted on directly.

use crate::audit::SeverityCounts;
use crate::ci::CiOutcome;
use crate::diff::{summarize, DiffOutcome};
use crate::report::MergeOutcome;
use crate::stats::{CountSummary, ErrorTypeSummary, ProtocolComparison, VennCounts};
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::collections::BTreeMap;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

fn print_json(v: &JsonVal) {
    match serde_json::to_string_pretty(v) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("{} {}", crate::utils::error_prefix(), e),
    }
}

fn heading(text: &str, output: &str) {
    if use_colors(output) {
        println!("{}", text.bold());
    } else {
        println!("{}", text);
    }
}

fn widths(header: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    let mut w: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < w.len() {
                w[i] = w[i].max(cell.chars().count());
            }
        }
    }
    w
}

fn pad(cell: &str, width: usize) -> String {
    let n = cell.chars().count();
    format!("{}{}", cell, " ".repeat(width.saturating_sub(n)))
}

/// GitHub-flavoured markdown table.
pub fn render_markdown_table(header: &[String], rows: &[Vec<String>]) -> String {
    let w = widths(header, rows);
    let line = |cells: &[String]| -> String {
        let inner: Vec<String> = w
            .iter()
            .enumerate()
            .map(|(i, width)| pad(cells.get(i).map(String::as_str).unwrap_or(""), *width))
            .collect();
        format!("| {} |", inner.join(" | "))
    };
    let mut out = vec![line(header)];
    let sep: Vec<String> = w.iter().map(|width| "-".repeat(*width)).collect();
    out.push(format!("|-{}-|", sep.join("-|-")));
    out.extend(rows.iter().map(|r| line(r)));
    out.join("\n")
}

/// Single-line boxed table.
pub fn render_boxed_table(header: &[String], rows: &[Vec<String>]) -> String {
    let w = widths(header, rows);
    let rule = |l: &str, m: &str, r: &str| -> String {
        let segs: Vec<String> = w.iter().map(|width| "─".repeat(width + 2)).collect();
        format!("{}{}{}", l, segs.join(m), r)
    };
    let line = |cells: &[String]| -> String {
        let inner: Vec<String> = w
            .iter()
            .enumerate()
            .map(|(i, width)| pad(cells.get(i).map(String::as_str).unwrap_or(""), *width))
            .collect();
        format!("│ {} │", inner.join(" │ "))
    };
    let mut out = vec![rule("┌", "┬", "┐"), line(header), rule("├", "┼", "┤")];
    out.extend(rows.iter().map(|r| line(r)));
    out.push(rule("└", "┴", "┘"));
    out.join("\n")
}

pub fn compose_counts_json(summary: &CountSummary) -> JsonVal {
    let mut rows = serde_json::Map::new();
    for row in &summary.rows {
        let cells: serde_json::Map<String, JsonVal> = summary
            .columns
            .iter()
            .zip(&row.counts)
            .map(|(c, n)| (c.clone(), json!(n)))
            .collect();
        rows.insert(row.label.clone(), JsonVal::Object(cells));
    }
    JsonVal::Object(rows)
}

/// Print repaired counts per project and tool.
pub fn print_counts(summary: &CountSummary, output: &str) {
    match output {
        "json" => print_json(&compose_counts_json(summary)),
        _ => {
            let mut header = vec![String::new()];
            header.extend(summary.columns.iter().cloned());
            let rows: Vec<Vec<String>> = summary
                .rows
                .iter()
                .map(|r| {
                    let mut cells = vec![r.label.clone()];
                    cells.extend(r.counts.iter().map(|n| n.to_string()));
                    cells
                })
                .collect();
            println!("{}", render_markdown_table(&header, &rows));
        }
    }
}

/// Rows of the relative repair table; an unrepaired type renders as `0.0%`.
pub fn error_type_rows(summary: &ErrorTypeSummary) -> (Vec<String>, Vec<Vec<String>>) {
    let mut header = vec![String::new()];
    header.extend(
        summary
            .out_of
            .iter()
            .map(|(label, n)| format!("{} (/{})", label, n)),
    );
    let rows = summary
        .tools
        .iter()
        .map(|t| {
            let mut cells = vec![t.tool.clone()];
            cells.extend(summary.out_of.keys().map(|label| {
                format!("{:.1}%", t.relative.get(label).copied().unwrap_or(0.0))
            }));
            cells
        })
        .collect();
    (header, rows)
}

pub fn print_error_types(summary: &ErrorTypeSummary, output: &str) {
    match output {
        "json" => print_json(&json!(summary)),
        _ => {
            let (header, rows) = error_type_rows(summary);
            println!("{}", render_boxed_table(&header, &rows));
        }
    }
}

pub fn print_venn(v: &VennCounts, output: &str) {
    match output {
        "json" => print_json(&json!({"sets": v, "regions": v.regions()})),
        _ => {
            let [a, b, c] = &v.tools;
            let labels = [
                format!("only {}", a),
                format!("only {}", b),
                format!("only {}", c),
                format!("{} & {}", a, b),
                format!("{} & {}", a, c),
                format!("{} & {}", b, c),
                format!("{} & {} & {}", a, b, c),
            ];
            let header = vec!["region".to_string(), "files".to_string()];
            let rows: Vec<Vec<String>> = labels
                .iter()
                .zip(v.regions())
                .map(|(l, n)| vec![l.clone(), n.to_string()])
                .collect();
            heading(
                &format!("{}={} {}={} {}={}", a, v.a, b, v.b, c, v.c),
                output,
            );
            println!("{}", render_markdown_table(&header, &rows));
        }
    }
}

pub fn print_protocols(left: &str, right: &str, total: &ProtocolComparison, output: &str) {
    match output {
        "json" => print_json(&json!({
            "left": left,
            "right": right,
            "only_left": total.only_left,
            "only_right": total.only_right,
            "both": total.both,
        })),
        _ => {
            let header = vec![
                format!("only {}", left),
                format!("only {}", right),
                "both".to_string(),
            ];
            let rows = vec![vec![
                total.only_left.to_string(),
                total.only_right.to_string(),
                total.both.to_string(),
            ]];
            println!("{}", render_markdown_table(&header, &rows));
        }
    }
}

pub fn compose_diff_json(per_tool: &[(String, DiffOutcome)]) -> JsonVal {
    let mut out = serde_json::Map::new();
    for (tool, outcome) in per_tool {
        out.insert(
            tool.clone(),
            json!({
                "sizes": outcome.sizes,
                "skipped": outcome.skipped,
                "summary": summarize(&outcome.sizes),
            }),
        );
    }
    json!({"data": out, "x_label": "Diff size"})
}

pub fn print_diff(per_tool: &[(String, DiffOutcome)], output: &str) {
    match output {
        "json" => print_json(&compose_diff_json(per_tool)),
        _ => {
            let header: Vec<String> = ["tool", "samples", "skipped", "min", "median", "mean", "max"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            let rows: Vec<Vec<String>> = per_tool
                .iter()
                .map(|(tool, outcome)| match summarize(&outcome.sizes) {
                    Some(s) => vec![
                        tool.clone(),
                        s.samples.to_string(),
                        outcome.skipped.to_string(),
                        s.min.to_string(),
                        format!("{:.1}", s.median),
                        format!("{:.1}", s.mean),
                        s.max.to_string(),
                    ],
                    None => vec![
                        tool.clone(),
                        "0".to_string(),
                        outcome.skipped.to_string(),
                        "-".to_string(),
                        "-".to_string(),
                        "-".to_string(),
                        "-".to_string(),
                    ],
                })
                .collect();
            println!("{}", render_markdown_table(&header, &rows));
        }
    }
}

pub fn print_report_written(project: &str, files: usize, path: &str, output: &str) {
    match output {
        "json" => print_json(&json!({"project": project, "files": files, "report": path})),
        _ => {
            if use_colors(output) {
                println!("{} {} ({} files)", "📝 report:".green().bold(), path, files);
            } else {
                println!("📝 report: {} ({} files)", path, files);
            }
        }
    }
}

pub fn print_merge(outcome: &MergeOutcome, path: &str, output: &str) {
    match output {
        "json" => print_json(&json!({
            "report": path,
            "files": outcome.files,
            "included": outcome.included,
            "skipped": outcome.skipped,
        })),
        _ => {
            let msg = format!(
                "merged {} files from {} reports ({})",
                outcome.files,
                outcome.included.len(),
                outcome.included.join(", ")
            );
            if use_colors(output) {
                println!("{} {} -> {}", "📦".green(), msg, path.bold());
            } else {
                println!("📦 {} -> {}", msg, path);
            }
            for name in &outcome.skipped {
                println!("⏭️  no report: {}", name);
            }
        }
    }
}

pub fn compose_ci_json(outcome: &CiOutcome) -> JsonVal {
    let summary: BTreeMap<String, SeverityCounts> = outcome.summary();
    json!({
        "summary": summary,
        "interrupted": outcome.interrupted,
        "failure": outcome.failure,
    })
}

/// Print per-repo severity counts, including after a failure or interrupt.
pub fn print_ci(outcome: &CiOutcome, output: &str) {
    match output {
        "json" => print_json(&compose_ci_json(outcome)),
        _ => {
            if outcome.interrupted {
                eprintln!("{} interrupted; partial results follow", crate::utils::note_prefix());
            }
            if let Some(f) = &outcome.failure {
                eprintln!("{} {}; partial results follow", crate::utils::error_prefix(), f);
            }
            let header: Vec<String> = ["repo", "error", "warning", "unknown"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            let rows: Vec<Vec<String>> = outcome
                .summary()
                .into_iter()
                .map(|(repo, c)| {
                    vec![
                        repo,
                        c.error.to_string(),
                        c.warning.to_string(),
                        c.unknown.to_string(),
                    ]
                })
                .collect();
            println!("{}", render_markdown_table(&header, &rows));
        }
    }
}
