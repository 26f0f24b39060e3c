//! Plain-text report emission. Pure serialization: every list is written
//! in natural order, nested levels indented with tabs.

use crate::check::CheckReport;
use crate::natsort::sorted_naturally;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const NO_FILES_REPORT: &str = "no_files.txt";
pub const PIPELINES_REPORT: &str = "incorrect_pipelines.txt";
pub const EVENTS_REPORT: &str = "incorrect_nevents.txt";
pub const FRIENDS_REPORT: &str = "incorrect_friends.txt";

fn write(path: &Path, body: String) -> Result<()> {
    fs::write(path, body).with_context(|| format!("writing report {}", path.display()))
}

/// One name per line.
///
/// # Errors
///
/// Fails when the file cannot be written.
pub fn write_list(path: &Path, names: &[String]) -> Result<()> {
    let sorted = sorted_naturally(names);
    let mut body = sorted.join("\n");
    if !sorted.is_empty() {
        body.push('\n');
    }
    write(path, body)
}

/// Dataset lines with tab-indented children.
///
/// # Errors
///
/// Fails when the file cannot be written.
pub fn write_nested_list(path: &Path, map: &BTreeMap<String, Vec<String>>) -> Result<()> {
    let mut body = String::new();
    for dataset in sorted_naturally(map.keys()) {
        body.push_str(&dataset);
        body.push('\n');
        for child in sorted_naturally(&map[&dataset]) {
            body.push('\t');
            body.push_str(&child);
            body.push('\n');
        }
    }
    write(path, body)
}

/// Two levels of tab indentation: dataset, pipeline, then leaf names.
///
/// # Errors
///
/// Fails when the file cannot be written.
pub fn write_nested_tree(
    path: &Path,
    map: &BTreeMap<String, BTreeMap<String, Vec<String>>>,
) -> Result<()> {
    let mut body = String::new();
    for dataset in sorted_naturally(map.keys()) {
        body.push_str(&dataset);
        body.push('\n');
        for pipeline in sorted_naturally(map[&dataset].keys()) {
            body.push('\t');
            body.push_str(&pipeline);
            body.push('\n');
            for leaf in sorted_naturally(&map[&dataset][&pipeline]) {
                body.push_str("\t\t");
                body.push_str(&leaf);
                body.push('\n');
            }
        }
    }
    write(path, body)
}

/// Write the four categorized reports under `dir` with their standard
/// names.
///
/// # Errors
///
/// Fails when any report file cannot be written.
pub fn write_reports(dir: &Path, report: &CheckReport) -> Result<()> {
    write_list(&dir.join(NO_FILES_REPORT), &report.no_files)?;
    write_list(&dir.join(PIPELINES_REPORT), &report.wrong_pipeline_counts)?;
    write_nested_list(&dir.join(EVENTS_REPORT), &report.event_mismatches)?;
    write_nested_tree(&dir.join(FRIENDS_REPORT), &report.friend_mismatches)?;
    Ok(())
}
