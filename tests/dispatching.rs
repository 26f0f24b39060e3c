//! Bundle execution under the parallel dispatcher.

use ntuple_harvester::dispatch::{read_manifest, run_bundle};
use ntuple_harvester::plan::{MergeScript, write_bundle};
use tempfile::TempDir;

fn script(dataset: &str, commands: &[&str]) -> MergeScript {
    MergeScript {
        dataset: dataset.into(),
        destination: format!("/m/{dataset}/{dataset}.root"),
        commands: commands.iter().map(|c| (*c).to_string()).collect(),
    }
}

#[test]
fn manifest_round_trip() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    write_bundle(
        dir.path(),
        &[script("sample2", &["true"]), script("sample10", &["true"])],
    )?;
    assert_eq!(read_manifest(dir.path())?, vec!["sample2", "sample10"]);
    Ok(())
}

#[test]
fn every_script_runs_and_reports_its_exit_state() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let out = dir.path().join("touched.txt");
    let touch = format!("echo done > {}", out.display());
    write_bundle(
        dir.path(),
        &[script("good", &[touch.as_str()]), script("bad", &["exit 1"])],
    )?;

    let mut outcomes = run_bundle(dir.path(), 2)?;
    outcomes.sort_by(|a, b| a.dataset.cmp(&b.dataset));

    assert_eq!(outcomes.len(), 2);
    assert!(!outcomes[0].success, "bad script must report failure");
    assert!(outcomes[1].success, "good script must report success");
    assert!(out.exists(), "good script must actually have run");
    Ok(())
}

#[test]
fn missing_script_is_a_per_dataset_failure_not_fatal() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    write_bundle(dir.path(), &[script("present", &["true"])])?;
    // Hand-extend the manifest with a dataset that has no script.
    std::fs::write(
        dir.path().join("arguments.txt"),
        "present\nabsent\n",
    )?;

    let mut outcomes = run_bundle(dir.path(), 1)?;
    outcomes.sort_by(|a, b| a.dataset.cmp(&b.dataset));

    assert!(!outcomes[0].success); // absent
    assert!(outcomes[1].success); // present
    Ok(())
}
