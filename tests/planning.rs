//! Merge script rendering and bundle round trips.

use flate2::read::GzDecoder;
use ntuple_harvester::backend::{InputMode, OutputMode};
use ntuple_harvester::group::{DatasetGroups, FileKind, collect_groups};
use ntuple_harvester::plan::{MANIFEST_NAME, MergeScript, PlanConfig, plan_all, plan_dataset, write_bundle};
use ntuple_harvester::storage::FakeStorage;
use ntuple_harvester::testing::sample_tree;
use regex::Regex;
use std::fs::{self, File};
use std::io::Read;
use tempfile::TempDir;

fn config(output: OutputMode) -> PlanConfig {
    PlanConfig {
        output,
        output_root: "/store/user".into(),
        target_dir: "merged_v1".into(),
    }
}

fn sources() -> Vec<String> {
    vec!["/jobs/sampleX/a.root".into(), "/jobs/sampleX/b.root".into()]
}

#[test]
fn local_mode_merges_in_place() -> anyhow::Result<()> {
    let backend = FakeStorage::new();
    let script = plan_dataset(&config(OutputMode::Local), &backend, "sampleX", &sources())?;

    assert_eq!(
        script.commands,
        vec![
            "hadd -f /store/user/merged_v1/sampleX/sampleX.root \
             /jobs/sampleX/a.root /jobs/sampleX/b.root"
                .to_string()
        ]
    );
    assert_eq!(
        backend.created_directories(),
        vec!["/store/user/merged_v1/sampleX".to_string()]
    );
    Ok(())
}

#[test]
fn dcap_mode_writes_through_dcap_and_controls_through_srm() -> anyhow::Result<()> {
    let backend = FakeStorage::new();
    let output = OutputMode::DcapDirect {
        write: "gsidcap://dcap.example.org".into(),
        control: "srm://srm.example.org:8443/srm/managerv2?SFN=".into(),
    };
    let script = plan_dataset(&config(output), &backend, "sampleX", &sources())?;

    assert_eq!(script.commands.len(), 1);
    assert!(
        script.commands[0]
            .starts_with("hadd -f gsidcap://dcap.example.org/store/user/merged_v1/sampleX/sampleX.root")
    );
    assert_eq!(
        backend.created_directories(),
        vec![
            "srm://srm.example.org:8443/srm/managerv2?SFN=/store/user/merged_v1/sampleX"
                .to_string()
        ]
    );
    Ok(())
}

#[test]
fn srm_relay_stages_locally_then_copies() -> anyhow::Result<()> {
    let backend = FakeStorage::new();
    let output = OutputMode::SrmRelay("srm://srm.example.org:8443/srm/managerv2?SFN=".into());
    let script = plan_dataset(&config(output), &backend, "sampleX", &sources())?;

    assert_eq!(
        script.commands,
        vec![
            "hadd -f sampleX.root /jobs/sampleX/a.root /jobs/sampleX/b.root".to_string(),
            "gfal-copy -f sampleX.root \
             srm://srm.example.org:8443/srm/managerv2?SFN=/store/user/merged_v1/sampleX/sampleX.root"
                .to_string(),
        ]
    );
    Ok(())
}

#[test]
fn xrootd_relay_uses_xrdcp() -> anyhow::Result<()> {
    let backend = FakeStorage::new();
    let output = OutputMode::XrootdRelay("root://xrd.example.org".into());
    let script = plan_dataset(&config(output), &backend, "sampleX", &sources())?;

    assert_eq!(script.commands[0], "hadd -f sampleX.root /jobs/sampleX/a.root /jobs/sampleX/b.root");
    assert_eq!(
        script.commands[1],
        "xrdcp -f sampleX.root root://xrd.example.org/store/user/merged_v1/sampleX/sampleX.root"
    );
    Ok(())
}

#[test]
fn two_roots_feed_one_merge_command() -> anyhow::Result<()> {
    let storage = FakeStorage::new();
    sample_tree(&storage, "/jobs_v1", &[("sampleX", &["out_1.root"])]);
    sample_tree(&storage, "/jobs_v2", &[("sampleX", &["out_2.root"])]);

    let groups = collect_groups(
        &storage,
        &InputMode::Local,
        &["/jobs_v1".into(), "/jobs_v2".into()],
        &Regex::new(".*")?,
        FileKind::Ntuple,
    )?;
    assert_eq!(groups["sampleX"].len(), 2);

    let scripts = plan_all(&config(OutputMode::Local), &storage, &groups)?;
    assert_eq!(scripts.len(), 1);
    assert!(scripts[0].commands[0].contains("/jobs_v1/sampleX/out_1.root"));
    assert!(scripts[0].commands[0].contains("/jobs_v2/sampleX/out_2.root"));
    Ok(())
}

#[test]
fn empty_groups_are_skipped() -> anyhow::Result<()> {
    let backend = FakeStorage::new();
    let mut groups = DatasetGroups::new();
    groups.insert("empty".into(), Vec::new());
    groups.insert("full".into(), sources());

    let scripts = plan_all(&config(OutputMode::Local), &backend, &groups)?;
    assert_eq!(scripts.len(), 1);
    assert_eq!(scripts[0].dataset, "full");
    Ok(())
}

#[test]
fn bundle_round_trip() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let scripts = vec![
        MergeScript {
            dataset: "sample10".into(),
            destination: "/m/sample10/sample10.root".into(),
            commands: vec!["hadd -f out.root a.root".into()],
        },
        MergeScript {
            dataset: "sample2".into(),
            destination: "/m/sample2/sample2.root".into(),
            commands: vec!["hadd -f out.root b.root".into(), "true".into()],
        },
    ];
    write_bundle(dir.path(), &scripts)?;

    // Manifest lists datasets in natural order.
    let manifest = fs::read_to_string(dir.path().join(MANIFEST_NAME))?;
    assert_eq!(manifest, "sample2\nsample10\n");

    // Decompressing a script yields its rendered text.
    let mut decoder = GzDecoder::new(File::open(dir.path().join("sample2.sh.gz"))?);
    let mut text = String::new();
    decoder.read_to_string(&mut text)?;
    assert_eq!(text, "hadd -f out.root b.root\ntrue\n");
    Ok(())
}
