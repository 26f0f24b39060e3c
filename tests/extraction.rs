//! Per-dataset extraction over fake sources, and record store round trips.

use ntuple_harvester::backend::InputMode;
use ntuple_harvester::expect::{DatasetDatabase, DatasetInfo, PipelineCounts};
use ntuple_harvester::extract::{
    ExecMode, ExtractionContext, FriendRoot, extract_all, extract_dataset, load_records,
    save_records,
};
use ntuple_harvester::ntuple::{BOOKKEEPING_HISTOGRAM, EVENT_TABLE, FakeNtuple, FakeNtupleSource};
use ntuple_harvester::storage::FakeStorage;
use ntuple_harvester::testing::sample_tree;
use std::collections::BTreeMap;
use tempfile::TempDir;

fn database(entries: &[(&str, f64)]) -> DatasetDatabase {
    DatasetDatabase::from_entries(
        entries
            .iter()
            .map(|(name, n)| {
                ((*name).to_string(), DatasetInfo { generated_events: *n })
            })
            .collect(),
    )
}

struct Fixture {
    source: FakeNtupleSource,
    storage: FakeStorage,
    input: InputMode,
    database: DatasetDatabase,
    counts: PipelineCounts,
    friend_roots: Vec<FriendRoot>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            source: FakeNtupleSource::new(),
            storage: FakeStorage::new(),
            input: InputMode::Local,
            database: database(&[("sampleA", 1000.0)]),
            counts: PipelineCounts::new([(".*", 2)]).unwrap(),
            friend_roots: Vec::new(),
        }
    }

    fn ctx(&self) -> ExtractionContext<'_> {
        ExtractionContext {
            source: &self.source,
            lister: &self.storage,
            input: &self.input,
            friend_roots: &self.friend_roots,
            database: &self.database,
            pipeline_counts: &self.counts,
        }
    }
}

#[test]
fn reads_pipelines_sorted_with_counts_and_expectations() {
    let fx = Fixture::new();
    fx.source.add_file(
        "/merged/sampleA/sampleA.root",
        FakeNtuple::new()
            .with_pipeline("shift", 1100.0, 1100)
            .with_pipeline("nominal", 999.9, 1000),
    );

    let record = extract_dataset(&fx.ctx(), "sampleA", "/merged/sampleA/sampleA.root").unwrap();
    assert_eq!(record.pipelines, vec!["nominal", "shift"]);
    assert_eq!(record.weighted_counts["nominal"], 999.9);
    assert_eq!(record.tree_rows["shift"], 1100);
    assert_eq!(record.expected_events, 1000.0);
    assert_eq!(record.expected_pipelines, 2);
}

#[test]
fn unknown_dataset_gets_sentinel_expectations() {
    let fx = Fixture::new();
    fx.source
        .add_file("/merged/other/other.root", FakeNtuple::new().with_pipeline("p", 1.0, 1));

    let record = extract_dataset(&fx.ctx(), "other", "/merged/other/other.root").unwrap();
    assert_eq!(record.expected_events, -1.0);
}

#[test]
fn absent_histogram_and_table_read_as_zero() {
    let fx = Fixture::new();
    fx.source.add_file(
        "/merged/sampleA/sampleA.root",
        FakeNtuple::new().with_grouping("bare"),
    );

    let record = extract_dataset(&fx.ctx(), "sampleA", "/merged/sampleA/sampleA.root").unwrap();
    assert_eq!(record.weighted_counts["bare"], 0.0);
    assert_eq!(record.tree_rows["bare"], 0);
}

#[test]
fn open_failure_and_recovered_files_yield_no_record() {
    let fx = Fixture::new();
    fx.source
        .add_file("/merged/bad/bad.root", FakeNtuple::recovered());

    assert!(extract_dataset(&fx.ctx(), "bad", "/merged/bad/bad.root").is_none());
    assert!(extract_dataset(&fx.ctx(), "gone", "/merged/gone/gone.root").is_none());
}

#[test]
fn friend_counts_follow_the_primary_pipelines() {
    let mut fx = Fixture::new();
    fx.friend_roots = vec![FriendRoot::from_path("/friends/FakeFactors/")];
    assert_eq!(fx.friend_roots[0].label, "FakeFactors");

    fx.source.add_file(
        "/merged/sampleA/sampleA.root",
        FakeNtuple::new()
            .with_pipeline("nominal", 1000.0, 1000)
            .with_pipeline("shift", 1000.0, 1000),
    );
    sample_tree(
        &fx.storage,
        "/friends/FakeFactors",
        &[("sampleA", &["sampleA.root"])],
    );
    // The friend only carries the nominal pipeline.
    fx.source.add_file(
        "/friends/FakeFactors/sampleA/sampleA.root",
        FakeNtuple::new()
            .with_grouping("nominal")
            .with_rows("nominal", EVENT_TABLE, 1000),
    );

    let record = extract_dataset(&fx.ctx(), "sampleA", "/merged/sampleA/sampleA.root").unwrap();
    let friend = &record.friends["FakeFactors"];
    assert_eq!(friend["nominal"], 1000);
    assert_eq!(friend["shift"], 0);
}

#[test]
fn unmatched_friend_root_records_zero_for_every_pipeline() {
    let mut fx = Fixture::new();
    fx.friend_roots = vec![FriendRoot::from_path("/friends/SVFit")];
    fx.source.add_file(
        "/merged/sampleA/sampleA.root",
        FakeNtuple::new().with_pipeline("nominal", 1000.0, 1000),
    );
    // No /friends/SVFit/sampleA directory exists at all.

    let record = extract_dataset(&fx.ctx(), "sampleA", "/merged/sampleA/sampleA.root").unwrap();
    assert_eq!(record.friends["SVFit"]["nominal"], 0);
}

#[test]
fn several_friend_files_resolve_to_the_last_in_natural_order() {
    let mut fx = Fixture::new();
    fx.friend_roots = vec![FriendRoot::from_path("/friends/SVFit")];
    fx.source.add_file(
        "/merged/sampleA/sampleA.root",
        FakeNtuple::new().with_pipeline("nominal", 1000.0, 1000),
    );
    sample_tree(
        &fx.storage,
        "/friends/SVFit",
        &[("sampleA", &["part10.root", "part2.root"])],
    );
    fx.source.add_file(
        "/friends/SVFit/sampleA/part2.root",
        FakeNtuple::new()
            .with_grouping("nominal")
            .with_rows("nominal", EVENT_TABLE, 2),
    );
    fx.source.add_file(
        "/friends/SVFit/sampleA/part10.root",
        FakeNtuple::new()
            .with_grouping("nominal")
            .with_rows("nominal", EVENT_TABLE, 10),
    );

    let record = extract_dataset(&fx.ctx(), "sampleA", "/merged/sampleA/sampleA.root").unwrap();
    assert_eq!(record.friends["SVFit"]["nominal"], 10);
}

#[test]
fn extract_all_carries_unresolved_datasets_as_none() -> anyhow::Result<()> {
    let fx = Fixture::new();
    fx.source.add_file(
        "/merged/sampleA/sampleA.root",
        FakeNtuple::new()
            .with_scalar("nominal", BOOKKEEPING_HISTOGRAM, 1000.0)
            .with_grouping("nominal"),
    );

    let mut sources: BTreeMap<String, Option<String>> = BTreeMap::new();
    sources.insert("sampleA".into(), Some("/merged/sampleA/sampleA.root".into()));
    sources.insert("missing".into(), None);

    let store = extract_all(&fx.ctx(), &sources, ExecMode::Parallel { workers: Some(2) })?;
    assert!(store["sampleA"].is_some());
    assert!(store["missing"].is_none());
    Ok(())
}

#[test]
fn record_store_round_trip_preserves_none_markers() -> anyhow::Result<()> {
    let fx = Fixture::new();
    fx.source.add_file(
        "/merged/sampleA/sampleA.root",
        FakeNtuple::new().with_pipeline("nominal", 999.9, 1000),
    );

    let mut sources: BTreeMap<String, Option<String>> = BTreeMap::new();
    sources.insert("sampleA".into(), Some("/merged/sampleA/sampleA.root".into()));
    sources.insert("missing".into(), None);
    let store = extract_all(&fx.ctx(), &sources, ExecMode::Sequential)?;

    let dir = TempDir::new()?;
    let path = dir.path().join("check_results.json");
    save_records(&path, &store)?;
    let loaded = load_records(&path)?;
    assert_eq!(loaded, store);
    Ok(())
}
