//! End-to-end tests for the evaluation engine.

mod common;

use common::{read_json, touch_future, Fixture, REFERENCES};
use dialeval_core::{
    keys, requires, Metric, MetricError, MetricResult, Requirement, Resources, RunConfig,
};
use dialeval_metrics::{default_registry, Bleu, DistinctN};
use dialeval_runner::{
    parse_config, Engine, EngineConfig, Exporter, Interrupt, Layout, Plan, RunSummary,
    ScoreStore, UnitOutcome,
};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const RESPONSES: &str = "i am good\nmy name is alice\ni live in paris\n";

fn bleu(n: usize) -> Arc<dyn Metric> {
    Arc::new(Bleu::new(n, true))
}

fn distinct(n: usize) -> Arc<dyn Metric> {
    Arc::new(DistinctN::new(n))
}

fn run(plan: Plan, out: &Path, config: EngineConfig) -> RunSummary {
    Engine::new(plan, Exporter::new(out), config).run().unwrap()
}

/// Raises the interrupt from inside `compute`, as a Ctrl+C would.
#[derive(Debug)]
struct RaisesInterrupt {
    interrupt: Interrupt,
}

impl Metric for RaisesInterrupt {
    fn name(&self) -> &str {
        "raiser"
    }

    fn requires(&self) -> Vec<Requirement> {
        requires(&[keys::RESPONSES])
    }

    fn compute(&self, resources: &Resources) -> Result<MetricResult, MetricError> {
        let responses = resources.token_lists(keys::RESPONSES)?;
        self.interrupt.raise();
        Ok(MetricResult::from_values(
            responses.iter().map(|r| r.len() as f64),
        ))
    }
}

#[test]
fn test_bleu_end_to_end_from_config() {
    let dir = TempDir::new().unwrap();
    let fixture = Fixture::new(dir.path());
    let model = fixture.model("m", REFERENCES);

    let config: RunConfig = serde_json::from_value(json!({
        "models": [model],
        "datasets": {"d": {
            "context": fixture.root.join("data/contexts.txt"),
            "reference": fixture.root.join("data/references.txt"),
        }},
        "metrics": {"bleu": {"n": [1, 2], "smoothing": true}}
    }))
    .unwrap();
    let plan = parse_config(&config, &default_registry()).unwrap();

    let out = fixture.out_dir();
    let summary = run(plan, &out, EngineConfig::default());
    assert_eq!(summary.written, 2);
    assert!(summary.is_complete());

    for (n, metric) in [(1, "bleu_1"), (2, "bleu_2")] {
        let record = read_json(&out.join(format!("m-d-{}.json", metric)));
        assert_eq!(record["metric"], json!(metric), "n = {}", n);
        assert_eq!(record["model"], json!("m"));
        assert_eq!(record["dataset"], json!("d"));
        assert_eq!(record["utterance"].as_array().unwrap().len(), 3);
        let system = record["system"].as_f64().unwrap();
        assert!((system - 1.0).abs() < 1e-9, "identical responses score {}", system);
    }

    let manifest = read_json(&out.join("config.json"));
    assert_eq!(manifest["units"], json!(["m-d-bleu_1", "m-d-bleu_2"]));
}

#[test]
fn test_second_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let fixture = Fixture::new(dir.path());
    let model = fixture.model("m", RESPONSES);
    let plan = Plan::from_parts(
        vec![bleu(1), bleu(2), distinct(1)],
        vec![model],
        vec![fixture.dataset()],
    )
    .unwrap();

    let first = run(plan.clone(), &fixture.out_dir(), EngineConfig::default());
    assert_eq!(first.written, 3);

    let second = run(plan, &fixture.out_dir(), EngineConfig::default());
    assert_eq!(second.written, 0);
    assert_eq!(second.up_to_date, 3);
}

#[test]
fn test_touched_input_rewrites_only_its_units() {
    let dir = TempDir::new().unwrap();
    let fixture = Fixture::new(dir.path());
    let models = vec![fixture.model("a", RESPONSES), fixture.model("b", RESPONSES)];
    let plan = Plan::from_parts(vec![bleu(1)], models, vec![fixture.dataset()]).unwrap();
    run(plan.clone(), &fixture.out_dir(), EngineConfig::default());

    touch_future(&fixture.responses_path("a"), 60);
    let summary = run(plan.clone(), &fixture.out_dir(), EngineConfig::default());
    assert!(matches!(
        summary.outcome("a-d-bleu_1"),
        Some(UnitOutcome::Written { .. })
    ));
    assert_eq!(summary.outcome("b-d-bleu_1"), Some(&UnitOutcome::UpToDate));

    // Forcing recomputes everything regardless of timestamps
    let forced = run(plan, &fixture.out_dir(), EngineConfig::default().with_force(true));
    assert_eq!(forced.written, 2);
}

#[test]
fn test_shared_resources_loaded_once() {
    let dir = TempDir::new().unwrap();
    let fixture = Fixture::new(dir.path());
    let plan = Plan::from_parts(
        vec![bleu(1), bleu(2), distinct(1)],
        vec![fixture.model("m", RESPONSES)],
        vec![fixture.dataset()],
    )
    .unwrap();

    let mut engine = Engine::new(plan, Exporter::new(fixture.out_dir()), EngineConfig::default());
    engine.run().unwrap();

    let stats = engine.cache_stats();
    assert_eq!(stats.misses, 2, "responses and references each load once");
    assert_eq!(stats.hits, 3);
    assert_eq!(stats.entries, 2);
}

#[test]
fn test_unavailable_resource_skips_unit() {
    let dir = TempDir::new().unwrap();
    let fixture = Fixture::new(dir.path());
    let plan = Plan::from_parts(
        vec![bleu(1)],
        vec![fixture.missing_model("ghost"), fixture.model("m", RESPONSES)],
        vec![fixture.dataset()],
    )
    .unwrap();

    let out = fixture.out_dir();
    let summary = run(plan, &out, EngineConfig::default());
    assert_eq!(
        summary.outcome("ghost-d-bleu_1"),
        Some(&UnitOutcome::ResourcesUnavailable)
    );
    assert_eq!(summary.skipped, 1);
    assert!(!out.join("ghost-d-bleu_1.json").exists());
    assert!(out.join("m-d-bleu_1.json").exists());
}

#[test]
fn test_metric_failure_is_contained() {
    let dir = TempDir::new().unwrap();
    let fixture = Fixture::new(dir.path());
    // Two responses against three references
    let short = fixture.model("short", "one\ntwo\n");
    let plan = Plan::from_parts(
        vec![bleu(1), distinct(1)],
        vec![short, fixture.model("m", RESPONSES)],
        vec![fixture.dataset()],
    )
    .unwrap();

    let out = fixture.out_dir();
    let summary = run(plan, &out, EngineConfig::default());
    match summary.outcome("short-d-bleu_1") {
        Some(UnitOutcome::Failed { error }) => assert!(error.contains("2 responses")),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.written, 3);
    assert!(!out.join("short-d-bleu_1.json").exists());
    assert!(out.join("short-d-distinct_1.json").exists());
}

#[test]
fn test_interrupt_discards_only_current_unit() {
    let dir = TempDir::new().unwrap();
    let fixture = Fixture::new(dir.path());
    let interrupt = Interrupt::new();
    let raiser: Arc<dyn Metric> = Arc::new(RaisesInterrupt {
        interrupt: interrupt.clone(),
    });
    let plan = Plan::from_parts(
        vec![bleu(1), raiser, distinct(1)],
        vec![fixture.model("m", RESPONSES)],
        vec![fixture.dataset()],
    )
    .unwrap();

    let out = fixture.out_dir();
    let mut engine = Engine::new(plan, Exporter::new(&out), EngineConfig::default())
        .with_interrupt(interrupt.clone());
    let summary = engine.run().unwrap();

    assert_eq!(summary.outcome("m-d-raiser"), Some(&UnitOutcome::Interrupted));
    assert_eq!(summary.interrupted, 1);
    assert_eq!(summary.written, 2);
    assert!(!out.join("m-d-raiser.json").exists());
    assert!(out.join("m-d-distinct_1.json").exists());
    assert_eq!(interrupt.pending(), 0);
}

#[test]
fn test_interrupt_in_pool_discards_group() {
    let dir = TempDir::new().unwrap();
    let fixture = Fixture::new(dir.path());
    let interrupt = Interrupt::new();
    let raiser: Arc<dyn Metric> = Arc::new(RaisesInterrupt {
        interrupt: interrupt.clone(),
    });
    let plan = Plan::from_parts(
        vec![raiser, bleu(1), bleu(2)],
        vec![fixture.model("m", RESPONSES)],
        vec![fixture.dataset()],
    )
    .unwrap();

    let mut engine = Engine::new(
        plan,
        Exporter::new(fixture.out_dir()),
        EngineConfig::default().with_workers(2),
    )
    .with_interrupt(interrupt);
    let summary = engine.run().unwrap();

    assert_eq!(summary.outcome("m-d-raiser"), Some(&UnitOutcome::Interrupted));
    assert_eq!(summary.written, 2);
}

#[test]
fn test_pool_matches_sequential() {
    let dir = TempDir::new().unwrap();
    let fixture = Fixture::new(dir.path());
    let plan = Plan::from_parts(
        vec![bleu(1), bleu(2), distinct(1), distinct(2)],
        vec![fixture.model("a", RESPONSES), fixture.model("b", REFERENCES)],
        vec![fixture.dataset()],
    )
    .unwrap();

    let sequential_dir = dir.path().join("sequential");
    let pooled_dir = dir.path().join("pooled");
    let sequential = run(plan.clone(), &sequential_dir, EngineConfig::default());
    let pooled = run(plan, &pooled_dir, EngineConfig::default().with_workers(4));

    assert_eq!(sequential.written, 8);
    assert_eq!(pooled.written, 8);

    // Pooled runs report group by group, in unit order within each group
    let order: Vec<_> = pooled.units.iter().map(|u| u.prefix.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "a-d-bleu_1",
            "a-d-bleu_2",
            "b-d-bleu_1",
            "b-d-bleu_2",
            "a-d-distinct_1",
            "a-d-distinct_2",
            "b-d-distinct_1",
            "b-d-distinct_2",
        ]
    );

    for report in &sequential.units {
        let file = format!("{}.json", report.prefix);
        assert_eq!(
            read_json(&sequential_dir.join(&file)),
            read_json(&pooled_dir.join(&file)),
            "{}",
            report.prefix
        );
    }
}

#[test]
fn test_nested_layout_reads_back() {
    let dir = TempDir::new().unwrap();
    let fixture = Fixture::new(dir.path());
    let plan = Plan::from_parts(
        vec![bleu(1), distinct(1)],
        vec![fixture.model("m", RESPONSES)],
        vec![fixture.dataset()],
    )
    .unwrap();

    let out = fixture.out_dir();
    let exporter = Exporter::new(&out).with_layout(Layout::Nested);
    Engine::new(plan, exporter, EngineConfig::default())
        .run()
        .unwrap();
    assert!(out.join("bleu_1/m/d/m-d-bleu_1.json").exists());

    let store = ScoreStore::open(&out).unwrap();
    assert_eq!(store.len(), 2);
    let table = store.summary();
    assert_eq!(table.columns, vec!["bleu_1", "distinct_1"]);
    assert_eq!(table.rows.len(), 1);
    assert!(fs::read_dir(&out).unwrap().count() >= 3);
}
