//! End-to-end runs over a small hand-built history: ingest JSON, index, and
//! analyze.

use pretty_assertions::assert_eq;
use strata_core::{
    ActivityConfig, CancelToken, CoChangeConfig, CommitHistory, FileIndex, IngestOptions,
    InputOrder, StrataConfig,
};
use strata_pulse::activity::analyze_activity;
use strata_pulse::cochange::analyze_co_changes;
use strata_pulse::report::analyze_all;

/// C1 changes {a, b}; C2 an hour later {a, b, c}; C3 a day later {c}.
const HISTORY: &str = r#"[
    {"hash": "c1", "author": "alice", "timestamp": "2024-03-04T09:00:00Z",
     "files": [{"path": "a", "linesAdded": 10}, {"path": "b", "linesAdded": 4}]},
    {"hash": "c2", "author": "bob", "timestamp": "2024-03-04T10:00:00Z",
     "files": [{"path": "a", "linesAdded": 2, "linesRemoved": 1},
               {"path": "b", "linesAdded": 1},
               {"path": "c", "linesAdded": 7}]},
    {"hash": "c3", "author": "alice", "timestamp": "2024-03-05T10:00:00Z",
     "files": [{"path": "c", "linesAdded": 3, "linesRemoved": 3}]}
]"#;

fn load() -> (CommitHistory, FileIndex) {
    let history = CommitHistory::from_json(HISTORY, IngestOptions::default()).unwrap();
    let index = FileIndex::build(&history);
    (history, index)
}

fn pair_summary(history: &CommitHistory, index: &FileIndex, config: &CoChangeConfig) -> Vec<(String, String, u32, f64)> {
    analyze_co_changes(history, index, config, &CancelToken::new())
        .unwrap()
        .pairs
        .into_iter()
        .map(|p| (p.file_a, p.file_b, p.co_occurrence, p.correlation))
        .collect()
}

#[test]
fn co_change_pairs_with_single_co_occurrences_admitted() {
    let (history, index) = load();
    let config = CoChangeConfig {
        min_co_occurrence: 1,
        ..CoChangeConfig::default()
    };
    assert_eq!(
        pair_summary(&history, &index, &config),
        vec![
            ("a".to_string(), "b".to_string(), 2, 1.0),
            ("a".to_string(), "c".to_string(), 1, 0.5),
            ("b".to_string(), "c".to_string(), 1, 0.5),
        ]
    );
}

#[test]
fn default_co_occurrence_floor_keeps_only_repeated_pairs() {
    let (history, index) = load();
    assert_eq!(
        pair_summary(&history, &index, &CoChangeConfig::default()),
        vec![("a".to_string(), "b".to_string(), 2, 1.0)]
    );
}

#[test]
fn one_burst_when_window_covers_an_hour() {
    let (history, _) = load();
    let config = ActivityConfig {
        burst_window_minutes: 60,
        ..ActivityConfig::default()
    };
    let activity = analyze_activity(&history, &config, &CancelToken::new()).unwrap();
    assert_eq!(activity.bursts.len(), 1);
    assert_eq!(activity.bursts[0].commit_count, 2);
    assert_eq!(activity.bursts[0].hashes, vec!["c1", "c2"]);

    let narrow = analyze_activity(&history, &ActivityConfig::default(), &CancelToken::new()).unwrap();
    assert!(narrow.bursts.is_empty());
}

#[test]
fn newest_first_input_gives_same_results() {
    let (history, index) = load();
    let raw: Vec<serde_json::Value> = serde_json::from_str(HISTORY).unwrap();
    let reversed = serde_json::to_string(&raw.into_iter().rev().collect::<Vec<_>>()).unwrap();
    let newest_first = CommitHistory::from_json(
        &reversed,
        IngestOptions {
            order: InputOrder::NewestFirst,
            ..IngestOptions::default()
        },
    )
    .unwrap();
    let newest_index = FileIndex::build(&newest_first);

    let config = CoChangeConfig {
        min_co_occurrence: 1,
        ..CoChangeConfig::default()
    };
    assert_eq!(
        pair_summary(&history, &index, &config),
        pair_summary(&newest_first, &newest_index, &config)
    );
}

#[test]
fn full_report_serializes_with_camel_case_fields() {
    let (history, index) = load();
    let config = StrataConfig::from_toml(
        r#"
[cochange]
min_co_occurrence = 1

[activity]
burst_window_minutes = 60
"#,
    )
    .unwrap();
    let report = analyze_all(&history, &index, &config, &["c"], &CancelToken::new()).unwrap();

    assert_eq!(report.co_changes.pairs.len(), 3);
    assert_eq!(report.activity.bursts.len(), 1);
    assert_eq!(report.file_reports[0].churn.commits, 2);

    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("coChanges").is_some());
    assert!(json["activity"].get("weekendRatio").is_some());
    assert_eq!(json["fileReports"][0]["churn"]["linesAdded"], 10);
}

#[test]
fn identical_input_gives_identical_output() {
    let (history, index) = load();
    let config = StrataConfig::default();
    let first = analyze_all(&history, &index, &config, &["a", "c"], &CancelToken::new()).unwrap();
    let second = analyze_all(&history, &index, &config, &["a", "c"], &CancelToken::new()).unwrap();
    assert_eq!(first, second);
}
