//! Property tests over randomly generated histories.

use std::collections::BTreeSet;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use strata_core::{
    ActivityConfig, CancelToken, ChurnConfig, CoChangeConfig, CommitHistory, DepsConfig, DiffData,
    FileIndex, Hunk, IngestOptions, OwnershipConfig, RawCommit, RawFileChange,
};
use strata_pulse::activity::analyze_activity;
use strata_pulse::churn::analyze_churn;
use strata_pulse::cochange::{analyze_co_changes, analyze_co_changes_with};
use strata_pulse::deps::build_dependency_graph;
use strata_pulse::matrix::{DensePairCounts, SparsePairCounts};
use strata_pulse::ownership::analyze_ownership;

const BASE: i64 = 1_704_067_200;
const HOT: &str = "hot.rs";

#[derive(Debug, Clone)]
struct CommitPlan {
    files: BTreeSet<u8>,
    author: u8,
    offset: i64,
    added: u64,
    removed: u64,
    hunks: Vec<(u32, u32, u32, u32)>,
}

fn commit_plan() -> impl Strategy<Value = CommitPlan> {
    (
        prop::collection::btree_set(0u8..6, 1..5),
        0u8..4,
        0i64..30 * 86_400,
        0u64..50,
        0u64..50,
        prop::collection::vec((1u32..40, 0u32..6, 1u32..40, 1u32..4), 0..4),
    )
        .prop_map(|(files, author, offset, added, removed, hunks)| CommitPlan {
            files,
            author,
            offset,
            added,
            removed,
            // Hunks never shrink their range, so no counter is folded away.
            hunks: hunks
                .into_iter()
                .map(|(a, b, c, extra)| (a, b, c, b + extra))
                .collect(),
        })
}

fn build(plans: &[CommitPlan]) -> CommitHistory {
    let raw = plans.iter().enumerate().map(|(i, plan)| {
        let mut files: Vec<RawFileChange> = plan
            .files
            .iter()
            .map(|f| RawFileChange {
                path: format!("f{f}.rs"),
                lines_added: plan.added,
                lines_removed: plan.removed,
                ..RawFileChange::default()
            })
            .collect();
        if !plan.hunks.is_empty() {
            files.push(RawFileChange {
                path: HOT.into(),
                lines_added: plan.hunks.iter().map(|h| u64::from(h.3)).sum(),
                lines_removed: plan.hunks.iter().map(|h| u64::from(h.1)).sum(),
                diff: DiffData::Hunks(
                    plan.hunks
                        .iter()
                        .map(|&(a, b, c, d)| Hunk::new(a, b, c, d))
                        .collect(),
                ),
                ..RawFileChange::default()
            });
        }
        RawCommit {
            hash: Some(format!("h{i:04}")),
            author: format!("author{}", plan.author),
            timestamp: Utc.timestamp_opt(BASE + plan.offset, 0).single(),
            files,
            ..RawCommit::default()
        }
    });
    CommitHistory::ingest(raw, IngestOptions::default()).unwrap()
}

fn history() -> impl Strategy<Value = (Vec<CommitPlan>, CommitHistory)> {
    prop::collection::vec(commit_plan(), 0..25).prop_map(|plans| {
        let history = build(&plans);
        (plans, history)
    })
}

proptest! {
    #[test]
    fn correlations_stay_in_unit_interval((_, h) in history()) {
        let index = FileIndex::build(&h);
        let config = CoChangeConfig { min_co_occurrence: 1, min_correlation: 0.0, ..CoChangeConfig::default() };
        let matrix = analyze_co_changes(&h, &index, &config, &CancelToken::new()).unwrap();
        for pair in &matrix.pairs {
            prop_assert!((0.0..=1.0).contains(&pair.correlation));
            prop_assert!(pair.co_occurrence <= pair.changes_a.min(pair.changes_b));
            prop_assert!(pair.file_a < pair.file_b);
        }
    }

    #[test]
    fn pair_count_backends_agree((_, h) in history()) {
        let index = FileIndex::build(&h);
        let config = CoChangeConfig { min_co_occurrence: 1, ..CoChangeConfig::default() };
        let cancel = CancelToken::new();
        let dense = analyze_co_changes_with::<DensePairCounts>(&h, &index, &config, &cancel).unwrap();
        let sparse = analyze_co_changes_with::<SparsePairCounts>(&h, &index, &config, &cancel).unwrap();
        prop_assert_eq!(dense, sparse);
    }

    #[test]
    fn ownership_fractions_sum_to_one((_, h) in history()) {
        let index = FileIndex::build(&h);
        for path in index.paths() {
            let table = analyze_ownership(&h, &index, path, &OwnershipConfig::default(), &CancelToken::new()).unwrap();
            prop_assert!(table.total_commits > 0);
            prop_assert!((table.fraction_sum() - 1.0).abs() < 1e-9, "{} sums to {}", path, table.fraction_sum());
        }
    }

    #[test]
    fn histogram_counts_every_commit((_, h) in history(), offset in -12i32..=12) {
        let sign = if offset < 0 { '-' } else { '+' };
        let config = ActivityConfig {
            timezone: format!("{sign}{:02}:00", offset.abs()),
            ..ActivityConfig::default()
        };
        let activity = analyze_activity(&h, &config, &CancelToken::new()).unwrap();
        let cells: u32 = activity.cells.iter().flatten().sum();
        prop_assert_eq!(cells as usize, h.len());
        prop_assert_eq!(activity.total_commits as usize, h.len());
        prop_assert!((0.0..=1.0).contains(&activity.weekend_ratio));
        for burst in &activity.bursts {
            prop_assert!(burst.commit_count >= 2);
            prop_assert!(burst.start <= burst.end);
        }
    }

    #[test]
    fn churn_increments_match_hunk_coverage((plans, h) in history()) {
        let index = FileIndex::build(&h);
        let report = analyze_churn(&h, &index, HOT, &ChurnConfig::default(), &CancelToken::new()).unwrap();
        let covered: u64 = plans
            .iter()
            .flat_map(|s| s.hunks.iter())
            .map(|h| u64::from(h.3))
            .sum();
        prop_assert!(report.skipped.is_empty());
        prop_assert_eq!(report.line_touches, covered);
        // Every covered line gained exactly one, and none was folded away.
        let surviving: u64 = report.lines.iter().map(|l| u64::from(l.count)).sum();
        prop_assert_eq!(surviving, covered);
        for range in &report.hot_ranges {
            prop_assert!(range.peak >= report.hot_threshold);
        }
    }

    #[test]
    fn dependency_edges_are_well_formed((_, h) in history()) {
        let index = FileIndex::build(&h);
        let graph = build_dependency_graph(&h, &index, &DepsConfig::default(), &CancelToken::new()).unwrap();
        for edge in &graph.edges {
            prop_assert!(edge.similarity > 0.0 && edge.similarity <= 1.0);
            prop_assert!(edge.shared_files >= 1);
        }
        for node in &graph.nodes {
            prop_assert!(graph.edges_of(&node.hash).next().is_some());
        }
    }

    #[test]
    fn analyses_are_idempotent((_, h) in history()) {
        let index = FileIndex::build(&h);
        let cancel = CancelToken::new();
        let config = CoChangeConfig::default();
        prop_assert_eq!(
            analyze_co_changes(&h, &index, &config, &cancel).unwrap(),
            analyze_co_changes(&h, &index, &config, &cancel).unwrap()
        );
        prop_assert_eq!(
            build_dependency_graph(&h, &index, &DepsConfig::default(), &cancel).unwrap(),
            build_dependency_graph(&h, &index, &DepsConfig::default(), &cancel).unwrap()
        );
    }
}
