//! Commit dependency graph.
//!
//! Two commits depend on each other when they change overlapping sets of
//! files. Edge weight is the Jaccard similarity of the two file sets.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use strata_core::{
    Author, CancelToken, CommitHistory, DependencyWindow, DepsConfig, FileIndex, StrataError,
};

use crate::matrix::{PairCounts, SparsePairCounts};

/// A commit with at least one retained edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitNode {
    /// Full commit hash.
    pub hash: String,
    /// Commit author.
    pub author: Author,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
    /// Distinct files the commit changes.
    pub file_count: usize,
}

/// Similarity between two commits; `source` precedes `target` in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    /// Hash of the earlier commit.
    pub source: String,
    /// Hash of the later commit.
    pub target: String,
    /// Files changed by both commits.
    pub shared_files: u32,
    /// Jaccard similarity in `[0, 1]`.
    pub similarity: f64,
}

/// Commit nodes and weighted similarity edges.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    /// Ego-graph center, when one was requested.
    pub target: Option<String>,
    /// Commits eligible under the window.
    pub commits_considered: usize,
    /// Nodes in history order.
    pub nodes: Vec<CommitNode>,
    /// Edges by similarity, highest first.
    pub edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    /// Look up a node by full hash.
    pub fn node(&self, hash: &str) -> Option<&CommitNode> {
        self.nodes.iter().find(|n| n.hash == hash)
    }

    /// Edges incident to `hash`.
    pub fn edges_of<'a>(&'a self, hash: &'a str) -> impl Iterator<Item = &'a DependencyEdge> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.source == hash || e.target == hash)
    }

    /// Whether no edge was retained.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Jaccard similarity of two sets given their sizes and overlap.
///
/// # Examples
///
/// ```
/// use strata_pulse::deps::jaccard;
///
/// assert_eq!(jaccard(2, 3, 2), 2.0 / 3.0);
/// assert_eq!(jaccard(0, 0, 0), 0.0);
/// ```
pub fn jaccard(size_a: usize, size_b: usize, shared: usize) -> f64 {
    let union = size_a + size_b - shared;
    if union == 0 {
        0.0
    } else {
        shared as f64 / union as f64
    }
}

/// Build the commit dependency graph.
///
/// Pairs are enumerated through the per-file commit lists of `index`, so
/// commits sharing no file are never compared. With
/// [`DepsConfig::target`] set, only the ego-graph around that commit is
/// returned: edges touching it at depth 1, or every edge among commits
/// within `depth` hops otherwise. The target stays eligible even when the
/// window excludes it.
///
/// # Errors
///
/// Returns [`StrataError::TargetNotFound`] if the target hash is not in the
/// history, [`StrataError::Config`] for invalid settings, and
/// [`StrataError::Cancelled`] if `cancel` fires.
///
/// # Examples
///
/// ```
/// use strata_core::{CancelToken, CommitHistory, DepsConfig, FileIndex, IngestOptions};
/// use strata_pulse::deps::build_dependency_graph;
///
/// let json = r#"[
///     {"hash": "c1", "timestamp": "2024-01-01T00:00:00Z", "files": [{"path": "a"}, {"path": "b"}]},
///     {"hash": "c2", "timestamp": "2024-01-02T00:00:00Z", "files": [{"path": "a"}]},
///     {"hash": "c3", "timestamp": "2024-01-03T00:00:00Z", "files": [{"path": "z"}]}
/// ]"#;
/// let history = CommitHistory::from_json(json, IngestOptions::default()).unwrap();
/// let index = FileIndex::build(&history);
/// let graph = build_dependency_graph(&history, &index, &DepsConfig::default(), &CancelToken::new()).unwrap();
/// assert_eq!(graph.edges.len(), 1);
/// assert_eq!(graph.edges[0].similarity, 0.5);
/// assert!(graph.node("c3").is_none());
/// ```
pub fn build_dependency_graph(
    history: &CommitHistory,
    index: &FileIndex,
    config: &DepsConfig,
    cancel: &CancelToken,
) -> Result<DependencyGraph, StrataError> {
    config.validate()?;

    let target = config
        .target
        .as_deref()
        .map(|hash| {
            history
                .position(hash)
                .ok_or_else(|| StrataError::TargetNotFound(hash.to_string()))
        })
        .transpose()?;

    let eligible = eligible_commits(history, config.window.as_ref(), target);
    let commits_considered = eligible.iter().filter(|&&e| e).count();

    let mut shared = SparsePairCounts::with_size(history.len());
    for (_, positions) in index.entries() {
        cancel.check()?;
        let touching: Vec<usize> = positions.iter().copied().filter(|&i| eligible[i]).collect();
        for (i, &a) in touching.iter().enumerate() {
            for &b in &touching[i + 1..] {
                shared.increment(a, b);
            }
        }
    }

    let mut graph: UnGraph<usize, (u32, f64)> = UnGraph::new_undirected();
    let mut node_of: HashMap<usize, NodeIndex> = HashMap::new();
    for (a, b, count) in shared.nonzero() {
        let similarity = jaccard(
            index.files_of(a).len(),
            index.files_of(b).len(),
            count as usize,
        );
        if similarity < config.min_overlap {
            continue;
        }
        let na = *node_of.entry(a).or_insert_with(|| graph.add_node(a));
        let nb = *node_of.entry(b).or_insert_with(|| graph.add_node(b));
        graph.add_edge(na, nb, (count, similarity));
    }

    let within = match target {
        Some(position) => match node_of.get(&position) {
            Some(&center) => Some((center, hop_distances(&graph, center, config.depth))),
            None => Some((NodeIndex::end(), HashMap::new())),
        },
        None => None,
    };

    let mut kept: Vec<(usize, usize, u32, f64)> = Vec::new();
    for edge in graph.edge_references() {
        let (u, v) = (edge.source(), edge.target());
        let keep = match &within {
            None => true,
            Some((center, _)) if config.depth == 1 => u == *center || v == *center,
            Some((_, distances)) => distances.contains_key(&u) && distances.contains_key(&v),
        };
        if keep {
            let (a, b) = (graph[u].min(graph[v]), graph[u].max(graph[v]));
            let (count, similarity) = *edge.weight();
            kept.push((a, b, count, similarity));
        }
    }
    kept.sort_by(|x, y| {
        y.3.total_cmp(&x.3)
            .then_with(|| (x.0, x.1).cmp(&(y.0, y.1)))
    });

    let mut members: Vec<usize> = kept.iter().flat_map(|e| [e.0, e.1]).collect();
    members.sort_unstable();
    members.dedup();

    let commits = history.commits();
    let nodes = members
        .iter()
        .map(|&i| CommitNode {
            hash: commits[i].hash.clone(),
            author: commits[i].author.clone(),
            timestamp: commits[i].timestamp,
            file_count: index.files_of(i).len(),
        })
        .collect();
    let edges: Vec<DependencyEdge> = kept
        .into_iter()
        .map(|(a, b, count, similarity)| DependencyEdge {
            source: commits[a].hash.clone(),
            target: commits[b].hash.clone(),
            shared_files: count,
            similarity,
        })
        .collect();

    tracing::debug!(
        considered = commits_considered,
        edges = edges.len(),
        target = ?config.target,
        "dependency graph built"
    );

    Ok(DependencyGraph {
        target: target.map(|i| commits[i].hash.clone()),
        commits_considered,
        nodes,
        edges,
    })
}

fn eligible_commits(
    history: &CommitHistory,
    window: Option<&DependencyWindow>,
    target: Option<usize>,
) -> Vec<bool> {
    let len = history.len();
    let mut eligible: Vec<bool> = match window {
        None => vec![true; len],
        Some(DependencyWindow::LastCommits(n)) => {
            let first = len.saturating_sub(*n);
            (0..len).map(|i| i >= first).collect()
        }
        Some(DependencyWindow::Since(since)) => history
            .commits()
            .iter()
            .map(|c| c.timestamp >= *since)
            .collect(),
    };
    if let Some(position) = target {
        eligible[position] = true;
    }
    eligible
}

/// Breadth-first hop counts from `center`, limited to `depth`.
fn hop_distances(
    graph: &UnGraph<usize, (u32, f64)>,
    center: NodeIndex,
    depth: usize,
) -> HashMap<NodeIndex, usize> {
    let mut distances = HashMap::from([(center, 0)]);
    let mut queue = VecDeque::from([center]);
    while let Some(node) = queue.pop_front() {
        let hops = distances[&node];
        if hops == depth {
            continue;
        }
        for next in graph.neighbors(node) {
            if !distances.contains_key(&next) {
                distances.insert(next, hops + 1);
                queue.push_back(next);
            }
        }
    }
    distances
}
