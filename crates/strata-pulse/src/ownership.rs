//! Recency-weighted ownership and knowledge silo analysis.
//!
//! Attributes every change of a file to its author, decayed by age with a
//! configurable half-life, and derives ownership fractions, per-author
//! expertise, and the project bus factor.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_core::{
    normalize_path, Author, CancelToken, CommitHistory, FileIndex, OwnershipConfig, StrataError,
};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Ownership level of an author on a file.
///
/// # Examples
///
/// ```
/// use strata_pulse::ownership::OwnershipClass;
///
/// assert_eq!(OwnershipClass::from_fraction(0.5), OwnershipClass::Primary);
/// assert_eq!(OwnershipClass::from_fraction(0.1), OwnershipClass::Contributor);
/// assert_eq!(OwnershipClass::from_fraction(0.09), OwnershipClass::Minor);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnershipClass {
    /// At least half of the weighted contribution.
    Primary,
    /// Between 10% and 50%.
    Contributor,
    /// Below 10%.
    Minor,
}

impl OwnershipClass {
    /// Classify an ownership fraction.
    pub fn from_fraction(fraction: f64) -> Self {
        if fraction >= 0.5 {
            OwnershipClass::Primary
        } else if fraction >= 0.1 {
            OwnershipClass::Contributor
        } else {
            OwnershipClass::Minor
        }
    }
}

/// What a unit of contribution measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// Decayed lines added plus removed.
    Lines,
    /// Decayed commit count; used when no change reports line counts.
    Commits,
}

/// One author's share of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorOwnership {
    /// Author identity.
    pub author: Author,
    /// Commits by this author touching the file.
    pub commits: u32,
    /// Decayed contribution, with the file's latest change weighing 1.
    pub weighted_lines: f64,
    /// `weighted_lines / total_weighted`.
    pub fraction: f64,
    /// Band of `fraction`.
    pub classification: OwnershipClass,
    /// Days between the author's latest touch and the reference time.
    pub last_touch_days: f64,
    /// Whether `last_touch_days` exceeds the stale threshold.
    pub is_stale: bool,
}

/// Authors folded together for falling below the noise floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OthersBucket {
    /// Folded authors, sorted.
    pub authors: Vec<Author>,
    /// Their commits touching the file.
    pub commits: u32,
    /// Their decayed contribution.
    pub weighted_lines: f64,
    /// Their combined fraction.
    pub fraction: f64,
}

/// Ownership of a single file.
///
/// `authors` fractions plus the `others` fraction sum to 1.0 whenever the
/// file has any history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipTable {
    /// File path relative to repo root.
    pub path: String,
    /// Instant ages were measured from.
    pub reference_time: Option<DateTime<Utc>>,
    /// Half-life used for decay.
    pub half_life_days: f64,
    /// Commits touching the file.
    pub total_commits: u32,
    /// Sum of every author's decayed contribution. Decay runs from the
    /// file's latest change, so any file with history has a positive total.
    pub total_weighted: f64,
    /// Unit of contribution.
    pub weighting: Weighting,
    /// Authors above the noise floor, largest share first.
    pub authors: Vec<AuthorOwnership>,
    /// Authors below the noise floor.
    pub others: Option<OthersBucket>,
}

impl OwnershipTable {
    /// The author with the largest share, if any.
    pub fn primary(&self) -> Option<&AuthorOwnership> {
        self.authors
            .first()
            .filter(|a| a.classification == OwnershipClass::Primary)
    }

    /// Sum of all fractions, including `others`.
    pub fn fraction_sum(&self) -> f64 {
        self.authors.iter().map(|a| a.fraction).sum::<f64>()
            + self.others.as_ref().map_or(0.0, |o| o.fraction)
    }
}

/// Decay weight of a contribution `age_days` old.
///
/// Future timestamps (negative ages) weigh the same as age 0.
///
/// # Examples
///
/// ```
/// use strata_pulse::ownership::decay_weight;
///
/// assert_eq!(decay_weight(0.0, 90.0), 1.0);
/// assert!((decay_weight(90.0, 90.0) - 0.5).abs() < 1e-12);
/// assert_eq!(decay_weight(-10.0, 90.0), 1.0);
/// ```
pub fn decay_weight(age_days: f64, half_life_days: f64) -> f64 {
    2f64.powf(-age_days.max(0.0) / half_life_days)
}

fn age_days(reference: DateTime<Utc>, timestamp: DateTime<Utc>) -> f64 {
    (reference - timestamp).num_seconds() as f64 / SECONDS_PER_DAY
}

#[derive(Default)]
struct Accumulator {
    commits: u32,
    weighted_lines: f64,
    weighted_commits: f64,
    youngest_age: Option<f64>,
}

/// Compute recency-weighted ownership of `path`.
///
/// A path no commit touches yields an empty table with zero totals.
///
/// # Errors
///
/// Returns [`StrataError::Config`] for invalid settings and
/// [`StrataError::Cancelled`] if `cancel` fires.
///
/// # Examples
///
/// ```
/// use strata_core::{CancelToken, CommitHistory, FileIndex, IngestOptions, OwnershipConfig};
/// use strata_pulse::ownership::{analyze_ownership, OwnershipClass};
///
/// let json = r#"[
///     {"hash": "c1", "author": "alice", "timestamp": "2024-01-01T00:00:00Z",
///      "files": [{"path": "main.rs", "linesAdded": 90}]},
///     {"hash": "c2", "author": "bob", "timestamp": "2024-01-01T00:00:00Z",
///      "files": [{"path": "main.rs", "linesAdded": 10}]}
/// ]"#;
/// let history = CommitHistory::from_json(json, IngestOptions::default()).unwrap();
/// let index = FileIndex::build(&history);
/// let table = analyze_ownership(&history, &index, "main.rs", &OwnershipConfig::default(), &CancelToken::new()).unwrap();
/// assert_eq!(table.authors[0].author.name, "alice");
/// assert_eq!(table.authors[0].classification, OwnershipClass::Primary);
/// assert!((table.fraction_sum() - 1.0).abs() < 1e-9);
/// ```
pub fn analyze_ownership(
    history: &CommitHistory,
    index: &FileIndex,
    path: &str,
    config: &OwnershipConfig,
    cancel: &CancelToken,
) -> Result<OwnershipTable, StrataError> {
    config.validate()?;

    let path = normalize_path(path);
    let reference = config.reference_time.or_else(|| history.latest_timestamp());
    let mut per_author: BTreeMap<&Author, Accumulator> = BTreeMap::new();
    let mut total_commits = 0u32;

    // Ages are taken relative to the file's youngest change so that a file
    // last touched long before `reference` does not decay to zero weight.
    let mut touches: Vec<(&Author, f64, u64)> = Vec::new();
    if let Some(reference) = reference {
        for &position in index.commits_touching(&path) {
            cancel.check()?;
            let Some(commit) = history.get(position) else {
                continue;
            };
            let lines: u64 = commit
                .changes
                .iter()
                .filter(|c| c.path == path)
                .map(|c| c.lines_changed())
                .sum();
            let age = age_days(reference, commit.timestamp).max(0.0);
            touches.push((&commit.author, age, lines));
        }
    }

    let youngest = touches
        .iter()
        .map(|&(_, age, _)| age)
        .min_by(f64::total_cmp)
        .unwrap_or(0.0);
    for &(author, age, lines) in &touches {
        let weight = decay_weight(age - youngest, config.half_life_days);
        let acc = per_author.entry(author).or_default();
        acc.commits += 1;
        acc.weighted_lines += weight * lines as f64;
        acc.weighted_commits += weight;
        acc.youngest_age = Some(acc.youngest_age.map_or(age, |a: f64| a.min(age)));
        total_commits += 1;
    }

    let line_total: f64 = per_author.values().map(|a| a.weighted_lines).sum();
    let weighting = if line_total > 0.0 {
        Weighting::Lines
    } else {
        Weighting::Commits
    };
    let contribution = |acc: &Accumulator| match weighting {
        Weighting::Lines => acc.weighted_lines,
        Weighting::Commits => acc.weighted_commits,
    };
    let total_weighted: f64 = per_author.values().map(contribution).sum();

    let mut authors = Vec::new();
    let mut others: Option<OthersBucket> = None;

    if total_weighted > 0.0 {
        for (author, acc) in &per_author {
            let weighted = contribution(acc);
            let fraction = weighted / total_weighted;
            if fraction < config.noise_floor {
                let bucket = others.get_or_insert_with(|| OthersBucket {
                    authors: Vec::new(),
                    commits: 0,
                    weighted_lines: 0.0,
                    fraction: 0.0,
                });
                bucket.authors.push((*author).clone());
                bucket.commits += acc.commits;
                bucket.weighted_lines += weighted;
                continue;
            }

            let last_touch_days = acc.youngest_age.unwrap_or(0.0);
            authors.push(AuthorOwnership {
                author: (*author).clone(),
                commits: acc.commits,
                weighted_lines: weighted,
                fraction,
                classification: OwnershipClass::from_fraction(fraction),
                last_touch_days,
                is_stale: last_touch_days > f64::from(config.stale_after_days),
            });
        }
    }

    if let Some(bucket) = others.as_mut() {
        bucket.fraction = bucket.weighted_lines / total_weighted;
        tracing::trace!(
            path = %path,
            folded = bucket.authors.len(),
            "folded low-share authors into others"
        );
    }

    authors.sort_by(|a, b| {
        b.fraction
            .total_cmp(&a.fraction)
            .then_with(|| a.author.cmp(&b.author))
    });

    Ok(OwnershipTable {
        path,
        reference_time: reference,
        half_life_days: config.half_life_days,
        total_commits,
        total_weighted,
        weighting,
        authors,
        others,
    })
}

/// A file an author has worked on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpertiseEntry {
    /// File path relative to repo root.
    pub path: String,
    /// Commits by the author touching the file.
    pub commits: u32,
    /// Decayed lines added plus removed by the author.
    pub weighted_lines: f64,
    /// The author's latest change to the file.
    pub last_touched: DateTime<Utc>,
}

/// Files an author has touched, most active first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorExpertise {
    /// The name or email that was looked up.
    pub author: String,
    /// Number of distinct files.
    pub total_files: usize,
    /// Per-file activity.
    pub files: Vec<ExpertiseEntry>,
}

/// List the files `author` (matched by name or email) has changed.
///
/// # Errors
///
/// Returns [`StrataError::Config`] for invalid settings and
/// [`StrataError::Cancelled`] if `cancel` fires.
pub fn author_expertise(
    history: &CommitHistory,
    author: &str,
    config: &OwnershipConfig,
    cancel: &CancelToken,
) -> Result<AuthorExpertise, StrataError> {
    config.validate()?;

    let reference = config.reference_time.or_else(|| history.latest_timestamp());
    let mut files: BTreeMap<&str, ExpertiseEntry> = BTreeMap::new();

    for commit in history.commits() {
        cancel.check()?;
        let matches = commit.author.name == author || commit.author.email.as_deref() == Some(author);
        if !matches {
            continue;
        }
        let weight = reference.map_or(1.0, |r| {
            decay_weight(age_days(r, commit.timestamp), config.half_life_days)
        });

        let mut seen = HashSet::new();
        for change in &commit.changes {
            let entry = files
                .entry(change.path.as_str())
                .or_insert_with(|| ExpertiseEntry {
                    path: change.path.clone(),
                    commits: 0,
                    weighted_lines: 0.0,
                    last_touched: commit.timestamp,
                });
            if seen.insert(change.path.as_str()) {
                entry.commits += 1;
            }
            entry.weighted_lines += weight * change.lines_changed() as f64;
            entry.last_touched = entry.last_touched.max(commit.timestamp);
        }
    }

    let mut files: Vec<ExpertiseEntry> = files.into_values().collect();
    files.sort_by(|a, b| {
        b.commits
            .cmp(&a.commits)
            .then_with(|| b.weighted_lines.total_cmp(&a.weighted_lines))
            .then_with(|| a.path.cmp(&b.path))
    });

    Ok(AuthorExpertise {
        author: author.to_string(),
        total_files: files.len(),
        files,
    })
}

/// Knowledge distribution of a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOwnershipSummary {
    /// File path relative to repo root.
    pub path: String,
    /// Commits touching this file.
    pub total_commits: u32,
    /// Author with the largest share.
    pub dominant_author: Option<Author>,
    /// Share of the dominant author.
    pub dominant_fraction: f64,
    /// Number of authors with more than 10% share.
    pub bus_factor: u32,
    /// Whether the dominant author holds more than 80%.
    pub is_knowledge_silo: bool,
    /// Authors with more than 10% share, largest first.
    pub significant_authors: Vec<Author>,
}

/// Knowledge distribution across every indexed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipSummary {
    /// Total files analyzed.
    pub total_files: usize,
    /// Files with only one author.
    pub single_author_files: usize,
    /// Files where one author holds more than 80%.
    pub knowledge_silos: usize,
    /// Minimum authors to remove to orphan more than half the files.
    pub project_bus_factor: u32,
    /// Per-file data, silos first.
    pub files: Vec<FileOwnershipSummary>,
}

/// Summarize ownership of every file in `index`.
///
/// # Errors
///
/// Returns [`StrataError::Config`] for invalid settings and
/// [`StrataError::Cancelled`] if `cancel` fires.
pub fn summarize_ownership(
    history: &CommitHistory,
    index: &FileIndex,
    config: &OwnershipConfig,
    cancel: &CancelToken,
) -> Result<OwnershipSummary, StrataError> {
    let mut files = Vec::new();
    let mut single_author_files = 0usize;
    let mut knowledge_silos = 0usize;

    for path in index.paths() {
        let table = analyze_ownership(history, index, path, config, cancel)?;
        if table.total_commits == 0 {
            continue;
        }

        let author_count =
            table.authors.len() + table.others.as_ref().map_or(0, |o| o.authors.len());
        if author_count == 1 {
            single_author_files += 1;
        }

        let dominant = table.authors.first();
        let dominant_fraction = dominant.map_or(0.0, |a| a.fraction);
        let significant_authors: Vec<Author> = table
            .authors
            .iter()
            .filter(|a| a.fraction > 0.10)
            .map(|a| a.author.clone())
            .collect();
        let is_silo = dominant_fraction > 0.80;
        if is_silo {
            knowledge_silos += 1;
        }

        files.push(FileOwnershipSummary {
            path: table.path,
            total_commits: table.total_commits,
            dominant_author: dominant.map(|a| a.author.clone()),
            dominant_fraction,
            bus_factor: significant_authors.len() as u32,
            is_knowledge_silo: is_silo,
            significant_authors,
        });
    }

    files.sort_by(|a, b| {
        b.dominant_fraction
            .total_cmp(&a.dominant_fraction)
            .then_with(|| a.path.cmp(&b.path))
    });

    let project_bus_factor = compute_project_bus_factor(&files);

    Ok(OwnershipSummary {
        total_files: files.len(),
        single_author_files,
        knowledge_silos,
        project_bus_factor,
        files,
    })
}

/// Compute the project bus factor.
///
/// Iteratively remove the author significant on the most files until more
/// than half of the files have no significant author left.
fn compute_project_bus_factor(files: &[FileOwnershipSummary]) -> u32 {
    if files.is_empty() {
        return 0;
    }

    let mut reach: HashMap<&Author, u32> = HashMap::new();
    for file in files {
        for author in &file.significant_authors {
            *reach.entry(author).or_default() += 1;
        }
    }

    let mut ranked: Vec<(&Author, u32)> = reach.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let threshold = files.len() / 2;
    let mut removed: HashSet<&Author> = HashSet::new();
    let mut removals = 0u32;

    for (author, _) in &ranked {
        removed.insert(author);
        removals += 1;

        let orphaned = files
            .iter()
            .filter(|f| f.significant_authors.iter().all(|a| removed.contains(a)))
            .count();
        if orphaned > threshold {
            return removals;
        }
    }

    removals
}
