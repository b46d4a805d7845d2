//! Temporal activity analysis.
//!
//! Buckets commits into a weekday × hour histogram in a configured fixed
//! offset and detects bursts of closely spaced commits.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use strata_core::{ActivityConfig, Author, CancelToken, CommitHistory, StrataError};

/// A maximal run of commits whose consecutive gaps stay within the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Burst {
    /// Timestamp of the first commit.
    pub start: DateTime<Utc>,
    /// Timestamp of the last commit.
    pub end: DateTime<Utc>,
    /// Number of commits in the run, at least 2.
    pub commit_count: usize,
    /// Distinct authors, sorted.
    pub authors: Vec<Author>,
    /// Member hashes in time order.
    pub hashes: Vec<String>,
}

/// Per-author weekday and hour marginals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorActivity {
    /// Author identity.
    pub author: Author,
    /// Commits by this author.
    pub commits: u32,
    /// Commits per weekday; index 0 is Monday.
    pub by_weekday: [u32; 7],
    /// Commits per local hour.
    pub by_hour: [u32; 24],
}

/// Commit counts by localized ISO weekday and hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityHistogram {
    /// Offset the histogram was built in.
    pub timezone: String,
    /// Commits counted; equals the sum of all cells.
    pub total_commits: u32,
    /// `cells[weekday - 1][hour]`, weekday 1 = Monday.
    pub cells: [[u32; 24]; 7],
    /// Row sums of `cells`.
    pub by_weekday: [u32; 7],
    /// Column sums of `cells`.
    pub by_hour: [u32; 24],
    /// Share of commits on Saturday or Sunday; 0 for an empty history.
    pub weekend_ratio: f64,
    /// Share of commits in the late-night window; 0 for an empty history.
    pub late_night_ratio: f64,
    /// Busiest hour, earliest on ties.
    pub peak_hour: Option<u32>,
    /// Busiest ISO weekday (1 = Monday), earliest on ties.
    pub peak_weekday: Option<u32>,
    /// Per-author marginals, most active first.
    pub authors: Vec<AuthorActivity>,
    /// Detected bursts in time order.
    pub bursts: Vec<Burst>,
}

impl ActivityHistogram {
    /// Count for ISO `weekday` (1..=7) and `hour` (0..=23).
    ///
    /// Out-of-range coordinates count as zero.
    pub fn count(&self, weekday: u32, hour: u32) -> u32 {
        if !(1..=7).contains(&weekday) || hour > 23 {
            return 0;
        }
        self.cells[(weekday - 1) as usize][hour as usize]
    }
}

/// Build the activity histogram and burst list of `history`.
///
/// # Errors
///
/// Returns [`StrataError::Config`] for an unknown timezone or invalid hours,
/// and [`StrataError::Cancelled`] if `cancel` fires.
///
/// # Examples
///
/// ```
/// use strata_core::{ActivityConfig, CancelToken, CommitHistory, IngestOptions};
/// use strata_pulse::activity::analyze_activity;
///
/// let json = r#"[
///     {"hash": "c1", "author": "alice", "timestamp": "2024-01-06T10:00:00Z"},
///     {"hash": "c2", "author": "bob", "timestamp": "2024-01-06T10:20:00Z"}
/// ]"#;
/// let history = CommitHistory::from_json(json, IngestOptions::default()).unwrap();
/// let histogram = analyze_activity(&history, &ActivityConfig::default(), &CancelToken::new()).unwrap();
/// assert_eq!(histogram.count(6, 10), 2);
/// assert_eq!(histogram.weekend_ratio, 1.0);
/// assert_eq!(histogram.bursts.len(), 1);
/// ```
pub fn analyze_activity(
    history: &CommitHistory,
    config: &ActivityConfig,
    cancel: &CancelToken,
) -> Result<ActivityHistogram, StrataError> {
    config.validate()?;
    let offset = config.utc_offset()?;

    let mut cells = [[0u32; 24]; 7];
    let mut per_author: BTreeMap<&Author, AuthorActivity> = BTreeMap::new();

    for commit in history.commits() {
        cancel.check()?;
        let local = commit.timestamp.with_timezone(&offset);
        let day = local.weekday().num_days_from_monday() as usize;
        let hour = local.hour() as usize;
        cells[day][hour] += 1;

        let activity = per_author
            .entry(&commit.author)
            .or_insert_with(|| AuthorActivity {
                author: commit.author.clone(),
                commits: 0,
                by_weekday: [0; 7],
                by_hour: [0; 24],
            });
        activity.commits += 1;
        activity.by_weekday[day] += 1;
        activity.by_hour[hour] += 1;
    }

    let mut by_weekday = [0u32; 7];
    let mut by_hour = [0u32; 24];
    for (day, row) in cells.iter().enumerate() {
        for (hour, &count) in row.iter().enumerate() {
            by_weekday[day] += count;
            by_hour[hour] += count;
        }
    }

    let total: u32 = by_weekday.iter().sum();
    let weekend = by_weekday[5] + by_weekday[6];
    let late_night: u32 = (0..24u32)
        .filter(|&h| is_late_night(h, config))
        .map(|h| by_hour[h as usize])
        .sum();

    let mut authors: Vec<AuthorActivity> = per_author.into_values().collect();
    authors.sort_by(|a, b| b.commits.cmp(&a.commits).then_with(|| a.author.cmp(&b.author)));

    let bursts = detect_bursts(history, config.burst_window_minutes, cancel)?;

    tracing::trace!(
        commits = total,
        bursts = bursts.len(),
        timezone = %config.timezone,
        "activity histogram built"
    );

    Ok(ActivityHistogram {
        timezone: config.timezone.clone(),
        total_commits: total,
        cells,
        by_weekday,
        by_hour,
        weekend_ratio: ratio(weekend, total),
        late_night_ratio: ratio(late_night, total),
        peak_hour: peak(&by_hour),
        peak_weekday: peak(&by_weekday).map(|d| d + 1),
        authors,
        bursts,
    })
}

/// Find bursts: runs where every consecutive gap is at most `window_minutes`.
///
/// Commits are ordered by timestamp, ties by history position. Runs of a
/// single commit are not reported.
///
/// # Errors
///
/// Returns [`StrataError::Cancelled`] if `cancel` fires.
pub fn detect_bursts(
    history: &CommitHistory,
    window_minutes: u32,
    cancel: &CancelToken,
) -> Result<Vec<Burst>, StrataError> {
    let window = Duration::minutes(i64::from(window_minutes));
    let mut order: Vec<usize> = (0..history.len()).collect();
    order.sort_by_key(|&i| history.commits()[i].timestamp);

    let mut bursts = Vec::new();
    let mut run: Vec<usize> = Vec::new();

    for &i in &order {
        cancel.check()?;
        let commit = &history.commits()[i];
        if let Some(&last) = run.last() {
            if commit.timestamp - history.commits()[last].timestamp > window {
                flush_run(history, &run, &mut bursts);
                run.clear();
            }
        }
        run.push(i);
    }
    flush_run(history, &run, &mut bursts);

    Ok(bursts)
}

fn flush_run(history: &CommitHistory, run: &[usize], bursts: &mut Vec<Burst>) {
    let (Some(&first), Some(&last)) = (run.first(), run.last()) else {
        return;
    };
    if run.len() < 2 {
        return;
    }

    let commits = history.commits();
    let mut authors: Vec<Author> = run.iter().map(|&i| commits[i].author.clone()).collect();
    authors.sort();
    authors.dedup();

    bursts.push(Burst {
        start: commits[first].timestamp,
        end: commits[last].timestamp,
        commit_count: run.len(),
        authors,
        hashes: run.iter().map(|&i| commits[i].hash.clone()).collect(),
    });
}

fn is_late_night(hour: u32, config: &ActivityConfig) -> bool {
    let (start, end) = (config.late_night_start_hour, config.late_night_end_hour);
    if start <= end {
        (start..=end).contains(&hour)
    } else {
        hour >= start || hour <= end
    }
}

fn ratio(part: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(total)
    }
}

fn peak(counts: &[u32]) -> Option<u32> {
    let mut best: Option<(usize, u32)> = None;
    for (i, &count) in counts.iter().enumerate() {
        if count > best.map_or(0, |(_, c)| c) {
            best = Some((i, count));
        }
    }
    best.map(|(i, _)| i as u32)
}
