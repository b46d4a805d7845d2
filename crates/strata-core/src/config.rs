use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StrataError;

/// Top-level analyzer configuration, loadable from `.strata.toml`.
///
/// Every section is optional; missing keys fall back to their defaults.
///
/// # Examples
///
/// ```
/// use strata_core::StrataConfig;
///
/// let config = StrataConfig::default();
/// assert_eq!(config.cochange.max_files_per_commit, 20);
/// assert_eq!(config.ownership.half_life_days, 90.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrataConfig {
    /// File co-change correlation settings.
    #[serde(default)]
    pub cochange: CoChangeConfig,
    /// Recency-weighted ownership settings.
    #[serde(default)]
    pub ownership: OwnershipConfig,
    /// Temporal activity settings.
    #[serde(default)]
    pub activity: ActivityConfig,
    /// File and line churn settings.
    #[serde(default)]
    pub churn: ChurnConfig,
    /// Commit dependency graph settings.
    #[serde(default)]
    pub deps: DepsConfig,
}

impl StrataConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Io`] if the file cannot be read,
    /// [`StrataError::Toml`] if it is not valid TOML, or
    /// [`StrataError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use strata_core::StrataConfig;
    /// use std::path::Path;
    ///
    /// let config = StrataConfig::from_file(Path::new(".strata.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, StrataError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Toml`] if parsing fails or
    /// [`StrataError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_core::StrataConfig;
    ///
    /// let toml = r#"
    /// [cochange]
    /// min_correlation = 0.5
    /// "#;
    /// let config = StrataConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.cochange.min_correlation, 0.5);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, StrataError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section.
    ///
    /// # Errors
    ///
    /// Returns the first [`StrataError::Config`] found.
    pub fn validate(&self) -> Result<(), StrataError> {
        self.cochange.validate()?;
        self.ownership.validate()?;
        self.activity.validate()?;
        self.churn.validate()?;
        self.deps.validate()
    }
}

fn check_unit_interval(name: &str, value: f64) -> Result<(), StrataError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(StrataError::Config(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

/// Co-change analysis configuration.
///
/// # Examples
///
/// ```
/// use strata_core::CoChangeConfig;
///
/// let config = CoChangeConfig::default();
/// assert_eq!(config.min_correlation, 0.30);
/// assert_eq!(config.max_files_per_commit, 20);
/// assert_eq!(config.min_co_occurrence, 2);
/// assert!(config.max_pairs.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoChangeConfig {
    /// Minimum containment score to report a pair (default: 0.30).
    #[serde(default = "default_min_correlation")]
    pub min_correlation: f64,
    /// Commits touching more files than this are not paired (default: 20).
    #[serde(default = "default_max_files_per_commit")]
    pub max_files_per_commit: usize,
    /// Minimum number of shared commits to report a pair (default: 2).
    #[serde(default = "default_min_co_occurrence")]
    pub min_co_occurrence: u32,
    /// Keep only the top N pairs after sorting.
    #[serde(default)]
    pub max_pairs: Option<usize>,
}

fn default_min_correlation() -> f64 {
    0.30
}

fn default_max_files_per_commit() -> usize {
    20
}

fn default_min_co_occurrence() -> u32 {
    2
}

impl Default for CoChangeConfig {
    fn default() -> Self {
        Self {
            min_correlation: default_min_correlation(),
            max_files_per_commit: default_max_files_per_commit(),
            min_co_occurrence: default_min_co_occurrence(),
            max_pairs: None,
        }
    }
}

impl CoChangeConfig {
    /// # Errors
    ///
    /// Returns [`StrataError::Config`] for a correlation outside `[0, 1]` or
    /// a file limit below 2.
    pub fn validate(&self) -> Result<(), StrataError> {
        check_unit_interval("cochange.min_correlation", self.min_correlation)?;
        if self.max_files_per_commit < 2 {
            return Err(StrataError::Config(format!(
                "cochange.max_files_per_commit must be at least 2, got {}",
                self.max_files_per_commit
            )));
        }
        Ok(())
    }
}

/// Ownership analysis configuration.
///
/// # Examples
///
/// ```
/// use strata_core::OwnershipConfig;
///
/// let config = OwnershipConfig::default();
/// assert_eq!(config.half_life_days, 90.0);
/// assert_eq!(config.noise_floor, 0.01);
/// assert!(config.reference_time.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipConfig {
    /// Age at which a contribution counts half (default: 90 days).
    #[serde(default = "default_half_life_days")]
    pub half_life_days: f64,
    /// "Now" for decay purposes (default: latest commit timestamp).
    #[serde(default)]
    pub reference_time: Option<DateTime<Utc>>,
    /// Authors below this fraction fold into "others" (default: 0.01).
    #[serde(default = "default_noise_floor")]
    pub noise_floor: f64,
    /// Authors idle longer than this are flagged stale (default: 180 days).
    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: u32,
}

fn default_half_life_days() -> f64 {
    90.0
}

fn default_noise_floor() -> f64 {
    0.01
}

fn default_stale_after_days() -> u32 {
    180
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            half_life_days: default_half_life_days(),
            reference_time: None,
            noise_floor: default_noise_floor(),
            stale_after_days: default_stale_after_days(),
        }
    }
}

impl OwnershipConfig {
    /// # Errors
    ///
    /// Returns [`StrataError::Config`] for a non-positive half-life or a
    /// noise floor outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), StrataError> {
        if !(self.half_life_days.is_finite() && self.half_life_days > 0.0) {
            return Err(StrataError::Config(format!(
                "ownership.half_life_days must be positive, got {}",
                self.half_life_days
            )));
        }
        check_unit_interval("ownership.noise_floor", self.noise_floor)
    }
}

/// Activity analysis configuration.
///
/// # Examples
///
/// ```
/// use strata_core::ActivityConfig;
///
/// let config = ActivityConfig::default();
/// assert_eq!(config.burst_window_minutes, 30);
/// assert_eq!(config.timezone, "UTC");
/// assert_eq!(config.utc_offset().unwrap().local_minus_utc(), 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Maximum gap between consecutive commits of a burst (default: 30).
    #[serde(default = "default_burst_window_minutes")]
    pub burst_window_minutes: u32,
    /// `"UTC"` or a fixed offset such as `"+02:00"` (default: `"UTC"`).
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// First hour counted as late night (default: 22).
    #[serde(default = "default_late_night_start")]
    pub late_night_start_hour: u32,
    /// Last hour counted as late night, inclusive (default: 4).
    #[serde(default = "default_late_night_end")]
    pub late_night_end_hour: u32,
}

fn default_burst_window_minutes() -> u32 {
    30
}

fn default_timezone() -> String {
    "UTC".into()
}

fn default_late_night_start() -> u32 {
    22
}

fn default_late_night_end() -> u32 {
    4
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            burst_window_minutes: default_burst_window_minutes(),
            timezone: default_timezone(),
            late_night_start_hour: default_late_night_start(),
            late_night_end_hour: default_late_night_end(),
        }
    }
}

impl ActivityConfig {
    /// Resolve [`ActivityConfig::timezone`] to a fixed offset.
    ///
    /// Accepts `UTC`, `Z`, `+HH:MM`, `-HH:MM`, `+HHMM` and `+HH`.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Config`] if the value is not recognized.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_core::ActivityConfig;
    ///
    /// let config = ActivityConfig {
    ///     timezone: "-05:30".into(),
    ///     ..ActivityConfig::default()
    /// };
    /// assert_eq!(config.utc_offset().unwrap().local_minus_utc(), -(5 * 3600 + 30 * 60));
    /// ```
    pub fn utc_offset(&self) -> Result<FixedOffset, StrataError> {
        parse_offset(&self.timezone)
            .ok_or_else(|| StrataError::Config(format!("unknown timezone: {}", self.timezone)))
    }

    /// # Errors
    ///
    /// Returns [`StrataError::Config`] for an unknown timezone or an hour
    /// above 23.
    pub fn validate(&self) -> Result<(), StrataError> {
        self.utc_offset()?;
        if self.late_night_start_hour > 23 || self.late_night_end_hour > 23 {
            return Err(StrataError::Config(
                "activity late-night hours must be within 0..=23".into(),
            ));
        }
        Ok(())
    }
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("utc") || raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (
            digits[..2].parse::<i32>().ok()?,
            digits[2..].parse::<i32>().ok()?,
        ),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Churn analysis configuration.
///
/// # Examples
///
/// ```
/// use strata_core::ChurnConfig;
///
/// let config = ChurnConfig::default();
/// assert!(config.since.is_none());
/// assert_eq!(config.hot_threshold, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnConfig {
    /// Ignore commits older than this.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    /// Minimum per-line change count for a hotspot range (default: 3).
    #[serde(default = "default_hot_threshold")]
    pub hot_threshold: u32,
}

fn default_hot_threshold() -> u32 {
    3
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            since: None,
            hot_threshold: default_hot_threshold(),
        }
    }
}

impl ChurnConfig {
    /// # Errors
    ///
    /// Returns [`StrataError::Config`] for a zero hot threshold.
    pub fn validate(&self) -> Result<(), StrataError> {
        if self.hot_threshold == 0 {
            return Err(StrataError::Config(
                "churn.hot_threshold must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Restricts which commits the dependency graph considers.
///
/// # Examples
///
/// ```
/// use strata_core::DependencyWindow;
///
/// let window: DependencyWindow = serde_json::from_str(r#"{"last_commits": 50}"#).unwrap();
/// assert_eq!(window, DependencyWindow::LastCommits(50));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyWindow {
    /// Only the most recent N commits in history order.
    LastCommits(usize),
    /// Only commits at or after this instant.
    Since(DateTime<Utc>),
}

/// Commit dependency graph configuration.
///
/// # Examples
///
/// ```
/// use strata_core::DepsConfig;
///
/// let config = DepsConfig::default();
/// assert_eq!(config.min_overlap, 0.15);
/// assert_eq!(config.depth, 1);
/// assert!(config.target.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepsConfig {
    /// Minimum Jaccard similarity for an edge (default: 0.15).
    #[serde(default = "default_min_overlap")]
    pub min_overlap: f64,
    /// Restrict the result to the ego-graph of this commit hash.
    #[serde(default)]
    pub target: Option<String>,
    /// Restrict candidate commits.
    #[serde(default)]
    pub window: Option<DependencyWindow>,
    /// Hops around `target` to keep (default: 1).
    #[serde(default = "default_depth")]
    pub depth: usize,
}

fn default_min_overlap() -> f64 {
    0.15
}

fn default_depth() -> usize {
    1
}

impl Default for DepsConfig {
    fn default() -> Self {
        Self {
            min_overlap: default_min_overlap(),
            target: None,
            window: None,
            depth: default_depth(),
        }
    }
}

impl DepsConfig {
    /// # Errors
    ///
    /// Returns [`StrataError::Config`] for an overlap outside `[0, 1]` or a
    /// zero depth.
    pub fn validate(&self) -> Result<(), StrataError> {
        check_unit_interval("deps.min_overlap", self.min_overlap)?;
        if self.depth == 0 {
            return Err(StrataError::Config("deps.depth must be at least 1".into()));
        }
        Ok(())
    }
}
