/// Errors that can occur while ingesting or analyzing a commit history.
///
/// Ingestion errors abort the whole run. Per-item analyzer problems such as
/// [`StrataError::UnparseableHunk`] are recorded as skip entries by the
/// analyzer that hit them instead of being returned.
///
/// # Examples
///
/// ```
/// use strata_core::StrataError;
///
/// let err = StrataError::TargetNotFound("deadbeef".into());
/// assert!(err.to_string().contains("deadbeef"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StrataError {
    /// A raw commit descriptor is missing a required field.
    #[error("malformed commit descriptor #{index}: {reason}")]
    MalformedInput {
        /// Position of the descriptor in the input sequence.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A hash appeared twice while ingesting in strict mode.
    #[error("duplicate commit hash: {0}")]
    DuplicateCommit(String),

    /// A diff payload could not be turned into hunks.
    #[error("unparseable diff for {path} in {hash}: {reason}")]
    UnparseableHunk {
        /// Commit the payload belongs to.
        hash: String,
        /// File the payload belongs to.
        path: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The requested commit is not part of the history.
    #[error("commit not found in history: {0}")]
    TargetNotFound(String),

    /// The caller cancelled the analysis.
    #[error("analysis cancelled")]
    Cancelled,

    /// Invalid analyzer parameters.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: StrataError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn malformed_input_shows_position() {
        let err = StrataError::MalformedInput {
            index: 3,
            reason: "missing hash".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed commit descriptor #3: missing hash"
        );
    }

    #[test]
    fn unparseable_hunk_names_commit_and_path() {
        let err = StrataError::UnparseableHunk {
            hash: "abc123".into(),
            path: "src/lib.rs".into(),
            reason: "binary".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("src/lib.rs"));
    }
}
