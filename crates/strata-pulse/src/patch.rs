//! Hunk extraction from file-change diff payloads.
//!
//! Turns a [`DiffData`] into checked [`Hunk`]s. Binary payloads, missing
//! payloads and malformed unified-diff text come back as
//! [`StrataError::UnparseableHunk`] so that callers can record a skip.

use strata_core::{CommitRecord, DiffData, FileChange, Hunk, StrataError};

/// Resolve the hunks of `change`, parsing raw patch text when needed.
///
/// # Errors
///
/// Returns [`StrataError::UnparseableHunk`] when the payload is binary,
/// unavailable, or does not describe valid hunks.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use strata_core::{Author, ChangeKind, CommitRecord, DiffData, FileChange};
/// use strata_pulse::patch::resolve_hunks;
///
/// let change = FileChange {
///     path: "hello.rs".into(),
///     kind: ChangeKind::Modified,
///     old_path: None,
///     lines_added: 1,
///     lines_removed: 0,
///     diff: DiffData::Patch("@@ -1,2 +1,3 @@\n fn main() {\n+    println!(\"hi\");\n }\n".into()),
/// };
/// let commit = CommitRecord {
///     hash: "c1".into(),
///     author: Author::new("alice", None),
///     timestamp: Utc::now(),
///     message: None,
///     changes: vec![change.clone()],
/// };
/// let hunks = resolve_hunks(&commit, &change).unwrap();
/// assert_eq!((hunks[0].new_start, hunks[0].new_count), (1, 3));
/// ```
pub fn resolve_hunks(commit: &CommitRecord, change: &FileChange) -> Result<Vec<Hunk>, StrataError> {
    let unparseable = |reason: String| StrataError::UnparseableHunk {
        hash: commit.hash.clone(),
        path: change.path.clone(),
        reason,
    };

    let hunks = match &change.diff {
        DiffData::Hunks(hunks) => hunks.clone(),
        DiffData::Patch(text) => parse_hunks(text).map_err(unparseable)?,
        DiffData::Binary => return Err(unparseable("binary diff".into())),
        DiffData::Unavailable => return Err(unparseable("no diff available".into())),
    };

    for hunk in &hunks {
        validate_hunk(hunk).map_err(unparseable)?;
    }
    Ok(hunks)
}

fn validate_hunk(hunk: &Hunk) -> Result<(), String> {
    if hunk.old_start == 0 && hunk.old_count > 0 {
        return Err(format!(
            "old range starts at line 0 but spans {} lines",
            hunk.old_count
        ));
    }
    if hunk.new_start == 0 && hunk.new_count > 0 {
        return Err(format!(
            "new range starts at line 0 but spans {} lines",
            hunk.new_count
        ));
    }
    Ok(())
}

/// Parse the hunks of a single-file unified diff.
///
/// File headers (`diff --git`, `index`, `---`, `+++`, mode lines) are
/// skipped. When a hunk carries body lines, their counts must match the
/// header; header-only hunks are accepted as-is.
///
/// # Errors
///
/// Returns a diagnostic for binary markers, malformed `@@` headers, and
/// bodies that disagree with their header.
///
/// # Examples
///
/// ```
/// use strata_pulse::patch::parse_hunks;
///
/// let hunks = parse_hunks("@@ -3 +3,2 @@\n-old\n+new\n+more\n").unwrap();
/// assert_eq!(hunks.len(), 1);
/// assert_eq!(hunks[0].old_count, 1);
/// assert!(parse_hunks("Binary files a/x.png and b/x.png differ\n").is_err());
/// ```
pub fn parse_hunks(input: &str) -> Result<Vec<Hunk>, String> {
    let mut hunks = Vec::new();
    let mut current: Option<HunkBody> = None;

    for line in input.lines() {
        if line.starts_with("GIT binary patch")
            || (line.starts_with("Binary files ") && line.ends_with(" differ"))
        {
            return Err("binary diff".into());
        }

        if line.starts_with("@@ ") {
            if let Some(body) = current.take() {
                hunks.push(body.finish()?);
            }
            current = Some(HunkBody::new(parse_hunk_header(line)?));
            continue;
        }

        let Some(body) = current.as_mut() else {
            continue;
        };

        if line == "\\ No newline at end of file" {
            continue;
        }
        match line.as_bytes().first() {
            Some(b' ') => {
                body.old_seen += 1;
                body.new_seen += 1;
            }
            Some(b'-') => body.old_seen += 1,
            Some(b'+') => body.new_seen += 1,
            // An empty line inside a hunk is a context line whose leading
            // space was trimmed by a mail client or editor.
            None => {
                body.old_seen += 1;
                body.new_seen += 1;
            }
            _ => body.closed = true,
        }
        if body.closed || body.is_complete() {
            if let Some(body) = current.take() {
                hunks.push(body.finish()?);
            }
        }
    }

    if let Some(body) = current.take() {
        hunks.push(body.finish()?);
    }
    Ok(hunks)
}

struct HunkBody {
    header: Hunk,
    old_seen: u32,
    new_seen: u32,
    closed: bool,
}

impl HunkBody {
    fn new(header: Hunk) -> Self {
        Self {
            header,
            old_seen: 0,
            new_seen: 0,
            closed: false,
        }
    }

    fn is_complete(&self) -> bool {
        self.old_seen >= self.header.old_count && self.new_seen >= self.header.new_count
    }

    fn finish(self) -> Result<Hunk, String> {
        let header_only = self.old_seen == 0 && self.new_seen == 0;
        if header_only
            || (self.old_seen == self.header.old_count && self.new_seen == self.header.new_count)
        {
            Ok(self.header)
        } else {
            Err(format!(
                "hunk body has -{}/+{} lines but header says -{}/+{}",
                self.old_seen, self.new_seen, self.header.old_count, self.header.new_count
            ))
        }
    }
}

/// Read the ranges of `@@ -old[,n] +new[,n] @@ [section]`.
fn parse_hunk_header(line: &str) -> Result<Hunk, String> {
    let malformed = |what: &str| format!("malformed {what} in hunk header `{line}`");

    let (ranges, _section) = line
        .strip_prefix("@@ ")
        .and_then(|rest| rest.split_once(" @@"))
        .ok_or_else(|| malformed("delimiters"))?;
    let (old, new) = ranges
        .split_once(' ')
        .ok_or_else(|| malformed("ranges"))?;

    let (old_start, old_count) = old
        .strip_prefix('-')
        .and_then(line_range)
        .ok_or_else(|| malformed("old range"))?;
    let (new_start, new_count) = new
        .strip_prefix('+')
        .and_then(line_range)
        .ok_or_else(|| malformed("new range"))?;

    Ok(Hunk::new(old_start, old_count, new_start, new_count))
}

/// `start[,count]`; a missing count means a single line.
fn line_range(text: &str) -> Option<(u32, u32)> {
    let (start, count) = text.split_once(',').unwrap_or((text, "1"));
    Some((start.parse().ok()?, count.parse().ok()?))
}
