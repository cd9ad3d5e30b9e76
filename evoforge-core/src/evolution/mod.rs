//! Evolution sessions: the version store
//!
//! An [`EvolutionSession`] is an append-only, ordered log of generation
//! attempts persisted as one JSON document per session id. Every append
//! computes a bounded diff against the previous attempt and rewrites the
//! document; reads of a missing or malformed document yield an empty session.
//!
//! ```text
//! candidate text ──► add_version ──► diff + append ──► save
//!                                          │
//!            record_validation ◄───────────┘ (build result, errors)
//!                    │
//!                    ▼
//!   recurring_errors / quality_trend / targeted_feedback / ...
//! ```

mod feedback;
pub mod schema;

pub use feedback::FIRST_ATTEMPT_FEEDBACK;
pub use schema::{migrate, SessionDocument, SCHEMA_VERSION};

use crate::config::Config;
use crate::diff::unified_diff;
use crate::error::{Error, Result};
use crate::hash::short_digest;
use crate::persist::{read_json_value, write_json_atomic};
use crate::types::{ErrorRecord, EvolutionDirection, Version};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Maximum number of diff lines stored with a version.
pub const MAX_DIFF_LINES: usize = 50;

/// Context lines around each diff hunk.
const DIFF_CONTEXT: usize = 3;

/// How many previous error messages are checked when deriving fixed errors.
const RESOLVED_LOOKBACK: usize = 5;

/// Input for [`EvolutionSession::add_version`].
///
/// Everything except content and sequence defaults to "not validated yet".
#[derive(Debug, Clone, Default)]
pub struct NewVersion {
    pub content: String,
    pub sequence: u32,
    pub quality_score: f64,
    pub build_succeeded: bool,
    pub review_feedback: String,
    pub improvement_areas: Vec<String>,
    pub errors: Vec<ErrorRecord>,
    pub fixed_errors: Vec<String>,
}

impl NewVersion {
    pub fn new(content: impl Into<String>, sequence: u32) -> Self {
        Self {
            content: content.into(),
            sequence,
            ..Default::default()
        }
    }

    pub fn quality(mut self, score: f64) -> Self {
        self.quality_score = score;
        self
    }

    pub fn build_succeeded(mut self, succeeded: bool) -> Self {
        self.build_succeeded = succeeded;
        self
    }

    pub fn review(mut self, feedback: impl Into<String>) -> Self {
        self.review_feedback = feedback.into();
        self
    }

    pub fn improvement_areas<I, S>(mut self, areas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.improvement_areas = areas.into_iter().map(Into::into).collect();
        self
    }

    pub fn errors(mut self, errors: Vec<ErrorRecord>) -> Self {
        self.errors = errors;
        self
    }

    pub fn fixed_errors(mut self, fixed: Vec<String>) -> Self {
        self.fixed_errors = fixed;
        self
    }
}

/// Aggregate view over a whole session.
#[derive(Debug, Clone, Serialize)]
pub struct EvolutionSummary {
    pub session_id: String,
    pub total_versions: usize,
    pub current_sequence: Option<u32>,
    pub build_success_rate: f64,
    pub quality_trend: Vec<(u32, f64)>,
    pub improvement_patterns: Vec<(String, usize)>,
    pub best_quality_score: Option<f64>,
    pub latest_quality_score: Option<f64>,
    pub recurring_errors: Vec<(String, usize)>,
    pub fixed_errors_count: usize,
    pub most_common_error: Option<String>,
    pub direction: EvolutionDirection,
}

/// Append-only attempt log for one session id.
#[derive(Debug)]
pub struct EvolutionSession {
    session_id: String,
    path: PathBuf,
    versions: Vec<Version>,
}

impl EvolutionSession {
    /// Open the session stored under `dir`, or start an empty one.
    ///
    /// A missing or unreadable document is not an error: the attempt history
    /// is a cache, so the session simply starts over.
    pub fn open(dir: &Path, session_id: &str) -> Self {
        let mut session = Self {
            session_id: session_id.to_string(),
            path: Self::document_path(dir, session_id),
            versions: Vec::new(),
        };
        session.load();
        session
    }

    /// Open a session in the configured sessions directory.
    pub fn open_configured(config: &Config, session_id: &str) -> Self {
        Self::open(&config.sessions_dir(), session_id)
    }

    /// `<dir>/evolution_<session_id>.json`
    pub fn document_path(dir: &Path, session_id: &str) -> PathBuf {
        dir.join(format!("evolution_{}.json", session_id))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Sequence of the last version, 0 for an empty session.
    pub fn last_sequence(&self) -> u32 {
        self.versions.last().map(|v| v.sequence).unwrap_or(0)
    }

    /// Smallest sequence `add_version` will accept next.
    pub fn next_sequence(&self) -> u32 {
        self.last_sequence() + 1
    }

    /// Append a version and persist the session.
    ///
    /// Returns the new version id. The id is derived from the content hash
    /// and the sequence, so identical content at another sequence gets a
    /// different id. If persisting fails the version is not kept.
    pub fn add_version(&mut self, new: NewVersion) -> Result<String> {
        if let Some(last) = self.versions.last() {
            if new.sequence <= last.sequence {
                return Err(Error::SequenceNotIncreasing {
                    last: last.sequence,
                    given: new.sequence,
                });
            }
        }

        let quality_score = checked_score(new.quality_score)?;
        let id = version_id(&new.content, new.sequence);
        let diff_from_previous = self
            .versions
            .last()
            .map(|prev| bounded_diff(&prev.content, &new.content))
            .unwrap_or_default();

        let mut improvement_areas: Vec<String> = Vec::with_capacity(new.improvement_areas.len());
        for area in new.improvement_areas {
            if !improvement_areas.contains(&area) {
                improvement_areas.push(area);
            }
        }

        self.versions.push(Version {
            id: id.clone(),
            content: new.content,
            sequence: new.sequence,
            created_at: Utc::now(),
            quality_score,
            build_succeeded: new.build_succeeded,
            review_feedback: new.review_feedback,
            diff_from_previous,
            improvement_areas,
            errors: new.errors,
            fixed_errors: new.fixed_errors,
        });

        if let Err(e) = self.save() {
            self.versions.pop();
            return Err(e);
        }

        tracing::info!(
            session_id = %self.session_id,
            version_id = %id,
            sequence = new.sequence,
            "Added version"
        );
        Ok(id)
    }

    /// Attach validation results to the current version and persist.
    ///
    /// If persisting fails the previous results are restored.
    pub fn record_validation(
        &mut self,
        quality_score: f64,
        build_succeeded: bool,
        errors: Vec<ErrorRecord>,
    ) -> Result<()> {
        let quality_score = checked_score(quality_score)?;
        let current = self.versions.last_mut().ok_or(Error::EmptySession)?;
        let previous_score = std::mem::replace(&mut current.quality_score, quality_score);
        let previous_built = std::mem::replace(&mut current.build_succeeded, build_succeeded);
        let previous_errors = std::mem::replace(&mut current.errors, errors);
        let version_id = current.id.clone();

        if let Err(e) = self.save() {
            if let Some(current) = self.versions.last_mut() {
                current.quality_score = previous_score;
                current.build_succeeded = previous_built;
                current.errors = previous_errors;
            }
            return Err(e);
        }

        tracing::debug!(
            session_id = %self.session_id,
            version_id = %version_id,
            build_succeeded,
            "Recorded validation"
        );
        Ok(())
    }

    pub fn current_version(&self) -> Option<&Version> {
        self.versions.last()
    }

    pub fn version_by_id(&self, id: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// `(sequence, quality_score)` for every version, in order.
    pub fn quality_trend(&self) -> Vec<(u32, f64)> {
        self.versions
            .iter()
            .map(|v| (v.sequence, v.quality_score))
            .collect()
    }

    /// Fraction of versions that built, 0 for an empty session.
    pub fn build_success_rate(&self) -> f64 {
        if self.versions.is_empty() {
            return 0.0;
        }
        let built = self.versions.iter().filter(|v| v.build_succeeded).count();
        built as f64 / self.versions.len() as f64
    }

    /// Highest-scoring version; the earliest wins a tie.
    pub fn best_version(&self) -> Option<&Version> {
        self.versions.iter().fold(None, |best: Option<&Version>, v| match best {
            Some(b) if b.quality_score >= v.quality_score => Some(b),
            _ => Some(v),
        })
    }

    /// Improvement tags of versions that beat their predecessor's score.
    pub fn improvement_patterns(&self) -> Vec<(String, usize)> {
        let tags = self
            .versions
            .windows(2)
            .filter(|pair| pair[1].quality_score > pair[0].quality_score)
            .flat_map(|pair| pair[1].improvement_areas.iter().cloned());
        count_descending(tags)
    }

    /// Error signatures across all versions with their occurrence counts.
    pub fn recurring_errors(&self) -> Vec<(String, usize)> {
        let signatures = self
            .versions
            .iter()
            .flat_map(|v| v.errors.iter().map(ErrorRecord::signature));
        count_descending(signatures)
    }

    /// Compares first and last score among the last three versions.
    pub fn evolution_direction(&self) -> EvolutionDirection {
        if self.versions.len() < 3 {
            return EvolutionDirection::InsufficientData;
        }
        let recent = &self.versions[self.versions.len() - 3..];
        let (first, last) = (recent[0].quality_score, recent[2].quality_score);
        if last > first {
            EvolutionDirection::Improving
        } else if last < first {
            EvolutionDirection::Degrading
        } else {
            EvolutionDirection::Stable
        }
    }

    pub fn summary(&self) -> EvolutionSummary {
        let recurring_errors = self.recurring_errors();
        EvolutionSummary {
            session_id: self.session_id.clone(),
            total_versions: self.versions.len(),
            current_sequence: self.current_version().map(|v| v.sequence),
            build_success_rate: self.build_success_rate(),
            quality_trend: self.quality_trend(),
            improvement_patterns: self.improvement_patterns(),
            best_quality_score: self.best_version().map(|v| v.quality_score),
            latest_quality_score: self.current_version().map(|v| v.quality_score),
            most_common_error: recurring_errors.first().map(|(sig, _)| sig.clone()),
            recurring_errors,
            fixed_errors_count: self.versions.iter().map(|v| v.fixed_errors.len()).sum(),
            direction: self.evolution_direction(),
        }
    }

    /// Write the whole session document.
    pub fn save(&self) -> Result<()> {
        let doc = SessionDocument {
            schema_version: SCHEMA_VERSION,
            session_id: self.session_id.clone(),
            current_index: self.versions.len().saturating_sub(1),
            versions: self.versions.clone(),
        };
        write_json_atomic(&self.path, &doc)
    }

    /// Replace in-memory state with the persisted document.
    ///
    /// Missing or malformed documents reset the session to empty.
    pub fn load(&mut self) {
        self.versions = match read_document(&self.path) {
            Ok(Some(doc)) => {
                tracing::info!(
                    session_id = %self.session_id,
                    versions = doc.versions.len(),
                    "Loaded evolution session"
                );
                doc.versions
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Could not load evolution session, starting empty"
                );
                Vec::new()
            }
        };
    }
}

fn read_document(path: &Path) -> Result<Option<SessionDocument>> {
    let Some(raw) = read_json_value(path)? else {
        return Ok(None);
    };
    let doc: SessionDocument = serde_json::from_value(migrate(raw)?)?;
    Ok(Some(doc))
}

/// `v{sequence}_{first 8 hex chars of sha256(content)}`
pub fn version_id(content: &str, sequence: u32) -> String {
    format!("v{}_{}", sequence, short_digest(&[content], 8))
}

/// Clamp a score into [0, 1]; non-finite scores are rejected since the
/// document cannot represent them.
fn checked_score(score: f64) -> Result<f64> {
    if !score.is_finite() {
        return Err(Error::InvalidScore(score));
    }
    Ok(score.clamp(0.0, 1.0))
}

fn bounded_diff(old: &str, new: &str) -> String {
    let mut lines = unified_diff(old, new, "previous", "current", DIFF_CONTEXT);
    lines.truncate(MAX_DIFF_LINES);
    lines.join("\n")
}

/// Fixed-error descriptors for the next version: the last few previous
/// messages that no longer appear among the current errors.
pub fn resolved_errors(previous_messages: &[String], current: &[ErrorRecord]) -> Vec<String> {
    let start = previous_messages.len().saturating_sub(RESOLVED_LOOKBACK);
    previous_messages[start..]
        .iter()
        .filter(|msg| !current.iter().any(|e| &e.raw_message == *msg))
        .cloned()
        .collect()
}

/// Count items, most frequent first; ties keep first-seen order.
fn count_descending<I: IntoIterator<Item = String>>(items: I) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for item in items {
        match index.get(&item) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(item.clone(), counts.len());
                counts.push((item, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session(dir: &TempDir) -> EvolutionSession {
        EvolutionSession::open(dir.path(), "test")
    }

    fn err(msg: &str) -> ErrorRecord {
        ErrorRecord::new("compilation_error", msg)
    }

    #[test]
    fn test_add_version_appends_and_returns_current_id() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        assert!(s.current_version().is_none());

        let id1 = s.add_version(NewVersion::new("a", 1)).unwrap();
        assert_eq!(s.versions().len(), 1);
        assert_eq!(s.current_version().unwrap().id, id1);

        let id2 = s.add_version(NewVersion::new("a\nb", 2)).unwrap();
        assert_eq!(s.versions().len(), 2);
        assert_eq!(s.current_version().unwrap().id, id2);
        assert!(s.versions().windows(2).all(|w| w[0].sequence < w[1].sequence));
    }

    #[test]
    fn test_version_id_depends_on_sequence() {
        assert_ne!(version_id("same", 1), version_id("same", 2));
        assert_eq!(version_id("same", 1), version_id("same", 1));
        assert!(version_id("same", 7).starts_with("v7_"));
    }

    #[test]
    fn test_rejects_non_increasing_sequence() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        s.add_version(NewVersion::new("a", 3)).unwrap();
        let err = s.add_version(NewVersion::new("b", 3)).unwrap_err();
        assert!(matches!(
            err,
            Error::SequenceNotIncreasing { last: 3, given: 3 }
        ));
        assert_eq!(s.versions().len(), 1);
    }

    #[test]
    fn test_first_version_has_empty_diff() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        s.add_version(NewVersion::new("line one", 1)).unwrap();
        assert!(s.current_version().unwrap().diff_from_previous.is_empty());

        s.add_version(NewVersion::new("line one\nline two", 2)).unwrap();
        let diff = &s.current_version().unwrap().diff_from_previous;
        assert!(diff.starts_with("--- previous\n+++ current"));
        assert!(diff.contains("+line two"));
    }

    #[test]
    fn test_diff_is_bounded() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        let old: Vec<String> = (0..200).map(|i| format!("old {i}")).collect();
        let new: Vec<String> = (0..200).map(|i| format!("new {i}")).collect();
        s.add_version(NewVersion::new(old.join("\n"), 1)).unwrap();
        s.add_version(NewVersion::new(new.join("\n"), 2)).unwrap();
        let diff = &s.current_version().unwrap().diff_from_previous;
        assert_eq!(diff.lines().count(), MAX_DIFF_LINES);
    }

    #[test]
    fn test_quality_is_clamped_and_tags_deduplicated() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        s.add_version(
            NewVersion::new("x", 1)
                .quality(1.7)
                .improvement_areas(["syntax", "syntax", "logic"]),
        )
        .unwrap();
        let v = s.current_version().unwrap();
        assert_eq!(v.quality_score, 1.0);
        assert_eq!(v.improvement_areas, vec!["syntax", "logic"]);
    }

    #[test]
    fn test_build_success_rate() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        assert_eq!(s.build_success_rate(), 0.0);
        s.add_version(NewVersion::new("a", 1).build_succeeded(true)).unwrap();
        s.add_version(NewVersion::new("b", 2)).unwrap();
        assert_eq!(s.build_success_rate(), 0.5);
    }

    #[test]
    fn test_best_version_prefers_earliest_on_tie() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        s.add_version(NewVersion::new("a", 1).quality(0.4)).unwrap();
        let best = s.add_version(NewVersion::new("b", 2).quality(0.9)).unwrap();
        s.add_version(NewVersion::new("c", 3).quality(0.9)).unwrap();
        assert_eq!(s.best_version().unwrap().id, best);
    }

    #[test]
    fn test_improvement_patterns_count_only_improvements() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        s.add_version(NewVersion::new("a", 1).quality(0.2).improvement_areas(["ignored"]))
            .unwrap();
        s.add_version(NewVersion::new("b", 2).quality(0.4).improvement_areas(["syntax", "risk"]))
            .unwrap();
        s.add_version(NewVersion::new("c", 3).quality(0.3).improvement_areas(["risk"]))
            .unwrap();
        s.add_version(NewVersion::new("d", 4).quality(0.6).improvement_areas(["risk"]))
            .unwrap();
        assert_eq!(
            s.improvement_patterns(),
            vec![("risk".to_string(), 2), ("syntax".to_string(), 1)]
        );
    }

    #[test]
    fn test_recurring_errors_group_by_signature() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        s.add_version(NewVersion::new("a", 1).errors(vec![
            err("';' - semicolon expected (3,1)"),
            err("'Lots' - undeclared identifier (4,2)"),
        ]))
        .unwrap();
        s.add_version(NewVersion::new("b", 2).errors(vec![
            err("'Risk' - undeclared identifier (9,2)"),
        ]))
        .unwrap();

        let recurring = s.recurring_errors();
        assert_eq!(recurring[0], ("'identifier' - undeclared identifier".to_string(), 2));
        assert_eq!(recurring[1].1, 1);
        let total: usize = recurring.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_evolution_direction() {
        let dir = TempDir::new().unwrap();
        let mut up = EvolutionSession::open(dir.path(), "up");
        let mut down = EvolutionSession::open(dir.path(), "down");
        for (i, score) in [0.3, 0.5, 0.8].into_iter().enumerate() {
            up.add_version(NewVersion::new("x", i as u32 + 1).quality(score))
                .unwrap();
        }
        for (i, score) in [0.8, 0.5, 0.3].into_iter().enumerate() {
            down.add_version(NewVersion::new("x", i as u32 + 1).quality(score))
                .unwrap();
        }
        assert_eq!(up.evolution_direction(), EvolutionDirection::Improving);
        assert_eq!(down.evolution_direction(), EvolutionDirection::Degrading);
    }

    #[test]
    fn test_direction_needs_three_versions() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        s.add_version(NewVersion::new("a", 1)).unwrap();
        s.add_version(NewVersion::new("b", 2).quality(0.9)).unwrap();
        assert_eq!(s.evolution_direction(), EvolutionDirection::InsufficientData);
    }

    #[test]
    fn test_record_validation_updates_current() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        assert!(matches!(
            s.record_validation(0.5, true, vec![]),
            Err(Error::EmptySession)
        ));

        s.add_version(NewVersion::new("a", 1)).unwrap();
        s.record_validation(0.7, false, vec![err("'x' - undeclared identifier (1,1)")])
            .unwrap();

        let reopened = session(&dir);
        let v = reopened.current_version().unwrap();
        assert_eq!(v.quality_score, 0.7);
        assert!(!v.build_succeeded);
        assert_eq!(v.errors.len(), 1);
    }

    #[test]
    fn test_non_finite_score_is_rejected_and_history_survives() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        s.add_version(NewVersion::new("a", 1).quality(0.5)).unwrap();

        let err = s.add_version(NewVersion::new("b", 2).quality(f64::NAN)).unwrap_err();
        assert!(matches!(err, Error::InvalidScore(_)));
        assert!(matches!(
            s.record_validation(f64::INFINITY, true, vec![]),
            Err(Error::InvalidScore(_))
        ));
        assert_eq!(s.versions().len(), 1);

        let reopened = session(&dir);
        assert_eq!(reopened.versions(), s.versions());
        assert_eq!(reopened.current_version().unwrap().quality_score, 0.5);
    }

    #[test]
    fn test_failed_validation_save_restores_previous_results() {
        let dir = TempDir::new().unwrap();
        let sessions = dir.path().join("sessions");
        let mut s = EvolutionSession::open(&sessions, "s");
        s.add_version(
            NewVersion::new("a", 1)
                .quality(0.2)
                .errors(vec![err("';' - semicolon expected (1,1)")]),
        )
        .unwrap();

        std::fs::remove_dir_all(&sessions).unwrap();
        std::fs::write(&sessions, "file, not dir").unwrap();

        let result = s.record_validation(0.9, true, vec![]);
        assert!(matches!(result, Err(Error::Persist { .. })));
        let v = s.current_version().unwrap();
        assert_eq!(v.quality_score, 0.2);
        assert!(!v.build_succeeded);
        assert_eq!(v.errors.len(), 1);
    }

    #[test]
    fn test_version_lookup_by_id() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        let first = s.add_version(NewVersion::new("a", 1)).unwrap();
        let second = s.add_version(NewVersion::new("b", 2)).unwrap();

        assert_eq!(s.version_by_id(&first).unwrap().content, "a");
        assert_eq!(s.version_by_id(&second).unwrap().sequence, 2);
        assert!(s.version_by_id("v9_deadbeef").is_none());
    }

    #[test]
    fn test_quality_trend_lists_every_version_in_order() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        assert!(s.quality_trend().is_empty());

        s.add_version(NewVersion::new("a", 1).quality(0.3)).unwrap();
        s.add_version(NewVersion::new("b", 2).quality(1.4)).unwrap();
        s.add_version(NewVersion::new("c", 5).quality(0.6)).unwrap();
        assert_eq!(s.quality_trend(), vec![(1, 0.3), (2, 1.0), (5, 0.6)]);
    }

    #[test]
    fn test_resolved_errors_uses_last_five() {
        let previous: Vec<String> = (0..7).map(|i| format!("error {i}")).collect();
        let current = vec![err("error 6")];
        let resolved = resolved_errors(&previous, &current);
        assert_eq!(resolved, vec!["error 2", "error 3", "error 4", "error 5"]);
    }

    #[test]
    fn test_summary_reports_totals() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir);
        s.add_version(
            NewVersion::new("a", 1)
                .quality(0.2)
                .errors(vec![err("';' - semicolon expected (1,1)")]),
        )
        .unwrap();
        s.add_version(
            NewVersion::new("a;", 2)
                .quality(0.6)
                .build_succeeded(true)
                .fixed_errors(vec!["missing semicolon".to_string()]),
        )
        .unwrap();

        let summary = s.summary();
        assert_eq!(summary.total_versions, 2);
        assert_eq!(summary.current_sequence, Some(2));
        assert_eq!(summary.best_quality_score, Some(0.6));
        assert_eq!(summary.fixed_errors_count, 1);
        assert_eq!(
            summary.most_common_error.as_deref(),
            Some("'identifier' - semicolon expected")
        );
        assert_eq!(summary.direction, EvolutionDirection::InsufficientData);
    }

    #[test]
    fn test_malformed_document_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = EvolutionSession::document_path(dir.path(), "broken");
        std::fs::write(&path, "{ not json").unwrap();

        let s = EvolutionSession::open(dir.path(), "broken");
        assert!(s.is_empty());
        assert_eq!(s.last_sequence(), 0);
    }

    #[test]
    fn test_failed_save_surfaces_and_keeps_history() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not dir").unwrap();

        let mut s = EvolutionSession::open(&blocker, "s");
        let err = s.add_version(NewVersion::new("a", 1)).unwrap_err();
        assert!(matches!(err, Error::Persist { .. }));
        assert!(s.is_empty());
    }
}
