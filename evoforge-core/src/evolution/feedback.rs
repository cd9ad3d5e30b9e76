//! Text feedback rendered from a session's history

use super::{count_descending, EvolutionSession};
use crate::types::EvolutionDirection;

/// Message for a session with no attempts yet.
pub const FIRST_ATTEMPT_FEEDBACK: &str =
    "First attempt - focus on basic structure and core requirements.";

const MAX_RECURRING: usize = 5;
const MAX_FIXED: usize = 3;
const RECENT_WINDOW: usize = 5;
const MAX_FAILED: usize = 3;
const ERRORS_PER_FAILED: usize = 2;
const MAX_SUCCEEDED: usize = 2;
const FIXES_PER_SUCCEEDED: usize = 3;

impl EvolutionSession {
    /// Summary of past failures and repairs for the next generation prompt.
    ///
    /// Sections without content are left out; an empty session renders as
    /// an empty string.
    pub fn error_learning_context(&self) -> String {
        let mut sections: Vec<Vec<String>> = Vec::new();

        let recurring = self.recurring_errors();
        if !recurring.is_empty() {
            let mut lines = vec!["RECURRING ERRORS (avoid these):".to_string()];
            lines.extend(
                recurring
                    .iter()
                    .take(MAX_RECURRING)
                    .map(|(sig, count)| format!("  - {} (seen {}x)", sig, count)),
            );
            sections.push(lines);
        }

        let fixed = count_descending(
            self.versions
                .iter()
                .flat_map(|v| v.fixed_errors.iter().cloned()),
        );
        if !fixed.is_empty() {
            let mut lines = vec!["PREVIOUSLY FIXED ERRORS (for reference):".to_string()];
            lines.extend(
                fixed
                    .iter()
                    .take(MAX_FIXED)
                    .map(|(descriptor, _)| format!("  - {}", descriptor)),
            );
            sections.push(lines);
        }

        let recent_start = self.versions.len().saturating_sub(RECENT_WINDOW);
        let failed: Vec<_> = self.versions[recent_start..]
            .iter()
            .filter(|v| !v.build_succeeded)
            .collect();
        if !failed.is_empty() {
            let mut lines = vec!["RECENT BUILD FAILURES:".to_string()];
            for version in &failed[failed.len().saturating_sub(MAX_FAILED)..] {
                lines.push(format!("  Attempt {}:", version.sequence));
                lines.extend(
                    version
                        .errors
                        .iter()
                        .take(ERRORS_PER_FAILED)
                        .map(|e| format!("    - {}: {}", e.kind, e.raw_message)),
                );
            }
            sections.push(lines);
        }

        let succeeded: Vec<_> = self.versions.iter().filter(|v| v.build_succeeded).collect();
        let repairs: Vec<String> = succeeded[succeeded.len().saturating_sub(MAX_SUCCEEDED)..]
            .iter()
            .filter(|v| !v.fixed_errors.is_empty())
            .map(|v| {
                let shown: Vec<&str> = v
                    .fixed_errors
                    .iter()
                    .take(FIXES_PER_SUCCEEDED)
                    .map(String::as_str)
                    .collect();
                format!("  Attempt {} fixed: {}", v.sequence, shown.join(", "))
            })
            .collect();
        if !repairs.is_empty() {
            let mut lines = vec![format!(
                "SUCCESSFUL REPAIRS (from {} successful attempts):",
                succeeded.len()
            )];
            lines.extend(repairs);
            sections.push(lines);
        }

        sections
            .iter()
            .map(|lines| lines.join("\n"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Guidance for the next attempt based on direction, build rate and the
    /// latest score.
    pub fn targeted_feedback(&self) -> String {
        let Some(current) = self.current_version() else {
            return FIRST_ATTEMPT_FEEDBACK.to_string();
        };

        let mut lines = vec![
            format!("Evolution status (attempt {}):", current.sequence),
            String::new(),
        ];

        let direction_line = match self.evolution_direction() {
            EvolutionDirection::Improving => "Quality is improving - keep the current direction.",
            EvolutionDirection::Degrading => {
                "Quality is degrading - review the last changes that worked."
            }
            EvolutionDirection::Stable => "Quality is stable - try a new improvement approach.",
            EvolutionDirection::InsufficientData => {
                "Not enough attempts yet to judge the direction."
            }
        };
        lines.push(direction_line.to_string());

        let rate = self.build_success_rate();
        if rate < 0.70 {
            lines.push(format!(
                "Low build success rate ({:.1}%) - focus on syntax.",
                rate * 100.0
            ));
        } else if rate > 0.90 {
            lines.push(format!("Excellent build success rate ({:.1}%).", rate * 100.0));
        }

        if let Some((tag, _)) = self.improvement_patterns().first() {
            lines.push(format!("Most effective improvement area: {}", tag));
        }

        if !current.build_succeeded {
            lines.push(String::new());
            lines.push("PRIORITY: fix build errors before adding features.".to_string());
        }

        let focus = if current.quality_score < 0.5 {
            "FOCUS: fix structure and implement the core requirements."
        } else if current.quality_score < 0.8 {
            "FOCUS: improve logic and extend error handling."
        } else {
            "FOCUS: optimize performance and extend features."
        };
        lines.push(String::new());
        lines.push(focus.to_string());

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::super::NewVersion;
    use super::*;
    use crate::types::ErrorRecord;
    use tempfile::TempDir;

    fn err(msg: &str) -> ErrorRecord {
        ErrorRecord::new("compilation_error", msg)
    }

    #[test]
    fn test_empty_session_feedback() {
        let dir = TempDir::new().unwrap();
        let s = EvolutionSession::open(dir.path(), "empty");
        assert_eq!(s.targeted_feedback(), FIRST_ATTEMPT_FEEDBACK);
        assert_eq!(s.error_learning_context(), "");
    }

    #[test]
    fn test_feedback_for_failed_low_quality_attempt() {
        let dir = TempDir::new().unwrap();
        let mut s = EvolutionSession::open(dir.path(), "low");
        s.add_version(NewVersion::new("a", 1).quality(0.3)).unwrap();

        let text = s.targeted_feedback();
        assert!(text.starts_with("Evolution status (attempt 1):"));
        assert!(text.contains("Not enough attempts"));
        assert!(text.contains("Low build success rate (0.0%)"));
        assert!(text.contains("PRIORITY: fix build errors"));
        assert!(text.contains("FOCUS: fix structure"));
    }

    #[test]
    fn test_feedback_for_successful_high_quality_attempts() {
        let dir = TempDir::new().unwrap();
        let mut s = EvolutionSession::open(dir.path(), "high");
        s.add_version(NewVersion::new("a", 1).quality(0.6).build_succeeded(true))
            .unwrap();
        s.add_version(
            NewVersion::new("b", 2)
                .quality(0.9)
                .build_succeeded(true)
                .improvement_areas(["risk management"]),
        )
        .unwrap();

        let text = s.targeted_feedback();
        assert!(text.contains("Excellent build success rate (100.0%)"));
        assert!(text.contains("Most effective improvement area: risk management"));
        assert!(!text.contains("PRIORITY"));
        assert!(text.contains("FOCUS: optimize"));
    }

    #[test]
    fn test_learning_context_sections() {
        let dir = TempDir::new().unwrap();
        let mut s = EvolutionSession::open(dir.path(), "ctx");
        s.add_version(NewVersion::new("a", 1).errors(vec![
            err("'Lots' - undeclared identifier (4,2)"),
            err("';' - semicolon expected (5,1)"),
            err("'x' - undeclared identifier (6,2)"),
        ]))
        .unwrap();
        s.add_version(
            NewVersion::new("b", 2)
                .build_succeeded(true)
                .fixed_errors(vec!["missing semicolon".to_string()]),
        )
        .unwrap();

        let ctx = s.error_learning_context();
        assert!(ctx.contains("RECURRING ERRORS (avoid these):"));
        assert!(ctx.contains("'identifier' - undeclared identifier (seen 2x)"));
        assert!(ctx.contains("PREVIOUSLY FIXED ERRORS (for reference):\n  - missing semicolon"));
        assert!(ctx.contains("RECENT BUILD FAILURES:\n  Attempt 1:"));
        // only the first two errors of a failed attempt are listed
        assert!(!ctx.contains("(6,2)"));
        assert!(ctx.contains("SUCCESSFUL REPAIRS (from 1 successful attempts):"));
        assert!(ctx.contains("Attempt 2 fixed: missing semicolon"));
    }

    #[test]
    fn test_repairs_section_omitted_without_fixes() {
        let dir = TempDir::new().unwrap();
        let mut s = EvolutionSession::open(dir.path(), "nofix");
        s.add_version(NewVersion::new("a", 1).build_succeeded(true)).unwrap();
        assert!(!s.error_learning_context().contains("SUCCESSFUL REPAIRS"));
    }
}
