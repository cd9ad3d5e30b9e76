//! Plain-text rendering for CLI output

use evoforge_core::categorize::PriorityPlan;
use evoforge_core::{ChangeImpact, EvolutionSummary, FixOutcome, LearningReport};

/// Join lines with a trailing newline, ready for `print!`.
fn finish(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn summary(s: &EvolutionSummary) -> String {
    if s.total_versions == 0 {
        return finish(vec![format!(
            "No attempts recorded for session '{}'.",
            s.session_id
        )]);
    }

    let mut lines = vec![
        format!("Session: {}", s.session_id),
        format!("Attempts: {}", s.total_versions),
    ];
    if let Some(seq) = s.current_sequence {
        lines.push(format!("Current sequence: {}", seq));
    }
    lines.push(format!(
        "Build success rate: {:.1}%",
        s.build_success_rate * 100.0
    ));
    if let Some(best) = s.best_quality_score {
        lines.push(format!("Best quality: {:.2}", best));
    }
    if let Some(latest) = s.latest_quality_score {
        lines.push(format!("Latest quality: {:.2}", latest));
    }
    lines.push(format!("Direction: {}", s.direction));
    lines.push(format!("Fixed errors: {}", s.fixed_errors_count));

    if !s.quality_trend.is_empty() {
        let trend: Vec<String> = s
            .quality_trend
            .iter()
            .map(|(seq, score)| format!("{}:{:.2}", seq, score))
            .collect();
        lines.push(format!("Quality trend: {}", trend.join(" ")));
    }

    if !s.recurring_errors.is_empty() {
        lines.push(String::new());
        lines.push("Recurring errors:".to_string());
        for (signature, count) in &s.recurring_errors {
            lines.push(format!("  {:>3}x {}", count, signature));
        }
    }

    if !s.improvement_patterns.is_empty() {
        lines.push(String::new());
        lines.push("Improvement areas:".to_string());
        for (tag, count) in &s.improvement_patterns {
            lines.push(format!("  {:>3}x {}", count, tag));
        }
    }
    finish(lines)
}

pub fn learning_report(r: &LearningReport) -> String {
    if r.total_patterns == 0 {
        return finish(vec!["No patterns learned yet.".to_string()]);
    }

    let mut lines = vec![
        format!("Patterns: {}", r.total_patterns),
        format!("Average success rate: {:.3}", r.average_success_rate),
        "By fix type:".to_string(),
    ];
    for (fix_type, count) in &r.counts_by_fix_type {
        lines.push(format!("  {:<20} {}", fix_type.as_str(), count));
    }
    if let Some(m) = &r.most_used {
        lines.push(format!(
            "Most used: {} ({} uses, success rate {:.3})",
            m.fix_type, m.usage_count, m.success_rate
        ));
    }
    finish(lines)
}

pub fn priority_plan(plan: &PriorityPlan) -> String {
    let mut lines = Vec::new();
    for (label, bucket) in [
        ("Immediate", &plan.immediate),
        ("Short term", &plan.short_term),
        ("Long term", &plan.long_term),
    ] {
        lines.push(format!("{}: {}", label, bucket.len()));
        for error in bucket {
            lines.push(format!("  [{}] {}", error.kind, error.message));
        }
    }
    finish(lines)
}

pub fn fix_outcome(outcome: &FixOutcome, impact: &ChangeImpact, rollback: bool) -> String {
    if outcome.changes.is_empty() {
        return finish(vec!["No mechanical fixes apply.".to_string()]);
    }

    let mut lines = vec!["Proposed fixes:".to_string()];
    for change in &outcome.changes {
        lines.push(format!(
            "  line {} ({:.0}%): {} -> {}",
            change.line_number,
            change.confidence * 100.0,
            change.old_content.trim(),
            change.new_content.trim()
        ));
    }
    lines.push(format!(
        "Similarity {:.3}, {} changed region(s), change ratio {:.3}",
        impact.similarity_ratio, impact.total_changes, impact.change_ratio
    ));
    lines.push(if rollback {
        "Verdict: roll back".to_string()
    } else {
        "Verdict: keep".to_string()
    });
    finish(lines)
}
