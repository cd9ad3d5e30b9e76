//! Error categorization and fix prioritization
//!
//! Each raw compiler message is matched against three ordered rule tiers.
//! The first matching rule of the first matching tier wins, so a broad
//! simple-tier rule can shadow a more specific medium-tier one.
//!
//! | Priority | Tier | Plan bucket |
//! |----------|------|-------------|
//! | 1-2 | simple | immediate |
//! | 3-5 | medium | short term |
//! | 6-7 | complex | long term |
//! | 8 | medium (unknown) | long term |

use crate::normalize::{extract_identifier, extract_location};
use crate::types::{ErrorKind, Tier};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Priority given to messages no rule recognizes.
pub const UNKNOWN_PRIORITY: u8 = 8;

/// Fallback text for unresolved template placeholders.
const UNRESOLVED: &str = "?";

struct Rule {
    pattern: Regex,
    kind: ErrorKind,
    priority: u8,
    strategy: &'static str,
    template: &'static str,
}

fn rule(
    pattern: &str,
    kind: ErrorKind,
    priority: u8,
    strategy: &'static str,
    template: &'static str,
) -> Rule {
    Rule {
        pattern: Regex::new(&format!("(?i){}", pattern)).unwrap(),
        kind,
        priority,
        strategy,
        template,
    }
}

static TIERS: LazyLock<Vec<(Tier, Vec<Rule>)>> = LazyLock::new(|| {
    vec![
        (
            Tier::Simple,
            vec![
                rule(
                    r"';' - semicolon expected",
                    ErrorKind::MissingSemicolon,
                    1,
                    "Add missing semicolon",
                    "Line {line}: Add ; at end of statement",
                ),
                rule(
                    r"'\)' - \) expected",
                    ErrorKind::MissingParenthesis,
                    1,
                    "Add missing closing parenthesis",
                    "Line {line}: Add ) to close function call",
                ),
                rule(
                    r"'\}' - \} expected",
                    ErrorKind::MissingBrace,
                    1,
                    "Add missing closing brace",
                    "Line {line}: Add } to close block",
                ),
                rule(
                    r"undeclared identifier",
                    ErrorKind::UndeclaredVariable,
                    2,
                    "Declare variable or fix typo",
                    "Line {line}: Declare {variable} or check spelling",
                ),
            ],
        ),
        (
            Tier::Medium,
            vec![
                rule(
                    r"wrong parameters count",
                    ErrorKind::WrongParameters,
                    3,
                    "Fix function parameters",
                    "Line {line}: Check {function} parameter count",
                ),
                rule(
                    r"'MarketInfo' - undeclared identifier",
                    ErrorKind::DeprecatedFunction,
                    3,
                    "Replace with the SymbolInfo* equivalent",
                    "Line {line}: Replace MarketInfo with SymbolInfo*",
                ),
                rule(
                    r"'Ask'|'Bid' - undeclared identifier",
                    ErrorKind::DeprecatedVariable,
                    3,
                    "Replace with SymbolInfoDouble",
                    "Line {line}: Replace Ask/Bid with SymbolInfoDouble",
                ),
                rule(
                    r"'OP_BUY'|'OP_SELL' - undeclared identifier",
                    ErrorKind::DeprecatedConstant,
                    4,
                    "Replace with ORDER_TYPE_*",
                    "Line {line}: Replace OP_* with ORDER_TYPE_*",
                ),
            ],
        ),
        (
            Tier::Complex,
            vec![
                rule(
                    r"'OnInit' - function not defined",
                    ErrorKind::MissingFunction,
                    6,
                    "Add missing OnInit function",
                    "Add complete OnInit() function with proper initialization",
                ),
                rule(
                    r"'OnTick' - function not defined",
                    ErrorKind::MissingFunction,
                    6,
                    "Add missing OnTick function",
                    "Add complete OnTick() function with trading logic",
                ),
                rule(
                    r"'CTrade' - undeclared identifier",
                    ErrorKind::MissingInclude,
                    7,
                    "Add Trade.mqh include and CTrade object",
                    "Add #include <Trade\\Trade.mqh> and CTrade trade;",
                ),
            ],
        ),
    ]
});

/// A raw message with its kind, tier, priority and fix guidance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizedError {
    pub message: String,
    pub kind: ErrorKind,
    pub tier: Tier,
    /// Lower is more urgent
    pub priority: u8,
    pub fix_strategy: String,
    pub fix_template: String,
}

impl CategorizedError {
    /// 1-based line from the message's `(line,col)` token.
    pub fn line_number(&self) -> Option<u32> {
        extract_location(&self.message).map(|(line, _)| line)
    }
}

/// Categorize one raw message. Never fails: unmatched messages are
/// [`ErrorKind::Unknown`].
pub fn categorize(raw: &str) -> CategorizedError {
    let line = extract_location(raw)
        .map(|(line, _)| line.to_string())
        .unwrap_or_else(|| UNRESOLVED.to_string());
    let identifier = extract_identifier(raw).unwrap_or(UNRESOLVED);

    for (tier, rules) in TIERS.iter() {
        if let Some(rule) = rules.iter().find(|r| r.pattern.is_match(raw)) {
            return CategorizedError {
                message: raw.to_string(),
                kind: rule.kind,
                tier: *tier,
                priority: rule.priority,
                fix_strategy: rule.strategy.to_string(),
                fix_template: rule
                    .template
                    .replace("{line}", &line)
                    .replace("{variable}", identifier)
                    .replace("{function}", identifier),
            };
        }
    }

    CategorizedError {
        message: raw.to_string(),
        kind: ErrorKind::Unknown,
        tier: Tier::Medium,
        priority: UNKNOWN_PRIORITY,
        fix_strategy: "Manual investigation required".to_string(),
        fix_template: format!("Line {}: Check error manually", line),
    }
}

/// Categorize every message, most urgent first. Equal priorities keep
/// input order.
pub fn categorize_all<S: AsRef<str>>(raws: &[S]) -> Vec<CategorizedError> {
    let mut out: Vec<CategorizedError> = raws.iter().map(|r| categorize(r.as_ref())).collect();
    out.sort_by_key(|c| c.priority);
    out
}

/// Categorized errors split by urgency.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PriorityPlan {
    /// Priority 1-2
    pub immediate: Vec<CategorizedError>,
    /// Priority 3-5
    pub short_term: Vec<CategorizedError>,
    /// Priority 6 and above
    pub long_term: Vec<CategorizedError>,
}

pub fn priority_plan(errors: &[CategorizedError]) -> PriorityPlan {
    let mut plan = PriorityPlan::default();
    for error in errors {
        let bucket = match error.priority {
            0..=2 => &mut plan.immediate,
            3..=5 => &mut plan.short_term,
            _ => &mut plan.long_term,
        };
        bucket.push(error.clone());
    }
    plan
}

/// Numbered fix instructions for at most `max_fixes` errors.
pub fn focused_instructions(errors: &[CategorizedError], max_fixes: usize) -> String {
    if errors.is_empty() {
        return "No prioritized errors found.".to_string();
    }

    let shown = &errors[..errors.len().min(max_fixes)];
    let mut lines = vec![
        "FOCUSED ERROR FIXES (top priority):".to_string(),
        "=".repeat(50),
    ];
    for (i, error) in shown.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!(
            "{}. {} ERROR (Priority {}):",
            i + 1,
            error.tier.as_str().to_uppercase(),
            error.priority
        ));
        lines.push(format!("   Problem: {}", error.kind));
        lines.push(format!("   Strategy: {}", error.fix_strategy));
        lines.push(format!("   Template: {}", error.fix_template));
    }
    lines.push(String::new());
    lines.push(format!("FOCUS: fix ONLY these {} errors.", shown.len()));
    lines.push("Change nothing else.".to_string());
    lines.push("One iteration = one error type.".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semicolon_is_simple_priority_one() {
        let c = categorize("';' - semicolon expected (12,4)");
        assert_eq!(c.kind, ErrorKind::MissingSemicolon);
        assert_eq!(c.tier, Tier::Simple);
        assert_eq!(c.priority, 1);
        assert!(c.fix_template.contains("12"));
        assert_eq!(c.line_number(), Some(12));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let c = categorize("WRONG PARAMETERS COUNT (3,1)");
        assert_eq!(c.kind, ErrorKind::WrongParameters);
        assert_eq!(c.tier, Tier::Medium);
    }

    #[test]
    fn test_simple_tier_shadows_deprecated_identifiers() {
        // "undeclared identifier" in the simple tier matches first
        let c = categorize("'MarketInfo' - undeclared identifier (8,5)");
        assert_eq!(c.kind, ErrorKind::UndeclaredVariable);
        assert_eq!(c.priority, 2);
        assert_eq!(c.fix_template, "Line 8: Declare MarketInfo or check spelling");
    }

    #[test]
    fn test_complex_tier() {
        let c = categorize("'OnTick' - function not defined");
        assert_eq!(c.kind, ErrorKind::MissingFunction);
        assert_eq!(c.tier, Tier::Complex);
        assert_eq!(c.priority, 6);
    }

    #[test]
    fn test_unknown_fallback() {
        let c = categorize("something odd happened");
        assert_eq!(c.kind, ErrorKind::Unknown);
        assert_eq!(c.tier, Tier::Medium);
        assert_eq!(c.priority, UNKNOWN_PRIORITY);
        assert_eq!(c.fix_strategy, "Manual investigation required");
        assert_eq!(c.fix_template, "Line ?: Check error manually");
    }

    #[test]
    fn test_unresolved_placeholders_render_question_mark() {
        let c = categorize("wrong parameters count");
        assert_eq!(c.fix_template, "Line ?: Check ? parameter count");
    }

    #[test]
    fn test_categorize_all_is_stable_by_priority() {
        let raws = [
            "'OnInit' - function not defined",
            "'a' - undeclared identifier (1,1)",
            "';' - semicolon expected (2,1)",
            "'b' - undeclared identifier (3,1)",
        ];
        let sorted = categorize_all(&raws);
        let order: Vec<&str> = sorted.iter().map(|c| c.message.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "';' - semicolon expected (2,1)",
                "'a' - undeclared identifier (1,1)",
                "'b' - undeclared identifier (3,1)",
                "'OnInit' - function not defined",
            ]
        );
    }

    #[test]
    fn test_priority_plan_buckets() {
        let errors = categorize_all(&[
            "';' - semicolon expected (1,1)",
            "wrong parameters count (2,1)",
            "'CTrade' - function not defined",
            "mystery",
        ]);
        let plan = priority_plan(&errors);
        assert_eq!(plan.immediate.len(), 1);
        assert_eq!(plan.short_term.len(), 1);
        assert_eq!(plan.long_term.len(), 2);
    }

    #[test]
    fn test_focused_instructions() {
        assert_eq!(focused_instructions(&[], 5), "No prioritized errors found.");

        let errors = categorize_all(&[
            "';' - semicolon expected (1,1)",
            "wrong parameters count (2,1)",
            "mystery",
        ]);
        let text = focused_instructions(&errors, 2);
        assert!(text.contains("1. SIMPLE ERROR (Priority 1):"));
        assert!(text.contains("2. MEDIUM ERROR (Priority 3):"));
        assert!(!text.contains("3."));
        assert!(text.contains("FOCUS: fix ONLY these 2 errors."));
        assert!(text.ends_with("One iteration = one error type."));
    }
}
