//! Incremental fixer: small mechanical edits driven by categorized errors
//!
//! Fixes are applied one at a time to immutable [`SourceSnapshot`]s, so each
//! later fix sees the result of the earlier ones while the caller keeps the
//! untouched original for comparison or rollback.

use crate::categorize::CategorizedError;
use crate::config::FixerConfig;
use crate::diff::{OpTag, SequenceMatcher};
use crate::types::ErrorKind;
use serde::Serialize;
use std::sync::Arc;

/// Only the most urgent errors are attempted per cycle.
const MAX_ERRORS_CONSIDERED: usize = 3;

/// Indicator calls with fewer commas than this are missing leading arguments.
const MIN_INDICATOR_COMMAS: usize = 5;

/// Above this share of changed regions a fix set should be rolled back.
pub const MAX_CHANGE_RATIO: f64 = 0.10;

/// Below this similarity a fix set must show error improvement to be kept.
pub const MIN_SIMILARITY: f64 = 0.95;

const DEPRECATED_FUNCTIONS: &[(&str, &str)] = &[
    ("MarketInfo(_Symbol, MODE_SPREAD)", "SymbolInfoInteger(_Symbol, SYMBOL_SPREAD)"),
    ("MarketInfo(_Symbol, MODE_ASK)", "SymbolInfoDouble(_Symbol, SYMBOL_ASK)"),
    ("MarketInfo(_Symbol, MODE_BID)", "SymbolInfoDouble(_Symbol, SYMBOL_BID)"),
    ("MarketInfo(_Symbol, MODE_POINT)", "SymbolInfoDouble(_Symbol, SYMBOL_POINT)"),
    (
        "MarketInfo(_Symbol, MODE_TICKVALUE)",
        "SymbolInfoDouble(_Symbol, SYMBOL_TRADE_TICK_VALUE)",
    ),
    (
        "MarketInfo(_Symbol, MODE_TICKSIZE)",
        "SymbolInfoDouble(_Symbol, SYMBOL_TRADE_TICK_SIZE)",
    ),
    (
        "MarketInfo(_Symbol, MODE_LOTSIZE)",
        "SymbolInfoDouble(_Symbol, SYMBOL_TRADE_CONTRACT_SIZE)",
    ),
    ("MarketInfo(_Symbol, MODE_MINLOT)", "SymbolInfoDouble(_Symbol, SYMBOL_VOLUME_MIN)"),
    ("MarketInfo(_Symbol, MODE_MAXLOT)", "SymbolInfoDouble(_Symbol, SYMBOL_VOLUME_MAX)"),
    ("MarketInfo(_Symbol, MODE_LOTSTEP)", "SymbolInfoDouble(_Symbol, SYMBOL_VOLUME_STEP)"),
];

const DEPRECATED_VARIABLES: &[(&str, &str)] = &[
    ("AccountBalance()", "AccountInfoDouble(ACCOUNT_BALANCE)"),
    ("AccountEquity()", "AccountInfoDouble(ACCOUNT_EQUITY)"),
    ("AccountMargin()", "AccountInfoDouble(ACCOUNT_MARGIN)"),
    ("AccountFreeMargin()", "AccountInfoDouble(ACCOUNT_MARGIN_FREE)"),
    ("AccountProfit()", "AccountInfoDouble(ACCOUNT_PROFIT)"),
    ("Ask", "SymbolInfoDouble(_Symbol, SYMBOL_ASK)"),
    ("Bid", "SymbolInfoDouble(_Symbol, SYMBOL_BID)"),
    ("Point", "SymbolInfoDouble(_Symbol, SYMBOL_POINT)"),
    ("Digits", "SymbolInfoInteger(_Symbol, SYMBOL_DIGITS)"),
];

const INDICATOR_CALLS: &[(&str, &str)] = &[
    ("iMA(", "iMA(_Symbol, _Period, "),
    ("iRSI(", "iRSI(_Symbol, _Period, "),
    ("iMACD(", "iMACD(_Symbol, _Period, "),
    ("iATR(", "iATR(_Symbol, _Period, "),
    ("iBands(", "iBands(_Symbol, _Period, "),
    ("iStochastic(", "iStochastic(_Symbol, _Period, "),
];

// ============================================
// Snapshots and changes
// ============================================

/// Immutable line buffer. Cloning shares the lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSnapshot {
    lines: Arc<[String]>,
}

impl SourceSnapshot {
    /// Split on `\n`; a trailing newline yields a trailing empty line.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(String::from).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 1-based line lookup.
    pub fn line(&self, number: u32) -> Option<&str> {
        let index = (number as usize).checked_sub(1)?;
        self.lines.get(index).map(String::as_str)
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    /// New snapshot with `change` applied, or `None` if its line is out of range.
    pub fn with_change(&self, change: &CodeChange) -> Option<SourceSnapshot> {
        let index = (change.line_number as usize).checked_sub(1)?;
        let mut lines = self.lines.to_vec();
        match change.change_type {
            ChangeType::Replace => *lines.get_mut(index)? = change.new_content.clone(),
            ChangeType::Insert => {
                if index > lines.len() {
                    return None;
                }
                lines.insert(index, change.new_content.clone());
            }
            ChangeType::Remove => {
                if index >= lines.len() {
                    return None;
                }
                lines.remove(index);
            }
        }
        Some(Self {
            lines: lines.into(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Replace,
    Insert,
    Remove,
}

/// One mechanical edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeChange {
    /// 1-based line the edit applies to
    pub line_number: u32,
    pub old_content: String,
    pub new_content: String,
    pub change_type: ChangeType,
    /// Confidence in [0, 1]
    pub confidence: f64,
}

impl CodeChange {
    fn replace(line_number: u32, old: &str, new: String, confidence: f64) -> Self {
        Self {
            line_number,
            old_content: old.to_string(),
            new_content: new,
            change_type: ChangeType::Replace,
            confidence,
        }
    }
}

// ============================================
// Fix dispatch
// ============================================

/// Handler family for an error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixFamily {
    AppendSemicolon,
    CloseParenthesis,
    DeprecatedFunction,
    DeprecatedVariable,
    IndicatorArguments,
    Unsupported,
}

impl From<ErrorKind> for FixFamily {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::MissingSemicolon => FixFamily::AppendSemicolon,
            ErrorKind::MissingParenthesis => FixFamily::CloseParenthesis,
            ErrorKind::DeprecatedFunction => FixFamily::DeprecatedFunction,
            ErrorKind::DeprecatedVariable => FixFamily::DeprecatedVariable,
            ErrorKind::WrongParameters => FixFamily::IndicatorArguments,
            ErrorKind::MissingBrace
            | ErrorKind::UndeclaredVariable
            | ErrorKind::DeprecatedConstant
            | ErrorKind::MissingFunction
            | ErrorKind::MissingInclude
            | ErrorKind::Unknown => FixFamily::Unsupported,
        }
    }
}

/// Ordered find/replace tables used by the table-driven fixes.
///
/// The first entry whose key occurs in the line wins.
#[derive(Debug, Clone, PartialEq)]
pub struct FixTables {
    pub deprecated_functions: Vec<(String, String)>,
    pub deprecated_variables: Vec<(String, String)>,
    /// Indicator call prefix and its replacement with leading arguments
    pub indicator_calls: Vec<(String, String)>,
}

impl Default for FixTables {
    fn default() -> Self {
        Self {
            deprecated_functions: owned_table(DEPRECATED_FUNCTIONS),
            deprecated_variables: owned_table(DEPRECATED_VARIABLES),
            indicator_calls: owned_table(INDICATOR_CALLS),
        }
    }
}

fn owned_table(table: &[(&str, &str)]) -> Vec<(String, String)> {
    table
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn first_match<'t>(table: &'t [(String, String)], line: &str) -> Option<&'t (String, String)> {
    table.iter().find(|(key, _)| line.contains(key.as_str()))
}

/// Result of one repair cycle.
#[derive(Debug, Clone)]
pub struct FixOutcome {
    pub snapshot: SourceSnapshot,
    pub changes: Vec<CodeChange>,
}

/// How much a fix set moved the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChangeImpact {
    pub similarity_ratio: f64,
    /// Number of non-equal aligned regions
    pub total_changes: usize,
    /// `total_changes / before.len()`, 0 for an empty buffer
    pub change_ratio: f64,
    pub line_count_delta: i64,
}

#[derive(Debug, Clone)]
pub struct IncrementalFixer {
    max_changes_per_iteration: usize,
    tables: FixTables,
}

impl Default for IncrementalFixer {
    fn default() -> Self {
        Self::from_config(&FixerConfig::default())
    }
}

impl IncrementalFixer {
    pub fn new(max_changes_per_iteration: usize) -> Self {
        Self {
            max_changes_per_iteration,
            tables: FixTables::default(),
        }
    }

    pub fn from_config(config: &FixerConfig) -> Self {
        Self::new(config.max_changes_per_iteration)
    }

    pub fn with_tables(mut self, tables: FixTables) -> Self {
        self.tables = tables;
        self
    }

    pub fn tables(&self) -> &FixTables {
        &self.tables
    }

    /// Apply fixes for the first few errors, in order, up to the change cap.
    ///
    /// Errors without a usable line, or with no applicable fix, are skipped.
    pub fn apply_minimal_fixes(
        &self,
        source: &SourceSnapshot,
        errors: &[CategorizedError],
    ) -> FixOutcome {
        let mut snapshot = source.clone();
        let mut changes: Vec<CodeChange> = Vec::new();

        for error in errors.iter().take(MAX_ERRORS_CONSIDERED) {
            if changes.len() >= self.max_changes_per_iteration {
                break;
            }
            let Some(change) = self.fix_one(&snapshot, error) else {
                continue;
            };
            if let Some(next) = snapshot.with_change(&change) {
                snapshot = next;
                changes.push(change);
            }
        }

        tracing::debug!(
            considered = errors.len().min(MAX_ERRORS_CONSIDERED),
            applied = changes.len(),
            "Applied minimal fixes"
        );
        FixOutcome { snapshot, changes }
    }

    fn fix_one(&self, snapshot: &SourceSnapshot, error: &CategorizedError) -> Option<CodeChange> {
        let Some(number) = error.line_number() else {
            tracing::debug!(message = %error.message, "No line number, skipping fix");
            return None;
        };
        let Some(line) = snapshot.line(number) else {
            tracing::debug!(line = number, lines = snapshot.len(), "Line out of range, skipping fix");
            return None;
        };

        match FixFamily::from(error.kind) {
            FixFamily::AppendSemicolon => Some(CodeChange::replace(
                number,
                line,
                format!("{};", line.trim_end()),
                0.95,
            )),
            FixFamily::CloseParenthesis => {
                let open = line.matches('(').count();
                let close = line.matches(')').count();
                (open > close).then(|| {
                    CodeChange::replace(number, line, format!("{})", line.trim_end()), 0.90)
                })
            }
            FixFamily::DeprecatedFunction => first_match(&self.tables.deprecated_functions, line)
                .map(|(old, new)| CodeChange::replace(number, line, line.replace(old, new), 0.85)),
            FixFamily::DeprecatedVariable => first_match(&self.tables.deprecated_variables, line)
                .map(|(old, new)| CodeChange::replace(number, line, line.replace(old, new), 0.80)),
            FixFamily::IndicatorArguments => {
                if line.matches(',').count() >= MIN_INDICATOR_COMMAS {
                    return None;
                }
                first_match(&self.tables.indicator_calls, line)
                    .map(|(old, new)| CodeChange::replace(number, line, line.replace(old, new), 0.70))
            }
            FixFamily::Unsupported => None,
        }
    }
}

/// Line-aligned impact of going from `before` to `after`.
pub fn impact(before: &SourceSnapshot, after: &SourceSnapshot) -> ChangeImpact {
    let matcher = SequenceMatcher::new(before.lines(), after.lines());
    let total_changes = matcher
        .opcodes()
        .iter()
        .filter(|op| op.tag != OpTag::Equal)
        .count();
    let change_ratio = if before.is_empty() {
        0.0
    } else {
        total_changes as f64 / before.len() as f64
    };
    ChangeImpact {
        similarity_ratio: matcher.ratio(),
        total_changes,
        change_ratio,
        line_count_delta: after.len() as i64 - before.len() as i64,
    }
}

/// Whether a fix set should be discarded.
///
/// `error_improvement` is the error count before minus the count after.
pub fn should_rollback(impact: &ChangeImpact, error_improvement: i64) -> bool {
    if impact.change_ratio > MAX_CHANGE_RATIO {
        return true;
    }
    impact.similarity_ratio < MIN_SIMILARITY && error_improvement <= 0
}
