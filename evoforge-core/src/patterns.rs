//! Success pattern library
//!
//! Learns single-line repairs from attempts that built, and suggests them for
//! similar lines later. Patterns are keyed by a digest of their signature and
//! original line, so seeing the same repair again reinforces one pattern
//! instead of adding a duplicate.

use crate::config::Config;
use crate::diff::{char_ratio, OpTag, SequenceMatcher};
use crate::error::{Error, Result};
use crate::evolution::schema::upgrade_timestamp;
use crate::hash::short_digest;
use crate::persist::{read_json_value, write_json_atomic};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Current pattern document schema version
pub const PATTERN_SCHEMA_VERSION: u32 = 1;

/// Lines must be more similar than this for a pattern to apply.
pub const SIMILARITY_THRESHOLD: f64 = 0.70;

const MAX_SUGGESTIONS: usize = 3;
const INITIAL_CONFIDENCE: f64 = 0.8;
const MAX_CONFIDENCE: f64 = 0.95;
const CONFIDENCE_STEP: f64 = 0.05;
/// Weight of the newest observation in the success-rate moving average
const SUCCESS_ALPHA: f64 = 0.1;

const ORDER_CONSTANTS: &[&str] = &["OP_BUY", "OP_SELL", "OP_BUYLIMIT"];
const ACCOUNT_VARIABLES: &[&str] = &["Ask", "Bid", "Point", "Digits"];
const SYNTAX_MARKERS: &[&str] = &["expected", "undeclared", "syntax error"];

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// What kind of repair a pattern captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixType {
    DeprecatedFunction,
    DeprecatedVariable,
    SyntaxSemicolon,
    SyntaxParenthesis,
    Unknown,
}

impl FixType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixType::DeprecatedFunction => "deprecated_function",
            FixType::DeprecatedVariable => "deprecated_variable",
            FixType::SyntaxSemicolon => "syntax_semicolon",
            FixType::SyntaxParenthesis => "syntax_parenthesis",
            FixType::Unknown => "unknown",
        }
    }

    /// Classify a repair of `original` into `fixed`.
    pub fn classify(original: &str, fixed: &str) -> Self {
        if original.contains("MarketInfo") && fixed.contains("SymbolInfo") {
            FixType::DeprecatedFunction
        } else if ACCOUNT_VARIABLES.iter().any(|v| original.contains(v)) {
            FixType::DeprecatedVariable
        } else if format!("{};", original.trim_end()) == fixed {
            FixType::SyntaxSemicolon
        } else if format!("{})", original) == fixed {
            FixType::SyntaxParenthesis
        } else {
            FixType::Unknown
        }
    }
}

impl std::fmt::Display for FixType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A learned single-line repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessPattern {
    pub pattern_id: String,
    pub error_signature: String,
    pub original_code_snippet: String,
    pub fixed_code_snippet: String,
    pub fix_type: FixType,
    /// Moving average of outcomes, in [0, 1]
    pub success_rate: f64,
    pub usage_count: u32,
    pub last_used: DateTime<Utc>,
    /// In [0, 0.95]
    pub confidence: f64,
}

impl SuccessPattern {
    /// Ranking score for suggestions.
    pub fn score(&self) -> f64 {
        self.confidence * self.success_rate
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PatternDocument {
    schema_version: u32,
    patterns: Vec<SuccessPattern>,
}

/// Most-used pattern in a [`LearningReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MostUsed {
    pub fix_type: FixType,
    pub usage_count: u32,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningReport {
    pub total_patterns: usize,
    pub counts_by_fix_type: BTreeMap<FixType, usize>,
    pub average_success_rate: f64,
    pub most_used: Option<MostUsed>,
}

/// Persisted collection of success patterns.
#[derive(Debug)]
pub struct PatternLibrary {
    path: PathBuf,
    patterns: Vec<SuccessPattern>,
}

impl PatternLibrary {
    /// Open the library at `path`. Missing or malformed documents give an
    /// empty library.
    pub fn open(path: &Path) -> Self {
        let patterns = match read_document(path) {
            Ok(Some(doc)) => doc.patterns,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Could not load pattern library, starting empty"
                );
                Vec::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            patterns,
        }
    }

    pub fn open_configured(config: &Config) -> Self {
        Self::open(&config.patterns_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn patterns(&self) -> &[SuccessPattern] {
        &self.patterns
    }

    pub fn get(&self, pattern_id: &str) -> Option<&SuccessPattern> {
        self.patterns.iter().find(|p| p.pattern_id == pattern_id)
    }

    /// Learn the single-line repairs between `original` and `fixed`.
    ///
    /// Does nothing unless the fixed text built. Returns how many patterns
    /// were added or reinforced. If persisting fails the library is left as
    /// it was.
    pub fn learn_from_success<S: AsRef<str>>(
        &mut self,
        original: &str,
        fixed: &str,
        build_succeeded: bool,
        error_messages: &[S],
    ) -> Result<usize> {
        if !build_succeeded {
            return Ok(0);
        }

        let joined = join_messages(error_messages);
        let previous = self.patterns.clone();
        let mut upserted = 0;
        for (before, after) in line_replacements(original, fixed) {
            let before = before.trim();
            let after = after.trim();
            if before.is_empty() || after.is_empty() {
                continue;
            }
            let Some(signature) = signature_for(before, &joined) else {
                tracing::debug!(line = before, "No signature for repaired line, skipping");
                continue;
            };
            self.upsert(signature, before, after);
            upserted += 1;
        }

        if let Err(e) = self.save() {
            self.patterns = previous;
            return Err(e);
        }
        tracing::info!(
            upserted,
            total = self.patterns.len(),
            "Learned from successful build"
        );
        Ok(upserted)
    }

    fn upsert(&mut self, signature: String, before: &str, after: &str) {
        let pattern_id = short_digest(&[signature.as_str(), before], 16);
        let now = Utc::now();

        if let Some(existing) = self.patterns.iter_mut().find(|p| p.pattern_id == pattern_id) {
            existing.usage_count += 1;
            existing.last_used = now;
            existing.success_rate =
                ((1.0 - SUCCESS_ALPHA) * existing.success_rate + SUCCESS_ALPHA).clamp(0.0, 1.0);
            existing.confidence = (existing.confidence + CONFIDENCE_STEP).min(MAX_CONFIDENCE);
            return;
        }

        self.patterns.push(SuccessPattern {
            pattern_id,
            error_signature: signature,
            original_code_snippet: before.to_string(),
            fixed_code_snippet: after.to_string(),
            fix_type: FixType::classify(before, after),
            success_rate: 1.0,
            usage_count: 1,
            last_used: now,
            confidence: INITIAL_CONFIDENCE,
        });
    }

    /// Up to three patterns that fit `line` and its errors, best first.
    pub fn applicable_patterns<S: AsRef<str>>(
        &self,
        error_messages: &[S],
        line: &str,
    ) -> Vec<&SuccessPattern> {
        let Some(signature) = signature_for(line, &join_messages(error_messages)) else {
            return Vec::new();
        };
        let target = normalize_line(line);

        let mut found: Vec<&SuccessPattern> = self
            .patterns
            .iter()
            .filter(|p| p.error_signature.contains(&signature))
            .filter(|p| {
                char_ratio(&target, &normalize_line(&p.original_code_snippet))
                    > SIMILARITY_THRESHOLD
            })
            .collect();
        found.sort_by(|a, b| b.score().total_cmp(&a.score()));
        found.truncate(MAX_SUGGESTIONS);
        found
    }

    pub fn report(&self) -> LearningReport {
        let mut counts_by_fix_type = BTreeMap::new();
        let mut most_used: Option<&SuccessPattern> = None;
        for pattern in &self.patterns {
            *counts_by_fix_type.entry(pattern.fix_type).or_insert(0) += 1;
            if most_used.map_or(true, |m| pattern.usage_count > m.usage_count) {
                most_used = Some(pattern);
            }
        }

        let average_success_rate = if self.patterns.is_empty() {
            0.0
        } else {
            self.patterns.iter().map(|p| p.success_rate).sum::<f64>() / self.patterns.len() as f64
        };

        LearningReport {
            total_patterns: self.patterns.len(),
            counts_by_fix_type,
            average_success_rate,
            most_used: most_used.map(|p| MostUsed {
                fix_type: p.fix_type,
                usage_count: p.usage_count,
                success_rate: p.success_rate,
            }),
        }
    }

    pub fn save(&self) -> Result<()> {
        let doc = PatternDocument {
            schema_version: PATTERN_SCHEMA_VERSION,
            patterns: self.patterns.clone(),
        };
        write_json_atomic(&self.path, &doc)
    }
}

fn read_document(path: &Path) -> Result<Option<PatternDocument>> {
    let Some(raw) = read_json_value(path)? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_value(migrate(raw)?)?))
}

/// Upgrade a raw pattern document to [`PATTERN_SCHEMA_VERSION`].
///
/// The legacy layout is a bare array of patterns with naive timestamps.
pub fn migrate(doc: Value) -> Result<Value> {
    let mut doc = match doc {
        Value::Array(patterns) => serde_json::json!({
            "schema_version": PATTERN_SCHEMA_VERSION,
            "patterns": patterns,
        }),
        obj @ Value::Object(_) => obj,
        _ => {
            return Err(Error::Schema(
                "pattern document is neither an object nor an array".to_string(),
            ))
        }
    };

    let version = doc
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    if version > PATTERN_SCHEMA_VERSION as u64 {
        return Err(Error::Schema(format!(
            "pattern document schema {} is newer than supported {}",
            version, PATTERN_SCHEMA_VERSION
        )));
    }

    if let Some(Value::Array(patterns)) = doc.get_mut("patterns") {
        for pattern in patterns.iter_mut().filter_map(Value::as_object_mut) {
            if let Some(Value::String(ts)) = pattern.get_mut("last_used") {
                if let Some(upgraded) = upgrade_timestamp(ts) {
                    *ts = upgraded;
                }
            }
        }
    }
    Ok(doc)
}

fn join_messages<S: AsRef<str>>(messages: &[S]) -> String {
    messages
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}

/// One-to-one line replacements between two texts.
fn line_replacements<'a>(original: &'a str, fixed: &'a str) -> Vec<(&'a str, &'a str)> {
    let a: Vec<&str> = original.split('\n').collect();
    let b: Vec<&str> = fixed.split('\n').collect();
    SequenceMatcher::new(&a, &b)
        .opcodes()
        .into_iter()
        .filter(|op| op.tag == OpTag::Replace && op.a.len() == 1 && op.b.len() == 1)
        .map(|op| (a[op.a.start], b[op.b.start]))
        .collect()
}

/// Keyword signature of a line given the error text it was reported with.
///
/// `None` when no heuristic recognizes the line.
pub fn signature_for(line: &str, joined_errors: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();

    if line.contains("MarketInfo") {
        parts.push("deprecated_marketinfo");
    }
    if ORDER_CONSTANTS.iter().any(|c| line.contains(c)) {
        parts.push("deprecated_order_constant");
    }
    if ACCOUNT_VARIABLES.iter().any(|v| line.contains(v)) {
        parts.push("deprecated_account_variable");
    }
    if SYNTAX_MARKERS.iter().any(|m| joined_errors.contains(m)) {
        if !line.ends_with(';') && (line.contains('=') || line.contains("return")) {
            parts.push("missing_semicolon");
        } else if line.matches('(').count() != line.matches(')').count() {
            parts.push("missing_parenthesis");
        }
    }

    (!parts.is_empty()).then(|| parts.join("_"))
}

/// Trim, drop a trailing `//` comment, collapse whitespace.
fn normalize_line(line: &str) -> String {
    let code = line.trim();
    let code = code.split("//").next().unwrap_or(code).trim();
    WHITESPACE.replace_all(code, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ORIGINAL: &str = "void OnTick()\n{\n   double price = Ask\n}";
    const FIXED: &str =
        "void OnTick()\n{\n   double price = SymbolInfoDouble(_Symbol, SYMBOL_ASK);\n}";
    const ERRORS: &[&str] = &["'Ask' - undeclared identifier (3,19)"];

    fn library(dir: &TempDir) -> PatternLibrary {
        PatternLibrary::open(&dir.path().join("success_patterns.json"))
    }

    #[test]
    fn test_learns_single_line_repair() {
        let dir = TempDir::new().unwrap();
        let mut lib = library(&dir);
        let n = lib.learn_from_success(ORIGINAL, FIXED, true, ERRORS).unwrap();
        assert_eq!(n, 1);

        let p = &lib.patterns()[0];
        assert_eq!(p.error_signature, "deprecated_account_variable_missing_semicolon");
        assert_eq!(p.original_code_snippet, "double price = Ask");
        assert_eq!(p.fix_type, FixType::DeprecatedVariable);
        assert_eq!(p.usage_count, 1);
        assert_eq!(p.success_rate, 1.0);
        assert_eq!(p.confidence, INITIAL_CONFIDENCE);
        assert!(lib.get(&p.pattern_id).is_some());
    }

    #[test]
    fn test_failed_save_leaves_library_unchanged() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not dir").unwrap();

        let mut lib = PatternLibrary::open(&blocker.join("success_patterns.json"));
        let err = lib.learn_from_success(ORIGINAL, FIXED, true, ERRORS).unwrap_err();
        assert!(matches!(err, Error::Persist { .. }));
        assert!(lib.patterns().is_empty());
    }

    #[test]
    fn test_failed_build_learns_nothing() {
        let dir = TempDir::new().unwrap();
        let mut lib = library(&dir);
        assert_eq!(lib.learn_from_success(ORIGINAL, FIXED, false, ERRORS).unwrap(), 0);
        assert!(lib.patterns().is_empty());
        assert!(!lib.path().exists());
    }

    #[test]
    fn test_repeated_learning_reinforces() {
        let dir = TempDir::new().unwrap();
        let mut lib = library(&dir);
        lib.learn_from_success(ORIGINAL, FIXED, true, ERRORS).unwrap();
        lib.learn_from_success(ORIGINAL, FIXED, true, ERRORS).unwrap();

        assert_eq!(lib.patterns().len(), 1);
        let p = &lib.patterns()[0];
        assert_eq!(p.usage_count, 2);
        assert!(p.success_rate <= 1.0);
        assert!((p.success_rate - 1.0).abs() < 1e-9);
        assert!((p.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_and_rate_stay_bounded() {
        let dir = TempDir::new().unwrap();
        let mut lib = library(&dir);
        for _ in 0..10 {
            lib.learn_from_success(ORIGINAL, FIXED, true, ERRORS).unwrap();
        }
        let p = &lib.patterns()[0];
        assert_eq!(p.usage_count, 10);
        assert!(p.confidence <= MAX_CONFIDENCE);
        assert!((0.0..=1.0).contains(&p.success_rate));
    }

    #[test]
    fn test_unrecognized_and_multi_line_changes_are_ignored() {
        let dir = TempDir::new().unwrap();
        let mut lib = library(&dir);
        let n = lib
            .learn_from_success("a\nb\nc", "a\nx\ny\nz\nc", true, &["syntax error"])
            .unwrap();
        assert_eq!(n, 0);
        let n = lib
            .learn_from_success("int total;", "int count;", true, &["syntax error"])
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_signature_heuristics() {
        assert_eq!(
            signature_for("x = MarketInfo(_Symbol, MODE_ASK)", "").as_deref(),
            Some("deprecated_marketinfo")
        );
        assert_eq!(
            signature_for("OrderSend(OP_BUY", "')' - ) expected").as_deref(),
            Some("deprecated_order_constant_missing_parenthesis")
        );
        assert_eq!(signature_for("int x;", "syntax error"), None);
    }

    #[test]
    fn test_fix_type_classification() {
        assert_eq!(
            FixType::classify("MarketInfo(_Symbol, MODE_BID)", "SymbolInfoDouble(_Symbol, SYMBOL_BID)"),
            FixType::DeprecatedFunction
        );
        assert_eq!(FixType::classify("int x = 1", "int x = 1;"), FixType::SyntaxSemicolon);
        assert_eq!(FixType::classify("Print(x", "Print(x)"), FixType::SyntaxParenthesis);
        assert_eq!(FixType::classify("a", "b"), FixType::Unknown);
    }

    #[test]
    fn test_applicable_patterns_by_similarity() {
        let dir = TempDir::new().unwrap();
        let mut lib = library(&dir);
        lib.learn_from_success(ORIGINAL, FIXED, true, ERRORS).unwrap();

        let similar = lib.applicable_patterns(ERRORS, "  double price = Ask   // entry");
        assert_eq!(similar.len(), 1);

        let different = lib.applicable_patterns(ERRORS, "bool ok = Bid > threshold_value_high");
        assert!(different.is_empty());

        let none = lib.applicable_patterns(ERRORS, "int x;");
        assert!(none.is_empty());
    }

    #[test]
    fn test_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let mut lib = library(&dir);
        lib.learn_from_success(ORIGINAL, FIXED, true, ERRORS).unwrap();

        let reopened = library(&dir);
        assert_eq!(reopened.patterns(), lib.patterns());
    }

    #[test]
    fn test_legacy_array_document_is_migrated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("success_patterns.json");
        let legacy = serde_json::json!([{
            "pattern_id": "123_456",
            "error_signature": "missing_semicolon",
            "original_code_snippet": "int x = 1",
            "fixed_code_snippet": "int x = 1;",
            "fix_type": "syntax_semicolon",
            "success_rate": 0.9,
            "usage_count": 3,
            "last_used": "2024-05-01T10:00:00.5",
            "confidence": 0.9
        }]);
        std::fs::write(&path, legacy.to_string()).unwrap();

        let lib = PatternLibrary::open(&path);
        assert_eq!(lib.patterns().len(), 1);
        assert_eq!(lib.patterns()[0].fix_type, FixType::SyntaxSemicolon);
        assert_eq!(lib.patterns()[0].usage_count, 3);
    }

    #[test]
    fn test_malformed_document_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("success_patterns.json");
        std::fs::write(&path, "42").unwrap();
        assert!(PatternLibrary::open(&path).patterns().is_empty());
    }

    #[test]
    fn test_report() {
        let dir = TempDir::new().unwrap();
        let mut lib = library(&dir);
        assert_eq!(lib.report().total_patterns, 0);
        assert!(lib.report().most_used.is_none());

        lib.learn_from_success(ORIGINAL, FIXED, true, ERRORS).unwrap();
        lib.learn_from_success(ORIGINAL, FIXED, true, ERRORS).unwrap();
        lib.learn_from_success("int x = 1", "int x = 1;", true, &["';' - semicolon expected"])
            .unwrap();

        let report = lib.report();
        assert_eq!(report.total_patterns, 2);
        assert_eq!(report.counts_by_fix_type[&FixType::DeprecatedVariable], 1);
        assert_eq!(report.counts_by_fix_type[&FixType::SyntaxSemicolon], 1);
        let most_used = report.most_used.unwrap();
        assert_eq!(most_used.usage_count, 2);
        assert_eq!(most_used.fix_type, FixType::DeprecatedVariable);
    }
}
