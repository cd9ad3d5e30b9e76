//! Core domain types for evoforge
//!
//! These types are the persisted data model shared by the version store,
//! the categorizer, the fixer, and the pattern learner.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Version** | One generation attempt: candidate text plus its validation outcome |
//! | **ErrorRecord** | One structured compiler failure attached to a version |
//! | **Signature** | Location- and identifier-independent form of a failure message |
//! | **Recurring error** | A signature observed in more than one version of a session |
//! | **Tier** | Complexity bucket of a categorized error |

use crate::normalize::{extract_location, normalize};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Errors
// ============================================

/// One structured compiler failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Free-form category (e.g. "compilation_error")
    pub kind: String,
    /// Verbatim failure text
    pub raw_message: String,
    /// Best-effort 1-based line number
    pub line_number: Option<u32>,
    /// Source or log line the failure was extracted from
    pub snippet: String,
    /// Remedy tried for this failure, if any
    pub attempted_remedy: Option<String>,
}

impl ErrorRecord {
    /// Build a record from a raw message, taking the line number from its
    /// `(line,col)` token and using the message itself as the snippet.
    pub fn new(kind: impl Into<String>, raw_message: impl Into<String>) -> Self {
        let raw_message = raw_message.into();
        Self {
            kind: kind.into(),
            line_number: extract_location(&raw_message).map(|(line, _)| line),
            snippet: raw_message.clone(),
            raw_message,
            attempted_remedy: None,
        }
    }

    /// Normalized signature of the raw message.
    pub fn signature(&self) -> String {
        normalize(&self.raw_message)
    }
}

/// Closed set of error kinds the categorizer recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingSemicolon,
    MissingParenthesis,
    MissingBrace,
    UndeclaredVariable,
    WrongParameters,
    DeprecatedFunction,
    DeprecatedVariable,
    DeprecatedConstant,
    MissingFunction,
    MissingInclude,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingSemicolon => "missing_semicolon",
            ErrorKind::MissingParenthesis => "missing_parenthesis",
            ErrorKind::MissingBrace => "missing_brace",
            ErrorKind::UndeclaredVariable => "undeclared_variable",
            ErrorKind::WrongParameters => "wrong_parameters",
            ErrorKind::DeprecatedFunction => "deprecated_function",
            ErrorKind::DeprecatedVariable => "deprecated_variable",
            ErrorKind::DeprecatedConstant => "deprecated_constant",
            ErrorKind::MissingFunction => "missing_function",
            ErrorKind::MissingInclude => "missing_include",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complexity bucket of a categorized error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Simple,
    Medium,
    Complex,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Simple => "simple",
            Tier::Medium => "medium",
            Tier::Complex => "complex",
        }
    }
}

// ============================================
// Versions
// ============================================

/// One generation attempt within an evolution session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// `v{sequence}_{hash8}`, a pure function of content and sequence
    pub id: String,
    /// Full candidate source text
    pub content: String,
    /// Strictly increasing within a session, never reused
    pub sequence: u32,
    /// Informational only
    pub created_at: DateTime<Utc>,
    /// Quality in [0, 1]
    pub quality_score: f64,
    pub build_succeeded: bool,
    /// Reviewer output, stored verbatim
    pub review_feedback: String,
    /// Bounded unified diff against the previous version
    pub diff_from_previous: String,
    /// Free-form tags, each at most once
    pub improvement_areas: Vec<String>,
    pub errors: Vec<ErrorRecord>,
    /// Descriptors of errors believed resolved since the previous version
    pub fixed_errors: Vec<String>,
}

/// Direction of quality over the most recent versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionDirection {
    InsufficientData,
    Improving,
    Degrading,
    Stable,
}

impl EvolutionDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvolutionDirection::InsufficientData => "insufficient_data",
            EvolutionDirection::Improving => "improving",
            EvolutionDirection::Degrading => "degrading",
            EvolutionDirection::Stable => "stable",
        }
    }
}

impl std::fmt::Display for EvolutionDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
