//! Error message normalization
//!
//! Compiler messages carry locations and identifier names that change from
//! attempt to attempt. A signature strips both so the same failure shape is
//! counted once no matter where it occurred.
//!
//! | Input | Signature |
//! |-------|-----------|
//! | `'foo' - undeclared identifier (12,4)` | `'identifier' - undeclared identifier` |
//! | `syntax error on line 7` | `syntax error on line x` |

use regex::Regex;
use std::sync::LazyLock;

static LOCATION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\s*,\s*(\d+)\)").unwrap());

static LINE_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bline \d+").unwrap());

static QUOTED_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'[^']*'").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Placeholder substituted for every single-quoted token.
pub const IDENTIFIER_PLACEHOLDER: &str = "'identifier'";

/// Canonical signature of a raw failure message.
pub fn normalize(raw: &str) -> String {
    let msg = LOCATION_TOKEN.replace_all(raw, "");
    let msg = LINE_TOKEN.replace_all(&msg, "line x");
    let msg = QUOTED_TOKEN.replace_all(&msg, IDENTIFIER_PLACEHOLDER);
    let msg = WHITESPACE.replace_all(&msg, " ");
    msg.trim().to_lowercase()
}

/// First `(line,col)` token in a message.
pub fn extract_location(raw: &str) -> Option<(u32, u32)> {
    let caps = LOCATION_TOKEN.captures(raw)?;
    let line = caps.get(1)?.as_str().parse().ok()?;
    let col = caps.get(2)?.as_str().parse().ok()?;
    Some((line, col))
}

/// First single-quoted token, without the quotes.
pub fn extract_identifier(raw: &str) -> Option<&str> {
    QUOTED_TOKEN
        .find(raw)
        .map(|m| m.as_str().trim_matches('\''))
        .filter(|s| !s.is_empty())
}
