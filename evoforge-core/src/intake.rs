//! Compiler log intake
//!
//! Splits an already-captured compiler log into [`ErrorRecord`]s. Running the
//! compiler and capturing its output happens outside this crate.

use crate::types::ErrorRecord;

/// Record kind assigned to every line pulled from a log.
pub const LOG_ERROR_KIND: &str = "compilation_error";

/// Lowercase markers that flag a log line as a failure.
const ERROR_INDICATORS: &[&str] = &["error", "failed", "expected", "undefined"];

/// Extract error records from a raw compiler log.
///
/// Blank lines and warnings are skipped. Each remaining line that carries an
/// error indicator becomes one record, in log order.
pub fn parse_error_log(log: &str) -> Vec<ErrorRecord> {
    log.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let lower = line.to_lowercase();
            !lower.contains("warning") && ERROR_INDICATORS.iter().any(|i| lower.contains(i))
        })
        .map(|line| ErrorRecord::new(LOG_ERROR_KIND, line))
        .collect()
}

/// Raw messages of a record list, in order.
pub fn raw_messages(records: &[ErrorRecord]) -> Vec<String> {
    records.iter().map(|r| r.raw_message.clone()).collect()
}
