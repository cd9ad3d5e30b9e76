//! Session document schema and migrations
//!
//! Documents carry a `schema_version`. Older documents are upgraded in one
//! pass by [`migrate`] before typed deserialization, so the typed structs
//! never need per-field defaults for legacy shapes.
//!
//! | Version | Shape |
//! |---------|-------|
//! | 1 | No `schema_version`; `version_id`/`code`/`iteration`/`timestamp`/`compilation_success`/`changes_from_previous`/`compilation_errors` field names; `compilation_errors` and `fixed_errors` may be absent; naive timestamps |
//! | 2 | Current layout ([`SessionDocument`]) |

use crate::error::{Error, Result};
use crate::types::Version;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Current session document schema version
pub const SCHEMA_VERSION: u32 = 2;

/// On-disk form of an evolution session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub schema_version: u32,
    pub session_id: String,
    /// Index of the current version in `versions`
    pub current_index: usize,
    pub versions: Vec<Version>,
}

/// Upgrade a raw session document to [`SCHEMA_VERSION`].
pub fn migrate(mut doc: Value) -> Result<Value> {
    let obj = doc
        .as_object_mut()
        .ok_or_else(|| Error::Schema("session document is not a JSON object".to_string()))?;

    let version = obj
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(1) as u32;

    if version > SCHEMA_VERSION {
        return Err(Error::Schema(format!(
            "session document schema {} is newer than supported {}",
            version, SCHEMA_VERSION
        )));
    }

    if version < 2 {
        migrate_v1_to_v2(obj);
    }

    Ok(doc)
}

fn migrate_v1_to_v2(obj: &mut Map<String, Value>) {
    rename(obj, "current_version", "current_index");
    obj.entry("current_index").or_insert(Value::from(0));
    obj.entry("session_id").or_insert(Value::from(""));

    if let Some(Value::Array(versions)) = obj.get_mut("versions") {
        for version in versions.iter_mut().filter_map(Value::as_object_mut) {
            rename(version, "version_id", "id");
            rename(version, "code", "content");
            rename(version, "iteration", "sequence");
            rename(version, "timestamp", "created_at");
            rename(version, "compilation_success", "build_succeeded");
            rename(version, "changes_from_previous", "diff_from_previous");
            rename(version, "compilation_errors", "errors");

            version.entry("errors").or_insert_with(|| Value::Array(vec![]));
            version.entry("fixed_errors").or_insert_with(|| Value::Array(vec![]));
            version.entry("improvement_areas").or_insert_with(|| Value::Array(vec![]));
            version.entry("review_feedback").or_insert(Value::from(""));
            version.entry("diff_from_previous").or_insert(Value::from(""));

            if let Some(Value::String(ts)) = version.get_mut("created_at") {
                if let Some(upgraded) = upgrade_timestamp(ts) {
                    *ts = upgraded;
                }
            }

            if let Some(Value::Array(errors)) = version.get_mut("errors") {
                for error in errors.iter_mut().filter_map(Value::as_object_mut) {
                    migrate_error_v1(error);
                }
            }
        }
    } else {
        obj.insert("versions".to_string(), Value::Array(vec![]));
    }

    obj.insert("schema_version".to_string(), Value::from(2));
}

fn migrate_error_v1(error: &mut Map<String, Value>) {
    rename(error, "error_type", "kind");
    rename(error, "error_message", "raw_message");
    rename(error, "code_snippet", "snippet");
    rename(error, "solution_attempt", "attempted_remedy");

    // Empty remedy strings meant "nothing tried yet".
    if matches!(error.get("attempted_remedy"), Some(Value::String(s)) if s.is_empty()) {
        error.insert("attempted_remedy".to_string(), Value::Null);
    }
    error.entry("line_number").or_insert(Value::Null);
    error.entry("snippet").or_insert(Value::from(""));
}

fn rename(obj: &mut Map<String, Value>, from: &str, to: &str) {
    if obj.contains_key(to) {
        return;
    }
    if let Some(value) = obj.remove(from) {
        obj.insert(to.to_string(), value);
    }
}

/// Naive ISO timestamps are taken as UTC.
pub(crate) fn upgrade_timestamp(ts: &str) -> Option<String> {
    if DateTime::parse_from_rfc3339(ts).is_ok() {
        return None;
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().to_rfc3339())
}
