// Wire types for the record store tables.
//
// Field names match the table columns verbatim (snake_case), so no
// serde renames are needed. Identifiers and `created_at` are assigned by
// the store and never sent on insert.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ── RecordId ────────────────────────────────────────────────────────

/// Primary key of a stored row.
///
/// Tables may be keyed by UUID or by a serial integer; anything else is
/// carried through as text. Display always yields the form PostgREST
/// expects in an `id=eq.<id>` filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Uuid(Uuid),
    Serial(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Serial(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for RecordId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        if let Ok(u) = Uuid::parse_str(s) {
            Self::Uuid(u)
        } else if let Ok(n) = s.parse::<i64>() {
            Self::Serial(n)
        } else {
            Self::Text(s.to_owned())
        }
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Uuid> for RecordId {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

// ── Soldiers ────────────────────────────────────────────────────────

/// A tracked person, as stored in the `soldiers` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Soldier {
    pub id: RecordId,
    pub name: String,
    pub rank: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub clearance: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Column values for inserting or updating a soldier.
///
/// Every optional column is always serialized, so an update clears the
/// columns the caller left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoldierFields {
    pub name: String,
    pub rank: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub clearance: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

// ── System logs ─────────────────────────────────────────────────────

/// Log level used when a new entry doesn't name one.
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

/// A row in the `system_logs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemLog {
    pub id: RecordId,
    pub level: String,
    #[serde(default)]
    pub tag: Option<String>,
    pub message: String,
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Column values for a new log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSystemLog {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub tag: Option<String>,
    pub message: String,
    #[serde(default = "empty_context")]
    pub context: Value,
}

impl NewSystemLog {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            level: default_level(),
            tag: None,
            message: message.into(),
            context: empty_context(),
        }
    }
}

fn default_level() -> String {
    DEFAULT_LOG_LEVEL.into()
}

fn empty_context() -> Value {
    Value::Object(serde_json::Map::new())
}

// ── Threats ─────────────────────────────────────────────────────────

/// A row in the `threats` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threat {
    pub id: RecordId,
    pub level: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Column values for a new threat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewThreat {
    pub level: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn record_id_accepts_uuid_serial_and_text() {
        let u = Uuid::new_v4();
        assert_eq!(RecordId::from(u.to_string()), RecordId::Uuid(u));
        assert_eq!(RecordId::from("42"), RecordId::Serial(42));
        assert_eq!(RecordId::from("abc"), RecordId::Text("abc".into()));

        let parsed: RecordId = serde_json::from_value(serde_json::json!(7)).unwrap();
        assert_eq!(parsed.to_string(), "7");
    }

    #[test]
    fn new_log_defaults_level_and_context() {
        let log: NewSystemLog =
            serde_json::from_value(serde_json::json!({ "message": "boot" })).unwrap();
        assert_eq!(log.level, "INFO");
        assert_eq!(log.context, serde_json::json!({}));
        assert!(log.tag.is_none());
    }

    #[test]
    fn soldier_fields_serialize_every_column() {
        let fields = SoldierFields {
            name: "Ada".into(),
            rank: "Captain".into(),
            ..SoldierFields::default()
        };
        let value = serde_json::to_value(&fields).unwrap();
        assert_eq!(value["unit"], Value::Null);
        assert_eq!(value["avatar_url"], Value::Null);
        assert_eq!(value.as_object().map(serde_json::Map::len), Some(8));
    }
}
