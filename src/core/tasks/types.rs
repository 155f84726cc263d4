use chrono::{NaiveDateTime, ParseResult};
use rusqlite::ToSql;
use rusqlite::types::ToSqlOutput;

/// A recurring household task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub frequency_days: u32,
    pub last_done: NaiveDateTime,
    pub room: String,
    pub notes: String,
    pub points: u32,
}

/// Aggregated points for one user over a query window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPoints {
    pub username: String,
    pub total: i64,
}

/// Value for a single-field task update. Keeps `update_field` callers honest
/// about what lands in an INTEGER versus a TEXT column.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    Int(i64),
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Text(s) => s.to_sql(),
            Self::Int(n) => n.to_sql(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

/// Render a timestamp as ISO-8601 UTC text without an offset. The fractional
/// part is always six digits wide so that lexicographic comparison of stored
/// values matches chronological order.
pub(crate) fn to_iso(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Parse a stored ISO-8601 timestamp; the fraction is optional so values
/// written by earlier deployments still load.
pub(crate) fn parse_iso(s: &str) -> ParseResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
}
