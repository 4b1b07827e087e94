use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single column value, as it appears both in filter predicates and in
/// the row snapshots attached to change events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Int(i64),
    Bool(bool),
    Null,
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// A row snapshot: column name -> value. Change events carry one of these so
/// subscriptions can be matched without re-reading the store.
pub type Row = BTreeMap<String, Value>;

/// Build a [`Row`] from (column, value) pairs.
pub fn row<const N: usize>(cols: [(&str, Value); N]) -> Row {
    cols.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Structured filter predicate over a single table.
///
/// Renders to parameterized SQL for list queries and evaluates directly
/// against a [`Row`] for change-subscription matching, so the same predicate
/// drives both the fetch and the refresh signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum Filter {
    /// Matches every row.
    All,
    /// Column equals value.
    Eq(String, Value),
    /// Case-insensitive substring match on a text column.
    Contains(String, String),
    /// All sub-filters match.
    And(Vec<Filter>),
    /// At least one sub-filter matches.
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    pub fn contains(column: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::Contains(column.into(), needle.into())
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::Or(filters.into_iter().collect())
    }

    /// Render this filter as a SQL boolean expression, appending bind values
    /// to `params`. Placeholders are `?N`, numbered after any values already
    /// present in `params`.
    pub fn to_sql(&self, params: &mut Vec<Value>) -> String {
        match self {
            Self::All => "1=1".to_string(),
            Self::Eq(column, Value::Null) => format!("{column} IS NULL"),
            Self::Eq(column, value) => {
                params.push(value.clone());
                format!("{column} = ?{}", params.len())
            }
            Self::Contains(column, needle) => {
                // SQLite's LIKE only folds ASCII; the store registers a
                // Unicode-aware ulower() so both sides fold the same way
                // matches() does.
                params.push(Value::Text(format!("%{}%", needle.to_lowercase())));
                format!("ulower({column}) LIKE ?{}", params.len())
            }
            Self::And(filters) => join_sql(filters, " AND ", params),
            Self::Or(filters) => join_sql(filters, " OR ", params),
        }
    }

    /// Evaluate this filter against a row snapshot. A column absent from the
    /// row is treated as [`Value::Null`].
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::All => true,
            Self::Eq(column, value) => row.get(column).unwrap_or(&Value::Null) == value,
            Self::Contains(column, needle) => match row.get(column) {
                Some(Value::Text(s)) => {
                    s.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            },
            Self::And(filters) => filters.iter().all(|f| f.matches(row)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(row)),
        }
    }
}

fn join_sql(filters: &[Filter], sep: &str, params: &mut Vec<Value>) -> String {
    if filters.is_empty() {
        // An empty conjunction is vacuously true; keep the SQL valid.
        return "1=1".to_string();
    }
    let parts: Vec<String> = filters.iter().map(|f| format!("({})", f.to_sql(params))).collect();
    parts.join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_renders_numbered_placeholder() {
        let mut params = Vec::new();
        let sql = Filter::eq("sender_id", "u1").to_sql(&mut params);
        assert_eq!(sql, "sender_id = ?1");
        assert_eq!(params, vec![Value::text("u1")]);
    }

    #[test]
    fn conversation_filter_renders_both_directions() {
        let f = Filter::or([
            Filter::and([Filter::eq("sender_id", "u1"), Filter::eq("receiver_id", "u2")]),
            Filter::and([Filter::eq("sender_id", "u2"), Filter::eq("receiver_id", "u1")]),
        ]);

        let mut params = Vec::new();
        let sql = f.to_sql(&mut params);
        assert_eq!(
            sql,
            "((sender_id = ?1) AND (receiver_id = ?2)) OR ((sender_id = ?3) AND (receiver_id = ?4))"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn contains_renders_lowercased_like() {
        let mut params = Vec::new();
        let sql = Filter::contains("name", "Ágata").to_sql(&mut params);
        assert_eq!(sql, "ulower(name) LIKE ?1");
        assert_eq!(params, vec![Value::text("%ágata%")]);
    }

    #[test]
    fn matches_row_by_equality() {
        let f = Filter::eq("post_id", "p1");
        assert!(f.matches(&row([("post_id", "p1".into())])));
        assert!(!f.matches(&row([("post_id", "p2".into())])));
        // Absent column is Null, which never equals a text value
        assert!(!f.matches(&row([("user_id", "u1".into())])));
    }

    #[test]
    fn contains_is_case_insensitive() {
        let f = Filter::contains("name", "jonas");
        assert!(f.matches(&row([("name", "Jonas".into())])));
        assert!(!f.matches(&row([("name", "Pedro".into())])));
        // Non-text columns never match a substring predicate
        assert!(!f.matches(&row([("name", Value::Int(3))])));
        // Folding is Unicode-aware, not ASCII-only
        let f = Filter::contains("name", "ágata");
        assert!(f.matches(&row([("name", "Ágata".into())])));
    }

    #[test]
    fn or_matches_either_direction() {
        let f = Filter::or([
            Filter::and([Filter::eq("sender_id", "u1"), Filter::eq("receiver_id", "u2")]),
            Filter::and([Filter::eq("sender_id", "u2"), Filter::eq("receiver_id", "u1")]),
        ]);

        let outbound = row([("sender_id", "u1".into()), ("receiver_id", "u2".into())]);
        let inbound = row([("sender_id", "u2".into()), ("receiver_id", "u1".into())]);
        let unrelated = row([("sender_id", "u3".into()), ("receiver_id", "u2".into())]);

        assert!(f.matches(&outbound));
        assert!(f.matches(&inbound));
        assert!(!f.matches(&unrelated));
    }

    #[test]
    fn empty_and_is_vacuously_true() {
        let mut params = Vec::new();
        assert_eq!(Filter::And(vec![]).to_sql(&mut params), "1=1");
        assert!(Filter::And(vec![]).matches(&row([])));
    }

    #[test]
    fn filter_round_trips_through_json() {
        let f = Filter::and([Filter::eq("post_id", "p1"), Filter::eq("is_read", false)]);
        let json = serde_json::to_string(&f).unwrap();
        let back: Filter = serde_json::from_str(&json).unwrap();
        assert_eq!(f, back);
    }
}
