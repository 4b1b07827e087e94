use ripple_types::filter::Value;
use rusqlite::functions::FunctionFlags;

/// Register the `ulower` scalar that rendered Contains predicates reference.
/// SQLite's built-in lower() and LIKE fold ASCII only; this one folds the way
/// the in-memory filter matching does.
pub(crate) fn register_functions(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    conn.create_scalar_function(
        "ulower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
    )?;
    Ok(())
}

/// Convert a filter value into a rusqlite bind value. Booleans are stored as
/// INTEGER 0/1, matching the schema.
pub(crate) fn bind(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Int(i) => rusqlite::types::Value::Integer(*i),
        Value::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
        Value::Null => rusqlite::types::Value::Null,
    }
}

pub(crate) fn bind_all(values: &[Value]) -> Vec<rusqlite::types::Value> {
    values.iter().map(bind).collect()
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> anyhow::Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> anyhow::Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// True when an execute failed on a UNIQUE/CHECK constraint. Toggle mutations
/// use this to treat "already in target state" as success.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
