use serde::Serialize;
use serde_json::{Map, Number, Value};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{debug, warn};

use crate::error::{DbError, Result};

/// Outcome of a generic SQL execution. Execution errors are reported here
/// rather than propagated, so callers can always relay the outcome verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct SqlOutcome {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
}

impl SqlOutcome {
    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            results: None,
            row_count: None,
        }
    }
}

/// Executes an arbitrary SQL statement with named `:param` placeholders.
///
/// When `fetch_results` is set the rows are returned as JSON objects;
/// otherwise only the affected row count is reported. Writes run in a
/// transaction that is committed only when `commit` is set, which makes
/// uncommitted calls a dry run.
pub async fn execute_sql(
    pool: &PgPool,
    sql: &str,
    params: &Map<String, Value>,
    fetch_results: bool,
    commit: bool,
) -> SqlOutcome {
    let (rewritten, names) = rewrite_named_params(sql);
    let mut binds = Vec::with_capacity(names.len());
    for name in &names {
        match params.get(name) {
            Some(value) => binds.push(value.clone()),
            None => return SqlOutcome::error(format!("missing value for parameter :{name}")),
        }
    }

    match run_statement(pool, &rewritten, &binds, fetch_results, commit).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(%err, "sql execution failed");
            SqlOutcome::error(err.to_string())
        }
    }
}

async fn run_statement(
    pool: &PgPool,
    sql: &str,
    binds: &[Value],
    fetch_results: bool,
    commit: bool,
) -> Result<SqlOutcome> {
    let mut tx = pool.begin().await?;

    let mut query = sqlx::query(sql);
    for value in binds {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    query.bind(i)
                } else if let Some(f) = n.as_f64() {
                    query.bind(f)
                } else {
                    return Err(DbError::InvalidParameter(format!(
                        "unrepresentable number {n}"
                    )));
                }
            }
            Value::String(s) => query.bind(s.clone()),
            other => query.bind(other.clone()),
        };
    }

    let outcome = if fetch_results {
        let rows = query.fetch_all(&mut *tx).await?;
        let count = rows.len() as i64;
        let results = rows.iter().map(row_to_json).collect();
        SqlOutcome {
            status: "success".to_string(),
            message: format!("fetched {count} row(s)"),
            results: Some(results),
            row_count: Some(count),
        }
    } else {
        let result = query.execute(&mut *tx).await?;
        let count = result.rows_affected() as i64;
        SqlOutcome {
            status: "success".to_string(),
            message: format!("statement affected {count} row(s)"),
            results: None,
            row_count: Some(count),
        }
    };

    if commit {
        tx.commit().await?;
    } else {
        tx.rollback().await?;
        debug!("transaction rolled back (commit not requested)");
    }

    Ok(outcome)
}

/// Rewrites `:name` placeholders into positional `$n` binds, returning the
/// bind order. Repeated names reuse the same position. Placeholders inside
/// string literals and `::type` casts are left alone.
fn rewrite_named_params(sql: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(sql.len());
    let mut names: Vec<String> = Vec::new();
    let mut chars = sql.char_indices().peekable();
    let mut in_string = false;
    let bytes = sql.as_bytes();

    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            in_string = !in_string;
            out.push(c);
            continue;
        }
        if in_string || c != ':' {
            out.push(c);
            continue;
        }
        // ':' outside a string literal. '::' is a cast, not a placeholder.
        let prev_is_colon = i > 0 && bytes[i - 1] == b':';
        let next_is_colon = matches!(chars.peek(), Some((_, ':')));
        let next_is_ident = matches!(chars.peek(), Some((_, n)) if n.is_ascii_alphabetic() || *n == '_');
        if prev_is_colon || next_is_colon || !next_is_ident {
            out.push(c);
            continue;
        }

        let mut name = String::new();
        while let Some((_, n)) = chars.peek() {
            if n.is_ascii_alphanumeric() || *n == '_' {
                name.push(*n);
                chars.next();
            } else {
                break;
            }
        }
        let position = match names.iter().position(|existing| *existing == name) {
            Some(p) => p + 1,
            None => {
                names.push(name);
                names.len()
            }
        };
        out.push('$');
        out.push_str(&position.to_string());
    }

    (out, names)
}

/// Converts a row to a JSON object keyed by column name. Columns with types
/// the mapper does not know degrade to null rather than failing the call.
fn row_to_json(row: &PgRow) -> Value {
    let mut object = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = match row.try_get_raw(i) {
            Ok(raw) if raw.is_null() => Value::Null,
            Ok(raw) => decode_column(row, i, raw.type_info().name()),
            Err(_) => Value::Null,
        };
        object.insert(column.name().to_string(), value);
    }
    Value::Object(object)
}

fn decode_column(row: &PgRow, i: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => row.try_get::<bool, _>(i).map(Value::Bool).unwrap_or(Value::Null),
        "INT2" => row
            .try_get::<i16, _>(i)
            .map(|v| Value::Number(v.into()))
            .unwrap_or(Value::Null),
        "INT4" => row
            .try_get::<i32, _>(i)
            .map(|v| Value::Number(v.into()))
            .unwrap_or(Value::Null),
        "INT8" => row
            .try_get::<i64, _>(i)
            .map(|v| Value::Number(v.into()))
            .unwrap_or(Value::Null),
        "FLOAT4" => row
            .try_get::<f32, _>(i)
            .ok()
            .and_then(|v| Number::from_f64(f64::from(v)))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "FLOAT8" => row
            .try_get::<f64, _>(i)
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
            .try_get::<String, _>(i)
            .map(Value::String)
            .unwrap_or(Value::Null),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(i)
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(i)
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(i)
            .map(|v| Value::String(v.to_rfc3339()))
            .unwrap_or(Value::Null),
        "JSON" | "JSONB" => row.try_get::<Value, _>(i).unwrap_or(Value::Null),
        other => {
            debug!(column_type = other, "unmapped column type, returning null");
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_named_placeholders_in_order() {
        let (sql, names) =
            rewrite_named_params("SELECT * FROM t WHERE a = :alpha AND b = :beta");
        assert_eq!(sql, "SELECT * FROM t WHERE a = $1 AND b = $2");
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn repeated_names_share_one_position() {
        let (sql, names) = rewrite_named_params("SELECT :x + :y + :x");
        assert_eq!(sql, "SELECT $1 + $2 + $1");
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn casts_are_not_placeholders() {
        let (sql, names) = rewrite_named_params("SELECT value::text FROM t WHERE id = :id");
        assert_eq!(sql, "SELECT value::text FROM t WHERE id = $1");
        assert_eq!(names, vec!["id"]);
    }

    #[test]
    fn string_literals_are_untouched() {
        let (sql, names) = rewrite_named_params("SELECT ':not_a_param', :real FROM t");
        assert_eq!(sql, "SELECT ':not_a_param', $1 FROM t");
        assert_eq!(names, vec!["real"]);
    }

    #[test]
    fn plain_sql_passes_through() {
        let original = "SELECT count(*) FROM data_feeds";
        let (sql, names) = rewrite_named_params(original);
        assert_eq!(sql, original);
        assert!(names.is_empty());
    }
}
