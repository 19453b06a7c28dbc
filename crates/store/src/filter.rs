//! Rendering of [`RecordQuery`] into parameterised SQL.
//!
//! Relation and column names cannot be bound as parameters, so they are
//! validated against a strict identifier grammar and double-quoted. Values
//! are always bound.

use serde_json::Value;
use workroom_core::error::StoreError;
use workroom_core::records::{FilterOp, RecordQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

/// A rendered statement plus the values to bind, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Validate and quote a possibly schema-qualified identifier.
///
/// Accepts `name` or `schema.name`, where each part matches
/// `[A-Za-z_][A-Za-z0-9_]*`.
pub fn quote_identifier(ident: &str) -> Result<String, StoreError> {
    let parts: Vec<&str> = ident.split('.').collect();
    if parts.is_empty() || parts.len() > 2 || !parts.iter().all(|p| is_plain_identifier(p)) {
        return Err(StoreError::InvalidIdentifier(ident.to_string()));
    }
    Ok(parts
        .iter()
        .map(|p| format!("\"{p}\""))
        .collect::<Vec<_>>()
        .join("."))
}

fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Render the inner `SELECT * FROM ... WHERE ... ORDER BY ... LIMIT ...`.
pub fn render_select(query: &RecordQuery, dialect: Dialect) -> Result<RenderedQuery, StoreError> {
    let relation = quote_identifier(&query.relation)?;
    let mut params: Vec<Value> = Vec::new();
    let mut clauses: Vec<String> = Vec::new();

    for filter in &query.filters {
        let column = quote_identifier(&filter.column)?;
        let clause = match &filter.op {
            FilterOp::Eq(v) => {
                let lhs = column_expr(&column, v, dialect);
                format!("{lhs} = {}", push(&mut params, v.clone(), dialect))
            }
            FilterOp::Gte(v) => {
                let lhs = column_expr(&column, v, dialect);
                format!("{lhs} >= {}", push(&mut params, v.clone(), dialect))
            }
            FilterOp::Lte(v) => {
                let lhs = column_expr(&column, v, dialect);
                format!("{lhs} <= {}", push(&mut params, v.clone(), dialect))
            }
            FilterOp::ILike(pattern) => {
                let placeholder = push(&mut params, Value::String(pattern.clone()), dialect);
                match dialect {
                    // SQLite LIKE is already case-insensitive for ASCII.
                    Dialect::Sqlite => format!("{column} LIKE {placeholder} ESCAPE '\\'"),
                    Dialect::Postgres => format!("{column}::text ILIKE {placeholder} ESCAPE '\\'"),
                }
            }
            FilterOp::In(values) => {
                if values.is_empty() {
                    "1 = 0".to_string()
                } else {
                    let lhs = column_expr(&column, &values[0], dialect);
                    let placeholders: Vec<String> = values
                        .iter()
                        .map(|v| push(&mut params, v.clone(), dialect))
                        .collect();
                    format!("{lhs} IN ({})", placeholders.join(", "))
                }
            }
        };
        clauses.push(clause);
    }

    let mut sql = format!("SELECT * FROM {relation}");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    if let Some(order) = &query.order_by {
        let column = quote_identifier(&order.column)?;
        sql.push_str(&format!(
            " ORDER BY {column} {}",
            if order.descending { "DESC" } else { "ASC" }
        ));
    }
    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    Ok(RenderedQuery { sql, params })
}

/// Append a parameter and return its placeholder.
fn push(params: &mut Vec<Value>, value: Value, dialect: Dialect) -> String {
    params.push(value);
    match dialect {
        Dialect::Sqlite => "?".to_string(),
        Dialect::Postgres => format!("${}", params.len()),
    }
}

/// Postgres parameters are sent with a concrete type, so the column is cast
/// to the parameter's type. Dates and timestamps compare as ISO-8601 text.
fn column_expr(column: &str, sample: &Value, dialect: Dialect) -> String {
    match (dialect, sample) {
        (Dialect::Sqlite, _) => column.to_string(),
        (Dialect::Postgres, Value::Number(_)) => format!("{column}::float8"),
        (Dialect::Postgres, Value::Bool(_)) => format!("{column}::boolean"),
        (Dialect::Postgres, _) => format!("{column}::text"),
    }
}
