//! Read-only business records: the views and tables tools query.
//!
//! A [`RecordQuery`] is a deliberately small query shape (equality, range,
//! case-insensitive pattern and set-membership filters, one ordering, a
//! limit) that every backend can render safely with bound parameters.

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// A comparison applied to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "value")]
pub enum FilterOp {
    Eq(Value),
    Gte(Value),
    Lte(Value),
    /// SQL `ILIKE` pattern (`%` and `_` wildcards, `\` escape), case-insensitive
    ILike(String),
    In(Vec<Value>),
}

/// One `column <op> value` predicate. All filters of a query are ANDed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    #[serde(flatten)]
    pub op: FilterOp,
}

impl Filter {
    /// Evaluate the predicate against a JSON row. Missing columns never match.
    pub fn matches(&self, row: &Value) -> bool {
        let Some(cell) = row.get(&self.column) else {
            return false;
        };
        match &self.op {
            FilterOp::Eq(v) => compare(cell, v) == Some(Ordering::Equal),
            FilterOp::Gte(v) => matches!(
                compare(cell, v),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Lte(v) => matches!(compare(cell, v), Some(Ordering::Less | Ordering::Equal)),
            FilterOp::ILike(pattern) => cell
                .as_str()
                .is_some_and(|s| like_match(&s.to_lowercase(), &pattern.to_lowercase())),
            FilterOp::In(values) => values
                .iter()
                .any(|v| compare(cell, v) == Some(Ordering::Equal)),
        }
    }
}

/// Order numbers numerically and strings lexically (ISO dates sort correctly).
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Match `text` against a SQL LIKE pattern with `\` as the escape character.
fn like_match(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p = like_tokens(pattern);
    let (mut ti, mut pi) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while ti < t.len() {
        match p.get(pi) {
            Some(LikeToken::One) => {
                ti += 1;
                pi += 1;
            }
            Some(LikeToken::Literal(c)) if *c == t[ti] => {
                ti += 1;
                pi += 1;
            }
            Some(LikeToken::Any) => {
                star = Some((pi, ti));
                pi += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    pi = sp + 1;
                    ti = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }
    p[pi..].iter().all(|tok| *tok == LikeToken::Any)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeToken {
    Any,
    One,
    Literal(char),
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::Any,
            '_' => LikeToken::One,
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            other => LikeToken::Literal(other),
        });
    }
    tokens
}

/// Escape LIKE wildcards so `needle` only matches itself.
pub fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Sort order for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// A read-only selection from one relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordQuery {
    pub relation: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl RecordQuery {
    pub fn from(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    fn filter(mut self, column: &str, op: FilterOp) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op,
        });
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Eq(value.into()))
    }

    pub fn gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Gte(value.into()))
    }

    pub fn lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Lte(value.into()))
    }

    /// Case-insensitive substring match. `%` and `_` in `needle` are literal.
    pub fn contains(self, column: &str, needle: &str) -> Self {
        self.filter(column, FilterOp::ILike(format!("%{}%", escape_like(needle))))
    }

    /// Set membership. An empty set is ignored rather than matching nothing.
    pub fn any_of(self, column: &str, values: Vec<Value>) -> Self {
        if values.is_empty() {
            self
        } else {
            self.filter(column, FilterOp::In(values))
        }
    }

    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order_by = Some(OrderBy {
            column: column.to_string(),
            descending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply this query to rows held in memory.
    pub fn apply(&self, rows: &[Value]) -> Vec<Value> {
        let mut out: Vec<Value> = rows
            .iter()
            .filter(|row| self.filters.iter().all(|f| f.matches(row)))
            .cloned()
            .collect();
        if let Some(order) = &self.order_by {
            out.sort_by(|a, b| {
                let ord = match (a.get(&order.column), b.get(&order.column)) {
                    (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                if order.descending { ord.reverse() } else { ord }
            });
        }
        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

/// A backend that can answer [`RecordQuery`]s with JSON rows.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn select(&self, query: &RecordQuery) -> std::result::Result<Vec<Value>, StoreError>;
}
