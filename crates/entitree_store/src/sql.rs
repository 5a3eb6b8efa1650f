//! Rendering of predicates as SQL text.
//!
//! Only the primitives the tree engine relies on are covered: identifier
//! quoting, string literals, prefix and `LIKE` matching, and the length,
//! substring and cast functions used to derive order and level from the
//! code column. Literals are inlined; the output is meant for `EXPLAIN`
//! style inspection and for stores that forward statements verbatim.

use crate::error::{StoreError, StoreResult};
use crate::expr::{Expr, OrderBy, Predicate};
use crate::value::Value;
use std::fmt::Write as _;

/// Escape character used in rendered `LIKE` clauses.
pub const LIKE_ESCAPE: char = '\\';

/// SQL dialect primitives.
pub trait Dialect: Send + Sync {
    /// Human-readable dialect name.
    fn name(&self) -> &'static str;

    /// Quotes an identifier.
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Quotes a string literal.
    fn quote_str(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Character-length function.
    fn length(&self, inner: &str) -> String {
        format!("LENGTH({inner})")
    }

    /// Substring with a one-based start.
    fn substring(&self, inner: &str, start_one_based: usize, len: usize) -> String {
        format!("SUBSTR({inner}, {start_one_based}, {len})")
    }

    /// Last `n` characters.
    fn right(&self, inner: &str, n: usize) -> String;

    /// Integer cast.
    fn cast_int(&self, inner: &str) -> String {
        format!("CAST({inner} AS INTEGER)")
    }

    /// Boolean literal.
    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }
}

/// SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn right(&self, inner: &str, n: usize) -> String {
        format!("SUBSTR({inner}, -{n})")
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }
}

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn length(&self, inner: &str) -> String {
        format!("CHAR_LENGTH({inner})")
    }

    fn substring(&self, inner: &str, start_one_based: usize, len: usize) -> String {
        format!("SUBSTRING({inner} FROM {start_one_based} FOR {len})")
    }

    fn right(&self, inner: &str, n: usize) -> String {
        format!("RIGHT({inner}, {n})")
    }

    fn cast_int(&self, inner: &str) -> String {
        format!("CAST({inner} AS BIGINT)")
    }
}

/// Looks up a dialect by name (`sqlite`, `postgres`/`postgresql`).
#[must_use]
pub fn dialect_by_name(name: &str) -> Option<Box<dyn Dialect>> {
    match name.to_ascii_lowercase().as_str() {
        "sqlite" => Some(Box::new(SqliteDialect)),
        "postgres" | "postgresql" | "pg" => Some(Box::new(PostgresDialect)),
        _ => None,
    }
}

/// Renders expressions and predicates for one table.
pub struct SqlRenderer<'a> {
    dialect: &'a dyn Dialect,
    key_column: &'a str,
}

impl<'a> SqlRenderer<'a> {
    /// Creates a renderer. `key_column` is used for [`Predicate::KeyIn`].
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect, key_column: &'a str) -> Self {
        Self {
            dialect,
            key_column,
        }
    }

    /// Renders a literal value.
    #[must_use]
    pub fn value(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => self.dialect.bool_literal(*b).to_string(),
            Value::Int(i) => i.to_string(),
            Value::Text(s) => self.dialect.quote_str(s),
        }
    }

    /// Renders an expression.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero divisor.
    pub fn expr(&self, expr: &Expr) -> StoreResult<String> {
        Ok(match expr {
            Expr::Field(name) => self.dialect.quote_ident(name),
            Expr::Literal(value) => self.value(value),
            Expr::Length(inner) => self.dialect.length(&self.expr(inner)?),
            Expr::Substring { expr, start, len } => {
                self.dialect.substring(&self.expr(expr)?, start + 1, *len)
            }
            Expr::Right(inner, n) => self.dialect.right(&self.expr(inner)?, *n),
            Expr::CastInt(inner) => self.dialect.cast_int(&self.expr(inner)?),
            Expr::Div(inner, divisor) => {
                if *divisor == 0 {
                    return Err(StoreError::invalid_expression("division by zero"));
                }
                format!("({} / {divisor})", self.expr(inner)?)
            }
        })
    }

    /// Renders a predicate as a `WHERE` condition.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested expression cannot be rendered.
    pub fn predicate(&self, predicate: &Predicate) -> StoreResult<String> {
        Ok(match predicate {
            Predicate::All => "1 = 1".to_string(),
            Predicate::Compare(lhs, op, rhs) => {
                format!("{} {} {}", self.expr(lhs)?, op.as_sql(), self.expr(rhs)?)
            }
            Predicate::In(expr, values) if values.is_empty() => {
                let _ = self.expr(expr)?;
                "1 = 0".to_string()
            }
            Predicate::In(expr, values) => {
                let list: Vec<String> = values.iter().map(|v| self.value(v)).collect();
                format!("{} IN ({})", self.expr(expr)?, list.join(", "))
            }
            Predicate::IsNull(expr) => format!("{} IS NULL", self.expr(expr)?),
            Predicate::StartsWith(expr, prefix) => format!(
                "{} LIKE {} ESCAPE {}",
                self.expr(expr)?,
                self.dialect
                    .quote_str(&format!("{}%", escape_like(prefix))),
                self.dialect.quote_str(&LIKE_ESCAPE.to_string()),
            ),
            Predicate::Like(expr, pattern) => format!(
                "{} LIKE {}",
                self.expr(expr)?,
                self.dialect.quote_str(pattern)
            ),
            Predicate::KeyIn(keys) if keys.is_empty() => "1 = 0".to_string(),
            Predicate::KeyIn(keys) => {
                let list: Vec<String> = keys
                    .iter()
                    .map(|k| self.dialect.quote_str(&k.to_string()))
                    .collect();
                format!(
                    "{} IN ({})",
                    self.dialect.quote_ident(self.key_column),
                    list.join(", ")
                )
            }
            Predicate::And(parts) if parts.is_empty() => "1 = 1".to_string(),
            Predicate::Or(parts) if parts.is_empty() => "1 = 0".to_string(),
            Predicate::And(parts) => self.join(parts, " AND ")?,
            Predicate::Or(parts) => self.join(parts, " OR ")?,
            Predicate::Not(inner) => format!("NOT ({})", self.predicate(inner)?),
        })
    }

    fn join(&self, parts: &[Predicate], sep: &str) -> StoreResult<String> {
        let rendered = parts
            .iter()
            .map(|p| self.predicate(p).map(|s| format!("({s})")))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(rendered.join(sep))
    }

    /// Renders a full `SELECT * FROM table WHERE .. ORDER BY ..`.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter or an order term cannot be rendered.
    pub fn select(
        &self,
        table: &str,
        filter: &Predicate,
        order_by: &[OrderBy],
    ) -> StoreResult<String> {
        let mut sql = format!(
            "SELECT * FROM {} WHERE {}",
            self.dialect.quote_ident(table),
            self.predicate(filter)?
        );
        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            for (i, term) in order_by.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                let _ = write!(
                    sql,
                    "{} {}",
                    self.expr(&term.expr)?,
                    if term.descending { "DESC" } else { "ASC" }
                );
            }
        }
        Ok(sql)
    }

    /// Renders `SELECT MAX(expr) FROM table WHERE ..`.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression or filter cannot be rendered.
    pub fn select_max(&self, table: &str, expr: &Expr, filter: &Predicate) -> StoreResult<String> {
        Ok(format!(
            "SELECT MAX({}) FROM {} WHERE {}",
            self.expr(expr)?,
            self.dialect.quote_ident(table),
            self.predicate(filter)?
        ))
    }
}

/// Escapes `LIKE` metacharacters so `text` matches literally.
#[must_use]
pub fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}
