//! Predicate and expression AST understood by every backing store.
//!
//! The tree engine never issues recursive queries. Everything it needs is
//! expressible over a single table with:
//! - equality, range and `IN` comparisons
//! - `starts-with` prefix matching and SQL `LIKE` patterns
//! - `LENGTH`, `SUBSTRING`, right-hand substring and integer casts,
//!   so that order and level can be derived from the code column when
//!   they are not stored
//!
//! Stores either evaluate these trees directly (see [`crate::MemoryStore`])
//! or render them to SQL (see [`crate::sql`]).

use crate::key::RecordKey;
use crate::record::Record;
use crate::value::Value;
use std::cmp::Ordering;

/// A computable expression over one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// The value of a named field (null when absent).
    Field(String),
    /// A constant.
    Literal(Value),
    /// Character length of a text expression.
    Length(Box<Expr>),
    /// `len` characters starting at the zero-based character `start`.
    Substring {
        /// Text expression.
        expr: Box<Expr>,
        /// Zero-based start offset.
        start: usize,
        /// Number of characters.
        len: usize,
    },
    /// The last `n` characters of a text expression.
    Right(Box<Expr>, usize),
    /// Parses a text expression as an integer (null when not numeric).
    CastInt(Box<Expr>),
    /// Integer division by a constant.
    Div(Box<Expr>, i64),
}

impl Expr {
    /// Shorthand for [`Expr::Field`].
    pub fn field(name: impl Into<String>) -> Self {
        Expr::Field(name.into())
    }

    /// Shorthand for [`Expr::Literal`].
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// `LENGTH(self)`.
    #[must_use]
    pub fn length(self) -> Self {
        Expr::Length(Box::new(self))
    }

    /// `SUBSTRING(self, start, len)` with a zero-based start.
    #[must_use]
    pub fn substring(self, start: usize, len: usize) -> Self {
        Expr::Substring {
            expr: Box::new(self),
            start,
            len,
        }
    }

    /// `RIGHT(self, n)`.
    #[must_use]
    pub fn right(self, n: usize) -> Self {
        Expr::Right(Box::new(self), n)
    }

    /// `CAST(self AS INTEGER)`.
    #[must_use]
    pub fn cast_int(self) -> Self {
        Expr::CastInt(Box::new(self))
    }

    /// `self / divisor`.
    #[must_use]
    pub fn div(self, divisor: i64) -> Self {
        Expr::Div(Box::new(self), divisor)
    }

    /// Evaluates the expression against a record.
    #[must_use]
    pub fn eval(&self, record: &Record) -> Value {
        match self {
            Expr::Field(name) => record.get_field(name).cloned().unwrap_or(Value::Null),
            Expr::Literal(value) => value.clone(),
            Expr::Length(inner) => match inner.eval(record) {
                Value::Text(s) => Value::Int(s.chars().count() as i64),
                _ => Value::Null,
            },
            Expr::Substring { expr, start, len } => match expr.eval(record) {
                Value::Text(s) => Value::Text(s.chars().skip(*start).take(*len).collect()),
                _ => Value::Null,
            },
            Expr::Right(inner, n) => match inner.eval(record) {
                Value::Text(s) => {
                    let count = s.chars().count();
                    Value::Text(s.chars().skip(count.saturating_sub(*n)).collect())
                }
                _ => Value::Null,
            },
            Expr::CastInt(inner) => match inner.eval(record) {
                Value::Text(s) => s.trim().parse::<i64>().map_or(Value::Null, Value::Int),
                Value::Int(i) => Value::Int(i),
                Value::Bool(b) => Value::Int(i64::from(b)),
                Value::Null => Value::Null,
            },
            Expr::Div(inner, divisor) => match inner.eval(record) {
                Value::Int(i) if *divisor != 0 => Value::Int(i / divisor),
                _ => Value::Null,
            },
        }
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    fn matches(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }

    /// SQL spelling of the operator.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A boolean filter over records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Matches every record.
    All,
    /// Binary comparison. Null operands never match.
    Compare(Expr, CompareOp, Expr),
    /// Membership in a list of constants.
    In(Expr, Vec<Value>),
    /// The expression evaluates to null (an absent field included).
    IsNull(Expr),
    /// Prefix match on a text expression.
    StartsWith(Expr, String),
    /// SQL `LIKE` with `_` (one character) and `%` (any run).
    Like(Expr, String),
    /// Matches records whose key is in the list.
    KeyIn(Vec<RecordKey>),
    /// Conjunction; empty matches everything.
    And(Vec<Predicate>),
    /// Disjunction; empty matches nothing.
    Or(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
}

impl Predicate {
    /// `lhs = rhs`
    pub fn eq(lhs: Expr, rhs: impl Into<Value>) -> Self {
        Predicate::Compare(lhs, CompareOp::Eq, Expr::Literal(rhs.into()))
    }

    /// `lhs <op> rhs` against a constant.
    pub fn cmp(lhs: Expr, op: CompareOp, rhs: impl Into<Value>) -> Self {
        Predicate::Compare(lhs, op, Expr::Literal(rhs.into()))
    }

    /// `expr IS NULL`
    #[must_use]
    pub fn is_null(expr: Expr) -> Self {
        Predicate::IsNull(expr)
    }

    /// Prefix match.
    pub fn starts_with(expr: Expr, prefix: impl Into<String>) -> Self {
        Predicate::StartsWith(expr, prefix.into())
    }

    /// `LIKE` match.
    pub fn like(expr: Expr, pattern: impl Into<String>) -> Self {
        Predicate::Like(expr, pattern.into())
    }

    /// Combines with another predicate using `AND`, flattening nested
    /// conjunctions.
    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::All, p) | (p, Predicate::All) => p,
            (Predicate::And(mut a), Predicate::And(b)) => {
                a.extend(b);
                Predicate::And(a)
            }
            (Predicate::And(mut a), p) => {
                a.push(p);
                Predicate::And(a)
            }
            (p, Predicate::And(mut b)) => {
                b.insert(0, p);
                Predicate::And(b)
            }
            (a, b) => Predicate::And(vec![a, b]),
        }
    }

    /// Combines with another predicate using `OR`, flattening nested
    /// disjunctions.
    #[must_use]
    pub fn or(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::Or(mut a), Predicate::Or(b)) => {
                a.extend(b);
                Predicate::Or(a)
            }
            (Predicate::Or(mut a), p) => {
                a.push(p);
                Predicate::Or(a)
            }
            (a, b) => Predicate::Or(vec![a, b]),
        }
    }

    /// Negates this predicate.
    #[must_use]
    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Evaluates the predicate against a record.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Compare(lhs, op, rhs) => lhs
                .eval(record)
                .compare(&rhs.eval(record))
                .is_some_and(|ordering| op.matches(ordering)),
            Predicate::In(expr, values) => {
                let value = expr.eval(record);
                !value.is_null() && values.contains(&value)
            }
            Predicate::IsNull(expr) => expr.eval(record).is_null(),
            Predicate::StartsWith(expr, prefix) => match expr.eval(record) {
                Value::Text(s) => s.starts_with(prefix.as_str()),
                _ => false,
            },
            Predicate::Like(expr, pattern) => match expr.eval(record) {
                Value::Text(s) => like_match(&s, pattern),
                _ => false,
            },
            Predicate::KeyIn(keys) => keys.contains(&record.key()),
            Predicate::And(parts) => parts.iter().all(|p| p.matches(record)),
            Predicate::Or(parts) => parts.iter().any(|p| p.matches(record)),
            Predicate::Not(inner) => !inner.matches(record),
        }
    }
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Sort expression.
    pub expr: Expr,
    /// Sort descending instead of ascending.
    pub descending: bool,
}

impl OrderBy {
    /// Ascending order on an expression.
    #[must_use]
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            descending: false,
        }
    }

    /// Descending order on an expression.
    #[must_use]
    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            descending: true,
        }
    }
}

/// Compares two records under a list of `ORDER BY` terms.
#[must_use]
pub fn compare_records(a: &Record, b: &Record, order_by: &[OrderBy]) -> Ordering {
    for term in order_by {
        let ordering = term.expr.eval(a).sort_cmp(&term.expr.eval(b));
        let ordering = if term.descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// A `SET field = value` clause of a bulk update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Field to overwrite.
    pub field: String,
    /// New value.
    pub value: Value,
}

impl Assignment {
    /// Creates an assignment.
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// SQL `LIKE` matching without escape characters.
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // reachable[j]: pattern[..j] matches text[..i]
    let mut reachable = vec![false; pattern.len() + 1];
    reachable[0] = true;
    for j in 1..=pattern.len() {
        reachable[j] = reachable[j - 1] && pattern[j - 1] == '%';
    }

    for &c in &text {
        let mut next = vec![false; pattern.len() + 1];
        for j in 1..=pattern.len() {
            next[j] = match pattern[j - 1] {
                '%' => next[j - 1] || reachable[j],
                '_' => reachable[j - 1],
                p => reachable[j - 1] && p == c,
            };
        }
        reachable = next;
    }

    reachable[pattern.len()]
}
