use crate::error::{AppError, Result};
use crate::models::DateWindow;
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::fmt;

/// Rows grouped into one bulk-insert chunk.
pub const CHUNK_SIZE: usize = 500;

// SQL Server accepts at most 2100 parameters per request.
pub const MAX_PARAMETERS: usize = 2000;

/// Format dates take when stored in a text date column.
pub const ISO_DATE: &str = "%Y-%m-%d";

/// A typed value bound as a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl SqlValue {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            SqlValue::Date(date) => Some(*date),
            SqlValue::DateTime(datetime) => Some(datetime.date()),
            _ => None,
        }
    }
}

/// How the date column stores its values, which decides how the window is
/// matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateColumnKind {
    Date,
    DateTime,
    /// ISO `YYYY-MM-DD` strings, compared lexically.
    Text,
}

/// SQL text with `@P1..@Pn` placeholders and their values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// A possibly schema-qualified table name such as `dbo.meta_ads`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub schema: Option<String>,
    pub name: String,
}

impl TableName {
    /// Parse `table`, `schema.table` or their bracketed forms. Dots inside
    /// brackets belong to the identifier.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || AppError::Config(format!("Invalid table name '{}'", raw));
        let parts = split_identifier(raw.trim()).ok_or_else(invalid)?;
        if parts.iter().any(String::is_empty) {
            return Err(invalid());
        }

        let mut parts = parts.into_iter();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), None, None) => Ok(Self { schema: None, name }),
            (Some(schema), Some(name), None) => Ok(Self {
                schema: Some(schema),
                name,
            }),
            _ => Err(invalid()),
        }
    }

    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.name)),
            None => quote_ident(&self.name),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Split a dotted identifier, unquoting bracketed parts (`]]` inside brackets
/// is a literal `]`). `None` when a bracket is left open or stray text follows
/// a closing bracket.
fn split_identifier(raw: &str) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars().peekable();
    let mut closed = false;

    let finish = |part: &str, closed: bool| {
        if closed {
            part.to_string()
        } else {
            part.trim().to_string()
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                parts.push(finish(&current, closed));
                current.clear();
                closed = false;
            }
            _ if closed => {
                if !c.is_whitespace() {
                    return None;
                }
            }
            '[' if current.trim().is_empty() => {
                current.clear();
                loop {
                    match chars.next()? {
                        ']' if chars.peek() == Some(&']') => {
                            chars.next();
                            current.push(']');
                        }
                        ']' => break,
                        other => current.push(other),
                    }
                }
                closed = true;
            }
            _ => current.push(c),
        }
    }
    parts.push(finish(&current, closed));

    Some(parts)
}

/// Bracket-quote an identifier, doubling any closing bracket inside it.
pub fn quote_ident(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

/// The statement clearing `window` from the table.
///
/// Date and text columns use an inclusive `BETWEEN`. Date-time columns use a
/// half-open range ending at midnight after the last day, so timed rows on
/// that day are included.
pub fn delete_window_statement(
    table: &TableName,
    date_column: &str,
    kind: DateColumnKind,
    window: DateWindow,
) -> Result<Statement> {
    let target = table.quoted();
    let column = quote_ident(date_column);

    let statement = match kind {
        DateColumnKind::Date => Statement {
            sql: format!("DELETE FROM {} WHERE {} BETWEEN @P1 AND @P2", target, column),
            params: vec![SqlValue::Date(window.start), SqlValue::Date(window.end)],
        },
        DateColumnKind::Text => Statement {
            sql: format!("DELETE FROM {} WHERE {} BETWEEN @P1 AND @P2", target, column),
            params: vec![
                SqlValue::Text(window.start.format(ISO_DATE).to_string()),
                SqlValue::Text(window.end.format(ISO_DATE).to_string()),
            ],
        },
        DateColumnKind::DateTime => {
            let after_end = window.end.checked_add_days(Days::new(1)).ok_or_else(|| {
                AppError::Config(format!("Window end {} is out of range", window.end))
            })?;
            Statement {
                sql: format!(
                    "DELETE FROM {} WHERE {} >= @P1 AND {} < @P2",
                    target, column, column
                ),
                params: vec![
                    SqlValue::DateTime(window.start.and_time(NaiveTime::MIN)),
                    SqlValue::DateTime(after_end.and_time(NaiveTime::MIN)),
                ],
            }
        }
    };

    Ok(statement)
}

/// Multi-row INSERT statements covering `rows`, grouped in chunks of
/// [`CHUNK_SIZE`] and split further to respect the parameter limit.
pub fn insert_statements(
    table: &TableName,
    columns: &[String],
    rows: &[Vec<SqlValue>],
) -> Vec<Statement> {
    if columns.is_empty() {
        return Vec::new();
    }

    let rows_per_statement = (MAX_PARAMETERS / columns.len()).clamp(1, CHUNK_SIZE);
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    rows.chunks(CHUNK_SIZE)
        .flat_map(|chunk| chunk.chunks(rows_per_statement))
        .map(|batch| {
            let mut params = Vec::with_capacity(batch.len() * columns.len());
            let tuples = batch
                .iter()
                .map(|row| {
                    let placeholders = row
                        .iter()
                        .map(|value| {
                            params.push(value.clone());
                            format!("@P{}", params.len())
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("({})", placeholders)
                })
                .collect::<Vec<_>>()
                .join(", ");

            Statement {
                sql: format!(
                    "INSERT INTO {} ({}) VALUES {}",
                    table.quoted(),
                    column_list,
                    tuples
                ),
                params,
            }
        })
        .collect()
}
