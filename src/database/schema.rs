use crate::database::sql::{DateColumnKind, ISO_DATE, MAX_PARAMETERS, SqlValue};
use crate::error::{AppError, Result};
use crate::models::record::format_number;
use crate::models::{CellValue, DateWindow, RecordSet};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Decimal,
    Float,
    Boolean,
    Date,
    DateTime,
}

impl ColumnType {
    /// Map an `INFORMATION_SCHEMA.COLUMNS.DATA_TYPE` value.
    pub fn from_sql_type(data_type: &str) -> Self {
        match data_type.to_ascii_lowercase().as_str() {
            "tinyint" | "smallint" | "int" | "bigint" => ColumnType::Integer,
            "decimal" | "numeric" | "money" | "smallmoney" => ColumnType::Decimal,
            "float" | "real" => ColumnType::Float,
            "bit" => ColumnType::Boolean,
            "date" => ColumnType::Date,
            "datetime" | "datetime2" | "smalldatetime" | "datetimeoffset" => ColumnType::DateTime,
            _ => ColumnType::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl TableColumn {
    pub fn new(name: &str, column_type: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable,
        }
    }
}

/// Destination table layout used to validate sheet rows before loading.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    table: String,
    columns: Vec<TableColumn>,
}

/// Sheet rows converted to typed values in the order of `columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
    pub date_kind: DateColumnKind,
    date_index: usize,
}

impl BoundRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose date falls outside `window`.
    pub fn count_outside(&self, window: DateWindow) -> usize {
        self.rows
            .iter()
            .filter(|row| {
                row_date(&row[self.date_index]).is_none_or(|date| !window.contains(date))
            })
            .count()
    }
}

fn row_date(value: &SqlValue) -> Option<NaiveDate> {
    match value {
        SqlValue::Text(s) => NaiveDate::parse_from_str(s, ISO_DATE).ok(),
        other => other.as_date(),
    }
}

impl TableSchema {
    pub fn new(table: &str, columns: Vec<TableColumn>) -> Result<Self> {
        if columns.is_empty() {
            return Err(AppError::Schema {
                table: table.to_string(),
                reason: "table not found or has no columns".to_string(),
            });
        }

        Ok(Self {
            table: table.to_string(),
            columns,
        })
    }

    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
    }

    fn mismatch(&self, reason: String) -> AppError {
        AppError::Schema {
            table: self.table.clone(),
            reason,
        }
    }

    /// Check `records` against the table and convert every cell to its
    /// column's type.
    pub fn bind(&self, records: &RecordSet, date_column: &str) -> Result<BoundRows> {
        let date_target = self
            .column(date_column)
            .ok_or_else(|| self.mismatch(format!("date column '{}' not in table", date_column)))?;
        let date_kind = match date_target.column_type {
            ColumnType::Date => DateColumnKind::Date,
            ColumnType::DateTime => DateColumnKind::DateTime,
            ColumnType::Text => DateColumnKind::Text,
            _ => {
                return Err(self.mismatch(format!(
                    "date column '{}' is neither a date nor a text type",
                    date_target.name
                )));
            }
        };

        // (sheet position, target column)
        let mut mapping: Vec<(usize, &TableColumn)> = Vec::new();
        let mut seen = HashSet::new();

        for (idx, header) in records.headers().iter().enumerate() {
            if header.is_empty() {
                let unused = records.rows().iter().all(|row| row[idx].is_empty());
                if unused {
                    continue;
                }
                return Err(self.mismatch(format!("column {} has values but no header", idx + 1)));
            }

            let column = self
                .column(header)
                .ok_or_else(|| self.mismatch(format!("sheet column '{}' not in table", header)))?;
            if !seen.insert(column.name.to_ascii_lowercase()) {
                return Err(self.mismatch(format!("duplicate sheet column '{}'", header)));
            }
            mapping.push((idx, column));
        }

        // A single row must fit in one INSERT.
        if mapping.len() > MAX_PARAMETERS {
            return Err(self.mismatch(format!(
                "{} columns exceed the {} parameters allowed per statement",
                mapping.len(),
                MAX_PARAMETERS
            )));
        }

        let date_index = mapping
            .iter()
            .position(|(_, column)| column.name == date_target.name)
            .ok_or_else(|| {
                self.mismatch(format!("date column '{}' missing from sheet", date_column))
            })?;

        let rows = records
            .rows()
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                mapping
                    .iter()
                    .enumerate()
                    .map(|(pos, (idx, column))| {
                        let value = if pos == date_index && date_kind == DateColumnKind::Text {
                            coerce_text_date(&row[*idx])
                        } else {
                            coerce(&row[*idx], column)
                        };
                        value.map_err(|reason| {
                            self.mismatch(format!(
                                "record {} column '{}': {}",
                                row_idx + 1,
                                column.name,
                                reason
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BoundRows {
            columns: mapping.iter().map(|(_, c)| c.name.clone()).collect(),
            rows,
            date_kind,
            date_index,
        })
    }
}

fn coerce(cell: &CellValue, column: &TableColumn) -> std::result::Result<SqlValue, String> {
    let value = match (cell, column.column_type) {
        (CellValue::Empty, ColumnType::Text) => SqlValue::Text(String::new()),
        (CellValue::Empty, _) => SqlValue::Null,

        (CellValue::Text(s), ColumnType::Text) => SqlValue::Text(s.clone()),
        (CellValue::Number(n), ColumnType::Text) => SqlValue::Text(format_number(*n)),
        (CellValue::Bool(b), ColumnType::Text) => SqlValue::Text(b.to_string().to_uppercase()),

        (CellValue::Number(n), ColumnType::Integer) if n.fract() == 0.0 => SqlValue::Int(*n as i64),
        (CellValue::Text(s), ColumnType::Integer) => SqlValue::Int(
            s.trim()
                .parse::<i64>()
                .map_err(|_| format!("'{}' is not an integer", s))?,
        ),

        (CellValue::Number(n), ColumnType::Decimal) => SqlValue::Decimal(
            Decimal::try_from(*n).map_err(|e| format!("{} is not a decimal: {}", n, e))?,
        ),
        (CellValue::Text(s), ColumnType::Decimal) => SqlValue::Decimal(
            parse_decimal(s).ok_or_else(|| format!("'{}' is not a decimal", s))?,
        ),

        (CellValue::Number(n), ColumnType::Float) => SqlValue::Float(*n),
        (CellValue::Text(s), ColumnType::Float) => SqlValue::Float(
            parse_decimal(s)
                .and_then(|d| f64::try_from(d).ok())
                .ok_or_else(|| format!("'{}' is not a number", s))?,
        ),

        (CellValue::Bool(b), ColumnType::Boolean) => SqlValue::Bool(*b),
        (CellValue::Number(n), ColumnType::Boolean) if *n == 0.0 || *n == 1.0 => {
            SqlValue::Bool(*n == 1.0)
        }
        (CellValue::Text(s), ColumnType::Boolean) => {
            SqlValue::Bool(parse_bool(s).ok_or_else(|| format!("'{}' is not a boolean", s))?)
        }

        (CellValue::Text(s), ColumnType::Date) => {
            SqlValue::Date(parse_date(s).ok_or_else(|| format!("'{}' is not a date", s))?)
        }
        (CellValue::Number(n), ColumnType::Date) => {
            SqlValue::Date(serial_date(*n).ok_or_else(|| format!("{} is not a date serial", n))?)
        }

        (CellValue::Text(s), ColumnType::DateTime) => SqlValue::DateTime(
            parse_datetime(s).ok_or_else(|| format!("'{}' is not a date and time", s))?,
        ),
        (CellValue::Number(n), ColumnType::DateTime) => SqlValue::DateTime(
            serial_datetime(*n).ok_or_else(|| format!("{} is not a date serial", n))?,
        ),

        (cell, column_type) => {
            return Err(format!("cannot store {:?} in a {:?} column", cell, column_type));
        }
    };

    if value == SqlValue::Null && !column.nullable {
        return Err("empty value in NOT NULL column".to_string());
    }

    Ok(value)
}

/// Normalise a date cell bound for a text date column to `YYYY-MM-DD`, so the
/// window can be matched by string comparison.
fn coerce_text_date(cell: &CellValue) -> std::result::Result<SqlValue, String> {
    let date = match cell {
        CellValue::Empty => return Ok(SqlValue::Text(String::new())),
        CellValue::Text(s) => parse_date(s).ok_or_else(|| format!("'{}' is not a date", s))?,
        CellValue::Number(n) => serial_datetime(*n)
            .map(|datetime| datetime.date())
            .ok_or_else(|| format!("{} is not a date serial", n))?,
        CellValue::Bool(b) => return Err(format!("{} is not a date", b)),
    };

    Ok(SqlValue::Text(date.format(ISO_DATE).to_string()))
}

/// Parse a decimal, accepting a decimal comma when no point is present.
fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s).ok().or_else(|| {
        if s.contains(',') && !s.contains('.') {
            Decimal::from_str(&s.replace(',', ".")).ok()
        } else {
            None
        }
    })
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "sim" => Some(true),
        "false" | "0" | "não" | "nao" => Some(false),
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Some(date) = parse_date(s) {
        return Some(date.and_time(NaiveTime::MIN));
    }

    let (date, time) = s.split_once(' ')?;
    let date = parse_date(date)?;
    let time = TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(time.trim(), format).ok())?;
    Some(date.and_time(time))
}

/// Spreadsheet serial dates count days from 1899-12-30.
fn serial_date(n: f64) -> Option<NaiveDate> {
    if n < 0.0 || n.fract() != 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(n as u64))
}

fn serial_datetime(n: f64) -> Option<NaiveDateTime> {
    let date = serial_date(n.floor())?;
    let seconds = (n.fract() * 86_400.0).round() as u32;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds.min(86_399), 0)?;
    Some(date.and_time(time))
}
