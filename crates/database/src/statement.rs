use crate::error::DbError;
use crate::session::{Row, Session};
use core_types::{Record, SqlValue};

/// MySQL's limit on placeholders in a single prepared statement.
pub const MAX_PLACEHOLDERS: usize = 65_535;

/// Quotes a table or column name with backticks.
pub fn quote_identifier(name: &str) -> Result<String, DbError> {
    if name.trim().is_empty() || name.contains('\0') {
        return Err(DbError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// One line of `DESCRIBE <table>` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub key: String,
    pub extra: String,
}

impl ColumnInfo {
    pub fn is_auto_increment(&self) -> bool {
        self.extra.to_ascii_lowercase().contains("auto_increment")
    }

    /// Parses a `DESCRIBE` row: Field, Type, Null, Key, Default, Extra.
    fn from_describe_row(table: &str, row: &[SqlValue]) -> Result<Self, DbError> {
        let text = |i: usize| row.get(i).and_then(SqlValue::as_text).unwrap_or_default();
        let name = text(0);
        if name.is_empty() {
            return Err(DbError::InvalidDescribeRow(table.to_string()));
        }
        Ok(Self {
            name,
            data_type: text(1),
            nullable: text(2).eq_ignore_ascii_case("YES"),
            key: text(3),
            extra: text(5),
        })
    }
}

/// Reads a table's column list, in table order.
pub async fn describe_table(
    session: &mut dyn Session,
    table: &str,
) -> Result<Vec<ColumnInfo>, DbError> {
    let sql = format!("DESCRIBE {}", quote_identifier(table)?);
    let result = session.query(&sql, None).await?;

    let columns = result
        .rows
        .iter()
        .map(|row| ColumnInfo::from_describe_row(table, row))
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(DbError::NoColumns(table.to_string()));
    }
    tracing::debug!(table, columns = columns.len(), "Introspected table columns.");
    Ok(columns)
}

/// A parameterized INSERT over an exact, ordered column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    table: String,
    columns: Vec<String>,
}

impl InsertStatement {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Result<Self, DbError> {
        let table = table.into();
        quote_identifier(&table)?;
        if columns.is_empty() {
            return Err(DbError::NoColumns(table));
        }
        for column in &columns {
            quote_identifier(column)?;
        }
        Ok(Self { table, columns })
    }

    /// Builds the statement from introspected columns. With
    /// `skip_leading_identity`, a first column flagged `auto_increment` is
    /// left for the database to fill.
    pub fn from_columns(
        table: impl Into<String>,
        columns: &[ColumnInfo],
        skip_leading_identity: bool,
    ) -> Result<Self, DbError> {
        let skip = usize::from(
            skip_leading_identity && columns.first().is_some_and(ColumnInfo::is_auto_increment),
        );
        let names = columns.iter().skip(skip).map(|c| c.name.clone()).collect();
        Self::new(table, names)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows that fit in one statement without exceeding the placeholder limit.
    pub fn rows_per_statement(&self) -> usize {
        (MAX_PLACEHOLDERS / self.columns.len()).max(1)
    }

    /// `INSERT INTO t (a, b) VALUES (?, ?), (?, ?)` with `rows` placeholder
    /// groups, at least one.
    pub fn sql_for_rows(&self, rows: usize) -> String {
        // Identifiers were validated in `new`.
        let quote = |name: &str| format!("`{}`", name.replace('`', "``"));
        let columns = self
            .columns
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(", ");
        let group = format!("({})", vec!["?"; self.columns.len()].join(", "));
        let values = vec![group; rows.max(1)].join(", ");
        format!("INSERT INTO {} ({}) VALUES {}", quote(&self.table), columns, values)
    }

    /// Orders a record's values to match the column list. Fields the record
    /// has beyond the column list are ignored.
    pub fn row_from(&self, record: &Record) -> Result<Row, DbError> {
        self.columns
            .iter()
            .map(|column| {
                record
                    .get(column)
                    .cloned()
                    .ok_or_else(|| DbError::MissingColumn {
                        table: self.table.clone(),
                        column: column.clone(),
                    })
            })
            .collect()
    }

    pub fn rows_from(&self, records: &[Record]) -> Result<Vec<Row>, DbError> {
        records.iter().map(|r| self.row_from(r)).collect()
    }

    /// Fails when a row's width does not match the column list.
    pub fn check_row(&self, row: &Row) -> Result<(), DbError> {
        if row.len() != self.columns.len() {
            return Err(DbError::RowWidth {
                table: self.table.clone(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        Ok(())
    }
}
