// src/persist/mod.rs

use anyhow::{Context, Result};
use rusqlite::{params_from_iter, types::ValueRef, Connection, ToSql};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::dataset::{Column, Dataset, SemanticType, Value};
use crate::error::EtlError;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::ToSqlOutput;
        Ok(match self {
            Value::Missing => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Quote an SQL identifier (`"` doubled inside).
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A file-backed SQLite database. A connection is opened per call and
/// closed when the call returns, on success or failure.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        Connection::open(&self.path)
            .with_context(|| format!("opening SQLite database {}", self.path.display()))
    }

    /// Replace `table` with the contents of `ds` (drop + create + insert, one
    /// transaction). Returns the number of rows written.
    #[tracing::instrument(level = "info", skip(self, ds), fields(db = %self.path.display()))]
    pub fn persist(&self, table: &str, ds: &Dataset) -> Result<usize, EtlError> {
        self.persist_inner(table, ds)
            .map_err(|e| EtlError::persist(table, e))
    }

    fn persist_inner(&self, table: &str, ds: &Dataset) -> Result<usize> {
        if ds.num_columns() == 0 {
            anyhow::bail!("dataset has no columns");
        }
        let mut conn = self.open()?;
        let tx = conn.transaction()?;

        // 1) drop + recreate
        let table_q = quote_ident(table);
        let cols = ds
            .columns()
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.ty.sql_type()))
            .collect::<Vec<_>>()
            .join(", ");
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table_q}; CREATE TABLE {table_q} ({cols});"
        ))
        .context("recreating table")?;

        // 2) rows
        let placeholders = vec!["?"; ds.num_columns()].join(", ");
        {
            let mut stmt = tx
                .prepare(&format!("INSERT INTO {table_q} VALUES ({placeholders})"))
                .context("preparing insert")?;
            for row in 0..ds.num_rows() {
                stmt.execute(params_from_iter(ds.row(row)))
                    .with_context(|| format!("inserting row {}", row))?;
            }
        }

        tx.commit().context("committing")?;
        info!(rows = ds.num_rows(), "table replaced");
        Ok(ds.num_rows())
    }

    /// Read `table` back, typing columns by their declared SQL type.
    pub fn read_table(&self, table: &str) -> Result<Dataset, EtlError> {
        self.read_inner(table)
            .map_err(|e| EtlError::persist(table, e))
    }

    fn read_inner(&self, table: &str) -> Result<Dataset> {
        let conn = self.open()?;

        // 1) schema from PRAGMA table_info: (cid, name, type, notnull, dflt, pk)
        let mut info = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let schema = info
            .query_map([], |r| {
                let name: String = r.get(1)?;
                let decl: String = r.get(2)?;
                Ok((name, SemanticType::from_sql_type(&decl)))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        if schema.is_empty() {
            anyhow::bail!("no such table");
        }

        // 2) rows
        let mut columns: Vec<Column> = schema
            .iter()
            .map(|(name, ty)| Column::new(name.clone(), *ty, Vec::new()))
            .collect();
        let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(table)))?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (i, col) in columns.iter_mut().enumerate() {
                col.values.push(from_sql(row.get_ref(i)?, col.ty));
            }
        }
        Ok(Dataset::new(columns)?)
    }

    /// Names of the tables in the database.
    pub fn tables(&self) -> Result<Vec<String>, EtlError> {
        let inner = || -> Result<Vec<String>> {
            let conn = self.open()?;
            let mut stmt =
                conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
            let names = stmt
                .query_map([], |r| r.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(names)
        };
        inner().map_err(|e| EtlError::persist(self.path.display().to_string(), e))
    }
}

fn from_sql(v: ValueRef<'_>, ty: SemanticType) -> Value {
    let raw = match v {
        ValueRef::Null => return Value::Missing,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Text(String::from_utf8_lossy(b).into_owned()),
    };
    // SQLite may store a REAL column's integral value as INTEGER
    match (raw, ty) {
        (Value::Integer(i), SemanticType::Float) => Value::Float(i as f64),
        (other, _) => other,
    }
}
