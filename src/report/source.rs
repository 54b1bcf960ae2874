//! Tabular source store backed by SQLite
//!
//! The store is only ever scanned. Columns a profile references but the table
//! lacks are selected as NULL so a sparse dump still converts.

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use crate::convert::{FieldValue, WorkerContext};
use crate::core::{ImportError, Result};

/// A prepared full-table selection over the required columns
#[derive(Debug, Clone, PartialEq)]
pub struct SourceQuery {
    pub sql: String,
    pub columns: Vec<String>,
    /// Required columns the table does not have
    pub substituted: Vec<String>,
}

#[derive(Debug)]
pub struct SourceStore {
    conn: Connection,
}

impl SourceStore {
    /// Open an existing database file read-only
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ImportError::SourceNotFound(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Wrap an already-open connection (used with in-memory stores)
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Column names of `table`; empty when the table does not exist
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }

    /// Build the selection for `required` columns of `table`
    pub fn prepare_query(&self, table: &str, required: &[String]) -> Result<SourceQuery> {
        let available = self.table_columns(table)?;
        let query = build_select(table, required, &available);
        for column in &query.substituted {
            tracing::warn!(
                "Column '{}' not found in table '{}', reading it as NULL",
                column,
                table
            );
        }
        Ok(query)
    }

    /// Run `query` and hand each row to `visit` as a worker context.
    /// Returns the number of rows visited.
    pub fn scan<F>(&self, query: &SourceQuery, mut visit: F) -> Result<usize>
    where
        F: FnMut(&WorkerContext),
    {
        let mut stmt = self.conn.prepare(&query.sql)?;
        let mut rows = stmt.query([])?;
        let mut visited = 0;

        while let Some(row) = rows.next()? {
            let mut fields = Vec::with_capacity(query.columns.len());
            for (index, column) in query.columns.iter().enumerate() {
                fields.push((column.as_str(), field_value(row.get_ref(index)?)));
            }
            visit(&WorkerContext::new(fields));
            visited += 1;
        }

        Ok(visited)
    }
}

/// SELECT over `required`, substituting `NULL AS "col"` for absent columns
pub fn build_select(table: &str, required: &[String], available: &[String]) -> SourceQuery {
    let mut substituted = Vec::new();
    let parts: Vec<String> = required
        .iter()
        .map(|column| {
            if available.iter().any(|a| a.eq_ignore_ascii_case(column)) {
                quote_identifier(column)
            } else {
                substituted.push(column.clone());
                format!("NULL AS {}", quote_identifier(column))
            }
        })
        .collect();

    let select_list = if parts.is_empty() {
        "NULL".to_string()
    } else {
        parts.join(", ")
    };

    SourceQuery {
        sql: format!("SELECT {} FROM {}", select_list, quote_identifier(table)),
        columns: required.to_vec(),
        substituted,
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn field_value(value: ValueRef<'_>) -> FieldValue {
    match value {
        ValueRef::Null => FieldValue::Null,
        ValueRef::Integer(v) => FieldValue::Int(v),
        ValueRef::Real(v) => FieldValue::Float(v),
        ValueRef::Text(bytes) => FieldValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => FieldValue::Bytes(bytes.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SourceStore {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE workers (id INTEGER, name TEXT, technique REAL, selling TEXT);
             INSERT INTO workers VALUES (1, 'Ace', 80.5, '60');
             INSERT INTO workers VALUES (2, 'Bolt', NULL, 'unknown');",
        )
        .unwrap();
        SourceStore::from_connection(conn)
    }

    #[test]
    fn test_build_select_substitutes_missing_columns() {
        let required = vec!["id".to_string(), "charisma".to_string()];
        let available = vec!["ID".to_string(), "name".to_string()];
        let query = build_select("workers", &required, &available);

        assert_eq!(query.sql, r#"SELECT "id", NULL AS "charisma" FROM "workers""#);
        assert_eq!(query.substituted, vec!["charisma".to_string()]);
    }

    #[test]
    fn test_table_columns() {
        let columns = store().table_columns("workers").unwrap();
        assert_eq!(columns, vec!["id", "name", "technique", "selling"]);
        assert!(store().table_columns("missing").unwrap().is_empty());
    }

    #[test]
    fn test_scan_reads_typed_fields() {
        let store = store();
        let required = vec!["id".to_string(), "technique".to_string(), "selling".to_string(), "push".to_string()];
        let query = store.prepare_query("workers", &required).unwrap();

        let mut seen = Vec::new();
        let count = store
            .scan(&query, |ctx| {
                seen.push((
                    ctx.try_get_string("id"),
                    ctx.try_get_number("technique"),
                    ctx.try_get_number("selling"),
                    ctx.try_get_string("push"),
                ));
            })
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(seen[0], (Some("1".to_string()), Some(80.5), Some(60.0), None));
        assert_eq!(seen[1], (Some("2".to_string()), None, None, None));
    }

    #[test]
    fn test_scan_of_missing_table_fails() {
        let store = store();
        let query = store.prepare_query("nope", &["id".to_string()]).unwrap();
        assert!(store.scan(&query, |_| {}).is_err());
    }

    #[test]
    fn test_open_missing_file() {
        let result = SourceStore::open(Path::new("/definitely/not/here.db"));
        assert!(matches!(result, Err(ImportError::SourceNotFound(_))));
    }
}
