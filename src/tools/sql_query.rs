//! Structured-data tool: natural language in, SQL rows out
//!
//! The question is translated into one read-only SQLite statement by the
//! model, executed against the included tables, and the rows are
//! returned as text.

use super::{parse_query_input, query_input_schema, InvocationError, Tool, ToolContext};
use crate::llm::{LlmRequest, LlmService};
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use thiserror::Error;

const MAX_ROWS: usize = 50;

const TEXT_TO_SQL_PROMPT: &str = "Given an input question, write one syntactically correct \
SQLite query that answers it. Only query the tables described below, only select the columns \
needed, and never modify data. Respond with the SQL query and nothing else.";

#[derive(Debug, Error)]
pub enum SqlError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Only read-only SELECT statements are allowed")]
    NotReadOnly,
    #[error("Database lock poisoned")]
    Poisoned,
}

/// Rows returned by a query, as `(column, rendered value)` pairs
pub type Rows = Vec<Vec<(String, String)>>;

/// Result of [`SqlDatabase::query`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRows {
    pub rows: Rows,
    /// More rows matched than were returned
    pub truncated: bool,
}

/// Thread-safe handle on a SQLite database, restricted to a set of tables
#[derive(Clone)]
pub struct SqlDatabase {
    conn: Arc<Mutex<Connection>>,
    tables: Vec<String>,
}

impl SqlDatabase {
    pub fn new(conn: Connection, tables: Vec<String>) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            tables,
        }
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// `CREATE TABLE`-style description of the included tables, for prompting
    pub fn schema_description(&self) -> Result<String, SqlError> {
        let conn = self.conn.lock().map_err(|_| SqlError::Poisoned)?;
        let mut out = String::new();
        for table in &self.tables {
            let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1)")?;
            let columns = stmt
                .query_map([table], |row| {
                    Ok(format!(
                        "{} {}",
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            let _ = writeln!(out, "Table '{table}' has columns: {}.", columns.join(", "));
        }
        Ok(out)
    }

    /// Run one read-only statement and render up to `MAX_ROWS` rows
    pub fn query(&self, sql: &str) -> Result<QueryRows, SqlError> {
        self.query_with_limit(sql, MAX_ROWS)
    }

    pub fn query_with_limit(&self, sql: &str, max_rows: usize) -> Result<QueryRows, SqlError> {
        let conn = self.conn.lock().map_err(|_| SqlError::Poisoned)?;
        let mut stmt = conn.prepare(sql)?;
        if !stmt.readonly() {
            return Err(SqlError::NotReadOnly);
        }

        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        let mut truncated = false;
        while let Some(row) = rows.next()? {
            if out.len() == max_rows {
                truncated = true;
                break;
            }
            let mut rendered = Vec::with_capacity(names.len());
            for (idx, name) in names.iter().enumerate() {
                rendered.push((name.clone(), render_value(row.get_ref(idx)?)));
            }
            out.push(rendered);
        }
        Ok(QueryRows {
            rows: out,
            truncated,
        })
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

/// Pull the SQL statement out of a model reply.
///
/// Models often wrap the query in a markdown fence or prefix it with
/// `SQLQuery:`; anything after a `SQLResult:` marker is dropped.
pub(crate) fn extract_sql(reply: &str) -> Option<String> {
    let mut text = reply.trim();
    if let Some((_, rest)) = text.split_once("SQLQuery:") {
        text = rest.trim();
    }
    if let Some((head, _)) = text.split_once("SQLResult:") {
        text = head.trim();
    }
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest
            .strip_prefix("sqlite")
            .or_else(|| rest.strip_prefix("sql"))
            .unwrap_or(rest);
        text = rest.split("```").next().unwrap_or_default().trim();
    }
    let sql = text.trim().trim_end_matches(';').trim();
    if sql.is_empty() {
        None
    } else {
        Some(sql.to_string())
    }
}

fn render_rows(sql: &str, result: &QueryRows) -> String {
    let mut out = format!("SQL: {sql}\n");
    let rows = &result.rows;
    if rows.is_empty() {
        out.push_str("No rows returned.");
        return out;
    }
    for row in rows {
        let line = row
            .iter()
            .map(|(col, val)| format!("{col}={val}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "{line}");
    }
    if result.truncated {
        let _ = writeln!(out, "(truncated to {} rows)", rows.len());
    }
    out.trim_end().to_string()
}

/// Natural-language query tool over a [`SqlDatabase`]
pub struct SqlQueryTool {
    name: String,
    description: String,
    db: SqlDatabase,
    llm: Arc<dyn LlmService>,
}

impl SqlQueryTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        db: SqlDatabase,
        llm: Arc<dyn LlmService>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            db,
            llm,
        }
    }

    async fn translate(&self, question: &str) -> Result<String, InvocationError> {
        let db = self.db.clone();
        let schema = tokio::task::spawn_blocking(move || db.schema_description())
            .await
            .map_err(|e| InvocationError::Downstream(format!("Schema task failed: {e}")))?
            .map_err(|e| InvocationError::Downstream(e.to_string()))?;
        let request = LlmRequest::prompt(
            format!("{TEXT_TO_SQL_PROMPT}\n\n{schema}"),
            format!("Question: {question}\nSQLQuery:"),
        );
        let reply = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| InvocationError::Downstream(format!("SQL translation failed: {e}")))?;
        extract_sql(&reply.message.content).ok_or_else(|| {
            InvocationError::Downstream("SQL translation returned no query".to_string())
        })
    }
}

#[async_trait]
impl Tool for SqlQueryTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn input_schema(&self) -> Value {
        query_input_schema("Natural language question about the table data")
    }

    async fn invoke(&self, arguments: Value, ctx: ToolContext) -> Result<String, InvocationError> {
        let question = parse_query_input(arguments)?;

        let sql = tokio::select! {
            sql = self.translate(&question) => sql?,
            () = ctx.cancel.cancelled() => return Err(InvocationError::Cancelled),
        };
        tracing::debug!(call_id = %ctx.call_id, sql = %sql, "Executing translated query");

        let db = self.db.clone();
        let query_sql = sql.clone();
        let rows = tokio::task::spawn_blocking(move || db.query(&query_sql))
            .await
            .map_err(|e| InvocationError::Downstream(format!("Query task failed: {e}")))?
            .map_err(|e| InvocationError::Downstream(format!("{e} (query: {sql})")))?;

        Ok(render_rows(&sql, &rows))
    }
}
