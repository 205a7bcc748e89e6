//! Database tools exposed to the agent.
//!
//! Tool failures are returned as observation text so the model can correct
//! itself; only errors from the model itself (query checker) are propagated.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::parser::extract_sql;
use super::prompt::build_checker_prompt;
use super::ToolDefinition;
use crate::db::DatabaseHandle;
use crate::error::Result;
use crate::llm::{LlmClient, Message};
use crate::safety::classify_sql;

pub const LIST_TABLES: &str = "sql_db_list_tables";
pub const SCHEMA: &str = "sql_db_schema";
pub const QUERY: &str = "sql_db_query";
pub const QUERY_CHECKER: &str = "sql_db_query_checker";

/// Number of sample rows shown under each table definition.
const SAMPLE_ROWS: usize = 3;

/// The four SQL tools over one database handle.
pub struct SqlToolkit {
    db: DatabaseHandle,
    llm: Arc<dyn LlmClient>,
}

impl SqlToolkit {
    pub fn new(db: DatabaseHandle, llm: Arc<dyn LlmClient>) -> Self {
        Self { db, llm }
    }

    /// SQL dialect name used in prompts.
    pub fn dialect(&self) -> &'static str {
        self.db.backend().as_str()
    }

    pub fn tools(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::new(
                QUERY,
                format!(
                    "Input to this tool is a detailed and correct SQL query, output is a result \
                     from the database. If the query is not correct, an error message will be \
                     returned. If an error is returned, rewrite the query, check the query, and \
                     try again. If you encounter an issue with Unknown column 'xxxx' in 'field \
                     list', use {SCHEMA} to query the correct table fields."
                ),
            ),
            ToolDefinition::new(
                SCHEMA,
                format!(
                    "Input to this tool is a comma-separated list of tables, output is the schema \
                     and sample rows for those tables. Be sure that the tables actually exist by \
                     calling {LIST_TABLES} first! Example Input: table1, table2, table3"
                ),
            ),
            ToolDefinition::new(
                LIST_TABLES,
                "Input is an empty string, output is a comma-separated list of tables in the \
                 database.",
            ),
            ToolDefinition::new(
                QUERY_CHECKER,
                format!(
                    "Use this tool to check if your query is correct before executing it. \
                     Always use this tool before executing a query with {QUERY}!"
                ),
            ),
        ]
    }

    /// Runs a tool and returns its observation.
    pub async fn execute(&self, tool: &str, input: &str) -> Result<String> {
        let start = Instant::now();
        let observation = match tool {
            LIST_TABLES => self.list_tables().await,
            SCHEMA => self.schema(input).await,
            QUERY => self.query(input).await,
            QUERY_CHECKER => self.check_query(input).await?,
            unknown => {
                let names = self
                    .tools()
                    .into_iter()
                    .map(|t| t.name)
                    .collect::<Vec<_>>()
                    .join(", ");
                warn!(tool = unknown, "Agent requested unknown tool");
                format!("{unknown} is not a valid tool, try one of [{names}].")
            }
        };

        info!(
            tool = tool,
            input_len = input.len(),
            output_len = observation.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Tool executed"
        );
        Ok(observation)
    }

    async fn list_tables(&self) -> String {
        match self.db.list_tables().await {
            Ok(tables) => tables.join(", "),
            Err(e) => format!("Error: {}", e.message()),
        }
    }

    async fn schema(&self, input: &str) -> String {
        let requested: Vec<String> = input
            .split(',')
            .map(|t| t.trim().trim_matches(|c: char| c == '"' || c == '`' || c == '\'').to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let schema = match self.db.introspect_schema().await {
            Ok(schema) => schema,
            Err(e) => return format!("Error: {}", e.message()),
        };

        let missing: Vec<&str> = requested
            .iter()
            .filter(|name| schema.table(name).is_none())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() || requested.is_empty() {
            return format!(
                "Error: table_names {{{}}} not found in database",
                missing
                    .iter()
                    .map(|name| format!("'{name}'"))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let mut sections = Vec::with_capacity(requested.len());
        for name in &requested {
            let Some(table) = schema.table(name) else {
                continue;
            };
            let mut section = schema.create_statement(table);
            if let Some(samples) = self.sample_rows(&table.name).await {
                section.push_str(&format!(
                    "\n\n/*\n{SAMPLE_ROWS} rows from {} table:\n{}\n*/",
                    table.name, samples
                ));
            }
            sections.push(section);
        }

        sections.join("\n\n")
    }

    async fn sample_rows(&self, table: &str) -> Option<String> {
        let sql = format!(
            "SELECT * FROM {} LIMIT {SAMPLE_ROWS}",
            self.db.backend().quote_identifier(table)
        );
        match self.db.execute_query(&sql).await {
            Ok(result) => {
                let mut lines = vec![result
                    .columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join("\t")];
                lines.extend(result.rows.iter().map(|row| {
                    row.iter()
                        .map(|v| v.to_display_string())
                        .collect::<Vec<_>>()
                        .join("\t")
                }));
                Some(lines.join("\n"))
            }
            Err(e) => {
                debug!(table = table, error = %e, "Sample rows unavailable");
                None
            }
        }
    }

    async fn query(&self, input: &str) -> String {
        let sql = input.trim();
        if sql.is_empty() {
            return "Error: empty query".to_string();
        }

        // Statements the parser cannot read go to the database, which has
        // the final word on what the dialect accepts.
        match classify_sql(sql, self.db.backend()) {
            Ok(classification) if !classification.is_read_only() => {
                warn!(
                    statement = %classification.statement_type,
                    level = %classification.level,
                    "Refused non-read-only statement"
                );
                return format!(
                    "Error: {} statements are not allowed; only read-only queries can be run.",
                    classification.statement_type
                );
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Query not classified"),
        }

        match self.db.execute_query(sql).await {
            Ok(result) => result.format_as_text(),
            Err(e) => format!("Error: {}", e.message()),
        }
    }

    async fn check_query(&self, input: &str) -> Result<String> {
        let prompt = build_checker_prompt(self.dialect(), input.trim());
        let response = self.llm.complete(&[Message::user(prompt)], &[]).await?;
        Ok(extract_sql(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Column, ColumnInfo, MockDatabaseClient, QueryResult, Schema, Table, Value};
    use crate::llm::MockLlmClient;
    use pretty_assertions::assert_eq;

    fn student_schema() -> Schema {
        Schema {
            tables: vec![Table::new("STUDENT")
                .with_column(Column::new("NAME", "VARCHAR(25)"))
                .with_column(Column::new("MARKS", "INT"))],
            foreign_keys: Vec::new(),
        }
    }

    fn make_toolkit(db: MockDatabaseClient) -> (SqlToolkit, Arc<MockDatabaseClient>) {
        let db = Arc::new(db);
        let toolkit = SqlToolkit::new(db.clone(), Arc::new(MockLlmClient::new()));
        (toolkit, db)
    }

    #[test]
    fn test_tool_names() {
        let (toolkit, _) = make_toolkit(MockDatabaseClient::new());
        let names: Vec<String> = toolkit.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec![QUERY, SCHEMA, LIST_TABLES, QUERY_CHECKER]);
        assert_eq!(toolkit.dialect(), "sqlite");
    }

    #[tokio::test]
    async fn test_list_tables() {
        let schema = Schema {
            tables: vec![Table::new("CLASSES"), Table::new("STUDENT")],
            foreign_keys: Vec::new(),
        };
        let (toolkit, _) = make_toolkit(MockDatabaseClient::with_schema(schema));
        let output = toolkit.execute(LIST_TABLES, "").await.unwrap();
        assert_eq!(output, "CLASSES, STUDENT");
    }

    #[tokio::test]
    async fn test_schema_with_sample_rows() {
        let samples = QueryResult::with_data(
            vec![ColumnInfo::new("NAME", "TEXT"), ColumnInfo::new("MARKS", "INTEGER")],
            vec![vec![Value::from("Krish"), Value::Int(90)]],
        );
        let db = MockDatabaseClient::with_schema(student_schema())
            .with_result("SELECT * FROM \"STUDENT\" LIMIT 3", samples);
        let (toolkit, db) = make_toolkit(db);

        let output = toolkit.execute(SCHEMA, "student").await.unwrap();
        assert_eq!(
            output,
            "CREATE TABLE \"STUDENT\" (\n\t\"NAME\" VARCHAR(25), \n\t\"MARKS\" INT\n)\n\n\
             /*\n3 rows from STUDENT table:\nNAME\tMARKS\nKrish\t90\n*/"
        );
        assert_eq!(db.executed(), vec!["SELECT * FROM \"STUDENT\" LIMIT 3"]);
    }

    #[tokio::test]
    async fn test_schema_unknown_table() {
        let (toolkit, _) = make_toolkit(MockDatabaseClient::with_schema(student_schema()));
        let output = toolkit.execute(SCHEMA, "STUDENT, COURSES").await.unwrap();
        assert_eq!(output, "Error: table_names {'COURSES'} not found in database");
    }

    #[tokio::test]
    async fn test_query_formats_rows() {
        let db = MockDatabaseClient::new().with_result(
            "SELECT COUNT(*) FROM STUDENT",
            QueryResult::with_data(
                vec![ColumnInfo::new("COUNT(*)", "INTEGER")],
                vec![vec![Value::Int(5)]],
            ),
        );
        let (toolkit, _) = make_toolkit(db);
        let output = toolkit
            .execute(QUERY, "SELECT COUNT(*) FROM STUDENT")
            .await
            .unwrap();
        assert_eq!(output, "COUNT(*)\n5");
    }

    #[tokio::test]
    async fn test_query_refuses_writes() {
        let (toolkit, db) = make_toolkit(MockDatabaseClient::new());
        let output = toolkit
            .execute(QUERY, "DELETE FROM STUDENT")
            .await
            .unwrap();
        assert!(output.starts_with("Error: DELETE statements are not allowed"));
        assert!(db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_query_database_error_becomes_observation() {
        // Unparseable SQL reaches the database, which rejects it.
        let (toolkit, db) = make_toolkit(MockDatabaseClient::new());
        let output = toolkit.execute(QUERY, "SELEC * FORM x").await.unwrap();
        assert_eq!(output, "Error: attempt to write a readonly database");
        assert_eq!(db.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_query_checker_returns_checked_sql() {
        let (toolkit, _) = make_toolkit(MockDatabaseClient::new());
        let output = toolkit
            .execute(QUERY_CHECKER, "SELECT NAME FROM STUDENT")
            .await
            .unwrap();
        assert_eq!(output, "SELECT NAME FROM STUDENT");
    }

    #[tokio::test]
    async fn test_query_checker_propagates_llm_errors() {
        let toolkit = SqlToolkit::new(
            Arc::new(MockDatabaseClient::new()),
            Arc::new(MockLlmClient::failing("Rate limited")),
        );
        assert!(toolkit.execute(QUERY_CHECKER, "SELECT 1").await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (toolkit, _) = make_toolkit(MockDatabaseClient::new());
        let output = toolkit.execute("sql_db_drop", "x").await.unwrap();
        assert_eq!(
            output,
            "sql_db_drop is not a valid tool, try one of [sql_db_query, sql_db_schema, \
             sql_db_list_tables, sql_db_query_checker]."
        );
    }
}
