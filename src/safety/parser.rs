//! SQL parsing and classification logic.
//!
//! Uses sqlparser-rs with the dialect of the connected backend.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::{Dialect, MySqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

use crate::db::DatabaseBackend;
use crate::error::{Result, SqlChatError};

use super::{ClassificationResult, SafetyLevel, StatementType};

/// SQL classifier bound to one backend dialect.
#[derive(Debug, Clone, Copy)]
pub struct SqlClassifier {
    backend: DatabaseBackend,
}

impl SqlClassifier {
    pub fn new(backend: DatabaseBackend) -> Self {
        Self { backend }
    }

    fn dialect(&self) -> Box<dyn Dialect> {
        match self.backend {
            DatabaseBackend::Sqlite => Box::new(SQLiteDialect {}),
            DatabaseBackend::MySql => Box::new(MySqlDialect {}),
        }
    }

    /// Classifies a SQL string.
    ///
    /// Returns a query error when the SQL cannot be parsed in this dialect.
    pub fn classify(&self, sql: &str) -> Result<ClassificationResult> {
        let dialect = self.dialect();
        let statements = Parser::parse_sql(dialect.as_ref(), sql)
            .map_err(|e| SqlChatError::query(format!("SQL parse error: {}", e)))?;

        match statements.as_slice() {
            [] => Err(SqlChatError::query("Empty SQL statement")),
            [single] => {
                let (level, stmt_type) = classify_statement(single);
                Ok(ClassificationResult::new(level, stmt_type))
            }
            many => {
                let (level, stmt_type) = many
                    .iter()
                    .map(classify_statement)
                    .max_by_key(|(level, _)| *level)
                    .unwrap_or((SafetyLevel::Safe, StatementType::Unknown));
                Ok(ClassificationResult::new(
                    level,
                    StatementType::Multiple(Box::new(stmt_type)),
                ))
            }
        }
    }
}

/// Classifies SQL for the given backend without keeping a classifier around.
pub fn classify_sql(sql: &str, backend: DatabaseBackend) -> Result<ClassificationResult> {
    SqlClassifier::new(backend).classify(sql)
}

fn most_dangerous(
    a: (SafetyLevel, StatementType),
    b: (SafetyLevel, StatementType),
) -> (SafetyLevel, StatementType) {
    if b.0 > a.0 {
        b
    } else {
        a
    }
}

fn classify_statement(statement: &Statement) -> (SafetyLevel, StatementType) {
    match statement {
        Statement::Query(query) => classify_query(query),
        Statement::Explain {
            analyze, statement, ..
        } => {
            if *analyze {
                // EXPLAIN ANALYZE runs the statement
                let (inner_level, _) = classify_statement(statement);
                (inner_level, StatementType::Explain)
            } else {
                (SafetyLevel::Safe, StatementType::Explain)
            }
        }
        Statement::ExplainTable { .. } => (SafetyLevel::Safe, StatementType::Explain),
        Statement::ShowVariable { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. }
        | Statement::ShowCollation { .. } => (SafetyLevel::Safe, StatementType::Show),
        Statement::Pragma { is_eq: false, .. } => (SafetyLevel::Safe, StatementType::Pragma),
        Statement::Pragma { .. } => (SafetyLevel::Mutating, StatementType::Pragma),

        Statement::Insert { .. } => (SafetyLevel::Mutating, StatementType::Insert),
        Statement::Update { .. } => (SafetyLevel::Mutating, StatementType::Update),
        Statement::Merge { .. } => (SafetyLevel::Mutating, StatementType::Merge),

        Statement::Delete { .. } => (SafetyLevel::Destructive, StatementType::Delete),
        Statement::Drop { .. } => (SafetyLevel::Destructive, StatementType::Drop),
        Statement::Truncate { .. } => (SafetyLevel::Destructive, StatementType::Truncate),
        Statement::AlterTable { .. } | Statement::AlterIndex { .. } | Statement::AlterView { .. } => {
            (SafetyLevel::Destructive, StatementType::Alter)
        }
        Statement::CreateTable { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. }
        | Statement::CreateDatabase { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::Grant { .. } => (SafetyLevel::Destructive, StatementType::Grant),
        Statement::Revoke { .. } => (SafetyLevel::Destructive, StatementType::Revoke),

        // Anything unrecognized is treated as a write
        _ => (SafetyLevel::Destructive, StatementType::Unknown),
    }
}

/// Walks CTEs and the query body looking for data-modifying parts.
fn classify_query(query: &Query) -> (SafetyLevel, StatementType) {
    let ctes = query
        .with
        .iter()
        .flat_map(|with| with.cte_tables.iter())
        .map(|cte| classify_query(&cte.query));

    ctes.fold(classify_set_expr(&query.body), most_dangerous)
}

fn classify_set_expr(set_expr: &SetExpr) -> (SafetyLevel, StatementType) {
    match set_expr {
        SetExpr::Insert(stmt) | SetExpr::Update(stmt) => classify_statement(stmt),
        SetExpr::Query(query) => classify_query(query),
        SetExpr::Select(select) => classify_select(select),
        SetExpr::SetOperation { left, right, .. } => {
            most_dangerous(classify_set_expr(left), classify_set_expr(right))
        }
        _ => (SafetyLevel::Safe, StatementType::Select),
    }
}

fn classify_select(select: &Select) -> (SafetyLevel, StatementType) {
    select
        .from
        .iter()
        .map(classify_table_with_joins)
        .fold((SafetyLevel::Safe, StatementType::Select), most_dangerous)
}

fn classify_table_with_joins(twj: &TableWithJoins) -> (SafetyLevel, StatementType) {
    twj.joins
        .iter()
        .map(|join| classify_table_factor(&join.relation))
        .fold(classify_table_factor(&twj.relation), most_dangerous)
}

fn classify_table_factor(factor: &TableFactor) -> (SafetyLevel, StatementType) {
    match factor {
        TableFactor::Derived { subquery, .. } => classify_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => classify_table_with_joins(table_with_joins),
        _ => (SafetyLevel::Safe, StatementType::Select),
    }
}
