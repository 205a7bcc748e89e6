//! Database schema types.
//!
//! Represents tables, columns and foreign keys, and renders them as the
//! `CREATE TABLE` text the agent reads.

/// Represents the complete schema of a database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub tables: Vec<Table>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table names in introspection order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Looks up a table by name, ignoring ASCII case.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Renders a `CREATE TABLE` statement for the given table, including its
    /// primary key and outgoing foreign keys.
    pub fn create_statement(&self, table: &Table) -> String {
        let mut defs: Vec<String> = table
            .columns
            .iter()
            .map(|column| {
                let mut def = format!("\t\"{}\" {}", column.name, column.data_type);
                if !column.is_nullable {
                    def.push_str(" NOT NULL");
                }
                if let Some(default) = &column.default {
                    def.push_str(" DEFAULT ");
                    def.push_str(default);
                }
                def
            })
            .collect();

        if !table.primary_key.is_empty() {
            defs.push(format!(
                "\tPRIMARY KEY ({})",
                quote_list(&table.primary_key)
            ));
        }

        for fk in self.foreign_keys.iter().filter(|fk| fk.from_table == table.name) {
            defs.push(format!(
                "\tFOREIGN KEY({}) REFERENCES \"{}\" ({})",
                quote_list(&fk.from_columns),
                fk.to_table,
                quote_list(&fk.to_columns)
            ));
        }

        format!("CREATE TABLE \"{}\" (\n{}\n)", table.name, defs.join(", \n"))
    }
}

fn quote_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("\"{n}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Represents a database table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,

    /// Column names that form the primary key.
    pub primary_key: Vec<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Column {
    pub name: String,

    /// Declared data type (e.g., "INTEGER", "varchar(255)").
    pub data_type: String,

    pub is_nullable: bool,

    /// Default value expression, if any.
    pub default: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default: None,
        }
    }

    pub fn nullable(self, nullable: bool) -> Self {
        Self {
            is_nullable: nullable,
            ..self
        }
    }

    pub fn with_default(self, default: impl Into<String>) -> Self {
        Self {
            default: Some(default.into()),
            ..self
        }
    }
}

/// Represents a foreign key relationship between tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForeignKey {
    pub from_table: String,
    pub from_columns: Vec<String>,
    pub to_table: String,
    pub to_columns: Vec<String>,
}

impl ForeignKey {
    pub fn new(
        from_table: impl Into<String>,
        from_columns: Vec<String>,
        to_table: impl Into<String>,
        to_columns: Vec<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            from_columns,
            to_table: to_table.into(),
            to_columns,
        }
    }
}
