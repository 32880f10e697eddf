use sea_orm::{DbBackend, Statement, Value};

/// Positional parameter accumulator for hand-written Postgres statements.
///
/// Every caller-supplied literal goes through [`SqlParams::bind`]; only table
/// and column names taken from [`super::tables::PropertyTables`] are ever
/// formatted into the SQL text.
#[derive(Debug, Default)]
pub struct SqlParams {
    values: Vec<Value>,
}

impl SqlParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a value and return its placeholder (`$1`, `$2`, ...).
    pub fn bind(&mut self, value: impl Into<Value>) -> String {
        self.values.push(value.into());
        format!("${}", self.values.len())
    }

    /// Bind every item and return the comma separated placeholders.
    pub fn bind_all<I, V>(&mut self, items: I) -> String
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        items
            .into_iter()
            .map(|v| self.bind(v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_statement(self, sql: impl Into<String>) -> Statement {
        Statement::from_sql_and_values(DbBackend::Postgres, sql, self.values)
    }
}
