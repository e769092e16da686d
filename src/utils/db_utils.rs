use chrono::NaiveDate;
use sqlx::{MySql, QueryBuilder};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Date(NaiveDate),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::U64(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

/// ===============================
/// SQL update container
/// ===============================
/// Column names come from code, never from the request payload; only the
/// values are bound.
#[derive(Debug)]
pub struct SqlUpdate {
    table: &'static str,
    id_column: &'static str,
    assignments: Vec<(&'static str, SqlValue)>,
}

impl SqlUpdate {
    pub fn new(table: &'static str, id_column: &'static str) -> Self {
        Self {
            table,
            id_column,
            assignments: Vec::new(),
        }
    }

    /// Adds `column = ?` when `value` is present.
    pub fn set<V: Into<SqlValue>>(mut self, column: &'static str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.assignments.push((column, v.into()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// ===============================
    /// Build dynamic UPDATE SQL
    /// ===============================
    pub fn into_query(self, id_value: u64) -> QueryBuilder<'static, MySql> {
        let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", self.table));

        let mut set_clause = qb.separated(", ");
        for (column, value) in self.assignments {
            set_clause.push(format!("{column} = "));
            match value {
                SqlValue::String(v) => set_clause.push_bind_unseparated(v),
                SqlValue::U64(v) => set_clause.push_bind_unseparated(v),
                SqlValue::Date(v) => set_clause.push_bind_unseparated(v),
            };
        }

        qb.push(format!(" WHERE {} = ", self.id_column));
        qb.push_bind(id_value);
        qb
    }
}
