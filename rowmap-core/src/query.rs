use crate::value::Value;

/// Per-query inputs carried into SQL rendering.
///
/// Everything is optional: the table override replaces the descriptor's table
/// name (e.g. for sharding by suffix), the fragments are appended verbatim to
/// select statements, and `params` holds arguments for raw queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryContext {
    pub table: Option<String>,
    pub where_clause: Option<String>,
    pub order_by: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub params: Vec<Value>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Sets the `where` fragment, without the keyword.
    pub fn where_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    /// Sets the `order by` fragment, without the keywords.
    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order_by = Some(order.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Appends a parameter for the `where` fragment.
    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// The table override, or `default` when there is none or it is blank.
    pub fn table_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.table
            .as_deref()
            .map(str::trim)
            .filter(|table| !table.is_empty())
            .unwrap_or(default)
    }

    pub(crate) fn push_filters(&self, sql: &mut String) {
        if let Some(clause) = non_blank(self.where_clause.as_deref()) {
            sql.push_str(" where ");
            sql.push_str(clause);
        }
    }

    pub(crate) fn push_tail(&self, sql: &mut String) {
        if let Some(order) = non_blank(self.order_by.as_deref()) {
            sql.push_str(" order by ");
            sql.push_str(order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" limit {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" offset {offset}"));
        }
    }
}

fn non_blank(fragment: Option<&str>) -> Option<&str> {
    fragment.map(str::trim).filter(|s| !s.is_empty())
}
