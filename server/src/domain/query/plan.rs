//! Query AST and rendering
//!
//! Predicates carry their own parameters, so rendering only has to join
//! fragments and concatenate parameter lists in the same order.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::catalog::PRIMARY_KEY;
use super::types::{Identifier, OrderDirection, Scalar};
use crate::utils::sql::count_placeholders;

/// Target SQL dialect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    /// Embedded DuckDB, dates bound as plain `?` text
    #[default]
    Duckdb,
    /// SuiteQL, dates converted with `TO_DATE`
    Suiteql,
}

impl SqlDialect {
    pub fn date_placeholder(&self) -> &'static str {
        match self {
            Self::Duckdb => "?",
            Self::Suiteql => "TO_DATE(?, 'YYYY-MM-DD')",
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duckdb => write!(f, "duckdb"),
            Self::Suiteql => write!(f, "suiteql"),
        }
    }
}

/// SQL fragment with the parameters its placeholders bind to
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    sql: String,
    params: Vec<Scalar>,
}

impl CompiledPredicate {
    pub fn new(sql: impl Into<String>, params: Vec<Scalar>) -> Self {
        let sql = sql.into();
        debug_assert_eq!(
            count_placeholders(&sql),
            params.len(),
            "placeholder/parameter mismatch in `{}`",
            sql
        );
        Self { sql, params }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Scalar] {
        &self.params
    }

    pub fn negate(self) -> Self {
        Self {
            sql: format!("NOT ({})", self.sql),
            params: self.params,
        }
    }

    /// Join predicates with AND, keeping parameter order
    pub fn conjunction(predicates: &[CompiledPredicate]) -> Self {
        let sql = predicates
            .iter()
            .map(|p| p.sql.as_str())
            .collect::<Vec<_>>()
            .join(" AND ");
        let params = predicates
            .iter()
            .flat_map(|p| p.params.iter().cloned())
            .collect();
        Self { sql, params }
    }
}

/// Table with its alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub table: String,
    pub alias: String,
}

impl TableRef {
    pub fn new(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
        }
    }

    pub fn column(&self, name: &str) -> String {
        format!("{}.{}", self.alias, name)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.table, self.alias)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectList {
    All,
    Columns(Vec<Identifier>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderExpr {
    /// Column on the base table
    Column(String),
    /// Header column looked up through the line's foreign key
    HeaderLookup {
        header: TableRef,
        foreign_key: String,
        field: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub expr: OrderExpr,
    pub direction: OrderDirection,
}

/// Compiled query, rendered to text once via [`QueryPlan::render`]
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub select: SelectList,
    pub from: TableRef,
    pub filter: Vec<CompiledPredicate>,
    pub order_by: OrderTerm,
}

/// SQL text with positional parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<Scalar>,
}

impl QueryPlan {
    /// Qualified select list (`t.*` when no fields were requested)
    pub fn select_fields(&self) -> Vec<String> {
        match &self.select {
            SelectList::All => vec![self.from.column("*")],
            SelectList::Columns(cols) => cols.iter().map(|c| self.from.column(c.as_str())).collect(),
        }
    }

    fn order_sql(&self) -> String {
        let expr = match &self.order_by.expr {
            OrderExpr::Column(name) => self.from.column(name),
            OrderExpr::HeaderLookup {
                header,
                foreign_key,
                field,
            } => format!(
                "(SELECT {} FROM {} WHERE {} = {})",
                header.column(field),
                header,
                header.column(PRIMARY_KEY),
                self.from.column(foreign_key)
            ),
        };
        format!("{} {}", expr, self.order_by.direction.as_sql())
    }

    pub fn render(&self) -> RenderedQuery {
        let mut sql = format!(
            "SELECT {} FROM {}",
            self.select_fields().join(", "),
            self.from
        );

        let where_clause = CompiledPredicate::conjunction(&self.filter);
        if !self.filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(where_clause.sql());
        }

        sql.push_str(" ORDER BY ");
        sql.push_str(&self.order_sql());

        RenderedQuery {
            sql,
            params: where_clause.params,
        }
    }
}
