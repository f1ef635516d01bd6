//! Filter-to-query compiler
//!
//! Pure and synchronous: a [`QuerySpec`] goes in, a rendered parameterized
//! query comes out. Nothing here touches the backend.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog::RecordCatalog;
use super::error::QueryError;
use super::join;
use super::normalize::{self, NormalizedFilterTerm};
use super::plan::{CompiledPredicate, QueryPlan, RenderedQuery, SelectList, SqlDialect, TableRef};
use super::types::{Identifier, OrderDirection, Scalar};

/// Per-deployment compiler settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    pub dialect: SqlDialect,
    /// Treat date-shaped operands of comparison operators as whole days
    pub date_aware_comparisons: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::default(),
            date_aware_comparisons: true,
        }
    }
}

/// Caller-facing query description
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    pub record_type: Option<String>,
    pub filters: Value,
    pub fields: Option<Vec<String>>,
    pub order_by: Option<String>,
    pub order_dir: Option<String>,
}

impl QuerySpec {
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: Some(record_type.into()),
            ..Self::default()
        }
    }

    pub fn with_filters(mut self, filters: Value) -> Self {
        self.filters = filters;
        self
    }
}

/// Compilation output
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    /// Lower-cased catalog key
    pub record_type: String,
    pub base_table: String,
    pub alias: String,
    pub plan: QueryPlan,
    pub rendered: RenderedQuery,
}

#[derive(Debug, Clone)]
pub struct QueryCompiler {
    catalog: Arc<RecordCatalog>,
    config: QueryConfig,
}

impl QueryCompiler {
    pub fn new(catalog: Arc<RecordCatalog>, config: QueryConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &RecordCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn compile(&self, spec: &QuerySpec) -> Result<CompiledQuery, QueryError> {
        let record_type = spec
            .record_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(QueryError::MissingRecordType)?;

        let terms = normalize::normalize(&spec.filters)?;
        let resolved = self.catalog.resolve(record_type)?;
        let entry = resolved.entry;
        let from = TableRef::new(&entry.base_table, resolved.alias);

        let select = select_list(spec.fields.as_deref())?;
        let order_by = spec
            .order_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Identifier::parse(s, "orderBy"))
            .transpose()?;

        let mut filter = join::compile_filters(&terms, &from, entry, &self.config)?;
        for implicit in &entry.implicit_filters {
            if !filters_field(&terms, &implicit.field) {
                filter.push(CompiledPredicate::new(
                    format!("{} = ?", from.column(&implicit.field)),
                    vec![Scalar::from(implicit.value.as_str())],
                ));
            }
        }

        let direction = OrderDirection::parse_lenient(spec.order_dir.as_deref());
        let plan = QueryPlan {
            select,
            from,
            filter,
            order_by: join::order_term(entry, order_by.as_ref(), direction),
        };
        let rendered = plan.render();

        tracing::debug!(
            record_type = %resolved.key,
            terms = terms.len(),
            params = rendered.params.len(),
            "Compiled query"
        );

        Ok(CompiledQuery {
            record_type: resolved.key.to_string(),
            base_table: entry.base_table.clone(),
            alias: resolved.alias.to_string(),
            plan,
            rendered,
        })
    }
}

fn select_list(fields: Option<&[String]>) -> Result<SelectList, QueryError> {
    match fields {
        None | Some([]) => Ok(SelectList::All),
        Some(fields) => fields
            .iter()
            .map(|f| Identifier::parse(f.trim(), "fields"))
            .collect::<Result<Vec<_>, _>>()
            .map(SelectList::Columns),
    }
}

fn filters_field(terms: &[NormalizedFilterTerm], field: &str) -> bool {
    terms.iter().any(|t| t.field_name.eq_ignore_case(field))
}
