//! Header/line correlation
//!
//! On line record types, terms naming a header-only field are evaluated
//! against the header table and folded into one membership predicate:
//!
//! ```text
//! line.fk IN (SELECT h.id FROM header_table h WHERE <header predicates>)
//! ```
//!
//! The membership predicate always comes first so its parameters lead.

use super::catalog::{CatalogEntry, LineSpec, PRIMARY_KEY};
use super::compiler::QueryConfig;
use super::error::QueryError;
use super::normalize::NormalizedFilterTerm;
use super::operators;
use super::plan::{CompiledPredicate, OrderExpr, OrderTerm, TableRef};
use super::types::{Identifier, OrderDirection};

/// Compile all terms, routing header-only fields through the header table
pub fn compile_filters(
    terms: &[NormalizedFilterTerm],
    base: &TableRef,
    entry: &CatalogEntry,
    config: &QueryConfig,
) -> Result<Vec<CompiledPredicate>, QueryError> {
    let Some(line) = &entry.line else {
        return terms
            .iter()
            .map(|t| operators::compile(t, &base.alias, config))
            .collect();
    };

    let (header_terms, line_terms): (Vec<_>, Vec<_>) = terms
        .iter()
        .partition(|t| entry.is_header_only(t.field_name.as_str()));

    let mut predicates = Vec::with_capacity(line_terms.len() + 1);
    if !header_terms.is_empty() {
        let header = header_ref(line);
        let header_predicates = header_terms
            .iter()
            .map(|t| operators::compile(t, &header.alias, config))
            .collect::<Result<Vec<_>, _>>()?;
        predicates.push(header_membership(base, line, &header, &header_predicates));
    }
    for term in line_terms {
        predicates.push(operators::compile(term, &base.alias, config)?);
    }
    Ok(predicates)
}

fn header_ref(line: &LineSpec) -> TableRef {
    TableRef::new(&line.header_table, &line.header_alias)
}

fn header_membership(
    base: &TableRef,
    line: &LineSpec,
    header: &TableRef,
    header_predicates: &[CompiledPredicate],
) -> CompiledPredicate {
    let inner = CompiledPredicate::conjunction(header_predicates);
    CompiledPredicate::new(
        format!(
            "{} IN (SELECT {} FROM {} WHERE {})",
            base.column(&line.foreign_key),
            header.column(PRIMARY_KEY),
            header,
            inner.sql()
        ),
        inner.params().to_vec(),
    )
}

/// Resolve the ORDER BY term for a record type
///
/// Without an explicit column, line records order by their foreign key and
/// everything else by the primary key. A header-only column on a line record
/// is looked up through a correlated scalar subquery.
pub fn order_term(
    entry: &CatalogEntry,
    order_by: Option<&Identifier>,
    direction: OrderDirection,
) -> OrderTerm {
    let expr = match (order_by, &entry.line) {
        (Some(field), Some(line)) if entry.is_header_only(field.as_str()) => {
            OrderExpr::HeaderLookup {
                header: header_ref(line),
                foreign_key: line.foreign_key.clone(),
                field: field.to_string(),
            }
        }
        (Some(field), _) => OrderExpr::Column(field.to_string()),
        (None, Some(line)) => OrderExpr::Column(line.foreign_key.clone()),
        (None, None) => OrderExpr::Column(PRIMARY_KEY.to_string()),
    };
    OrderTerm { expr, direction }
}
