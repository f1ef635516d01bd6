//! Operator vocabulary and per-operator predicate compilation
//!
//! Every operator tag has exactly one compile function, selected by a single
//! `match` in [`compile`]. Day-window handling for date-like operands is
//! decided once in [`date_operand`] and shared by the general comparison
//! operators and the explicit `date_*` operators.

use std::fmt;

use serde::Serialize;

use super::compiler::QueryConfig;
use super::dates::DayWindow;
use super::error::QueryError;
use super::normalize::NormalizedFilterTerm;
use super::plan::CompiledPredicate;
use super::types::Scalar;
use crate::utils::sql::{escape_like_pattern, placeholder_list};

/// Flag literals the backing store uses for booleans
pub const TRUE_FLAG: &str = "T";
pub const FALSE_FLAG: &str = "F";

/// Closed operator vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Contains,
    StartsWith,
    EndsWith,
    NotContains,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    DateRange,
    DateEquals,
    DateBefore,
    DateAfter,
    IsTrue,
    IsFalse,
}

impl Operator {
    pub const ALL: [Operator; 20] = [
        Self::Equals,
        Self::NotEquals,
        Self::GreaterThan,
        Self::LessThan,
        Self::GreaterThanOrEqual,
        Self::LessThanOrEqual,
        Self::Contains,
        Self::StartsWith,
        Self::EndsWith,
        Self::NotContains,
        Self::In,
        Self::NotIn,
        Self::IsNull,
        Self::IsNotNull,
        Self::DateRange,
        Self::DateEquals,
        Self::DateBefore,
        Self::DateAfter,
        Self::IsTrue,
        Self::IsFalse,
    ];

    /// Symbolic tokens accepted in place of the named comparison operators
    pub const SYMBOLS: [(&'static str, Operator); 6] = [
        ("=", Self::Equals),
        ("!=", Self::NotEquals),
        (">", Self::GreaterThan),
        ("<", Self::LessThan),
        (">=", Self::GreaterThanOrEqual),
        ("<=", Self::LessThanOrEqual),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::GreaterThanOrEqual => "greater_than_or_equal",
            Self::LessThanOrEqual => "less_than_or_equal",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::NotContains => "not_contains",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::DateRange => "date_range",
            Self::DateEquals => "date_equals",
            Self::DateBefore => "date_before",
            Self::DateAfter => "date_after",
            Self::IsTrue => "is_true",
            Self::IsFalse => "is_false",
        }
    }

    /// Resolve an operator token (named, any case, or symbolic)
    pub fn parse(token: &str) -> Result<Self, QueryError> {
        let token = token.trim();
        if let Some((_, op)) = Self::SYMBOLS.iter().find(|(sym, _)| *sym == token) {
            return Ok(*op);
        }
        let lower = token.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == lower)
            .ok_or_else(|| QueryError::UnsupportedOperator(token.to_string()))
    }

    /// Whether the operator takes a list operand
    pub fn is_set_membership(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy)]
enum Comparison {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl Comparison {
    fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
        }
    }
}

#[derive(Clone, Copy)]
enum Pattern {
    Contains,
    StartsWith,
    EndsWith,
    NotContains,
}

/// Compile one normalized term against a table alias
pub fn compile(
    term: &NormalizedFilterTerm,
    alias: &str,
    config: &QueryConfig,
) -> Result<CompiledPredicate, QueryError> {
    let column = format!("{}.{}", alias, term.field_name);
    let op = term.operator;

    match op {
        Operator::Equals => compile_comparison(&column, term, Comparison::Eq, config),
        Operator::NotEquals => compile_comparison(&column, term, Comparison::Ne, config),
        Operator::GreaterThan => compile_comparison(&column, term, Comparison::Gt, config),
        Operator::LessThan => compile_comparison(&column, term, Comparison::Lt, config),
        Operator::GreaterThanOrEqual => {
            compile_comparison(&column, term, Comparison::Gte, config)
        }
        Operator::LessThanOrEqual => compile_comparison(&column, term, Comparison::Lte, config),
        Operator::Contains => compile_pattern(&column, term, Pattern::Contains),
        Operator::StartsWith => compile_pattern(&column, term, Pattern::StartsWith),
        Operator::EndsWith => compile_pattern(&column, term, Pattern::EndsWith),
        Operator::NotContains => compile_pattern(&column, term, Pattern::NotContains),
        Operator::In => compile_membership(&column, term, "IN"),
        Operator::NotIn => compile_membership(&column, term, "NOT IN"),
        Operator::IsNull => Ok(CompiledPredicate::new(
            format!("{} IS NULL", column),
            Vec::new(),
        )),
        Operator::IsNotNull => Ok(CompiledPredicate::new(
            format!("{} IS NOT NULL", column),
            Vec::new(),
        )),
        Operator::DateRange => compile_date_range(&column, term, config),
        Operator::DateEquals => {
            let window = required_date(term, term.value.as_ref())?;
            Ok(day_range(&column, &window.start, &window.next, config))
        }
        Operator::DateBefore => {
            let window = required_date(term, term.value.as_ref())?;
            Ok(date_bound(&column, "<", window.start, config))
        }
        Operator::DateAfter => {
            let window = required_date(term, term.value.as_ref())?;
            Ok(date_bound(&column, ">=", window.next, config))
        }
        Operator::IsTrue => Ok(flag_equals(&column, TRUE_FLAG)),
        Operator::IsFalse => Ok(flag_equals(&column, FALSE_FLAG)),
    }
}

fn scalar_operand(term: &NormalizedFilterTerm) -> Result<&Scalar, QueryError> {
    term.value
        .as_ref()
        .ok_or_else(|| QueryError::missing(term.operator, "a scalar value"))
}

/// Day window for a date-like operand, if date-aware comparisons apply
fn date_operand(value: &Scalar, config: &QueryConfig) -> Option<DayWindow> {
    if !config.date_aware_comparisons {
        return None;
    }
    value.as_text().and_then(DayWindow::parse)
}

fn required_date(
    term: &NormalizedFilterTerm,
    value: Option<&Scalar>,
) -> Result<DayWindow, QueryError> {
    let value = value.ok_or_else(|| QueryError::missing(term.operator, "a date value"))?;
    value
        .as_text()
        .and_then(DayWindow::parse)
        .ok_or_else(|| QueryError::InvalidDate {
            operator: term.operator,
            value: value.to_string(),
        })
}

fn date_bound(column: &str, op: &str, date: String, config: &QueryConfig) -> CompiledPredicate {
    CompiledPredicate::new(
        format!("{} {} {}", column, op, config.dialect.date_placeholder()),
        vec![Scalar::Text(date)],
    )
}

/// `column >= start AND column < next`
fn day_range(column: &str, start: &str, next: &str, config: &QueryConfig) -> CompiledPredicate {
    let ph = config.dialect.date_placeholder();
    CompiledPredicate::new(
        format!("{col} >= {ph} AND {col} < {ph}", col = column, ph = ph),
        vec![Scalar::from(start), Scalar::from(next)],
    )
}

fn compile_comparison(
    column: &str,
    term: &NormalizedFilterTerm,
    cmp: Comparison,
    config: &QueryConfig,
) -> Result<CompiledPredicate, QueryError> {
    let value = scalar_operand(term)?;

    if let Some(window) = date_operand(value, config) {
        return Ok(match cmp {
            Comparison::Eq => day_range(column, &window.start, &window.next, config),
            Comparison::Ne => day_range(column, &window.start, &window.next, config).negate(),
            Comparison::Gt => date_bound(column, ">=", window.next, config),
            Comparison::Lt => date_bound(column, "<", window.start, config),
            Comparison::Gte => date_bound(column, ">=", window.start, config),
            Comparison::Lte => date_bound(column, "<", window.next, config),
        });
    }

    Ok(CompiledPredicate::new(
        format!("{} {} ?", column, cmp.symbol()),
        vec![value.clone()],
    ))
}

fn compile_pattern(
    column: &str,
    term: &NormalizedFilterTerm,
    pattern: Pattern,
) -> Result<CompiledPredicate, QueryError> {
    let value = scalar_operand(term)?;
    let escaped = escape_like_pattern(&value.to_string());
    let (operand, keyword) = match pattern {
        Pattern::Contains => (format!("%{}%", escaped), "LIKE"),
        Pattern::StartsWith => (format!("{}%", escaped), "LIKE"),
        Pattern::EndsWith => (format!("%{}", escaped), "LIKE"),
        Pattern::NotContains => (format!("%{}%", escaped), "NOT LIKE"),
    };
    Ok(CompiledPredicate::new(
        format!("{} {} ? ESCAPE '\\'", column, keyword),
        vec![Scalar::Text(operand)],
    ))
}

fn compile_membership(
    column: &str,
    term: &NormalizedFilterTerm,
    keyword: &str,
) -> Result<CompiledPredicate, QueryError> {
    let values = match term.values.as_deref() {
        Some(values) if !values.is_empty() => values,
        _ => return Err(QueryError::missing(term.operator, "a non-empty values list")),
    };
    Ok(CompiledPredicate::new(
        format!("{} {} ({})", column, keyword, placeholder_list(values.len())),
        values.to_vec(),
    ))
}

fn compile_date_range(
    column: &str,
    term: &NormalizedFilterTerm,
    config: &QueryConfig,
) -> Result<CompiledPredicate, QueryError> {
    let (Some(start), Some(end)) = (term.start_date.as_deref(), term.end_date.as_deref()) else {
        return Err(QueryError::missing(
            term.operator,
            "both startdate and enddate",
        ));
    };
    let start = required_date(term, Some(&Scalar::from(start)))?;
    let end = required_date(term, Some(&Scalar::from(end)))?;
    Ok(day_range(column, &start.start, &end.next, config))
}

fn flag_equals(column: &str, flag: &str) -> CompiledPredicate {
    CompiledPredicate::new(format!("{} = ?", column), vec![Scalar::from(flag)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::plan::SqlDialect;
    use crate::domain::query::types::Identifier;

    fn term(field: &str, operator: Operator) -> NormalizedFilterTerm {
        NormalizedFilterTerm::new(Identifier::parse(field, "field_name").unwrap(), operator)
    }

    fn with_value(field: &str, operator: Operator, value: Scalar) -> NormalizedFilterTerm {
        NormalizedFilterTerm {
            value: Some(value),
            ..term(field, operator)
        }
    }

    fn run(t: &NormalizedFilterTerm) -> CompiledPredicate {
        compile(t, "t", &QueryConfig::default()).unwrap()
    }

    fn text(s: &str) -> Scalar {
        Scalar::from(s)
    }

    #[test]
    fn test_parse_symbols_and_names() {
        assert_eq!(Operator::parse("=").unwrap(), Operator::Equals);
        assert_eq!(Operator::parse("!=").unwrap(), Operator::NotEquals);
        assert_eq!(Operator::parse(">=").unwrap(), Operator::GreaterThanOrEqual);
        assert_eq!(Operator::parse(" Not_In ").unwrap(), Operator::NotIn);
        assert_eq!(Operator::parse("IS_TRUE").unwrap(), Operator::IsTrue);
    }

    #[test]
    fn test_parse_unknown_operator() {
        for token in ["between", "==", "<>", ""] {
            assert!(matches!(
                Operator::parse(token),
                Err(QueryError::UnsupportedOperator(_))
            ));
        }
    }

    #[test]
    fn test_every_operator_round_trips_its_name() {
        for op in Operator::ALL {
            assert_eq!(Operator::parse(op.as_str()).unwrap(), op);
        }
    }

    #[test]
    fn test_equals_date_is_day_window() {
        let p = run(&with_value("trandate", Operator::Equals, text("2024-06-01")));
        assert_eq!(p.sql(), "t.trandate >= ? AND t.trandate < ?");
        assert_eq!(p.params(), &[text("2024-06-01"), text("2024-06-02")]);
    }

    #[test]
    fn test_equals_normalizes_date_before_windowing() {
        let p = run(&with_value("trandate", Operator::Equals, text("6/30/2024")));
        assert_eq!(p.params(), &[text("2024-06-30"), text("2024-07-01")]);
    }

    #[test]
    fn test_not_equals_date_is_negated_window() {
        let p = run(&with_value("trandate", Operator::NotEquals, text("2024-06-01")));
        assert_eq!(p.sql(), "NOT (t.trandate >= ? AND t.trandate < ?)");
        assert_eq!(p.params().len(), 2);
    }

    #[test]
    fn test_comparison_day_boundaries() {
        let cases = [
            (Operator::GreaterThan, "t.d >= ?", "2024-06-02"),
            (Operator::LessThan, "t.d < ?", "2024-06-01"),
            (Operator::GreaterThanOrEqual, "t.d >= ?", "2024-06-01"),
            (Operator::LessThanOrEqual, "t.d < ?", "2024-06-02"),
            (Operator::DateBefore, "t.d < ?", "2024-06-01"),
            (Operator::DateAfter, "t.d >= ?", "2024-06-02"),
        ];
        for (op, sql, param) in cases {
            let p = run(&with_value("d", op, text("2024-06-01")));
            assert_eq!(p.sql(), sql, "{}", op);
            assert_eq!(p.params(), &[text(param)], "{}", op);
        }
    }

    #[test]
    fn test_non_date_comparisons_are_literal() {
        let p = run(&with_value("amount", Operator::GreaterThan, Scalar::Int(100)));
        assert_eq!(p.sql(), "t.amount > ?");
        assert_eq!(p.params(), &[Scalar::Int(100)]);

        let p = run(&with_value("status", Operator::Equals, text("open")));
        assert_eq!(p.sql(), "t.status = ?");

        let p = run(&with_value("status", Operator::NotEquals, text("closed")));
        assert_eq!(p.sql(), "t.status != ?");

        let p = run(&with_value("amount", Operator::LessThanOrEqual, Scalar::Float(9.5)));
        assert_eq!(p.sql(), "t.amount <= ?");
    }

    #[test]
    fn test_impossible_date_falls_back_to_literal_comparison() {
        let p = run(&with_value("d", Operator::Equals, text("2024-02-30")));
        assert_eq!(p.sql(), "t.d = ?");
    }

    #[test]
    fn test_date_awareness_can_be_disabled() {
        let config = QueryConfig {
            date_aware_comparisons: false,
            ..QueryConfig::default()
        };
        let t = with_value("trandate", Operator::Equals, text("2024-06-01"));
        let p = compile(&t, "t", &config).unwrap();
        assert_eq!(p.sql(), "t.trandate = ?");
    }

    #[test]
    fn test_suiteql_dialect_wraps_dates() {
        let config = QueryConfig {
            dialect: SqlDialect::Suiteql,
            ..QueryConfig::default()
        };
        let t = with_value("trandate", Operator::LessThan, text("2024-06-01"));
        let p = compile(&t, "t", &config).unwrap();
        assert_eq!(p.sql(), "t.trandate < TO_DATE(?, 'YYYY-MM-DD')");
    }

    #[test]
    fn test_pattern_operators_escape_operand() {
        let p = run(&with_value("memo", Operator::Contains, text("50%_off")));
        assert_eq!(p.sql(), "t.memo LIKE ? ESCAPE '\\'");
        assert_eq!(p.params(), &[text("%50\\%\\_off%")]);

        let p = run(&with_value("name", Operator::StartsWith, text("Acme")));
        assert_eq!(p.params(), &[text("Acme%")]);

        let p = run(&with_value("name", Operator::EndsWith, text("Inc")));
        assert_eq!(p.params(), &[text("%Inc")]);

        let p = run(&with_value("name", Operator::NotContains, text("test")));
        assert_eq!(p.sql(), "t.name NOT LIKE ? ESCAPE '\\'");
    }

    #[test]
    fn test_pattern_requires_value() {
        let err = compile(&term("memo", Operator::Contains), "t", &QueryConfig::default());
        assert!(matches!(err, Err(QueryError::MissingOperand { .. })));
    }

    #[test]
    fn test_in_expands_placeholders() {
        let t = NormalizedFilterTerm {
            values: Some(vec![text("SalesOrd"), text("CustInvc")]),
            ..term("type", Operator::In)
        };
        let p = run(&t);
        assert_eq!(p.sql(), "t.type IN (?, ?)");
        assert_eq!(p.params().len(), 2);

        let t = NormalizedFilterTerm {
            operator: Operator::NotIn,
            ..t
        };
        assert_eq!(run(&t).sql(), "t.type NOT IN (?, ?)");
    }

    #[test]
    fn test_empty_in_is_rejected() {
        let t = NormalizedFilterTerm {
            values: Some(Vec::new()),
            ..term("type", Operator::In)
        };
        let err = compile(&t, "t", &QueryConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            QueryError::MissingOperand {
                operator: Operator::In,
                ..
            }
        ));

        let err = compile(&term("type", Operator::NotIn), "t", &QueryConfig::default());
        assert!(matches!(err, Err(QueryError::MissingOperand { .. })));
    }

    #[test]
    fn test_null_checks_take_no_operand() {
        assert_eq!(run(&term("memo", Operator::IsNull)).sql(), "t.memo IS NULL");
        let p = run(&term("memo", Operator::IsNotNull));
        assert_eq!(p.sql(), "t.memo IS NOT NULL");
        assert!(p.params().is_empty());
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let t = NormalizedFilterTerm {
            start_date: Some("1-1-2024".to_string()),
            end_date: Some("1/31/2024".to_string()),
            ..term("trandate", Operator::DateRange)
        };
        let p = run(&t);
        assert_eq!(p.sql(), "t.trandate >= ? AND t.trandate < ?");
        assert_eq!(p.params(), &[text("2024-01-01"), text("2024-02-01")]);
    }

    #[test]
    fn test_date_range_requires_both_bounds() {
        let t = NormalizedFilterTerm {
            start_date: Some("2024-01-01".to_string()),
            ..term("trandate", Operator::DateRange)
        };
        let err = compile(&t, "t", &QueryConfig::default()).unwrap_err();
        assert!(matches!(err, QueryError::MissingOperand { .. }));
    }

    #[test]
    fn test_explicit_date_operator_rejects_non_dates() {
        let t = with_value("trandate", Operator::DateEquals, text("last week"));
        let err = compile(&t, "t", &QueryConfig::default()).unwrap_err();
        assert!(matches!(err, QueryError::InvalidDate { .. }));

        let t = with_value("trandate", Operator::DateAfter, Scalar::Int(20240101));
        let err = compile(&t, "t", &QueryConfig::default()).unwrap_err();
        assert!(matches!(err, QueryError::InvalidDate { .. }));
    }

    #[test]
    fn test_boolean_flags() {
        let p = run(&term("isinactive", Operator::IsTrue));
        assert_eq!(p.sql(), "t.isinactive = ?");
        assert_eq!(p.params(), &[text("T")]);

        let p = run(&term("isinactive", Operator::IsFalse));
        assert_eq!(p.params(), &[text("F")]);
    }
}
