//! Filter shape normalization
//!
//! Accepted shapes, tried in this order:
//!
//! 1. `[{ "field": "x", "operator": "=", "value": 1 }]`
//! 2. `[{ "x": { "operator": "=", "value": 1 } }]`
//! 3. `{ "x": 1, "y": { "operator": "in", "values": [...] }, "d_startdate": "..." }`
//! 4. `[{ "field_name": "x", "operator": "equals", "value": 1 }]` (internal form)
//!
//! Anything else (null, scalars) means "no filtering".

use serde_json::{Map, Value};

use super::dates::normalize_date;
use super::error::QueryError;
use super::operators::Operator;
use super::types::{Identifier, Scalar};

/// Upper bound on filter terms per request
pub const MAX_FILTER_TERMS: usize = 100;

const START_SUFFIX: &str = "_startdate";
const END_SUFFIX: &str = "_enddate";

/// Canonical filter term
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFilterTerm {
    pub field_name: Identifier,
    pub operator: Operator,
    pub value: Option<Scalar>,
    pub values: Option<Vec<Scalar>>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl NormalizedFilterTerm {
    pub fn new(field_name: Identifier, operator: Operator) -> Self {
        Self {
            field_name,
            operator,
            value: None,
            values: None,
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_value(mut self, value: Scalar) -> Self {
        self.value = Some(value);
        self
    }
}

/// Normalize any accepted filter shape into canonical terms
pub fn normalize(raw: &Value) -> Result<Vec<NormalizedFilterTerm>, QueryError> {
    let terms = match raw {
        Value::Array(items) => {
            check_count(items.len())?;
            normalize_array(items)?
        }
        Value::Object(map) => {
            check_count(map.len())?;
            normalize_legacy_object(map)?
        }
        _ => Vec::new(),
    };
    check_count(terms.len())?;
    Ok(terms)
}

fn check_count(count: usize) -> Result<(), QueryError> {
    if count > MAX_FILTER_TERMS {
        return Err(QueryError::TooManyFilters {
            count,
            max: MAX_FILTER_TERMS,
        });
    }
    Ok(())
}

fn normalize_array(items: &[Value]) -> Result<Vec<NormalizedFilterTerm>, QueryError> {
    let has_field = |v: &Value| v.as_object().is_some_and(|o| o.contains_key("field"));
    let single_key = |v: &Value| v.as_object().is_some_and(|o| o.len() == 1);

    if items.iter().all(has_field) {
        return items
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| {
                let field = obj.get("field").map(field_name_text).unwrap_or_default();
                term_from_spec(&field, obj)
            })
            .collect();
    }

    if items.iter().all(single_key) {
        let mut terms = Vec::with_capacity(items.len());
        for obj in items.iter().filter_map(Value::as_object) {
            for (field, spec) in obj {
                // non-object specs carry no operator and are skipped
                if let Value::Object(spec) = spec {
                    terms.push(term_from_spec(field, spec)?);
                }
            }
        }
        return Ok(terms);
    }

    items
        .iter()
        .map(|item| match item {
            Value::Object(obj) => {
                let field = obj
                    .get("field_name")
                    .map(field_name_text)
                    .unwrap_or_default();
                term_from_spec(&field, obj)
            }
            other => Err(QueryError::UnsafeIdentifier {
                kind: "field_name",
                name: other.to_string(),
            }),
        })
        .collect()
}

#[derive(Default)]
struct DateBounds {
    start: Option<String>,
    end: Option<String>,
}

/// Bounds for `field`, kept in first-seen order
fn bounds_entry<'a>(
    bounds: &'a mut Vec<(String, DateBounds)>,
    field: &str,
) -> &'a mut DateBounds {
    let pos = match bounds.iter().position(|(f, _)| f == field) {
        Some(pos) => pos,
        None => {
            bounds.push((field.to_string(), DateBounds::default()));
            bounds.len() - 1
        }
    };
    &mut bounds[pos].1
}

fn normalize_legacy_object(
    map: &Map<String, Value>,
) -> Result<Vec<NormalizedFilterTerm>, QueryError> {
    let mut terms = Vec::new();
    let mut bounds: Vec<(String, DateBounds)> = Vec::new();

    for (key, val) in map {
        if let Some(field) = strip_suffix_ignore_case(key, START_SUFFIX) {
            bounds_entry(&mut bounds, field.trim()).start = date_text(val);
            continue;
        }
        if let Some(field) = strip_suffix_ignore_case(key, END_SUFFIX) {
            bounds_entry(&mut bounds, field.trim()).end = date_text(val);
            continue;
        }

        match val {
            Value::Object(spec) if spec.contains_key("operator") => {
                terms.push(term_from_spec(key, spec)?);
            }
            Value::Array(items) => {
                let field = field_identifier(key)?;
                let mut term = NormalizedFilterTerm::new(field, Operator::In);
                term.values = Some(scalar_list(items, Operator::In)?);
                terms.push(term);
            }
            other => {
                let field = field_identifier(key)?;
                let mut term = NormalizedFilterTerm::new(field, Operator::Equals);
                term.value = Scalar::from_json(other);
                terms.push(term);
            }
        }
    }

    for (field, b) in bounds {
        let ident = field_identifier(&field)?;
        if let Some(start) = b.start {
            terms.push(
                NormalizedFilterTerm::new(ident.clone(), Operator::GreaterThanOrEqual)
                    .with_value(Scalar::Text(start)),
            );
        }
        if let Some(end) = b.end {
            terms.push(
                NormalizedFilterTerm::new(ident, Operator::LessThanOrEqual)
                    .with_value(Scalar::Text(end)),
            );
        }
    }

    Ok(terms)
}

fn field_identifier(name: &str) -> Result<Identifier, QueryError> {
    Identifier::parse(name.trim(), "field_name")
}

/// Build a term from an operator/value record
fn term_from_spec(
    field: &str,
    spec: &Map<String, Value>,
) -> Result<NormalizedFilterTerm, QueryError> {
    let field_name = field_identifier(field)?;
    let operator = match spec.get("operator") {
        Some(Value::String(token)) => Operator::parse(token)?,
        Some(other) => return Err(QueryError::UnsupportedOperator(other.to_string())),
        None => return Err(QueryError::UnsupportedOperator(String::new())),
    };

    let mut term = NormalizedFilterTerm::new(field_name, operator);

    match spec.get("value") {
        Some(Value::Array(items)) if operator.is_set_membership() => {
            term.values = Some(scalar_list(items, operator)?);
        }
        Some(value) => term.value = Scalar::from_json(value),
        None => {}
    }

    match spec.get("values") {
        Some(Value::Array(items)) => term.values = Some(scalar_list(items, operator)?),
        Some(Value::Null) | None => {}
        Some(_) => return Err(QueryError::missing(operator, "a list of scalar values")),
    }

    term.start_date =
        first_of(spec, &["startdate", "startDate", "start_date"]).and_then(date_text);
    term.end_date = first_of(spec, &["enddate", "endDate", "end_date"]).and_then(date_text);

    Ok(term)
}

fn first_of<'a>(spec: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| spec.get(*k))
}

fn scalar_list(items: &[Value], operator: Operator) -> Result<Vec<Scalar>, QueryError> {
    items
        .iter()
        .map(|v| {
            Scalar::from_json(v)
                .ok_or_else(|| QueryError::missing(operator, "a list of scalar values"))
        })
        .collect()
}

fn field_name_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn date_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => normalize_date(s),
        Value::Number(n) => normalize_date(&n.to_string()),
        _ => None,
    }
}

fn strip_suffix_ignore_case<'a>(key: &'a str, suffix: &str) -> Option<&'a str> {
    let split = key.len().checked_sub(suffix.len())?;
    if !key.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = key.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ident(s: &str) -> Identifier {
        Identifier::parse(s, "field_name").unwrap()
    }

    #[test]
    fn test_three_shapes_are_equivalent() {
        let expected = vec![NormalizedFilterTerm::new(ident("x"), Operator::Equals).with_value(Scalar::Int(1))];

        let a = normalize(&json!([{ "field": "x", "operator": "=", "value": 1 }])).unwrap();
        let b = normalize(&json!([{ "x": { "operator": "=", "value": 1 } }])).unwrap();
        let c = normalize(&json!({ "x": 1 })).unwrap();

        assert_eq!(a, expected);
        assert_eq!(b, expected);
        assert_eq!(c, expected);
    }

    #[test]
    fn test_internal_shape_passes_through() {
        let terms = normalize(&json!([
            { "field_name": "status", "operator": "equals", "value": "open" },
            { "field_name": "type", "operator": "in", "values": ["A", "B"] }
        ]))
        .unwrap();
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].field_name.as_str(), "status");
        assert_eq!(terms[1].operator, Operator::In);
        assert_eq!(
            terms[1].values,
            Some(vec![Scalar::from("A"), Scalar::from("B")])
        );
    }

    #[test]
    fn test_empty_and_unknown_inputs_mean_no_filtering() {
        assert!(normalize(&json!(null)).unwrap().is_empty());
        assert!(normalize(&json!([])).unwrap().is_empty());
        assert!(normalize(&json!({})).unwrap().is_empty());
        assert!(normalize(&json!("status = 1")).unwrap().is_empty());
        assert!(normalize(&json!(42)).unwrap().is_empty());
    }

    #[test]
    fn test_legacy_date_suffixes_pair_up() {
        let terms = normalize(&json!({
            "status": "open",
            "trandate_startdate": "1-6-2024",
            "TranDate_EndDate": "6/30/2024"
        }))
        .unwrap();

        assert_eq!(terms.len(), 3);
        assert_eq!(terms[0].operator, Operator::Equals);
        assert_eq!(terms[1].field_name.as_str(), "trandate");
        assert_eq!(terms[1].operator, Operator::GreaterThanOrEqual);
        assert_eq!(terms[1].value, Some(Scalar::from("2024-06-01")));
        // suffix match is case-insensitive, the field keeps its own casing
        assert_eq!(terms[2].field_name.as_str(), "TranDate");
        assert_eq!(terms[2].operator, Operator::LessThanOrEqual);
        assert_eq!(terms[2].value, Some(Scalar::from("2024-06-30")));
    }

    #[test]
    fn test_legacy_start_and_end_for_same_field() {
        let terms = normalize(&json!({
            "trandate_enddate": "2024-06-30",
            "trandate_startdate": "2024-06-01"
        }))
        .unwrap();
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].operator, Operator::GreaterThanOrEqual);
        assert_eq!(terms[1].operator, Operator::LessThanOrEqual);
    }

    #[test]
    fn test_legacy_operator_record_taken_as_given() {
        let terms = normalize(&json!({
            "amount": { "operator": ">", "value": 500 },
            "memo": { "operator": "is_null" }
        }))
        .unwrap();
        assert_eq!(terms[0].operator, Operator::GreaterThan);
        assert_eq!(terms[0].value, Some(Scalar::Int(500)));
        assert_eq!(terms[1].operator, Operator::IsNull);
    }

    #[test]
    fn test_legacy_array_value_becomes_in() {
        let terms = normalize(&json!({ "type": ["SalesOrd", "CustInvc"] })).unwrap();
        assert_eq!(terms[0].operator, Operator::In);
        assert_eq!(terms[0].values.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_array_value_accepted_for_in() {
        let terms = normalize(&json!([{ "field": "type", "operator": "in", "value": ["A"] }])).unwrap();
        assert_eq!(terms[0].values, Some(vec![Scalar::from("A")]));
        assert_eq!(terms[0].value, None);
    }

    #[test]
    fn test_date_range_bounds_are_normalized() {
        let terms = normalize(&json!([{
            "field": "trandate",
            "operator": "date_range",
            "startdate": "1/1/2024",
            "enddate": "31-1-2024"
        }]))
        .unwrap();
        assert_eq!(terms[0].start_date.as_deref(), Some("2024-01-01"));
        assert_eq!(terms[0].end_date.as_deref(), Some("2024-01-31"));
    }

    #[test]
    fn test_unsafe_field_names_rejected() {
        for raw in [
            json!([{ "field": "id; DROP TABLE customer", "operator": "=", "value": 1 }]),
            json!([{ "first name": { "operator": "=", "value": 1 } }]),
            json!({ "id--": 1 }),
            json!([{ "field_name": "a/*", "operator": "=", "value": 1 }]),
        ] {
            assert!(matches!(
                normalize(&raw),
                Err(QueryError::UnsafeIdentifier { .. })
            ));
        }
    }

    #[test]
    fn test_field_names_are_trimmed_in_every_shape() {
        let expected = vec![NormalizedFilterTerm::new(ident("status"), Operator::Equals)
            .with_value(Scalar::from("A"))];
        for raw in [
            json!([{ "field": " status ", "operator": "=", "value": "A" }]),
            json!([{ "status\t": { "operator": "=", "value": "A" } }]),
            json!({ " status": "A" }),
            json!([{ "field_name": "status ", "operator": "=", "value": "A" }]),
        ] {
            assert_eq!(normalize(&raw).unwrap(), expected, "{}", raw);
        }

        let terms = normalize(&json!({ " trandate_startdate": "2024-06-01" })).unwrap();
        assert_eq!(terms[0].field_name, ident("trandate"));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let err = normalize(&json!([{ "field": "x", "operator": "between", "value": 1 }])).unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedOperator(op) if op == "between"));
    }

    #[test]
    fn test_missing_operator_rejected_in_array_shape() {
        let err = normalize(&json!([{ "field": "x", "value": 1 }])).unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedOperator(_)));
    }

    #[test]
    fn test_non_object_specs_skipped_in_single_key_shape() {
        let terms = normalize(&json!([{ "x": { "operator": "=", "value": 1 } }, { "y": 2 }])).unwrap();
        assert_eq!(terms.len(), 1);
    }

    #[test]
    fn test_too_many_filters() {
        let items: Vec<Value> = (0..=MAX_FILTER_TERMS)
            .map(|i| json!({ "field": format!("f{}", i), "operator": "is_null" }))
            .collect();
        let err = normalize(&Value::Array(items)).unwrap_err();
        assert!(matches!(err, QueryError::TooManyFilters { .. }));
    }

    #[test]
    fn test_suffix_strip() {
        assert_eq!(strip_suffix_ignore_case("d_STARTDATE", START_SUFFIX), Some("d"));
        assert_eq!(strip_suffix_ignore_case("_startdate", START_SUFFIX), Some(""));
        assert_eq!(strip_suffix_ignore_case("startdate", START_SUFFIX), None);
    }
}
