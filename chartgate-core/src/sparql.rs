// Typed-literal conversion of SPARQL JSON result bindings

use crate::error::{MediatorError, Result};
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::sync::LazyLock;

const XSD_PREFIX: &str = "http://www.w3.org/2001/XMLSchema#";
const WKT_LITERAL: &str = "http://www.opengis.net/ont/geosparql#wktLiteral";

const NUMERIC_TYPES: [&str; 13] = [
    "double",
    "float",
    "decimal",
    "integer",
    "long",
    "int",
    "short",
    "nonNegativeInteger",
    "positiveInteger",
    "unsignedByte",
    "unsignedInt",
    "unsignedLong",
    "unsignedShort",
];

static POINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Point\(\s*([-+0-9.eE]+)\s+([-+0-9.eE]+)\s*\)$").unwrap()
});
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^http://www\.wikidata\.org/entity/([PQ][1-9][0-9]*)$").unwrap()
});

/// Flattens `results.bindings` into one `name -> value` object per row.
pub fn parse_bindings(bindings: &[Value]) -> Result<Vec<Value>> {
    bindings
        .iter()
        .map(|binding| {
            let cells = binding.as_object().ok_or_else(|| {
                MediatorError::UpstreamDataShapeError("SPARQL binding is not an object".to_string())
            })?;
            let row: Map<String, Value> = cells
                .iter()
                .filter_map(|(name, cell)| parse_cell(cell).map(|value| (name.clone(), value)))
                .collect();
            Ok(Value::Object(row))
        })
        .collect()
}

/// Converts one `{type, value, datatype?}` cell. Cells without `type` or `value` yield `None`.
pub fn parse_cell(cell: &Value) -> Option<Value> {
    let kind = cell.get("type")?.as_str()?;
    let value = cell.get("value")?.as_str()?;

    let parsed = match kind {
        "literal" => match cell.get("datatype").and_then(Value::as_str) {
            Some(WKT_LITERAL) => parse_point(value),
            Some(datatype) => datatype
                .strip_prefix(XSD_PREFIX)
                .filter(|name| NUMERIC_TYPES.contains(name))
                .and_then(|_| parse_number(value)),
            None => None,
        },
        "uri" => ENTITY_RE
            .captures(value)
            .map(|caps| Value::String(caps[1].to_string())),
        _ => None,
    };

    Some(parsed.unwrap_or_else(|| Value::String(value.to_string())))
}

fn parse_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(int) = text.parse::<i64>() {
        return Some(Value::Number(int.into()));
    }
    let float: f64 = text.parse().ok()?;
    if float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
        return Some(Value::Number((float as i64).into()));
    }
    Number::from_f64(float).map(Value::Number)
}

fn parse_point(text: &str) -> Option<Value> {
    let caps = POINT_RE.captures(text)?;
    let x = parse_number(&caps[1])?;
    let y = parse_number(&caps[2])?;
    Some(Value::Array(vec![x, y]))
}
