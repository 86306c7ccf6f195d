// Response normalization
//
// Mirrors translation: the protocol the chart asked for decides how the backend body is checked
// and reshaped before the renderer sees it.

use crate::error::{MediatorError, Result};
use crate::mediator::Mediator;
use crate::protocol::Protocol;
use crate::sparql;
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Data handed back to the chart renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartData {
    /// Body passed through as text, or extracted page content.
    Raw(String),
    Json(Value),
}

impl ChartData {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ChartData::Json(value) => Some(value),
            ChartData::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            ChartData::Raw(text) => Some(text),
            ChartData::Json(_) => None,
        }
    }
}

impl Mediator {
    /// Validates and reshapes a backend response for the protocol the chart originally used.
    pub fn normalize(&self, raw: &str, protocol: Protocol) -> Result<ChartData> {
        match protocol {
            Protocol::WikiApi => Ok(ChartData::Json(self.parse_api_response(raw)?)),
            Protocol::WikiRaw => {
                let json = self.parse_api_response(raw)?;
                page_content(&json).map(ChartData::Raw)
            }
            Protocol::Tabular => {
                let json = self.parse_api_response(raw)?;
                tabular_data(&json).map(ChartData::Json)
            }
            Protocol::Map => {
                let json = self.parse_api_response(raw)?;
                map_data(&json).map(ChartData::Json)
            }
            Protocol::WikidataSparql => {
                let json = parse_json(raw)?;
                let bindings = json
                    .pointer("/results/bindings")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        MediatorError::UpstreamDataShapeError(
                            "SPARQL response has no results.bindings array".to_string(),
                        )
                    })?;
                Ok(ChartData::Json(Value::Array(sparql::parse_bindings(bindings)?)))
            }
            _ => Ok(ChartData::Raw(raw.to_string())),
        }
    }

    /// Parses a wiki API body, failing on a reported `error` and logging any `warnings`.
    fn parse_api_response(&self, raw: &str) -> Result<Value> {
        let json = parse_json(raw)?;

        if let Some(error) = json.get("error").filter(|e| !e.is_null()) {
            return Err(MediatorError::UpstreamApiError(error.to_string()));
        }
        if let Some(warnings) = json.get("warnings").filter(|w| !w.is_null()) {
            self.warn(&format!("API warnings: {}", warnings));
        }

        Ok(json)
    }
}

fn parse_json(raw: &str) -> Result<Value> {
    serde_json::from_str(raw)
        .map_err(|e| MediatorError::UpstreamDataShapeError(format!("invalid JSON: {}", e)))
}

fn page_content(json: &Value) -> Result<String> {
    json.pointer("/query/pages/0/revisions/0/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            MediatorError::ContentExtractionFailure(
                "response has no query.pages[0].revisions[0].content".to_string(),
            )
        })
}

fn jsondata(json: &Value) -> Result<&Value> {
    json.get("jsondata")
        .filter(|data| data.is_object())
        .ok_or_else(|| {
            MediatorError::ContentExtractionFailure("response has no jsondata".to_string())
        })
}

fn field(value: &Value, pointer: &str) -> Value {
    value.pointer(pointer).cloned().unwrap_or(Value::Null)
}

fn metadata(data: &Value) -> Map<String, Value> {
    let mut meta = Map::new();
    meta.insert("description".into(), field(data, "/description"));
    meta.insert("license_code".into(), field(data, "/license/code"));
    meta.insert("license_text".into(), field(data, "/license/text"));
    meta.insert("license_url".into(), field(data, "/license/url"));
    meta.insert("sources".into(), field(data, "/sources"));
    meta
}

fn tabular_data(json: &Value) -> Result<Value> {
    let data = jsondata(json)?;
    let fields = field(data, "/schema/fields");
    let names: Vec<&str> = fields
        .as_array()
        .ok_or_else(|| {
            MediatorError::ContentExtractionFailure(
                "tabular data has no schema.fields".to_string(),
            )
        })?
        .iter()
        .map(|f| f.get("name").and_then(Value::as_str).unwrap_or_default())
        .collect();

    let rows = data
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            MediatorError::ContentExtractionFailure("tabular data has no data rows".to_string())
        })?;

    let rows: Vec<Value> = rows
        .iter()
        .map(|row| {
            let values = row.as_array().map(Vec::as_slice).unwrap_or_default();
            let record: Map<String, Value> = names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.to_string(), values.get(i).cloned().unwrap_or(Value::Null)))
                .collect();
            Value::Object(record)
        })
        .collect();

    Ok(json!({
        "meta": [metadata(data)],
        "fields": fields,
        "data": rows,
    }))
}

fn map_data(json: &Value) -> Result<Value> {
    let data = jsondata(json)?;
    let mut meta = metadata(data);
    meta.insert("zoom".into(), field(data, "/zoom"));
    meta.insert("lat".into(), field(data, "/latitude"));
    meta.insert("lon".into(), field(data, "/longitude"));

    Ok(json!({
        "meta": [meta],
        "data": field(data, "/data"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_protocols_pass_through() {
        let mediator = Mediator::default();
        for protocol in [
            Protocol::Http,
            Protocol::WikiRest,
            Protocol::WikiFile,
            Protocol::GeoShape,
        ] {
            assert_eq!(
                mediator.normalize("not json", protocol).unwrap(),
                ChartData::Raw("not json".to_string())
            );
        }
    }

    #[test]
    fn api_error_field_fails() {
        let err = Mediator::default()
            .normalize(r#"{"error":{"code":"badtitle"}}"#, Protocol::WikiApi)
            .unwrap_err();
        assert_eq!(
            err,
            MediatorError::UpstreamApiError(r#"{"code":"badtitle"}"#.to_string())
        );
        assert!(err.is_upstream());
    }

    #[test]
    fn null_error_field_is_ignored() {
        let data = Mediator::default()
            .normalize(r#"{"error":null,"a":1}"#, Protocol::WikiApi)
            .unwrap();
        assert_eq!(data.as_json(), Some(&json!({"error": null, "a": 1})));
    }

    #[test]
    fn invalid_json_is_a_shape_error() {
        let err = Mediator::default().normalize("<html>", Protocol::Tabular).unwrap_err();
        assert!(matches!(err, MediatorError::UpstreamDataShapeError(_)));
    }

    #[test]
    fn tabular_rows_are_padded_with_null() {
        let raw = json!({"jsondata": {
            "schema": {"fields": [{"name": "a"}, {"name": "b"}]},
            "data": [[1, null], [2]]
        }})
        .to_string();
        let data = Mediator::default().normalize(&raw, Protocol::Tabular).unwrap();
        let data = data.as_json().unwrap();
        assert_eq!(data["data"], json!([{"a": 1, "b": null}, {"a": 2, "b": null}]));
        assert_eq!(data["meta"][0]["license_code"], Value::Null);
    }

    #[test]
    fn map_meta_has_coordinates() {
        let raw = json!({"jsondata": {
            "zoom": 3, "latitude": 1.5, "longitude": -2, "data": {"type": "FeatureCollection"}
        }})
        .to_string();
        let data = Mediator::default().normalize(&raw, Protocol::Map).unwrap();
        let data = data.as_json().unwrap();
        assert_eq!(data["meta"][0]["zoom"], json!(3));
        assert_eq!(data["meta"][0]["lat"], json!(1.5));
        assert_eq!(data["meta"][0]["lon"], json!(-2));
        assert_eq!(data["data"], json!({"type": "FeatureCollection"}));
    }

    #[test]
    fn missing_jsondata_is_extraction_failure() {
        let err = Mediator::default().normalize("{}", Protocol::Map).unwrap_err();
        assert!(matches!(err, MediatorError::ContentExtractionFailure(_)));
    }
}
