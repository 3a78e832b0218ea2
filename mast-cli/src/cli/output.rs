//! Rendering of API records on stdout

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;

/// Output format of record listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON on one line
    #[default]
    Json,
    /// Indented JSON with sorted keys
    Pretty,
    /// Tab-separated values with a header row
    Tsv,
}

/// Format records according to the specified output format
pub fn format_output(data: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string(data).context("Failed to format JSON output"),
        OutputFormat::Pretty => to_pretty_json(data),
        OutputFormat::Tsv => json_to_tsv(data),
    }
}

/// Four-space indented JSON
///
/// serde_json maps keep their keys sorted, so objects print in key order.
pub fn to_pretty_json(data: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut serializer)
        .context("Failed to format JSON output")?;
    String::from_utf8(buf).context("JSON output is not valid UTF-8")
}

/// Convert a list of records to tab-separated values
///
/// Columns are the union of all record keys in first-seen order.
fn json_to_tsv(data: &Value) -> Result<String> {
    let records: Vec<&Value> = match data {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut headers: Vec<String> = Vec::new();
    for record in &records {
        if let Value::Object(obj) = record {
            for key in obj.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(Vec::new());

    if headers.is_empty() {
        for record in &records {
            writer.write_record([cell_text(record)])?;
        }
    } else {
        writer.write_record(&headers)?;
        for record in &records {
            let row: Vec<String> = headers
                .iter()
                .map(|h| record.get(h).map(cell_text).unwrap_or_default())
                .collect();
            writer.write_record(&row)?;
        }
    }

    let bytes = writer.into_inner().context("Failed to flush TSV output")?;
    String::from_utf8(bytes).context("TSV output is not valid UTF-8")
}

/// Convert a JSON value to a single cell
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_compact_json() {
        let data = json!([{"id": 1, "reference": "Smith 2019"}]);
        assert_eq!(
            format_output(&data, OutputFormat::Json).unwrap(),
            r#"[{"id":1,"reference":"Smith 2019"}]"#
        );
    }

    #[test]
    fn test_pretty_json_sorted_four_spaces() {
        let data = json!({"reference": "Smith 2019", "id": 1});
        assert_eq!(
            format_output(&data, OutputFormat::Pretty).unwrap(),
            "{\n    \"id\": 1,\n    \"reference\": \"Smith 2019\"\n}"
        );
    }

    #[test]
    fn test_tsv() {
        let data = json!([
            {"id": 1, "reference": "Smith 2019", "publication_year": null},
            {"id": 2, "reference": "Doe, 2020", "publication_year": 2020, "extra": ["a", "b"]},
        ]);

        let tsv = format_output(&data, OutputFormat::Tsv).unwrap();
        let lines: Vec<&str> = tsv.lines().collect();

        assert_eq!(lines[0], "id\tpublication_year\treference\textra");
        assert_eq!(lines[1], "1\t\tSmith 2019\t");
        assert_eq!(lines[2], "2\t2020\tDoe, 2020\t\"[\"\"a\"\",\"\"b\"\"]\"");
    }

    #[test]
    fn test_tsv_single_object() {
        let tsv = format_output(&json!({"id": 3}), OutputFormat::Tsv).unwrap();
        assert_eq!(tsv, "id\n3\n");
    }
}
