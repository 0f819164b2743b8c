// src/report/export.rs

use serde_json::{Map, Value};

use crate::{error::AppError, utils::html::escape};

use super::options::DownloadFormat;

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn tsv_field(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}

/// Serialises a header row plus data rows in the requested format.
/// `title` names the sheet where the format has a place for it.
pub fn render(
    format: DownloadFormat,
    title: &str,
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<String, AppError> {
    let out = match format {
        DownloadFormat::Csv => delimited(headers, rows, ",", csv_quote),
        DownloadFormat::Tsv => delimited(headers, rows, "\t", tsv_field),
        DownloadFormat::Json => {
            let records: Vec<Value> = rows
                .iter()
                .map(|row| {
                    let record: Map<String, Value> = headers
                        .iter()
                        .cloned()
                        .zip(row.iter().map(|cell| Value::String(cell.clone())))
                        .collect();
                    Value::Object(record)
                })
                .collect();
            serde_json::to_string_pretty(&records)?
        }
        DownloadFormat::Html => {
            let mut html = format!(
                "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head><body>\n<table>\n<tr>",
                escape(title)
            );
            for header in headers {
                html.push_str(&format!("<th>{}</th>", escape(header)));
            }
            html.push_str("</tr>\n");
            for row in rows {
                html.push_str("<tr>");
                for cell in row {
                    html.push_str(&format!("<td>{}</td>", escape(cell)));
                }
                html.push_str("</tr>\n");
            }
            html.push_str("</table>\n</body></html>\n");
            html
        }
    };
    Ok(out)
}

fn delimited(headers: &[String], rows: &[Vec<String>], separator: &str, field: fn(&str) -> String) -> String {
    let mut out = String::new();
    for line in std::iter::once(headers).chain(rows.iter().map(|r| r.as_slice())) {
        let fields: Vec<String> = line.iter().map(|s| field(s)).collect();
        out.push_str(&fields.join(separator));
        out.push('\n');
    }
    out
}
