//! CLI output: tables, JSON, and error mapping to the stable CLI surface.

use crate::dispatch::DispatchReport;
use crate::error::{DispatchError, HooksError};
use crate::record::Record;
use crate::types::Value;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use serde_json::json;

/// Map errors to a string for CLI output. Handler failures carry their trace.
pub fn map_error(e: &HooksError) -> String {
    match e {
        HooksError::Dispatch(DispatchError::HandlerFailed { trace, .. }) if !trace.is_empty() => {
            let mut out = e.to_string();
            out.push_str("\nTrace:");
            for line in trace {
                out.push_str("\n  ");
                out.push_str(line);
            }
            out
        }
        _ => e.to_string(),
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(value) => value.to_string(),
    }
}

/// One row per record; `columns` empty means the union of every record's attributes.
pub fn records_table(records: &[Record], columns: &[String]) -> String {
    let columns: Vec<String> = if columns.is_empty() {
        let mut names: Vec<String> = records
            .iter()
            .flat_map(|r| r.attribute_names())
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();
        names
    } else {
        columns.to_vec()
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    let mut header = vec!["id".to_string()];
    header.extend(columns.iter().cloned());
    table.set_header(header);
    for record in records {
        let mut row = vec![record.id.to_string()];
        row.extend(columns.iter().map(|c| cell(record.raw(c))));
        table.add_row(row);
    }
    format!("{}\n{} record(s)", table, records.len())
}

pub fn records_json(records: &[Record]) -> Result<String, HooksError> {
    serde_json::to_string_pretty(records).map_err(|e| HooksError::InvalidInput(e.to_string()))
}

pub fn record_text(record: &Record) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Attribute", "Value"]);
    table.add_row(vec!["type".to_string(), record.type_name.clone()]);
    table.add_row(vec!["id".to_string(), record.id.to_string()]);
    for name in record.attribute_names() {
        table.add_row(vec![name.to_string(), cell(record.raw(name))]);
    }
    table.to_string()
}

pub fn dispatch_text(report: &DispatchReport) -> String {
    if report.handlers_run.is_empty() {
        return "No handlers ran".to_string();
    }
    let mut out = format!("Handlers run: {}", report.handlers_run.join(", "));
    if !report.trace.is_empty() {
        out.push_str("\nTrace:");
        for line in &report.trace {
            out.push_str("\n  ");
            out.push_str(line);
        }
    }
    out
}

pub fn dispatch_json(report: &DispatchReport) -> Result<String, HooksError> {
    serde_json::to_string_pretty(&json!({
        "handlers_run": report.handlers_run,
        "trace": report.trace,
    }))
    .map_err(|e| HooksError::InvalidInput(e.to_string()))
}
