use std::io::{self, Write};

use serde_json::{Map, Value};
use stockdesk_core::Envelope;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Keys pulled to the front of table columns, in this order.
const LEADING_COLUMNS: [&str; 4] = ["date", "code", "label", "name"];

/// Arrays of scalars longer than this are summarized instead of listed.
const INLINE_LIST_MAX: usize = 8;

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    render_to(&mut out, envelope, format, pretty)?;
    out.flush()?;
    Ok(())
}

pub fn render_to<W: Write>(
    out: &mut W,
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Table => render_table(out, envelope)?,
    }
    Ok(())
}

fn render_table<W: Write>(out: &mut W, envelope: &Envelope<Value>) -> Result<(), CliError> {
    let meta = &envelope.meta;
    writeln!(out, "request_id  : {}", meta.request_id)?;
    writeln!(out, "schema      : {}", meta.schema_version)?;
    writeln!(out, "generated_at: {}", meta.generated_at)?;
    writeln!(
        out,
        "sources     : {}",
        meta.source_chain
            .iter()
            .map(|source| source.as_str())
            .collect::<Vec<_>>()
            .join(",")
    )?;
    writeln!(out, "latency_ms  : {}", meta.latency_ms)?;
    writeln!(out, "cache_hit   : {}", meta.cache_hit)?;

    if !meta.warnings.is_empty() {
        writeln!(out, "warnings:")?;
        for warning in &meta.warnings {
            writeln!(out, "  - {warning}")?;
        }
    }

    writeln!(out, "data:")?;
    write_value(out, &envelope.data, 1)?;

    if !envelope.errors.is_empty() {
        writeln!(out, "errors:")?;
        for error in &envelope.errors {
            match &error.section {
                Some(section) => writeln!(out, "  - [{section}] {}: {}", error.code, error.message)?,
                None => writeln!(out, "  - {}: {}", error.code, error.message)?,
            }
        }
    }

    Ok(())
}

fn write_value<W: Write>(out: &mut W, value: &Value, depth: usize) -> io::Result<()> {
    let indent = "  ".repeat(depth);

    if let Some(text) = inline(value) {
        return writeln!(out, "{indent}{text}");
    }

    match value {
        Value::Object(map) if is_statement_table(map) => write_statement_table(out, map, &indent),
        Value::Object(map) => {
            for (key, field) in map {
                match inline(field) {
                    Some(text) => writeln!(out, "{indent}{key}: {text}")?,
                    None => {
                        writeln!(out, "{indent}{key}:")?;
                        write_value(out, field, depth + 1)?;
                    }
                }
            }
            Ok(())
        }
        Value::Array(items) => {
            let rows: Vec<&Map<String, Value>> =
                items.iter().filter_map(Value::as_object).collect();
            if rows.len() == items.len() {
                write_grid(out, &rows, &indent)
            } else {
                for item in items {
                    write_value(out, item, depth)?;
                }
                Ok(())
            }
        }
        _ => Ok(()),
    }
}

/// One-line rendering for scalars and short scalar lists.
fn inline(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::from("-")),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(_) => Some(format_number(value)),
        Value::String(text) => Some(text.clone()),
        Value::Array(items) if items.is_empty() => Some(String::from("(none)")),
        Value::Array(items) if items.iter().all(is_scalar) => {
            if items.len() > INLINE_LIST_MAX {
                Some(format!("[{} values]", items.len()))
            } else {
                let parts: Vec<String> = items.iter().filter_map(inline).collect();
                Some(parts.join(", "))
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn format_number(value: &Value) -> String {
    match value.as_f64() {
        Some(number) if value.is_f64() => {
            let text = format!("{number:.4}");
            text.trim_end_matches('0').trim_end_matches('.').to_owned()
        }
        _ => value.to_string(),
    }
}

fn is_statement_table(map: &Map<String, Value>) -> bool {
    map.len() == 2
        && map.get("columns").is_some_and(Value::is_array)
        && map.get("rows").is_some_and(Value::is_array)
}

fn write_statement_table<W: Write>(
    out: &mut W,
    map: &Map<String, Value>,
    indent: &str,
) -> io::Result<()> {
    let columns = map
        .get("columns")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let rows = map
        .get("rows")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    if rows.is_empty() {
        return writeln!(out, "{indent}(no data)");
    }

    let mut header = vec![String::from("item")];
    header.extend(columns.iter().filter_map(inline));

    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let mut cells = vec![row
                .get("label")
                .and_then(inline)
                .unwrap_or_default()];
            if let Some(values) = row.get("values").and_then(Value::as_array) {
                cells.extend(values.iter().map(|value| inline(value).unwrap_or_default()));
            }
            cells
        })
        .collect();

    write_cells(out, &header, &body, indent)
}

fn write_grid<W: Write>(
    out: &mut W,
    rows: &[&Map<String, Value>],
    indent: &str,
) -> io::Result<()> {
    let mut header: Vec<String> = Vec::new();
    for leading in LEADING_COLUMNS {
        if rows.iter().any(|row| row.contains_key(leading)) {
            header.push(leading.to_owned());
        }
    }
    for row in rows {
        for key in row.keys() {
            if !header.contains(key) {
                header.push(key.clone());
            }
        }
    }

    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            header
                .iter()
                .map(|key| match row.get(key) {
                    Some(value) => inline(value).unwrap_or_else(|| String::from("…")),
                    None => String::new(),
                })
                .collect()
        })
        .collect();

    write_cells(out, &header, &body, indent)
}

fn write_cells<W: Write>(
    out: &mut W,
    header: &[String],
    body: &[Vec<String>],
    indent: &str,
) -> io::Result<()> {
    let mut widths: Vec<usize> = header.iter().map(|name| name.chars().count()).collect();
    for row in body {
        for (index, cell) in row.iter().enumerate() {
            let width = cell.chars().count();
            match widths.get_mut(index) {
                Some(current) => *current = (*current).max(width),
                None => widths.push(width),
            }
        }
    }

    let separator: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    write_row(out, header, &widths, indent)?;
    write_row(out, &separator, &widths, indent)?;
    for row in body {
        write_row(out, row, &widths, indent)?;
    }
    Ok(())
}

fn write_row<W: Write>(
    out: &mut W,
    cells: &[String],
    widths: &[usize],
    indent: &str,
) -> io::Result<()> {
    let padded: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(index, width)| {
            let cell = cells.get(index).map(String::as_str).unwrap_or_default();
            format!("{cell:<width$}")
        })
        .collect();
    writeln!(out, "{indent}{}", padded.join(" | ").trim_end())
}
