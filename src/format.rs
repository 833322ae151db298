//! Output formatting utilities.
//!
//! Renders result sets, plan reports and other command output as an ASCII
//! table (like the MySQL CLI), Markdown or JSON.

use crate::models::{CellValue, KeyRole, ResultSet, TableSchema};
use crate::planner::RunReport;
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (like MySQL CLI)
    #[default]
    Table,
    /// JSON format
    Json,
    /// Markdown table format
    Markdown,
}

fn is_numeric(value: &CellValue) -> bool {
    matches!(value, CellValue::Integer(_) | CellValue::Real(_))
}

pub fn format_as_table(result: &ResultSet, execution_time_ms: u64) -> String {
    if result.columns.is_empty() {
        return "Empty set".to_string();
    }
    let labels = result.labels();

    let mut widths: Vec<usize> = labels.iter().map(|l| l.width()).collect();
    for row in &result.rows {
        for (i, value) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(value.to_string().width());
        }
    }

    let mut output = String::new();
    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    output.push_str(&separator);
    let header: String = labels
        .iter()
        .zip(&widths)
        .map(|(label, w)| format!("| {} ", pad(label, *w, Align::Center)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in &result.rows {
        let row_str: String = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let value = row.get(i).unwrap_or(&CellValue::Null);
                let align = if is_numeric(value) {
                    Align::Right
                } else {
                    Align::Left
                };
                format!("| {} ", pad(&value.to_string(), *w, align))
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&separator);

    let row_count = result.row_count();
    let row_text = if row_count == 1 { "row" } else { "rows" };
    let truncated = if result.truncated { ", truncated" } else { "" };
    output.push_str(&format!(
        "{} {} in set{} ({:.2} sec)\n",
        row_count,
        row_text,
        truncated,
        execution_time_ms as f64 / 1000.0
    ));

    output
}

pub fn format_as_markdown(result: &ResultSet) -> String {
    if result.columns.is_empty() {
        return "*Empty set*".to_string();
    }

    let mut output = String::new();

    let header: String = result
        .labels()
        .iter()
        .map(|l| format!("| {} ", l))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);

    let sep: String = result.columns.iter().map(|_| "|---").collect::<String>() + "|\n";
    output.push_str(&sep);

    for row in &result.rows {
        let row_str: String = (0..result.columns.len())
            .map(|i| {
                let value = row.get(i).unwrap_or(&CellValue::Null);
                format!("| {} ", value.to_string().replace('|', "\\|"))
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&format!("\n*{} rows*", result.row_count()));

    output
}

/// Render a result set in the requested format.
pub fn format_result(result: &ResultSet, format: OutputFormat, execution_time_ms: u64) -> String {
    match format {
        OutputFormat::Table => format_as_table(result, execution_time_ms),
        OutputFormat::Markdown => format_as_markdown(result),
        OutputFormat::Json => to_json(result),
    }
}

/// Render a list of names (databases, tables) in the requested format.
pub fn format_names(header: &str, names: &[String], format: OutputFormat) -> String {
    let result = ResultSet::new(
        vec![header.to_string()],
        names.iter().map(|n| vec![CellValue::from(n.as_str())]).collect(),
    );
    match format {
        OutputFormat::Json => to_json(&names),
        _ => format_result(&result, format, 0),
    }
}

/// Render a table description with one row per column.
pub fn format_schema(schema: &TableSchema, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return to_json(schema);
    }
    let rows = schema
        .columns
        .iter()
        .map(|c| {
            vec![
                CellValue::from(c.name.as_str()),
                CellValue::from(c.declared_type.as_str()),
                CellValue::from(if c.is_nullable { "YES" } else { "NO" }),
                CellValue::from(match c.key_role {
                    KeyRole::Primary => "PRI",
                    KeyRole::Foreign => "FK",
                    KeyRole::None => "",
                }),
                c.default_value.clone().into(),
                CellValue::from(c.extra.as_str()),
            ]
        })
        .collect();
    let result = ResultSet::new(
        ["Field", "Type", "Null", "Key", "Default", "Extra"]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        rows,
    );
    format_result(&result, format, 0)
}

/// Render the outcome of a structural operation.
pub fn format_report(report: &RunReport, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return to_json(report);
    }
    let mut output = format!(
        "OK: {} {} ({} rows affected)\n",
        report.operation, report.target, report.affected
    );
    for step in &report.completed {
        output.push_str(&format!("  - {}\n", step));
    }
    output
}

/// Pretty JSON for any serializable output.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
    Center,
}

/// Pad by display width; `format!` width counts chars, not terminal columns.
fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.width());
    match align {
        Align::Left => format!("{}{}", text, " ".repeat(fill)),
        Align::Right => format!("{}{}", " ".repeat(fill), text),
        Align::Center => {
            let left = fill / 2;
            format!("{}{}{}", " ".repeat(left), text, " ".repeat(fill - left))
        }
    }
}
