//! Output formatting

use std::collections::BTreeMap;

use comfy_table::{Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use erpshell_client::Reporter;
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult};

/// Format and display output based on format preference
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    format: OutputFormat,
    colored: bool,
}

impl Formatter {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self { format, colored }
    }

    /// Render a result value as text.
    ///
    /// # Errors
    ///
    /// Only JSON serialisation failures.
    pub fn render(&self, value: &Value) -> CliResult<String> {
        match self.format {
            OutputFormat::Json => json(value, true),
            OutputFormat::Compact => json(value, false),
            OutputFormat::Table => Ok(records_table(value).unwrap_or_else(|| human(value))),
            OutputFormat::Human => Ok(human(value)),
        }
    }

    /// Display any result value
    pub fn display(&self, value: &Value) -> CliResult<()> {
        println!("{}", self.render(value)?);
        Ok(())
    }

    /// Display modules grouped by state
    pub fn display_modules(&self, modules: &BTreeMap<String, Vec<String>>) -> CliResult<()> {
        match self.format {
            OutputFormat::Human => {
                if modules.is_empty() {
                    self.print_info("No module found");
                    return Ok(());
                }
                for (state, names) in modules {
                    self.print_header(state);
                    for name in names {
                        println!("  {name}");
                    }
                }
                Ok(())
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .apply_modifier(UTF8_ROUND_CORNERS)
                    .set_header(vec!["State", "Module"]);
                for (state, names) in modules {
                    for name in names {
                        table.add_row(vec![state.as_str(), name.as_str()]);
                    }
                }
                println!("{table}");
                Ok(())
            }
            _ => self.display_serialized(modules),
        }
    }

    /// Display a list of names, one per line in human mode
    pub fn display_names(&self, title: &str, names: &[String]) -> CliResult<()> {
        match self.format {
            OutputFormat::Human => {
                if names.is_empty() {
                    self.print_info(&format!("No {title} found"));
                    return Ok(());
                }
                for name in names {
                    println!("{name}");
                }
                Ok(())
            }
            _ => self.display_serialized(names),
        }
    }

    /// Display key/value pairs
    pub fn display_info(&self, title: &str, pairs: &[(&str, String)]) -> CliResult<()> {
        match self.format {
            OutputFormat::Human | OutputFormat::Table => {
                self.print_header(title);
                for (key, value) in pairs {
                    self.print_kv(key, value);
                }
                Ok(())
            }
            _ => {
                let map: serde_json::Map<String, Value> = pairs
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), Value::String(v.clone())))
                    .collect();
                self.display(&Value::Object(map))
            }
        }
    }

    /// Display error with suggestions
    pub fn display_error(&self, error: &CliError) {
        if self.colored {
            eprintln!("{} [{}]: {}", "Error".bright_red().bold(), error.category(), error);
            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\n{}", "Suggestions:".bright_yellow().bold());
                for suggestion in suggestions {
                    eprintln!("  {} {}", "•".bright_blue(), suggestion);
                }
            }
        } else {
            eprintln!("Error [{}]: {error}", error.category());
            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\nSuggestions:");
                for suggestion in suggestions {
                    eprintln!("  • {suggestion}");
                }
            }
        }
    }

    fn display_serialized<T: Serialize + ?Sized>(&self, value: &T) -> CliResult<()> {
        self.display(&serde_json::to_value(value)?)
    }

    fn print_header(&self, text: &str) {
        if self.colored {
            println!("{}", text.bright_cyan().bold());
        } else {
            println!("{text}");
        }
    }

    fn print_info(&self, text: &str) {
        if self.colored {
            println!("{}", text.bright_blue());
        } else {
            println!("{text}");
        }
    }

    fn print_kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("  {}: {}", key.bright_green().bold(), value);
        } else {
            println!("  {key}: {value}");
        }
    }
}

fn json(value: &Value, pretty: bool) -> CliResult<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Strings bare, lists of scalars one per line, everything else pretty JSON.
fn human(value: &Value) -> String {
    match value {
        Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => {
            items.iter().map(scalar).collect::<Vec<_>>().join("\n")
        }
        Value::Object(_) | Value::Array(_) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
        other => scalar(other),
    }
}

/// A table when `value` is a non-empty list of records. Columns follow the
/// key order of the records, `id` first.
fn records_table(value: &Value) -> Option<String> {
    let records = value.as_array().filter(|r| !r.is_empty())?;
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for key in record.as_object()?.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }
    if let Some(pos) = columns.iter().position(|c| *c == "id") {
        let id = columns.remove(pos);
        columns.insert(0, id);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(columns.clone());
    for record in records {
        table.add_row(
            columns
                .iter()
                .map(|c| record.get(*c).map(scalar).unwrap_or_default())
                .collect::<Vec<_>>(),
        );
    }
    Some(table.to_string())
}

/// Operator messages from the client, colored when the terminal allows.
#[derive(Debug, Clone, Copy)]
pub struct TerminalReporter {
    colored: bool,
}

impl TerminalReporter {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }
}

impl Reporter for TerminalReporter {
    fn notice(&self, message: &str) {
        println!("{message}");
    }

    fn warn(&self, message: &str) {
        if self.colored {
            eprintln!("{} {message}", "Warning:".bright_yellow().bold());
        } else {
            eprintln!("Warning: {message}");
        }
    }

    fn error(&self, message: &str) {
        if self.colored {
            eprintln!("{} {message}", "Error:".bright_red().bold());
        } else {
            eprintln!("Error: {message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_human_rendering() {
        let formatter = Formatter::new(OutputFormat::Human, false);
        assert_eq!(formatter.render(&json!("6.1")).unwrap(), "6.1");
        assert_eq!(formatter.render(&json!([1, 2, 3])).unwrap(), "1\n2\n3");
        assert_eq!(formatter.render(&json!(["a <x>", "b"])).unwrap(), "a <x>\nb");
        assert_eq!(formatter.render(&json!(null)).unwrap(), "");
        assert!(formatter.render(&json!([{"id": 1}])).unwrap().contains("\"id\": 1"));
    }

    #[test]
    fn test_json_rendering() {
        let compact = Formatter::new(OutputFormat::Compact, false);
        assert_eq!(compact.render(&json!({"id": 1, "name": "A"})).unwrap(), r#"{"id":1,"name":"A"}"#);
        let pretty = Formatter::new(OutputFormat::Json, false);
        assert_eq!(pretty.render(&json!([1])).unwrap(), "[\n  1\n]");
    }

    #[test]
    fn test_records_table() {
        let table = records_table(&json!([
            {"name": "Agrolait", "id": 3},
            {"name": "Camptocamp", "id": 7, "email": null},
        ]))
        .unwrap();
        let header = table.lines().nth(1).unwrap();
        let id = header.find("id").unwrap();
        let name = header.find("name").unwrap();
        let email = header.find("email").unwrap();
        assert!(id < name && name < email);
        assert!(table.contains("Camptocamp"));

        assert!(records_table(&json!([])).is_none());
        assert!(records_table(&json!([1, 2])).is_none());
        assert!(records_table(&json!({"id": 1})).is_none());
    }

    #[test]
    fn test_table_falls_back_to_human() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.render(&json!([4, 5])).unwrap(), "4\n5");
    }
}
