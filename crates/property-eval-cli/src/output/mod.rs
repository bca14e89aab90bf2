pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use clap::ValueEnum;
use serde_json::Value;

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed response
    #[default]
    Json,
    /// Field and scenario tables
    Table,
    /// One row per scenario or schedule period
    Csv,
    /// The headline number only
    Minimal,
}

impl OutputFormat {
    pub fn render(self, value: &Value) {
        match self {
            OutputFormat::Json => json::print_json(value),
            OutputFormat::Table => table::print_table(value),
            OutputFormat::Csv => csv_out::print_csv(value),
            OutputFormat::Minimal => minimal::print_minimal(value),
        }
    }
}
