use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Args;
use serde::Serialize;
use serde_json::{json, Value};

use property_eval_core::session::ExportSession;
use property_eval_core::{analyze_investment, normalize_request, EngineConfig};

use super::RequestArgs;
use crate::input;

/// Arguments for the CSV export
#[derive(Args)]
pub struct ExportArgs {
    /// Path to JSON request file (cannot be combined with request flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Yearly projection CSV path
    #[arg(long, default_value = "projection.csv")]
    pub out: String,

    /// Also write the first N months of amortization next to the projection
    #[arg(long)]
    pub months: Option<u32>,

    #[command(flatten)]
    pub request: RequestArgs,
}

pub fn run_export(
    args: ExportArgs,
    engine: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request = input::read_request(args.input.as_deref(), args.request.to_request())?;
    let (property, loan) = normalize_request(&request, engine)?;
    let output = analyze_investment(&property, &loan, engine)?;
    let session = ExportSession::new(Local::now().date_naive(), property, loan, output.result);

    let yearly = session.yearly_rows();
    let yearly_path = PathBuf::from(&args.out);
    write_csv(&yearly_path, &yearly)?;
    tracing::info!(path = %yearly_path.display(), rows = yearly.len(), "projection exported");

    let amortization_path = match args.months {
        Some(months) => {
            let rows = session.amortization_rows(months)?;
            let path = sibling_path(&yearly_path, "amortization");
            write_csv(&path, &rows)?;
            Some(path.display().to_string())
        }
        None => None,
    };

    Ok(json!({
        "as_of": session.as_of.to_string(),
        "currency": session.currency.code(),
        "projection_csv": yearly_path.display().to_string(),
        "rows_written": yearly.len(),
        "amortization_csv": amortization_path,
        "summary": session.summary_lines(),
        "warnings": output.warnings,
    }))
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| format!("Failed to create '{}': {}", path.display(), e))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// `dir/name.csv` -> `dir/name_<suffix>.csv`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("projection");
    path.with_file_name(format!("{stem}_{suffix}.csv"))
}
