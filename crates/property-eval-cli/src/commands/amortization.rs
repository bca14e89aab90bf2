use clap::Args;
use serde_json::{json, Value};

use property_eval_core::mortgage::Mortgage;
use property_eval_core::{normalize_request, EngineConfig};

use super::RequestArgs;
use crate::input;

/// Arguments for the amortization schedule
#[derive(Args)]
pub struct AmortizationArgs {
    /// Path to JSON request file (cannot be combined with request flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Number of monthly payments to list (default: the full term)
    #[arg(long)]
    pub months: Option<u32>,

    #[command(flatten)]
    pub request: RequestArgs,
}

pub fn run_amortization(
    args: AmortizationArgs,
    engine: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request = input::read_request(args.input.as_deref(), args.request.to_request())?;
    let (_, loan) = normalize_request(&request, engine)?;
    let mortgage = Mortgage::new(loan.loan_amount, &loan)?;
    let rows = mortgage.amortization_schedule(args.months.unwrap_or(mortgage.total_months))?;

    Ok(json!({
        "loan_amount": mortgage.loan_amount,
        "monthly_payment": mortgage.monthly_payment,
        "interest_type": mortgage.interest_type,
        "total_months": mortgage.total_months,
        "total_interest": mortgage.total_interest(),
        "total_payback": mortgage.total_payback(),
        "rows": rows,
    }))
}
