use clap::Args;
use serde_json::Value;

use property_eval_core::{evaluate_request, EngineConfig};

use super::RequestArgs;
use crate::input;

/// Arguments for a dashboard evaluation
#[derive(Args)]
pub struct EvaluateArgs {
    /// Path to JSON request file (cannot be combined with request flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub request: RequestArgs,
}

pub fn run_evaluate(
    args: EvaluateArgs,
    engine: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request = input::read_request(args.input.as_deref(), args.request.to_request())?;
    let response = evaluate_request(&request, engine);
    Ok(serde_json::to_value(response)?)
}
