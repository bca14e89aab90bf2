pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod metrics;
pub mod mortgage;
pub mod output;
pub mod projection;
pub mod scenario;
pub mod session;
pub mod time_value;
pub mod types;

#[cfg(feature = "risk")]
pub mod risk;

pub use config::EngineConfig;
pub use engine::{analyze_investment, evaluate_request, InvestmentResult};
pub use error::EvalError;
pub use input::{normalize_request, LoanTerms, PropertyInputs, RawRequest};
pub use output::{assemble_response, DashboardResponse};
pub use types::*;

/// Standard result type for all property-eval operations
pub type EvalResult<T> = Result<T, EvalError>;
