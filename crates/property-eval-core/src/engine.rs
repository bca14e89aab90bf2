use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, warn};

use crate::config::EngineConfig;
use crate::error::{EvalError, FieldIssue};
use crate::input::{normalize_request, LoanTerms, PropertyInputs, RawRequest};
use crate::metrics::{aggregate_metrics, AdvancedMetrics};
use crate::mortgage::Mortgage;
use crate::output::{assemble_response, DashboardResponse};
use crate::projection::{project_cash_flows, CashFlowProjection};
use crate::scenario::{generate_scenarios, ScenarioAssumptions, ScenarioConfig, ScenarioSet};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::EvalResult;

#[cfg(feature = "risk")]
use crate::risk::{assess_risk, RiskAssessment};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Cash invested at acquisition, by component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentBreakdown {
    pub down_payment: Money,
    pub enhancement_costs: Money,
    pub closing_costs: Money,
}

impl InvestmentBreakdown {
    pub fn total(&self) -> Money {
        self.down_payment + self.enhancement_costs + self.closing_costs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentResult {
    /// Down payment + enhancement costs + closing costs
    pub total_investment: Money,
    pub down_payment: Money,
    pub loan_amount: Money,
    pub monthly_payment: Money,
    /// Over the full loan term
    pub total_interest: Money,
    pub total_payback: Money,
    /// resale_value - property_price
    pub expected_capital_gain: Money,
    pub holding_period_years: u32,
    pub investment_breakdown: InvestmentBreakdown,
    pub assumptions: ScenarioSet<ScenarioAssumptions>,
    pub projections: ScenarioSet<CashFlowProjection>,
    pub metrics: ScenarioSet<AdvancedMetrics>,
    #[cfg(feature = "risk")]
    pub risk_assessment: RiskAssessment,
}

#[derive(Serialize)]
struct AnalysisInputs<'a> {
    property: &'a PropertyInputs,
    loan: &'a LoanTerms,
    scenarios: &'a ScenarioConfig,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the full pipeline on typed inputs: mortgage, scenarios, per-scenario
/// projection and metrics. `config` is expected to be validated.
pub fn analyze_investment(
    property: &PropertyInputs,
    loan: &LoanTerms,
    config: &EngineConfig,
) -> EvalResult<ComputationOutput<InvestmentResult>> {
    let _span = info_span!("analyze_investment").entered();
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_inputs(property, loan)?;

    let mortgage = Mortgage::new(loan.loan_amount, loan)?;
    let investment_breakdown = InvestmentBreakdown {
        down_payment: loan.down_payment_amount,
        enhancement_costs: property.enhancement_costs,
        closing_costs: property.closing_costs,
    };
    let total_investment = investment_breakdown.total();
    debug!(
        loan_amount = %mortgage.loan_amount,
        monthly_payment = %mortgage.monthly_payment,
        total_investment = %total_investment,
        "loan sized"
    );

    let assumptions = generate_scenarios(property, &config.scenarios);
    for (kind, a) in assumptions.iter() {
        debug!(
            scenario = kind.key(),
            monthly_rent = %a.monthly_rent,
            occupancy = %a.occupancy_rate,
            "scenario assumptions"
        );
    }

    let projections = ScenarioSet::try_from_fn(|kind| {
        project_cash_flows(property, &mortgage, assumptions.get(kind), total_investment)
    })?;

    let metrics = ScenarioSet::try_from_fn(|kind| {
        aggregate_metrics(projections.get(kind), property, &config.irr, &mut warnings)
    })?;
    for (kind, m) in metrics.iter() {
        debug!(
            scenario = kind.key(),
            monthly_cash_flow = %m.monthly_cash_flow,
            roi = %m.roi,
            irr = ?m.irr,
            "scenario summary"
        );
    }

    if loan.down_payment_percentage < dec!(10) && !mortgage.loan_amount.is_zero() {
        warnings.push(format!(
            "High leverage: down payment of {}% of the purchase price",
            loan.down_payment_percentage.round_dp(2)
        ));
    }
    if metrics.base.dscr.is_some_and(|d| d < Decimal::ONE) {
        warnings.push("Base scenario DSCR below 1.0x: rent does not cover debt service".into());
    }

    #[cfg(feature = "risk")]
    let risk_assessment = assess_risk(property, loan, &metrics.base, &metrics.conservative);

    let result = InvestmentResult {
        total_investment,
        down_payment: loan.down_payment_amount,
        loan_amount: mortgage.loan_amount,
        monthly_payment: mortgage.monthly_payment,
        total_interest: mortgage.total_interest(),
        total_payback: mortgage.total_payback(),
        expected_capital_gain: property.resale_value - property.property_price,
        holding_period_years: property.holding_period_years,
        investment_breakdown,
        assumptions,
        projections,
        metrics,
        #[cfg(feature = "risk")]
        risk_assessment,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Leveraged rental property projection (annuity mortgage, three rent scenarios, NPV-root IRR)",
        &AnalysisInputs {
            property,
            loan,
            scenarios: &config.scenarios,
        },
        warnings,
        elapsed,
        result,
    ))
}

/// Normalize, analyze and assemble a raw request. Every failure becomes a
/// `success: false` response.
pub fn evaluate_request(raw: &RawRequest, config: &EngineConfig) -> DashboardResponse {
    let outcome = normalize_request(raw, config)
        .and_then(|(property, loan)| analyze_investment(&property, &loan, config));

    match outcome {
        Ok(output) => assemble_response(&output.result, &output.warnings),
        Err(e) => {
            warn!(error = %e, "evaluation rejected");
            DashboardResponse::failure(&e)
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Consistency checks for callers that build typed inputs directly.
fn validate_inputs(property: &PropertyInputs, loan: &LoanTerms) -> EvalResult<()> {
    let mut issues = Vec::new();
    let pct = |v: Decimal| v >= Decimal::ZERO && v <= dec!(100);

    if property.property_price <= Decimal::ZERO {
        issues.push(FieldIssue::new("property_price", "must be greater than 0"));
    }
    if !pct(loan.down_payment_percentage) {
        issues.push(FieldIssue::new(
            "down_payment_percentage",
            "must be between 0 and 100",
        ));
    }
    if loan.interest_rate_annual < Decimal::ZERO {
        issues.push(FieldIssue::new("interest_rate", "must not be negative"));
    }
    if loan.loan_term_years == 0 {
        issues.push(FieldIssue::new("loan_term_years", "must be a positive whole number"));
    }
    if loan.loan_amount < Decimal::ZERO
        || loan.down_payment_amount + loan.loan_amount != property.property_price
    {
        issues.push(FieldIssue::new(
            "loan_amount",
            "down payment and loan amount must sum to property_price",
        ));
    }
    if property.annual_rent <= Decimal::ZERO {
        issues.push(FieldIssue::new("annual_rent", "must be greater than 0"));
    }
    if !pct(property.occupancy_rate) {
        issues.push(FieldIssue::new("occupancy_rate", "must be between 0 and 100"));
    }
    for (field, value) in [
        ("hoa_fees_annual", property.hoa_fees_annual),
        ("rent_growth_rate", property.rent_growth_rate),
        ("resale_value", property.resale_value),
        ("enhancement_costs", property.enhancement_costs),
        ("closing_costs", property.closing_costs),
        ("other_operating_costs_annual", property.other_operating_costs_annual),
    ] {
        if value < Decimal::ZERO {
            issues.push(FieldIssue::new(field, "must not be negative"));
        }
    }
    if property.holding_period_years == 0 {
        issues.push(FieldIssue::new(
            "holding_period",
            "must be a positive whole number",
        ));
    }
    if !pct(property.selling_costs_percentage) {
        issues.push(FieldIssue::new(
            "selling_costs_percentage",
            "must be between 0 and 100",
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(EvalError::Validation { issues })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Currency;
    use serde_json::json;

    fn property() -> PropertyInputs {
        PropertyInputs {
            property_price: dec!(1000000),
            enhancement_costs: dec!(50000),
            closing_costs: dec!(25000),
            annual_rent: dec!(96000),
            occupancy_rate: dec!(95),
            hoa_fees_annual: dec!(6000),
            other_operating_costs_annual: Decimal::ZERO,
            rent_growth_rate: Decimal::ZERO,
            holding_period_years: 10,
            resale_value: dec!(1200000),
            selling_costs_percentage: Decimal::ZERO,
            currency: Currency::SAR,
        }
    }

    fn loan() -> LoanTerms {
        LoanTerms::new(dec!(1000000), dec!(20), dec!(5), 25)
    }

    #[test]
    fn test_total_investment_includes_costs() {
        let out = analyze_investment(&property(), &loan(), &EngineConfig::default()).unwrap();
        let r = &out.result;
        assert_eq!(r.total_investment, dec!(275000));
        assert_eq!(r.investment_breakdown.total(), r.total_investment);
        assert_eq!(r.loan_amount, dec!(800000));
        assert_eq!(r.expected_capital_gain, dec!(200000));
        assert_eq!(r.projections.base.initial_investment, dec!(275000));
        assert_eq!(r.projections.base.years.len(), 10);
    }

    #[test]
    fn test_envelope_metadata() {
        let out = analyze_investment(&property(), &loan(), &EngineConfig::default()).unwrap();
        assert!(out.methodology.contains("IRR"));
        assert_eq!(out.assumptions["loan"]["loan_term_years"], 25);
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
    }

    #[test]
    fn test_scenario_metrics_are_ordered() {
        let out = analyze_investment(&property(), &loan(), &EngineConfig::default()).unwrap();
        let m = &out.result.metrics;
        assert!(m.conservative.roi < m.base.roi);
        assert!(m.base.roi < m.optimistic.roi);
        assert!(m.conservative.monthly_cash_flow < m.base.monthly_cash_flow);
    }

    #[test]
    fn test_typed_inputs_are_checked() {
        let mut p = property();
        p.holding_period_years = 0;
        p.occupancy_rate = dec!(140);
        let err = analyze_investment(&p, &loan(), &EngineConfig::default()).unwrap_err();
        assert_eq!(err.invalid_fields(), vec!["occupancy_rate", "holding_period"]);
    }

    #[test]
    fn test_inconsistent_loan_rejected() {
        let mut l = loan();
        l.loan_amount = dec!(1);
        let err = analyze_investment(&property(), &l, &EngineConfig::default()).unwrap_err();
        assert_eq!(err.invalid_fields(), vec!["loan_amount"]);
    }

    #[test]
    fn test_high_leverage_warning() {
        let l = LoanTerms::new(dec!(1000000), dec!(5), dec!(5), 25);
        let out = analyze_investment(&property(), &l, &EngineConfig::default()).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("High leverage")));
    }

    #[test]
    fn test_evaluate_request_failure_is_contract_value() {
        let raw = match json!({"property_price": "abc"}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        let response = evaluate_request(&raw, &EngineConfig::default());
        assert!(!response.success);
        assert!(response.error.unwrap().contains("property_price"));
        assert!(response.payload.is_none());
    }
}
