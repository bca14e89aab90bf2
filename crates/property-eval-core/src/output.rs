use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::InvestmentResult;
use crate::error::EvalError;
use crate::scenario::{ScenarioKind, ScenarioSet};
use crate::types::{Money, Percent, Years};

#[cfg(feature = "risk")]
use crate::risk::RiskAssessment;

/// Pie slice colors: down payment, enhancement costs, closing costs.
pub const BREAKDOWN_COLORS: [&str; 3] = ["#ff9999", "#66b3ff", "#99ff99"];
/// Bar colors: conservative, base, optimistic.
pub const SCENARIO_COLORS: [&str; 3] = ["#d62728", "#1f77b4", "#2ca02c"];

const BREAKDOWN_LABELS: [&str; 3] = ["Down Payment", "Enhancement Costs", "Closing Costs"];

// ---------------------------------------------------------------------------
// Response contract
// ---------------------------------------------------------------------------

/// The value handed to the presentation layer for every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Option<DashboardPayload>,
}

impl DashboardResponse {
    pub fn failure(error: &EvalError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            payload: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardPayload {
    pub calculator_data: CalculatorData,
    pub scenarios: ScenarioSet<ScenarioSummary>,
    pub advanced_metrics: AdvancedMetricsSummary,
    pub charts: Charts,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[cfg(feature = "risk")]
    pub risk_assessment: RiskAssessment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorData {
    pub total_investment: Money,
    pub loan_amount: Money,
    pub monthly_payment: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub monthly_rent: Money,
    pub monthly_cash_flow: Money,
    pub annual_cash_flow: Money,
    pub roi: Percent,
    pub irr: Option<Percent>,
}

/// Base-scenario ratios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedMetricsSummary {
    pub dscr: Option<Decimal>,
    pub cash_on_cash_return: Percent,
    pub cap_rate: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charts {
    pub kpi_data: KpiData,
    pub cash_flow_data: CashFlowChart,
    pub investment_breakdown: ChartSeries,
    pub roi_comparison: ChartSeries,
    /// Total investment the cumulative cash flow must recover
    pub break_even_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiData {
    pub monthly_cash_flow: Money,
    pub annual_roi: Percent,
    pub total_investment: Money,
    pub break_even_years: Years,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowChart {
    pub years: Vec<u32>,
    /// Cumulative cash flow per year, aligned with `years`
    pub scenarios: ScenarioSet<Vec<Money>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<Decimal>,
    pub colors: Vec<String>,
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Reshape an analysis result into the dashboard contract.
pub fn assemble_response(result: &InvestmentResult, warnings: &[String]) -> DashboardResponse {
    let base = &result.metrics.base;

    let scenarios = result.metrics.map(|kind, m| ScenarioSummary {
        monthly_rent: result.assumptions.get(kind).monthly_rent,
        monthly_cash_flow: m.monthly_cash_flow,
        annual_cash_flow: m.annual_cash_flow,
        roi: m.roi,
        irr: m.irr,
    });

    let years: Vec<u32> = result
        .projections
        .base
        .years
        .iter()
        .map(|y| y.year)
        .collect();

    let cash_flow_data = CashFlowChart {
        years,
        scenarios: result
            .projections
            .map(|_, p| p.years.iter().map(|y| y.cumulative_cash_flow).collect()),
    };

    let b = &result.investment_breakdown;
    let investment_breakdown = ChartSeries {
        labels: BREAKDOWN_LABELS.iter().map(|s| s.to_string()).collect(),
        values: vec![b.down_payment, b.enhancement_costs, b.closing_costs],
        colors: BREAKDOWN_COLORS.iter().map(|s| s.to_string()).collect(),
    };

    let roi_comparison = ChartSeries {
        labels: ScenarioKind::ALL.iter().map(|k| k.label().to_string()).collect(),
        values: result.metrics.iter().map(|(_, m)| m.roi).collect(),
        colors: SCENARIO_COLORS.iter().map(|s| s.to_string()).collect(),
    };

    let payload = DashboardPayload {
        calculator_data: CalculatorData {
            total_investment: result.total_investment,
            loan_amount: result.loan_amount,
            monthly_payment: result.monthly_payment,
        },
        scenarios,
        advanced_metrics: AdvancedMetricsSummary {
            dscr: base.dscr,
            cash_on_cash_return: base.cash_on_cash_return,
            cap_rate: base.cap_rate,
        },
        charts: Charts {
            kpi_data: KpiData {
                monthly_cash_flow: base.monthly_cash_flow,
                annual_roi: base.annualized_roi,
                total_investment: result.total_investment,
                break_even_years: base.break_even_years,
            },
            cash_flow_data,
            investment_breakdown,
            roi_comparison,
            break_even_amount: result.total_investment,
        },
        warnings: warnings.to_vec(),
        #[cfg(feature = "risk")]
        risk_assessment: result.risk_assessment.clone(),
    };

    DashboardResponse {
        success: true,
        error: None,
        payload: Some(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::analyze_investment;
    use crate::input::{LoanTerms, PropertyInputs};
    use crate::types::Currency;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn result(holding: u32) -> (InvestmentResult, Vec<String>) {
        let property = PropertyInputs {
            property_price: dec!(1000000),
            enhancement_costs: dec!(30000),
            closing_costs: Decimal::ZERO,
            annual_rent: dec!(96000),
            occupancy_rate: dec!(95),
            hoa_fees_annual: dec!(6000),
            other_operating_costs_annual: Decimal::ZERO,
            rent_growth_rate: Decimal::ZERO,
            holding_period_years: holding,
            resale_value: dec!(1200000),
            selling_costs_percentage: Decimal::ZERO,
            currency: Currency::SAR,
        };
        let loan = LoanTerms::new(dec!(1000000), dec!(20), dec!(5), 25);
        let out = analyze_investment(&property, &loan, &EngineConfig::default()).unwrap();
        (out.result, out.warnings)
    }

    #[test]
    fn test_chart_series_shapes() {
        let (r, w) = result(7);
        let response = assemble_response(&r, &w);
        let payload = response.payload.unwrap();
        let chart = &payload.charts.cash_flow_data;
        assert_eq!(chart.years, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(chart.scenarios.conservative.len(), 7);
        assert_eq!(chart.scenarios.optimistic.len(), 7);
        assert_eq!(
            payload.charts.investment_breakdown.values,
            vec![dec!(200000), dec!(30000), Decimal::ZERO]
        );
        assert_eq!(
            payload.charts.roi_comparison.labels,
            vec!["Conservative", "Base", "Optimistic"]
        );
        assert_eq!(payload.charts.break_even_amount, dec!(230000));
    }

    #[test]
    fn test_kpis_mirror_base_scenario() {
        let (r, w) = result(10);
        let payload = assemble_response(&r, &w).payload.unwrap();
        assert_eq!(payload.charts.kpi_data.monthly_cash_flow, r.metrics.base.monthly_cash_flow);
        assert_eq!(payload.charts.kpi_data.annual_roi, r.metrics.base.annualized_roi);
        assert_eq!(payload.advanced_metrics.cap_rate, r.metrics.base.cap_rate);
        assert_eq!(payload.scenarios.base.monthly_rent, dec!(8000));
        assert_eq!(payload.calculator_data.loan_amount, dec!(800000));
    }

    #[test]
    fn test_json_shape() {
        let (r, _) = result(10);
        let json = serde_json::to_value(assemble_response(&r, &[])).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        assert!(json.get("warnings").is_none());
        assert!(json["calculator_data"]["monthly_payment"].is_number());
        assert!(json["charts"]["cash_flow_data"]["scenarios"]["base"].is_array());
        assert!(json["scenarios"]["optimistic"]["irr"].is_number());
    }

    #[test]
    fn test_warnings_surface_when_present() {
        let (r, _) = result(10);
        let json = serde_json::to_value(assemble_response(&r, &["careful".into()])).unwrap();
        assert_eq!(json["warnings"][0], "careful");
    }

    #[test]
    fn test_failure_shape() {
        let err = EvalError::invalid("down_payment_percentage", "must be between 0 and 100");
        let json = serde_json::to_value(DashboardResponse::failure(&err)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(
            json["error"],
            "Invalid input: down_payment_percentage: must be between 0 and 100"
        );
        assert!(json.get("charts").is_none());
    }
}
