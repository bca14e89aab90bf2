use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::EvalError;
use crate::input::PropertyInputs;
use crate::projection::CashFlowProjection;
use crate::time_value::{self, IrrSettings};
use crate::types::{Money, Percent, Years};
use crate::EvalResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Summary metrics of one scenario. Percent-valued fields are on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedMetrics {
    /// Cumulative net profit at the end of the holding period / total investment
    pub roi: Percent,
    /// roi / holding period
    pub annualized_roi: Percent,
    /// Year-1 operating cash flow (excludes resale)
    pub annual_cash_flow: Money,
    pub monthly_cash_flow: Money,
    /// Year-1 net operating income
    pub net_operating_income: Money,
    /// Year-1 debt service
    pub annual_debt_service: Money,
    pub cap_rate: Percent,
    /// None without debt service
    pub dscr: Option<Decimal>,
    pub cash_on_cash_return: Percent,
    /// Fractional years until cumulative cash flow reaches zero, capped at
    /// the holding period
    pub break_even_years: Years,
    pub break_even_reached: bool,
    /// None when undefined or non-convergent
    pub irr: Option<Percent>,
}

/// Payback point of a cumulative cash-flow series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakEven {
    pub years: Years,
    pub reached: bool,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Reduce a scenario projection to its summary metrics. Degraded outcomes
/// (undefined IRR, zero investment, break-even never reached) are pushed to
/// `warnings` and never fail the call.
pub fn aggregate_metrics(
    projection: &CashFlowProjection,
    property: &PropertyInputs,
    irr_settings: &IrrSettings,
    warnings: &mut Vec<String>,
) -> EvalResult<AdvancedMetrics> {
    let scenario = projection.scenario.key();
    let first = projection.first_year().ok_or_else(|| {
        EvalError::invalid("holding_period_years", "must be a positive whole number")
    })?;
    let holding = Decimal::from(property.holding_period_years);
    let investment = projection.initial_investment;

    let annual_cash_flow = first.monthly_cash_flow * dec!(12);
    let net_operating_income = first.annual_net_operating_income;
    let annual_debt_service = first.annual_debt_service;

    let returns = calculate_cash_on_cash(projection.net_profit(), investment)?
        .zip(calculate_cash_on_cash(annual_cash_flow, investment)?);
    let (roi, cash_on_cash_return) = returns.unwrap_or_else(|| {
        warn!(scenario = scenario, "total investment is zero; returns reported as 0");
        warnings.push(format!(
            "{scenario}: total investment is zero; ROI and cash-on-cash return reported as 0"
        ));
        (Decimal::ZERO, Decimal::ZERO)
    });
    let annualized_roi = roi / holding;

    let cap_rate = calculate_cap_rate(net_operating_income, property.property_price)?;
    let dscr = calculate_dscr(net_operating_income, annual_debt_service)?;

    let break_even = break_even(&projection.cumulative_series(), &projection.irr_cash_flows());
    if !break_even.reached {
        warn!(scenario = scenario, "break-even not reached within the holding period");
        warnings.push(format!(
            "{scenario}: cumulative cash flow does not break even within {} years",
            property.holding_period_years
        ));
    }

    let irr = scenario_irr(projection, irr_settings, warnings);

    Ok(AdvancedMetrics {
        roi,
        annualized_roi,
        annual_cash_flow,
        monthly_cash_flow: first.monthly_cash_flow,
        net_operating_income,
        annual_debt_service,
        cap_rate,
        dscr,
        cash_on_cash_return,
        break_even_years: break_even.years,
        break_even_reached: break_even.reached,
        irr,
    })
}

fn scenario_irr(
    projection: &CashFlowProjection,
    settings: &IrrSettings,
    warnings: &mut Vec<String>,
) -> Option<Percent> {
    let scenario = projection.scenario.key();
    match time_value::irr(&projection.irr_cash_flows(), settings) {
        Ok(Some(rate)) => Some(rate * dec!(100)),
        Ok(None) => {
            warn!(scenario = scenario, "IRR undefined: cash flows never change sign");
            warnings.push(format!(
                "{scenario}: IRR undefined because the cash flows never change sign"
            ));
            None
        }
        Err(e) => {
            warn!(scenario = scenario, error = %e, "IRR calculation failed");
            warnings.push(format!("{scenario}: IRR calculation warning: {e}"));
            None
        }
    }
}

/// NOI / annual debt service; None when there is no debt service.
pub fn calculate_dscr(
    net_operating_income: Money,
    annual_debt_service: Money,
) -> EvalResult<Option<Decimal>> {
    if annual_debt_service.is_zero() {
        return Ok(None);
    }
    net_operating_income
        .checked_div(annual_debt_service)
        .map(Some)
        .ok_or_else(|| overflow("DSCR", annual_debt_service))
}

/// NOI / price, percent.
pub fn calculate_cap_rate(net_operating_income: Money, property_price: Money) -> EvalResult<Percent> {
    if property_price.is_zero() {
        return Err(EvalError::DivisionByZero {
            context: "cap rate with zero property price".into(),
        });
    }
    percent_of(net_operating_income, property_price).ok_or_else(|| overflow("cap rate", property_price))
}

/// Cash flow / cash invested, percent. None for a zero investment.
pub fn calculate_cash_on_cash(cash_flow: Money, total_investment: Money) -> EvalResult<Option<Percent>> {
    if total_investment.is_zero() {
        return Ok(None);
    }
    percent_of(cash_flow, total_investment)
        .map(Some)
        .ok_or_else(|| overflow("return on investment", total_investment))
}

fn percent_of(numerator: Decimal, denominator: Decimal) -> Option<Percent> {
    numerator.checked_div(denominator)?.checked_mul(dec!(100))
}

fn overflow(function: &str, denominator: Decimal) -> EvalError {
    EvalError::Computation {
        function: format!("{function} ratio"),
        iterations: 0,
        last_delta: denominator,
    }
}

/// First crossing of zero in `cumulative` (index = year, index 0 = year 0),
/// interpolated linearly inside the crossing year using that year's flow
/// from `flows` (same indexing). Never reached means the last year, flagged.
pub fn break_even(cumulative: &[Money], flows: &[Money]) -> BreakEven {
    let horizon = cumulative.len().saturating_sub(1);

    match cumulative.first() {
        None => {
            return BreakEven {
                years: Decimal::ZERO,
                reached: false,
            }
        }
        Some(c0) if *c0 >= Decimal::ZERO => {
            return BreakEven {
                years: Decimal::ZERO,
                reached: true,
            }
        }
        Some(_) => {}
    }

    for year in 1..cumulative.len() {
        if cumulative[year] < Decimal::ZERO {
            continue;
        }
        let shortfall = -cumulative[year - 1];
        let flow = flows.get(year).copied().unwrap_or(Decimal::ZERO);
        let fraction = if flow > Decimal::ZERO {
            (shortfall / flow).min(Decimal::ONE)
        } else {
            Decimal::ONE
        };
        return BreakEven {
            years: Decimal::from(year - 1) + fraction,
            reached: true,
        };
    }

    BreakEven {
        years: Decimal::from(horizon),
        reached: false,
    }
}
