use std::iter::FusedIterator;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::input::PropertyInputs;
use crate::mortgage::Mortgage;
use crate::scenario::{ScenarioAssumptions, ScenarioKind};
use crate::types::Money;
use crate::EvalResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One projected year of a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowYear {
    /// 1-based year index
    pub year: u32,
    /// Gross monthly rent after growth, before occupancy
    pub monthly_rent: Money,
    pub effective_monthly_rent: Money,
    pub monthly_cash_flow: Money,
    /// Effective rent less HOA and other operating costs, before debt service
    pub annual_net_operating_income: Money,
    pub annual_debt_service: Money,
    /// Sale proceeds net of loan payoff and selling costs; final year only
    pub net_resale_proceeds: Money,
    pub annual_cash_flow: Money,
    pub cumulative_cash_flow: Money,
    /// Outstanding principal at year end
    pub loan_balance_end: Money,
}

/// A materialized scenario projection with random access by year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowProjection {
    pub scenario: ScenarioKind,
    /// Cash outlay at year 0
    pub initial_investment: Money,
    pub years: Vec<CashFlowYear>,
}

impl CashFlowProjection {
    /// Year `year` (1-based).
    pub fn year(&self, year: u32) -> Option<&CashFlowYear> {
        let idx = usize::try_from(year).ok()?.checked_sub(1)?;
        self.years.get(idx)
    }

    pub fn first_year(&self) -> Option<&CashFlowYear> {
        self.years.first()
    }

    pub fn final_year(&self) -> Option<&CashFlowYear> {
        self.years.last()
    }

    /// Cumulative cash flow from year 0 (`-initial_investment`) through the
    /// final year.
    pub fn cumulative_series(&self) -> Vec<Money> {
        std::iter::once(-self.initial_investment)
            .chain(self.years.iter().map(|y| y.cumulative_cash_flow))
            .collect()
    }

    /// `[-initial_investment, annual_cash_flow(1), ..]` for NPV / IRR.
    pub fn irr_cash_flows(&self) -> Vec<Money> {
        std::iter::once(-self.initial_investment)
            .chain(self.years.iter().map(|y| y.annual_cash_flow))
            .collect()
    }

    /// Cumulative cash flow at the end of the holding period.
    pub fn net_profit(&self) -> Money {
        self.final_year()
            .map(|y| y.cumulative_cash_flow)
            .unwrap_or(-self.initial_investment)
    }
}

/// Lazily yields each year of a scenario projection. Finite: stops after the
/// holding period, or after the first error.
pub struct ProjectionIter<'a> {
    property: &'a PropertyInputs,
    mortgage: &'a Mortgage,
    assumptions: &'a ScenarioAssumptions,
    growth: Decimal,
    growth_factor: Decimal,
    cumulative: Money,
    net_resale_proceeds: Money,
    next_year: u32,
    holding_period: u32,
}

impl<'a> ProjectionIter<'a> {
    pub fn new(
        property: &'a PropertyInputs,
        mortgage: &'a Mortgage,
        assumptions: &'a ScenarioAssumptions,
        total_investment: Money,
    ) -> EvalResult<Self> {
        let holding_months = property.holding_period_years.saturating_mul(12);
        let payoff = mortgage.balance_after(holding_months)?;
        let selling_costs = property.resale_value * property.selling_costs_percentage / dec!(100);

        Ok(Self {
            property,
            mortgage,
            assumptions,
            growth: Decimal::ONE + property.rent_growth_rate / dec!(100),
            growth_factor: Decimal::ONE,
            cumulative: -total_investment,
            net_resale_proceeds: property.resale_value - payoff - selling_costs,
            next_year: 1,
            holding_period: property.holding_period_years,
        })
    }

    fn overflow(&self, year: u32, context: &str) -> EvalError {
        EvalError::Computation {
            function: format!("cash flow projection ({context})"),
            iterations: year,
            last_delta: self.growth_factor,
        }
    }

    fn project_year(&mut self, year: u32) -> EvalResult<CashFlowYear> {
        if year > 1 {
            self.growth_factor = self
                .growth_factor
                .checked_mul(self.growth)
                .ok_or_else(|| self.overflow(year, "rent growth"))?;
        }

        let monthly_rent = self
            .assumptions
            .monthly_rent
            .checked_mul(self.growth_factor)
            .ok_or_else(|| self.overflow(year, "monthly rent"))?;
        let effective_monthly_rent = monthly_rent * (self.assumptions.occupancy_rate / dec!(100));

        let annual_operating_costs =
            self.property.hoa_fees_annual + self.property.other_operating_costs_annual;
        let annual_debt_service = self.mortgage.annual_debt_service(year);

        let monthly_cash_flow = effective_monthly_rent
            - annual_debt_service / dec!(12)
            - annual_operating_costs / dec!(12);
        let annual_net_operating_income = effective_monthly_rent
            .checked_mul(dec!(12))
            .ok_or_else(|| self.overflow(year, "net operating income"))?
            - annual_operating_costs;

        let net_resale_proceeds = if year == self.holding_period {
            self.net_resale_proceeds
        } else {
            Decimal::ZERO
        };
        let annual_cash_flow = monthly_cash_flow
            .checked_mul(dec!(12))
            .and_then(|cf| cf.checked_add(net_resale_proceeds))
            .ok_or_else(|| self.overflow(year, "annual cash flow"))?;

        self.cumulative = self
            .cumulative
            .checked_add(annual_cash_flow)
            .ok_or_else(|| self.overflow(year, "cumulative cash flow"))?;

        let loan_balance_end = self.mortgage.balance_after(year.saturating_mul(12))?;

        Ok(CashFlowYear {
            year,
            monthly_rent,
            effective_monthly_rent,
            monthly_cash_flow,
            annual_net_operating_income,
            annual_debt_service,
            net_resale_proceeds,
            annual_cash_flow,
            cumulative_cash_flow: self.cumulative,
            loan_balance_end,
        })
    }
}

impl Iterator for ProjectionIter<'_> {
    type Item = EvalResult<CashFlowYear>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_year > self.holding_period {
            return None;
        }
        let year = self.next_year;
        let item = self.project_year(year);
        // Stop after an error; later years depend on this one.
        self.next_year = if item.is_ok() {
            year + 1
        } else {
            self.holding_period + 1
        };
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.holding_period + 1).saturating_sub(self.next_year) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ProjectionIter<'_> {}

impl FusedIterator for ProjectionIter<'_> {}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project one scenario over the holding period.
pub fn project_cash_flows(
    property: &PropertyInputs,
    mortgage: &Mortgage,
    assumptions: &ScenarioAssumptions,
    total_investment: Money,
) -> EvalResult<CashFlowProjection> {
    let years = ProjectionIter::new(property, mortgage, assumptions, total_investment)?
        .collect::<EvalResult<Vec<_>>>()?;

    Ok(CashFlowProjection {
        scenario: assumptions.kind,
        initial_investment: total_investment,
        years,
    })
}
