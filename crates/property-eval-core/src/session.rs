use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::InvestmentResult;
use crate::input::{LoanTerms, PropertyInputs};
use crate::mortgage::{AmortizationRow, Mortgage};
use crate::types::{Currency, Money};
use crate::EvalResult;

/// Months of amortization exported by default.
pub const DEFAULT_EXPORT_MONTHS: u32 = 60;

/// A completed analysis, handed explicitly to export collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSession {
    pub as_of: NaiveDate,
    pub currency: Currency,
    pub property: PropertyInputs,
    pub loan: LoanTerms,
    pub result: InvestmentResult,
}

/// One flat row of the yearly projection export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportYearRow {
    pub year: u32,
    pub conservative_annual_cash_flow: Money,
    pub conservative_cumulative_cash_flow: Money,
    pub base_annual_cash_flow: Money,
    pub base_cumulative_cash_flow: Money,
    pub optimistic_annual_cash_flow: Money,
    pub optimistic_cumulative_cash_flow: Money,
    pub base_monthly_rent: Money,
    pub base_annual_debt_service: Money,
    pub base_loan_balance: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryLine {
    pub metric: &'static str,
    pub value: Option<Decimal>,
}

impl ExportSession {
    pub fn new(
        as_of: NaiveDate,
        property: PropertyInputs,
        loan: LoanTerms,
        result: InvestmentResult,
    ) -> Self {
        Self {
            as_of,
            currency: property.currency.clone(),
            property,
            loan,
            result,
        }
    }

    pub fn yearly_rows(&self) -> Vec<ExportYearRow> {
        let p = &self.result.projections;
        p.base
            .years
            .iter()
            .zip(&p.conservative.years)
            .zip(&p.optimistic.years)
            .map(|((base, cons), opt)| ExportYearRow {
                year: base.year,
                conservative_annual_cash_flow: cons.annual_cash_flow,
                conservative_cumulative_cash_flow: cons.cumulative_cash_flow,
                base_annual_cash_flow: base.annual_cash_flow,
                base_cumulative_cash_flow: base.cumulative_cash_flow,
                optimistic_annual_cash_flow: opt.annual_cash_flow,
                optimistic_cumulative_cash_flow: opt.cumulative_cash_flow,
                base_monthly_rent: base.monthly_rent,
                base_annual_debt_service: base.annual_debt_service,
                base_loan_balance: base.loan_balance_end,
            })
            .collect()
    }

    /// The first `months` payments of the loan.
    pub fn amortization_rows(&self, months: u32) -> EvalResult<Vec<AmortizationRow>> {
        Mortgage::new(self.loan.loan_amount, &self.loan)?.amortization_schedule(months)
    }

    /// Headline figures for a report cover page. Base scenario unless named.
    pub fn summary_lines(&self) -> Vec<SummaryLine> {
        let r = &self.result;
        let base = &r.metrics.base;
        let line = |metric, value: Decimal| SummaryLine {
            metric,
            value: Some(value),
        };
        vec![
            line("Property Price", self.property.property_price),
            line("Down Payment", r.down_payment),
            line("Loan Amount", r.loan_amount),
            line("Monthly Payment", r.monthly_payment),
            line("Total Investment", r.total_investment),
            line("Total Interest", r.total_interest),
            line("Total Payback", r.total_payback),
            line("Expected Capital Gain", r.expected_capital_gain),
            line("Monthly Cash Flow", base.monthly_cash_flow),
            line("ROI (%)", base.roi),
            line("Annualized ROI (%)", base.annualized_roi),
            line("Cap Rate (%)", base.cap_rate),
            line("Cash-on-Cash Return (%)", base.cash_on_cash_return),
            SummaryLine {
                metric: "DSCR",
                value: base.dscr,
            },
            SummaryLine {
                metric: "IRR (%)",
                value: base.irr,
            },
            line("Break-even (years)", base.break_even_years),
            line("Conservative ROI (%)", r.metrics.conservative.roi),
            line("Optimistic ROI (%)", r.metrics.optimistic.roi),
        ]
    }
}
