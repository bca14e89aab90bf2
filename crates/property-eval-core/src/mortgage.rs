use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::input::LoanTerms;
use crate::time_value::pmt;
use crate::types::{Money, Percent, Rate};
use crate::EvalResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How interest accrues on the loan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestType {
    /// Monthly compounding annuity: P * r(1+r)^n / ((1+r)^n - 1)
    #[default]
    Compound,
    /// Flat interest of P * rate * years, spread evenly over every payment
    Simple,
}

/// A fixed-rate, fully amortizing loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mortgage {
    pub loan_amount: Money,
    /// Annual nominal rate, percent
    pub interest_rate_annual: Percent,
    /// interest_rate_annual / 12 / 100
    pub monthly_rate: Rate,
    pub total_months: u32,
    pub interest_type: InterestType,
    pub monthly_payment: Money,
}

/// One row of the amortization schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub period: u32,
    pub payment: Money,
    pub principal: Money,
    pub interest: Money,
    /// Outstanding principal after this payment
    pub balance: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl Mortgage {
    pub fn new(loan_amount: Money, terms: &LoanTerms) -> EvalResult<Self> {
        if loan_amount < Decimal::ZERO {
            return Err(EvalError::invalid("loan_amount", "must not be negative"));
        }
        if terms.loan_term_years == 0 {
            return Err(EvalError::invalid(
                "loan_term_years",
                "must be a positive whole number",
            ));
        }

        let total_months = terms.loan_term_years * 12;
        let monthly_rate = terms.interest_rate_annual / dec!(12) / dec!(100);

        let monthly_payment = if loan_amount.is_zero() {
            Decimal::ZERO
        } else {
            match terms.interest_type {
                InterestType::Compound => -pmt(monthly_rate, total_months, loan_amount, Decimal::ZERO)?,
                InterestType::Simple => {
                    let interest = loan_amount * terms.interest_rate_annual / dec!(100)
                        * Decimal::from(terms.loan_term_years);
                    (loan_amount + interest) / Decimal::from(total_months)
                }
            }
        };

        let mortgage = Self {
            loan_amount,
            interest_rate_annual: terms.interest_rate_annual,
            monthly_rate,
            total_months,
            interest_type: terms.interest_type,
            monthly_payment,
        };

        // The compounding factor over the full term bounds every partial one.
        if mortgage.interest_type == InterestType::Compound {
            mortgage.compound_factor(total_months)?;
        }
        Ok(mortgage)
    }

    fn compound_factor(&self, months: u32) -> EvalResult<Decimal> {
        (Decimal::ONE + self.monthly_rate)
            .checked_powu(u64::from(months))
            .ok_or_else(|| EvalError::Computation {
                function: "mortgage compounding factor".into(),
                iterations: months,
                last_delta: self.monthly_rate,
            })
    }

    fn straight_line_principal(&self) -> Money {
        self.loan_amount / Decimal::from(self.total_months)
    }

    /// Outstanding principal after `month` payments.
    pub fn balance_after(&self, month: u32) -> EvalResult<Money> {
        if self.loan_amount.is_zero() || month >= self.total_months {
            return Ok(Decimal::ZERO);
        }
        if month == 0 {
            return Ok(self.loan_amount);
        }

        let balance = match self.interest_type {
            InterestType::Simple => {
                self.loan_amount * Decimal::from(self.total_months - month)
                    / Decimal::from(self.total_months)
            }
            InterestType::Compound if self.monthly_rate.is_zero() => {
                self.loan_amount - self.monthly_payment * Decimal::from(month)
            }
            InterestType::Compound => {
                // B_k = P(1+r)^k - PMT * ((1+r)^k - 1) / r
                let factor = self.compound_factor(month)?;
                let grown = self.loan_amount.checked_mul(factor);
                let repaid = self
                    .monthly_payment
                    .checked_mul(factor - Decimal::ONE)
                    .and_then(|v| v.checked_div(self.monthly_rate));
                grown
                    .zip(repaid)
                    .and_then(|(g, r)| g.checked_sub(r))
                    .ok_or_else(|| EvalError::Computation {
                        function: "mortgage balance".into(),
                        iterations: month,
                        last_delta: factor,
                    })?
            }
        };

        Ok(balance.max(Decimal::ZERO))
    }

    /// Interest carried by payment `month` (1-based).
    pub fn interest_component(&self, month: u32) -> EvalResult<Money> {
        if month == 0 || month > self.total_months || self.loan_amount.is_zero() {
            return Ok(Decimal::ZERO);
        }
        match self.interest_type {
            InterestType::Simple => Ok(self.monthly_payment - self.straight_line_principal()),
            InterestType::Compound => Ok(self.monthly_rate * self.balance_after(month - 1)?),
        }
    }

    /// Principal repaid by payment `month` (1-based).
    pub fn principal_component(&self, month: u32) -> EvalResult<Money> {
        if month == 0 || month > self.total_months {
            return Ok(Decimal::ZERO);
        }
        Ok(self.monthly_payment - self.interest_component(month)?)
    }

    /// Payments falling in projection year `year` (1-based), 0..=12.
    pub fn payments_in_year(&self, year: u32) -> u32 {
        if year == 0 {
            return 0;
        }
        let made_before = (year - 1).saturating_mul(12);
        self.total_months.saturating_sub(made_before).min(12)
    }

    /// Debt service paid in projection year `year`; zero after payoff.
    pub fn annual_debt_service(&self, year: u32) -> Money {
        self.monthly_payment * Decimal::from(self.payments_in_year(year))
    }

    /// The first `periods` rows of the schedule, stopping at the end of the term.
    pub fn amortization_schedule(&self, periods: u32) -> EvalResult<Vec<AmortizationRow>> {
        let last = periods.min(self.total_months);
        let mut rows = Vec::with_capacity(last as usize);
        for period in 1..=last {
            let interest = self.interest_component(period)?;
            rows.push(AmortizationRow {
                period,
                payment: self.monthly_payment,
                principal: self.monthly_payment - interest,
                interest,
                balance: self.balance_after(period)?,
            });
        }
        Ok(rows)
    }

    pub fn total_payback(&self) -> Money {
        self.monthly_payment * Decimal::from(self.total_months)
    }

    pub fn total_interest(&self) -> Money {
        self.total_payback() - self.loan_amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(rate: Decimal, years: u32) -> LoanTerms {
        LoanTerms::new(dec!(100000), dec!(20), rate, years)
    }

    #[test]
    fn test_compound_payment_matches_annuity() {
        let m = Mortgage::new(dec!(80000), &terms(dec!(5), 30)).unwrap();
        assert_eq!(m.monthly_payment.round_dp(2), dec!(429.46));
        assert_eq!(m.total_months, 360);
    }

    #[test]
    fn test_simple_interest_payment() {
        let t = terms(dec!(5), 30).with_interest_type(InterestType::Simple);
        let m = Mortgage::new(dec!(80000), &t).unwrap();
        assert_eq!(m.monthly_payment.round_dp(2), dec!(555.56));
        assert_eq!(m.total_interest().round_dp(2), dec!(120000));
    }

    #[test]
    fn test_dashboard_fixture_payment() {
        let t = LoanTerms::new(dec!(1000000), dec!(20), dec!(5), 25);
        let m = Mortgage::new(t.loan_amount, &t).unwrap();
        assert_eq!(m.monthly_payment.round_dp(2), dec!(4676.72));
    }

    #[test]
    fn test_zero_rate_straight_line() {
        let m = Mortgage::new(dec!(120000), &terms(dec!(0), 10)).unwrap();
        assert_eq!(m.monthly_payment, dec!(1000));
        assert_eq!(m.balance_after(60).unwrap(), dec!(60000));
        assert_eq!(m.interest_component(5).unwrap(), Decimal::ZERO);
        assert_eq!(m.total_interest(), Decimal::ZERO);
    }

    #[test]
    fn test_zero_loan_amount() {
        let m = Mortgage::new(Decimal::ZERO, &terms(dec!(5), 30)).unwrap();
        assert_eq!(m.monthly_payment, Decimal::ZERO);
        assert_eq!(m.balance_after(0).unwrap(), Decimal::ZERO);
        assert_eq!(m.balance_after(100).unwrap(), Decimal::ZERO);
        assert_eq!(m.annual_debt_service(1), Decimal::ZERO);
    }

    #[test]
    fn test_full_amortization() {
        let m = Mortgage::new(dec!(80000), &terms(dec!(5), 30)).unwrap();
        let mut repaid = Decimal::ZERO;
        for month in 1..=m.total_months {
            repaid += m.principal_component(month).unwrap();
        }
        assert!((repaid - dec!(80000)).abs() < dec!(0.0001));
        assert_eq!(m.balance_after(360).unwrap(), Decimal::ZERO);
        assert_eq!(m.balance_after(500).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_balance_closed_form_matches_schedule() {
        let m = Mortgage::new(dec!(80000), &terms(dec!(5), 30)).unwrap();
        let schedule = m.amortization_schedule(12).unwrap();
        let mut balance = dec!(80000);
        for row in &schedule {
            balance -= row.principal;
            assert!((balance - row.balance).abs() < dec!(0.000001));
        }
        assert!(schedule[0].interest > schedule[11].interest);
        assert_eq!(schedule[0].interest.round_dp(2), dec!(333.33));
    }

    #[test]
    fn test_schedule_stops_at_term() {
        let m = Mortgage::new(dec!(12000), &terms(dec!(3), 1)).unwrap();
        let schedule = m.amortization_schedule(60).unwrap();
        assert_eq!(schedule.len(), 12);
        assert_eq!(schedule[11].balance, Decimal::ZERO);
    }

    #[test]
    fn test_payments_in_year_stop_after_payoff() {
        let m = Mortgage::new(dec!(80000), &terms(dec!(5), 2)).unwrap();
        assert_eq!(m.payments_in_year(1), 12);
        assert_eq!(m.payments_in_year(2), 12);
        assert_eq!(m.payments_in_year(3), 0);
        assert_eq!(m.annual_debt_service(3), Decimal::ZERO);
        assert_eq!(m.annual_debt_service(1), m.monthly_payment * dec!(12));
    }

    #[test]
    fn test_simple_interest_components() {
        let t = terms(dec!(5), 30).with_interest_type(InterestType::Simple);
        let m = Mortgage::new(dec!(80000), &t).unwrap();
        let principal = m.principal_component(1).unwrap();
        assert_eq!(principal.round_dp(6), (dec!(80000) / dec!(360)).round_dp(6));
        assert_eq!(m.balance_after(180).unwrap(), dec!(40000));
    }

    #[test]
    fn test_overflowing_rate_is_computation_error() {
        let t = LoanTerms::new(dec!(1000000), dec!(0), dec!(100), 100);
        let err = Mortgage::new(t.loan_amount, &t).unwrap_err();
        assert!(matches!(err, EvalError::Computation { .. }));
    }

    #[test]
    fn test_large_factor_loan_is_computation_error() {
        // The factor itself fits; the loan grown by it does not.
        let t = LoanTerms::new(dec!(1000000), dec!(20), dec!(60), 100);
        let err = Mortgage::new(t.loan_amount, &t).unwrap_err();
        assert!(matches!(err, EvalError::Computation { .. }));
    }

    #[test]
    fn test_simple_interest_skips_compounding_check() {
        let t = LoanTerms::new(dec!(1000000), dec!(0), dec!(100), 100)
            .with_interest_type(InterestType::Simple);
        let m = Mortgage::new(t.loan_amount, &t).unwrap();
        // (1M + 1M * 100% * 100y) / 1200
        assert_eq!(m.monthly_payment.round_dp(6), (dec!(101000000) / dec!(1200)).round_dp(6));
        assert_eq!(m.balance_after(600).unwrap(), dec!(500000));
    }

    #[test]
    fn test_zero_term_rejected() {
        let err = Mortgage::new(dec!(1000), &terms(dec!(5), 0)).unwrap_err();
        assert_eq!(err.invalid_fields(), vec!["loan_term_years"]);
    }
}
