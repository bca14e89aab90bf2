use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::types::{Money, Rate};
use crate::EvalResult;

/// Default |NPV| below which an IRR candidate is accepted.
pub const IRR_NPV_TOLERANCE: Decimal = dec!(0.000001);
/// Default iteration ceiling for the IRR refinement loop.
pub const MAX_IRR_ITERATIONS: u32 = 200;

/// Candidate rates scanned, in order, to find a sign-changing bracket.
/// Spans -99% to +1000% per period.
const IRR_BRACKET_GRID: [Rate; 19] = [
    dec!(-0.99),
    dec!(-0.9),
    dec!(-0.75),
    dec!(-0.5),
    dec!(-0.25),
    dec!(-0.1),
    dec!(0),
    dec!(0.05),
    dec!(0.1),
    dec!(0.15),
    dec!(0.25),
    dec!(0.35),
    dec!(0.5),
    dec!(0.75),
    dec!(1),
    dec!(2),
    dec!(3.5),
    dec!(5),
    dec!(10),
];

/// Bracket width below which refinement cannot make further progress.
const MIN_BRACKET_WIDTH: Decimal = dec!(0.0000000000000000001);

/// Root-finder settings for IRR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrrSettings {
    /// Accept a rate once |NPV(rate)| <= tolerance
    pub tolerance: Decimal,
    /// Hard cap on refinement iterations
    pub max_iterations: u32,
}

impl Default for IrrSettings {
    fn default() -> Self {
        Self {
            tolerance: IRR_NPV_TOLERANCE,
            max_iterations: MAX_IRR_ITERATIONS,
        }
    }
}

impl IrrSettings {
    pub fn validate(&self) -> EvalResult<()> {
        if self.tolerance <= Decimal::ZERO {
            return Err(EvalError::configuration(
                "irr.tolerance",
                "must be greater than 0",
            ));
        }
        if self.max_iterations == 0 {
            return Err(EvalError::configuration(
                "irr.max_iterations",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Net Present Value of periodic cash flows; index 0 is undiscounted.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> EvalResult<Money> {
    if rate <= dec!(-1) {
        return Err(EvalError::invalid(
            "rate",
            "discount rate must be greater than -100%",
        ));
    }
    checked_npv(rate, cash_flows).ok_or_else(|| EvalError::DivisionByZero {
        context: format!("NPV discount factor overflow at rate {rate}"),
    })
}

/// Payment (PMT) for a loan of `present_value` over `nper` periods.
/// Sign convention follows spreadsheets: a positive loan yields a negative payment.
pub fn pmt(rate: Rate, nper: u32, present_value: Money, future_value: Money) -> EvalResult<Money> {
    if nper == 0 {
        return Err(EvalError::invalid("nper", "number of periods must be > 0"));
    }

    if rate.is_zero() {
        return Ok(-(present_value + future_value) / Decimal::from(nper));
    }

    let factor = (Decimal::ONE + rate)
        .checked_powu(u64::from(nper))
        .ok_or_else(|| EvalError::Computation {
            function: "PMT compounding factor".into(),
            iterations: nper,
            last_delta: rate,
        })?;
    let annuity_factor = (factor - Decimal::ONE)
        .checked_div(rate)
        .ok_or_else(|| EvalError::Computation {
            function: "PMT annuity factor".into(),
            iterations: nper,
            last_delta: rate,
        })?;

    if annuity_factor.is_zero() {
        return Err(EvalError::DivisionByZero {
            context: "PMT annuity factor".into(),
        });
    }

    present_value
        .checked_mul(factor)
        .and_then(|fv_of_loan| fv_of_loan.checked_add(future_value))
        .and_then(|total| total.checked_div(annuity_factor))
        .map(|payment| -payment)
        .ok_or_else(|| EvalError::Computation {
            function: "PMT".into(),
            iterations: nper,
            last_delta: factor,
        })
}

/// True when the series holds at least one strictly positive and one
/// strictly negative flow.
pub fn has_sign_change(cash_flows: &[Money]) -> bool {
    let any_negative = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    let any_positive = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    any_negative && any_positive
}

/// Internal Rate of Return of periodic cash flows (index 0 = today).
///
/// Returns `Ok(None)` when the IRR is undefined because the series never
/// changes sign. Returns `EvalError::Computation` when no bracketing pair
/// of rates exists on the search grid or the refinement does not reach
/// `settings.tolerance` within `settings.max_iterations`.
///
/// The search scans a fixed grid of rates for a sign change in NPV, then
/// refines inside that bracket with Newton steps, falling back to bisection
/// whenever a Newton step would leave the bracket.
pub fn irr(cash_flows: &[Money], settings: &IrrSettings) -> EvalResult<Option<Rate>> {
    if cash_flows.len() < 2 || !has_sign_change(cash_flows) {
        return Ok(None);
    }

    let (mut lo, mut npv_lo, mut hi) = match find_bracket(cash_flows, settings.tolerance) {
        Bracket::Root(rate) => return Ok(Some(rate)),
        Bracket::Found { lo, npv_lo, hi } => (lo, npv_lo, hi),
        Bracket::Missing => {
            return Err(EvalError::Computation {
                function: "IRR bracket search".into(),
                iterations: IRR_BRACKET_GRID.len() as u32,
                last_delta: Decimal::ZERO,
            })
        }
    };

    let mut rate = midpoint(lo, hi);
    let mut last_npv = npv_lo;

    for i in 0..settings.max_iterations {
        let (value, slope) =
            npv_and_derivative(rate, cash_flows).ok_or_else(|| EvalError::Computation {
                function: "IRR".into(),
                iterations: i,
                last_delta: last_npv,
            })?;
        last_npv = value;

        if value.abs() <= settings.tolerance {
            return Ok(Some(rate));
        }

        // Keep the root inside [lo, hi].
        if (value < Decimal::ZERO) == (npv_lo < Decimal::ZERO) {
            lo = rate;
            npv_lo = value;
        } else {
            hi = rate;
        }

        if hi - lo < MIN_BRACKET_WIDTH {
            break;
        }

        let newton = if slope.is_zero() {
            None
        } else {
            value.checked_div(slope).and_then(|step| rate.checked_sub(step))
        };

        rate = match newton {
            Some(candidate) if candidate > lo && candidate < hi => candidate,
            _ => midpoint(lo, hi),
        };
    }

    Err(EvalError::Computation {
        function: "IRR".into(),
        iterations: settings.max_iterations,
        last_delta: last_npv,
    })
}

enum Bracket {
    Root(Rate),
    Found { lo: Rate, npv_lo: Money, hi: Rate },
    Missing,
}

fn find_bracket(cash_flows: &[Money], tolerance: Decimal) -> Bracket {
    let mut previous: Option<(Rate, Money)> = None;

    for &rate in IRR_BRACKET_GRID.iter() {
        // Grid points whose discount factors overflow are skipped; NPV is
        // continuous above -100% so the neighbours still bracket correctly.
        let Some(value) = checked_npv(rate, cash_flows) else {
            continue;
        };
        if value.abs() <= tolerance {
            return Bracket::Root(rate);
        }
        if let Some((prev_rate, prev_value)) = previous {
            if (prev_value < Decimal::ZERO) != (value < Decimal::ZERO) {
                return Bracket::Found {
                    lo: prev_rate,
                    npv_lo: prev_value,
                    hi: rate,
                };
            }
        }
        previous = Some((rate, value));
    }

    Bracket::Missing
}

fn midpoint(lo: Rate, hi: Rate) -> Rate {
    lo + (hi - lo) / dec!(2)
}

/// NPV with every step checked; `None` on overflow or a non-positive base.
fn checked_npv(rate: Rate, cash_flows: &[Money]) -> Option<Money> {
    npv_and_derivative(rate, cash_flows).map(|(value, _)| value)
}

/// NPV(r) = sum CF_t / (1+r)^t and its derivative d(NPV)/dr.
fn npv_and_derivative(rate: Rate, cash_flows: &[Money]) -> Option<(Money, Decimal)> {
    let one_plus_r = Decimal::ONE.checked_add(rate)?;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }

    let mut value = Decimal::ZERO;
    let mut slope = Decimal::ZERO;
    let mut discount = Decimal::ONE; // (1+r)^-t

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_div(one_plus_r)?;
        }
        let pv = cf.checked_mul(discount)?;
        value = value.checked_add(pv)?;
        if t > 0 {
            // d/dr of CF_t / (1+r)^t = -t * CF_t / (1+r)^(t+1)
            let term = pv
                .checked_mul(Decimal::from(t as u64))?
                .checked_div(one_plus_r)?;
            slope = slope.checked_sub(term)?;
        }
    }

    Some((value, slope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(0.01));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        assert_eq!(npv(dec!(0.0), &cfs).unwrap(), dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_at_minus_one() {
        assert!(npv(dec!(-1), &[dec!(-1), dec!(2)]).is_err());
    }

    #[test]
    fn test_pmt_matches_annuity_formula() {
        // 80k over 30 years at 5% => ~429.46/month
        let payment = -pmt(dec!(0.05) / dec!(12), 360, dec!(80000), Decimal::ZERO).unwrap();
        assert!((payment - dec!(429.46)).abs() < dec!(0.01), "got {payment}");
    }

    #[test]
    fn test_pmt_zero_rate_is_straight_line() {
        let payment = -pmt(Decimal::ZERO, 360, dec!(360000), Decimal::ZERO).unwrap();
        assert_eq!(payment, dec!(1000));
    }

    #[test]
    fn test_pmt_overflow_is_computation_error() {
        // (1.05)^1200 fits in a Decimal; the loan times that factor does not.
        let result = pmt(dec!(0.05), 1200, dec!(800000), Decimal::ZERO);
        assert!(matches!(result, Err(EvalError::Computation { .. })));
    }

    #[test]
    fn test_pmt_zero_periods_error() {
        assert!(pmt(dec!(0.01), 0, dec!(100), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_irr_simple_case() {
        // Invest 100, receive 110 in 1 year => 10%
        let irr = irr(&[dec!(-100), dec!(110)], &IrrSettings::default())
            .unwrap()
            .unwrap();
        assert!((irr - dec!(0.10)).abs() < dec!(0.0000001), "got {irr}");
    }

    #[test]
    fn test_irr_even_cashflows() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let settings = IrrSettings::default();
        let rate = irr(&cfs, &settings).unwrap().unwrap();
        assert!((rate - dec!(0.097)).abs() < dec!(0.001), "got {rate}");
        assert!(npv(rate, &cfs).unwrap().abs() <= settings.tolerance);
    }

    #[test]
    fn test_irr_negative_rate() {
        // Lose 40% over one period
        let rate = irr(&[dec!(-100), dec!(60)], &IrrSettings::default())
            .unwrap()
            .unwrap();
        assert!((rate - dec!(-0.4)).abs() < dec!(0.0000001), "got {rate}");
    }

    #[test]
    fn test_irr_undefined_without_sign_change() {
        let settings = IrrSettings::default();
        assert_eq!(irr(&[dec!(-100), dec!(-5), dec!(-5)], &settings).unwrap(), None);
        assert_eq!(irr(&[dec!(100), dec!(5), dec!(5)], &settings).unwrap(), None);
        assert_eq!(irr(&[dec!(-100)], &settings).unwrap(), None);
    }

    #[test]
    fn test_irr_long_series_stays_finite() {
        let mut cfs = vec![dec!(-200000)];
        cfs.extend(std::iter::repeat(dec!(15000)).take(39));
        cfs.push(dec!(500000));
        let settings = IrrSettings::default();
        let rate = irr(&cfs, &settings).unwrap().unwrap();
        assert!(npv(rate, &cfs).unwrap().abs() <= settings.tolerance);
    }

    #[test]
    fn test_irr_iteration_cap_yields_computation_error() {
        let settings = IrrSettings {
            tolerance: dec!(0.000000000000000000000000001),
            max_iterations: 1,
        };
        let result = irr(&[dec!(-1000), dec!(300), dec!(400), dec!(500)], &settings);
        assert!(matches!(result, Err(EvalError::Computation { .. })));
    }

    #[test]
    fn test_irr_settings_validation() {
        assert!(IrrSettings::default().validate().is_ok());
        let bad = IrrSettings {
            tolerance: Decimal::ZERO,
            ..IrrSettings::default()
        };
        assert!(bad.validate().is_err());
    }
}
