//! Rule-based risk screening of an evaluated investment.
//!
//! Rules read only the base and conservative scenario metrics together with
//! the investor's own leverage and occupancy assumptions.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::input::{LoanTerms, PropertyInputs};
use crate::metrics::AdvancedMetrics;
use crate::types::{Money, Percent};

/// Base monthly cash flow below which the margin is considered thin.
pub const LOW_CASH_FLOW_MARGIN: Money = dec!(200);
/// Base monthly cash flow below which a larger reserve is recommended.
pub const CASH_RESERVE_THRESHOLD: Money = dec!(500);
/// Annualized ROI below which the investment trails market alternatives.
pub const LOW_ROI_THRESHOLD: Percent = dec!(5);
/// Annualized ROI below which alternatives are worth comparing.
pub const COMPARE_ALTERNATIVES_ROI: Percent = dec!(8);
/// Down payment share of price below which leverage is flagged.
pub const LOW_DOWN_PAYMENT_PERCENT: Percent = dec!(15);
/// Occupancy assumption below which vacancy risk is flagged.
pub const LOW_OCCUPANCY_PERCENT: Percent = dec!(90);
/// Occupancy assumption below which market research is recommended.
pub const VALIDATE_OCCUPANCY_PERCENT: Percent = dec!(95);

const GENERAL_RECOMMENDATIONS: [&str; 4] = [
    "Conduct thorough due diligence on the property and neighborhood",
    "Consider hiring a property management company if you lack experience",
    "Regularly review and adjust rent to market rates",
    "Maintain adequate insurance coverage for the property",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
}

pub fn assess_risk(
    property: &PropertyInputs,
    loan: &LoanTerms,
    base: &AdvancedMetrics,
    conservative: &AdvancedMetrics,
) -> RiskAssessment {
    let mut level = RiskLevel::Low;
    let mut factors = Vec::new();

    let mut flag = |factor: &str, severity: RiskLevel| {
        factors.push(factor.to_string());
        level = level.max(severity);
    };

    if base.monthly_cash_flow < Decimal::ZERO {
        flag("Negative cash flow in base scenario", RiskLevel::High);
    } else if base.monthly_cash_flow < LOW_CASH_FLOW_MARGIN {
        flag("Low cash flow margin", RiskLevel::Medium);
    }

    if conservative.monthly_cash_flow < Decimal::ZERO {
        flag("Negative cash flow in conservative scenario", RiskLevel::High);
    }

    if base.annualized_roi < LOW_ROI_THRESHOLD {
        flag("Low ROI compared to market alternatives", RiskLevel::Medium);
    }

    if loan.down_payment_percentage < LOW_DOWN_PAYMENT_PERCENT {
        flag("Low down payment increases leverage risk", RiskLevel::Medium);
    }

    if property.occupancy_rate < LOW_OCCUPANCY_PERCENT {
        flag(
            "Low occupancy rate assumption increases vacancy risk",
            RiskLevel::Medium,
        );
    }

    RiskAssessment {
        risk_level: level,
        risk_factors: factors,
        recommendations: recommendations(property, base, level),
    }
}

fn recommendations(
    property: &PropertyInputs,
    base: &AdvancedMetrics,
    level: RiskLevel,
) -> Vec<String> {
    let mut out: Vec<&str> = Vec::new();

    if level == RiskLevel::High {
        out.extend([
            "Consider increasing down payment to improve cash flow",
            "Negotiate a lower purchase price or higher rental income",
            "Explore properties in different markets with better rent-to-price ratios",
        ]);
    }
    if base.annualized_roi < COMPARE_ALTERNATIVES_ROI {
        out.push("Compare with other investment options (stocks, bonds, REITs)");
    }
    if property.occupancy_rate < VALIDATE_OCCUPANCY_PERCENT {
        out.push("Research local rental market to validate occupancy assumptions");
    }
    if base.monthly_cash_flow < CASH_RESERVE_THRESHOLD {
        out.push("Build a larger cash reserve for unexpected expenses and vacancies");
    }
    out.extend(GENERAL_RECOMMENDATIONS);

    out.into_iter().map(String::from).collect()
}
