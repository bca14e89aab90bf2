use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::{EvalError, FieldIssue};
use crate::mortgage::InterestType;
use crate::types::{Currency, Money, Percent};
use crate::EvalResult;

/// A flat request mapping as submitted by the form-handling layer.
pub type RawRequest = serde_json::Map<String, Value>;

/// Largest accepted currency amount.
pub const MAX_AMOUNT: Money = dec!(1000000000000000);
/// Largest accepted loan term or holding period, in years.
pub const MAX_YEARS: u32 = 100;
/// Largest accepted annual interest or rent growth rate, in percent.
pub const MAX_RATE_PERCENT: Percent = dec!(100);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Validated property and operating assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInputs {
    /// Purchase price
    pub property_price: Money,
    /// Renovation / furnishing spend at acquisition
    pub enhancement_costs: Money,
    /// Transaction costs paid in cash at acquisition
    pub closing_costs: Money,
    /// Gross annual rent at full occupancy (year 1)
    pub annual_rent: Money,
    /// Expected occupancy, 0-100
    pub occupancy_rate: Percent,
    /// Annual HOA / service charges
    pub hoa_fees_annual: Money,
    /// Other annual operating costs (maintenance, insurance, management)
    pub other_operating_costs_annual: Money,
    /// Annual rent growth, percent
    pub rent_growth_rate: Percent,
    /// Years the property is held before resale
    pub holding_period_years: u32,
    /// Expected sale price at the end of the holding period
    pub resale_value: Money,
    /// Selling costs as a percent of the resale value
    pub selling_costs_percentage: Percent,
    /// Display currency
    pub currency: Currency,
}

/// Validated financing terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Down payment as a percent of the purchase price, 0-100
    pub down_payment_percentage: Percent,
    /// Annual nominal interest rate, percent
    pub interest_rate_annual: Percent,
    /// Amortization term in years
    pub loan_term_years: u32,
    pub interest_type: InterestType,
    /// Derived: price * down_payment_percentage / 100
    pub down_payment_amount: Money,
    /// Derived: price - down_payment_amount
    pub loan_amount: Money,
}

impl LoanTerms {
    /// Terms for a down payment given as a percentage of `property_price`.
    pub fn new(
        property_price: Money,
        down_payment_percentage: Percent,
        interest_rate_annual: Percent,
        loan_term_years: u32,
    ) -> Self {
        let down_payment_amount = property_price * down_payment_percentage / dec!(100);
        Self {
            down_payment_percentage,
            interest_rate_annual,
            loan_term_years,
            interest_type: InterestType::Compound,
            down_payment_amount,
            loan_amount: property_price - down_payment_amount,
        }
    }

    /// Terms for a down payment given as an amount. The amount is kept
    /// exactly; the percentage is derived from it.
    pub fn from_down_payment_amount(
        property_price: Money,
        down_payment_amount: Money,
        interest_rate_annual: Percent,
        loan_term_years: u32,
    ) -> Self {
        let down_payment_percentage = if property_price.is_zero() {
            Decimal::ZERO
        } else {
            down_payment_amount / property_price * dec!(100)
        };
        Self {
            down_payment_percentage,
            interest_rate_annual,
            loan_term_years,
            interest_type: InterestType::Compound,
            down_payment_amount,
            loan_amount: property_price - down_payment_amount,
        }
    }

    pub fn with_interest_type(mut self, interest_type: InterestType) -> Self {
        self.interest_type = interest_type;
        self
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse and validate a raw request into typed property and loan inputs.
///
/// Every offending field is reported, in request-contract order, inside a
/// single `EvalError::Validation`.
pub fn normalize_request(
    raw: &RawRequest,
    config: &EngineConfig,
) -> EvalResult<(PropertyInputs, LoanTerms)> {
    let mut reader = FieldReader::new(raw);

    let property_price = reader.required(&["property_price"]);
    check(&mut reader, "property_price", property_price, Domain::Positive);

    let down_payment = read_down_payment(&mut reader, property_price);

    let interest_rate = reader.required(&["interest_rate", "interest_rate_annual"]);
    check(&mut reader, "interest_rate", interest_rate, Domain::Rate);

    let loan_term_years = reader.years(&["loan_term_years"], None);

    let annual_rent = read_annual_rent(&mut reader);

    let occupancy_rate = reader.required(&["occupancy_rate"]);
    check(&mut reader, "occupancy_rate", occupancy_rate, Domain::Percentage);

    let hoa_fees_annual = reader.optional(&["hoa_fees_annual"], Decimal::ZERO);
    check(&mut reader, "hoa_fees_annual", hoa_fees_annual, Domain::NonNegative);

    let rent_growth_rate = reader.optional(&["rent_growth_rate"], Decimal::ZERO);
    check(&mut reader, "rent_growth_rate", rent_growth_rate, Domain::Rate);

    let holding_period_years = reader.years(
        &["holding_period", "holding_period_years"],
        Some(config.default_holding_period_years),
    );

    let resale_value = match reader.get(&["resale_value"]) {
        Some(value) => Some(value),
        None => property_price
            .filter(|p| *p > Decimal::ZERO)
            .and_then(|p| p.checked_mul(config.default_resale_multiplier)),
    };
    check(&mut reader, "resale_value", resale_value, Domain::NonNegative);

    let enhancement_costs = reader.optional(&["enhancement_costs"], Decimal::ZERO);
    check(&mut reader, "enhancement_costs", enhancement_costs, Domain::NonNegative);

    let closing_costs = reader.optional(&["closing_costs"], Decimal::ZERO);
    check(&mut reader, "closing_costs", closing_costs, Domain::NonNegative);

    let other_costs = reader.optional(&["other_operating_costs_annual"], Decimal::ZERO);
    check(&mut reader, "other_operating_costs_annual", other_costs, Domain::NonNegative);

    let selling_costs = reader.optional(&["selling_costs_percentage"], Decimal::ZERO);
    check(&mut reader, "selling_costs_percentage", selling_costs, Domain::Percentage);

    let interest_type = reader.interest_type();
    let currency = reader.currency();

    if !reader.issues.is_empty() {
        return Err(EvalError::Validation {
            issues: reader.issues,
        });
    }

    // Every value below was checked above; a `None` here means an issue was recorded.
    let (
        Some(property_price),
        Some(down_payment),
        Some(interest_rate),
        Some(loan_term_years),
        Some(annual_rent),
        Some(occupancy_rate),
        Some(hoa_fees_annual),
        Some(rent_growth_rate),
        Some(holding_period_years),
        Some(resale_value),
        Some(enhancement_costs),
        Some(closing_costs),
        Some(other_costs),
        Some(selling_costs),
    ) = (
        property_price,
        down_payment,
        interest_rate,
        loan_term_years,
        annual_rent,
        occupancy_rate,
        hoa_fees_annual,
        rent_growth_rate,
        holding_period_years,
        resale_value,
        enhancement_costs,
        closing_costs,
        other_costs,
        selling_costs,
    )
    else {
        return Err(EvalError::invalid("request", "could not be normalized"));
    };

    let loan = match down_payment {
        DownPayment::Percentage(pct) => {
            LoanTerms::new(property_price, pct, interest_rate, loan_term_years)
        }
        DownPayment::Amount(amount) => LoanTerms::from_down_payment_amount(
            property_price,
            amount,
            interest_rate,
            loan_term_years,
        ),
    }
    .with_interest_type(interest_type);

    let property = PropertyInputs {
        property_price,
        enhancement_costs,
        closing_costs,
        annual_rent,
        occupancy_rate,
        hoa_fees_annual,
        other_operating_costs_annual: other_costs,
        rent_growth_rate,
        holding_period_years,
        resale_value,
        selling_costs_percentage: selling_costs,
        currency,
    };

    Ok((property, loan))
}

// ---------------------------------------------------------------------------
// Field readers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum DownPayment {
    Percentage(Percent),
    Amount(Money),
}

#[derive(Debug, Clone, Copy)]
enum Domain {
    Positive,
    NonNegative,
    Percentage,
    Rate,
}

struct FieldReader<'a> {
    raw: &'a RawRequest,
    issues: Vec<FieldIssue>,
}

impl<'a> FieldReader<'a> {
    fn new(raw: &'a RawRequest) -> Self {
        Self {
            raw,
            issues: Vec::new(),
        }
    }

    fn issue(&mut self, field: &str, reason: impl Into<String>) {
        self.issues.push(FieldIssue::new(field, reason));
    }

    /// First present, non-empty value among `names`, parsed as a decimal.
    /// Records an issue and returns `None` for malformed values.
    fn get(&mut self, names: &[&str]) -> Option<Decimal> {
        let (name, value) = names
            .iter()
            .find_map(|n| self.raw.get(*n).filter(|v| !is_blank(v)).map(|v| (*n, v)))?;
        match parse_decimal(value) {
            Some(d) => Some(d),
            None => {
                self.issue(name, "must be a number");
                None
            }
        }
    }

    fn present(&self, names: &[&str]) -> bool {
        names
            .iter()
            .any(|n| self.raw.get(*n).is_some_and(|v| !is_blank(v)))
    }

    fn required(&mut self, names: &[&str]) -> Option<Decimal> {
        if !self.present(names) {
            self.issue(names[0], "is required");
            return None;
        }
        self.get(names)
    }

    fn optional(&mut self, names: &[&str], default: Decimal) -> Option<Decimal> {
        if !self.present(names) {
            return Some(default);
        }
        self.get(names)
    }

    /// Positive whole number of years, at most `MAX_YEARS`.
    fn years(&mut self, names: &[&str], default: Option<u32>) -> Option<u32> {
        let value = match (self.present(names), default) {
            (false, Some(d)) => return Some(d),
            (false, None) => {
                self.issue(names[0], "is required");
                return None;
            }
            (true, _) => self.get(names)?,
        };
        if value <= Decimal::ZERO || !value.fract().is_zero() {
            self.issue(names[0], "must be a positive whole number");
            return None;
        }
        if value > Decimal::from(MAX_YEARS) {
            self.issue(names[0], format!("must not exceed {MAX_YEARS} years"));
            return None;
        }
        u32::from_str(&value.trunc().normalize().to_string())
            .ok()
            .or_else(|| {
                self.issue(names[0], "must be a positive whole number");
                None
            })
    }

    fn interest_type(&mut self) -> InterestType {
        match self.raw.get("interest_type") {
            None | Some(Value::Null) => InterestType::Compound,
            Some(Value::String(s)) if s.trim().is_empty() => InterestType::Compound,
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "compound" => InterestType::Compound,
                "simple" => InterestType::Simple,
                _ => {
                    self.issue("interest_type", "must be 'compound' or 'simple'");
                    InterestType::Compound
                }
            },
            Some(_) => {
                self.issue("interest_type", "must be 'compound' or 'simple'");
                InterestType::Compound
            }
        }
    }

    fn currency(&mut self) -> Currency {
        match self.raw.get("currency") {
            Some(Value::String(s)) if !s.trim().is_empty() => Currency::from_code(s),
            None | Some(Value::Null) | Some(Value::String(_)) => Currency::default(),
            Some(_) => {
                self.issue("currency", "must be a currency code");
                Currency::default()
            }
        }
    }
}

fn read_down_payment(reader: &mut FieldReader<'_>, price: Option<Money>) -> Option<DownPayment> {
    if reader.present(&["down_payment_percentage"]) {
        let pct = reader.get(&["down_payment_percentage"]);
        check(reader, "down_payment_percentage", pct, Domain::Percentage);
        return pct.map(DownPayment::Percentage);
    }
    if reader.present(&["down_payment"]) {
        let amount = reader.get(&["down_payment"]);
        check(reader, "down_payment", amount, Domain::NonNegative);
        let amount = amount?;
        if let Some(p) = price {
            if amount > p {
                reader.issue("down_payment", "must not exceed property_price");
                return None;
            }
        }
        return Some(DownPayment::Amount(amount));
    }
    reader.issue(
        "down_payment_percentage",
        "is required (or provide down_payment)",
    );
    None
}

fn read_annual_rent(reader: &mut FieldReader<'_>) -> Option<Money> {
    if reader.present(&["annual_rent"]) {
        let rent = reader.get(&["annual_rent"]);
        check(reader, "annual_rent", rent, Domain::Positive);
        return rent;
    }
    if reader.present(&["monthly_rent"]) {
        let monthly = reader.get(&["monthly_rent"]);
        check(reader, "monthly_rent", monthly, Domain::Positive);
        return monthly.and_then(|m| m.checked_mul(dec!(12)));
    }
    reader.issue("annual_rent", "is required (or provide monthly_rent)");
    None
}

/// Range check for an already-parsed value. `None` passes through untouched
/// (missing/malformed was recorded by the reader); an out-of-range value is
/// recorded and the caller's copy is left in place, since the issue list
/// already blocks the result.
fn check(reader: &mut FieldReader<'_>, field: &str, value: Option<Decimal>, domain: Domain) {
    let Some(v) = value else {
        return;
    };
    let problem = match domain {
        Domain::Positive if v <= Decimal::ZERO => Some("must be greater than 0".to_string()),
        Domain::NonNegative if v < Decimal::ZERO => Some("must not be negative".to_string()),
        Domain::Percentage if v < Decimal::ZERO || v > dec!(100) => {
            Some("must be between 0 and 100".to_string())
        }
        Domain::Rate if v < Decimal::ZERO => Some("must not be negative".to_string()),
        Domain::Rate if v > MAX_RATE_PERCENT => {
            Some(format!("must not exceed {MAX_RATE_PERCENT}%"))
        }
        Domain::Positive | Domain::NonNegative if v > MAX_AMOUNT => {
            Some(format!("must not exceed {MAX_AMOUNT}"))
        }
        _ => None,
    };
    if let Some(reason) = problem {
        reader.issue(field, reason);
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Numbers and numeric strings; `None` for anything else.
fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: Value) -> RawRequest {
        match value {
            Value::Object(map) => map,
            _ => panic!("test request must be an object"),
        }
    }

    fn base_request() -> RawRequest {
        request(json!({
            "property_price": "1000000",
            "down_payment_percentage": "20",
            "interest_rate": "5",
            "loan_term_years": "25",
            "annual_rent": "96000",
            "occupancy_rate": "95",
            "hoa_fees_annual": "6000",
            "rent_growth_rate": "0",
            "holding_period": "10",
            "enhancement_costs": "0"
        }))
    }

    fn fields(err: EvalError) -> Vec<String> {
        err.invalid_fields().into_iter().map(String::from).collect()
    }

    #[test]
    fn test_normalizes_string_fields() {
        let (property, loan) = normalize_request(&base_request(), &EngineConfig::default()).unwrap();
        assert_eq!(property.property_price, dec!(1000000));
        assert_eq!(property.annual_rent, dec!(96000));
        assert_eq!(property.holding_period_years, 10);
        assert_eq!(loan.loan_term_years, 25);
        assert_eq!(loan.down_payment_amount, dec!(200000));
        assert_eq!(loan.loan_amount, dec!(800000));
        assert_eq!(loan.interest_type, InterestType::Compound);
        assert_eq!(property.currency, Currency::SAR);
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let mut raw = base_request();
        raw.remove("holding_period");
        raw.remove("hoa_fees_annual");
        raw.remove("rent_growth_rate");
        let (property, _) = normalize_request(&raw, &EngineConfig::default()).unwrap();
        assert_eq!(property.holding_period_years, 10);
        assert_eq!(property.hoa_fees_annual, Decimal::ZERO);
        assert_eq!(property.rent_growth_rate, Decimal::ZERO);
        // Derived resale value: price * 1.2
        assert_eq!(property.resale_value, dec!(1200000));
    }

    #[test]
    fn test_accepts_json_numbers_and_aliases() {
        let raw = request(json!({
            "property_price": 500000,
            "down_payment": 100000,
            "interest_rate_annual": 4.5,
            "loan_term_years": 30.0,
            "monthly_rent": 3000,
            "occupancy_rate": 100,
            "holding_period_years": 5,
            "resale_value": 550000
        }));
        let (property, loan) = normalize_request(&raw, &EngineConfig::default()).unwrap();
        assert_eq!(property.annual_rent, dec!(36000));
        assert_eq!(loan.down_payment_percentage, dec!(20));
        assert_eq!(loan.down_payment_amount, dec!(100000));
        assert_eq!(loan.interest_rate_annual, dec!(4.5));
        assert_eq!(loan.loan_term_years, 30);
        assert_eq!(property.holding_period_years, 5);
        assert_eq!(property.resale_value, dec!(550000));
    }

    #[test]
    fn test_down_payment_over_100_names_field() {
        let mut raw = base_request();
        raw.insert("down_payment_percentage".into(), json!("120"));
        let err = normalize_request(&raw, &EngineConfig::default()).unwrap_err();
        assert_eq!(fields(err), vec!["down_payment_percentage"]);
    }

    #[test]
    fn test_reports_every_offending_field() {
        let raw = request(json!({
            "property_price": "-5",
            "down_payment_percentage": "20",
            "interest_rate": "abc",
            "loan_term_years": "12.5",
            "annual_rent": "96000",
            "occupancy_rate": "101",
            "hoa_fees_annual": "-1",
            "holding_period": "0"
        }));
        let err = normalize_request(&raw, &EngineConfig::default()).unwrap_err();
        assert_eq!(
            fields(err),
            vec![
                "property_price",
                "interest_rate",
                "loan_term_years",
                "occupancy_rate",
                "hoa_fees_annual",
                "holding_period",
            ]
        );
    }

    #[test]
    fn test_missing_required_fields() {
        let err = normalize_request(&RawRequest::new(), &EngineConfig::default()).unwrap_err();
        assert_eq!(
            fields(err),
            vec![
                "property_price",
                "down_payment_percentage",
                "interest_rate",
                "loan_term_years",
                "annual_rent",
                "occupancy_rate",
            ]
        );
    }

    #[test]
    fn test_empty_string_counts_as_missing() {
        let mut raw = base_request();
        raw.insert("occupancy_rate".into(), json!("  "));
        raw.insert("hoa_fees_annual".into(), json!(""));
        let err = normalize_request(&raw, &EngineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("occupancy_rate: is required"));
        assert_eq!(fields(err), vec!["occupancy_rate"]);
    }

    #[test]
    fn test_down_payment_amount_above_price() {
        let mut raw = base_request();
        raw.remove("down_payment_percentage");
        raw.insert("down_payment".into(), json!("1500000"));
        let err = normalize_request(&raw, &EngineConfig::default()).unwrap_err();
        assert_eq!(fields(err), vec!["down_payment"]);
    }

    #[test]
    fn test_interest_type_parsing() {
        let mut raw = base_request();
        raw.insert("interest_type".into(), json!("Simple"));
        let (_, loan) = normalize_request(&raw, &EngineConfig::default()).unwrap();
        assert_eq!(loan.interest_type, InterestType::Simple);

        raw.insert("interest_type".into(), json!("balloon"));
        let err = normalize_request(&raw, &EngineConfig::default()).unwrap_err();
        assert_eq!(fields(err), vec!["interest_type"]);
    }

    #[test]
    fn test_rejects_non_numeric_json_types() {
        let mut raw = base_request();
        raw.insert("annual_rent".into(), json!(true));
        raw.insert("enhancement_costs".into(), json!([1, 2]));
        let err = normalize_request(&raw, &EngineConfig::default()).unwrap_err();
        assert_eq!(fields(err), vec!["annual_rent", "enhancement_costs"]);
    }

    #[test]
    fn test_scientific_notation_accepted() {
        let mut raw = base_request();
        raw.insert("property_price".into(), json!("1e6"));
        let (property, _) = normalize_request(&raw, &EngineConfig::default()).unwrap();
        assert_eq!(property.property_price, dec!(1000000));
    }

    #[test]
    fn test_upper_bounds() {
        let mut raw = base_request();
        raw.insert("loan_term_years".into(), json!("150"));
        raw.insert("rent_growth_rate".into(), json!("250"));
        let err = normalize_request(&raw, &EngineConfig::default()).unwrap_err();
        assert_eq!(fields(err), vec!["loan_term_years", "rent_growth_rate"]);
    }
}
