pub mod amortization;
pub mod evaluate;
pub mod export;

use clap::Args;
use property_eval_core::RawRequest;
use rust_decimal::Decimal;
use serde_json::Value;

/// Request fields as flags. Used when neither `--input` nor stdin is given.
#[derive(Args, Debug, Default)]
pub struct RequestArgs {
    /// Purchase price
    #[arg(long)]
    pub property_price: Option<Decimal>,

    /// Down payment as a percent of the price (0-100)
    #[arg(long)]
    pub down_payment_percentage: Option<Decimal>,

    /// Down payment as an amount (alternative to --down-payment-percentage)
    #[arg(long)]
    pub down_payment: Option<Decimal>,

    /// Annual interest rate, percent (e.g. 5 for 5%)
    #[arg(long)]
    pub interest_rate: Option<Decimal>,

    /// Loan term in years
    #[arg(long)]
    pub loan_term_years: Option<u32>,

    /// compound (default) or simple
    #[arg(long)]
    pub interest_type: Option<String>,

    /// Gross annual rent at full occupancy
    #[arg(long)]
    pub annual_rent: Option<Decimal>,

    /// Gross monthly rent (alternative to --annual-rent)
    #[arg(long)]
    pub monthly_rent: Option<Decimal>,

    /// Expected occupancy, percent
    #[arg(long)]
    pub occupancy_rate: Option<Decimal>,

    /// Annual HOA / service charges
    #[arg(long)]
    pub hoa_fees_annual: Option<Decimal>,

    /// Other annual operating costs
    #[arg(long)]
    pub other_operating_costs_annual: Option<Decimal>,

    /// Annual rent growth, percent
    #[arg(long)]
    pub rent_growth_rate: Option<Decimal>,

    /// Holding period in years
    #[arg(long)]
    pub holding_period: Option<u32>,

    /// Expected resale value (defaults to a multiple of the price)
    #[arg(long)]
    pub resale_value: Option<Decimal>,

    /// Selling costs, percent of resale value
    #[arg(long)]
    pub selling_costs_percentage: Option<Decimal>,

    /// Renovation / furnishing costs at purchase
    #[arg(long)]
    pub enhancement_costs: Option<Decimal>,

    /// Transaction costs at purchase
    #[arg(long)]
    pub closing_costs: Option<Decimal>,

    /// Display currency code (SAR, USD, EUR, GBP, ...)
    #[arg(long)]
    pub currency: Option<String>,
}

impl RequestArgs {
    /// The flags that were given, as a request mapping of numeric strings.
    pub fn to_request(&self) -> RawRequest {
        let mut request = RawRequest::new();
        let mut put = |name: &str, value: Option<String>| {
            if let Some(v) = value {
                request.insert(name.to_string(), Value::String(v));
            }
        };
        let dec = |v: Option<Decimal>| v.map(|d| d.to_string());
        let int = |v: Option<u32>| v.map(|n| n.to_string());

        put("property_price", dec(self.property_price));
        put("down_payment_percentage", dec(self.down_payment_percentage));
        put("down_payment", dec(self.down_payment));
        put("interest_rate", dec(self.interest_rate));
        put("loan_term_years", int(self.loan_term_years));
        put("interest_type", self.interest_type.clone());
        put("annual_rent", dec(self.annual_rent));
        put("monthly_rent", dec(self.monthly_rent));
        put("occupancy_rate", dec(self.occupancy_rate));
        put("hoa_fees_annual", dec(self.hoa_fees_annual));
        put("other_operating_costs_annual", dec(self.other_operating_costs_annual));
        put("rent_growth_rate", dec(self.rent_growth_rate));
        put("holding_period", int(self.holding_period));
        put("resale_value", dec(self.resale_value));
        put("selling_costs_percentage", dec(self.selling_costs_percentage));
        put("enhancement_costs", dec(self.enhancement_costs));
        put("closing_costs", dec(self.closing_costs));
        put("currency", self.currency.clone());
        request
    }
}
