use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::input::MAX_YEARS;
use crate::scenario::ScenarioConfig;
use crate::time_value::IrrSettings;
use crate::EvalResult;

/// Holding period used when a request omits one.
pub const DEFAULT_HOLDING_PERIOD_YEARS: u32 = 10;
/// Resale value multiplier applied to the price when a request omits one.
pub const DEFAULT_RESALE_MULTIPLIER: Decimal = dec!(1.2);

/// Engine-wide settings, loaded once and validated before any request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scenarios: ScenarioConfig,
    pub irr: IrrSettings,
    pub default_holding_period_years: u32,
    pub default_resale_multiplier: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scenarios: ScenarioConfig::default(),
            irr: IrrSettings::default(),
            default_holding_period_years: DEFAULT_HOLDING_PERIOD_YEARS,
            default_resale_multiplier: DEFAULT_RESALE_MULTIPLIER,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EvalResult<()> {
        self.scenarios.validate()?;
        self.irr.validate()?;
        if self.default_holding_period_years == 0 || self.default_holding_period_years > MAX_YEARS {
            return Err(EvalError::configuration(
                "default_holding_period_years",
                format!("must be within [1, {MAX_YEARS}]"),
            ));
        }
        if self.default_resale_multiplier < Decimal::ZERO {
            return Err(EvalError::configuration(
                "default_resale_multiplier",
                "must not be negative",
            ));
        }
        Ok(())
    }

    /// Parse from JSON and validate.
    pub fn from_json(json: &str) -> EvalResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_holding_period_years, 10);
        assert_eq!(config.scenarios.conservative_rent_multiplier, dec!(0.85));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = EngineConfig::from_json(
            r#"{"scenarios": {"conservative_occupancy_delta": 5}, "default_holding_period_years": 15}"#,
        )
        .unwrap();
        assert_eq!(config.scenarios.conservative_occupancy_delta, dec!(5));
        assert_eq!(config.scenarios.optimistic_rent_multiplier, dec!(1.15));
        assert_eq!(config.default_holding_period_years, 15);
        assert_eq!(config.irr, IrrSettings::default());
    }

    #[test]
    fn test_invalid_delta_is_configuration_error() {
        let err = EngineConfig::from_json(r#"{"scenarios": {"optimistic_occupancy_delta": 150}}"#)
            .unwrap_err();
        assert!(matches!(err, EvalError::Configuration { .. }));
        assert!(err.to_string().contains("optimistic_occupancy_delta"));
    }

    #[test]
    fn test_zero_holding_default_rejected() {
        let config = EngineConfig {
            default_holding_period_years: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = EngineConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, EvalError::Serialization(_)));
    }
}
