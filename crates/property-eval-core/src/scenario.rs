use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::input::PropertyInputs;
use crate::types::{Money, Percent};
use crate::EvalResult;

/// Rent multiplier applied in the conservative case.
pub const DEFAULT_CONSERVATIVE_RENT_MULTIPLIER: Decimal = dec!(0.85);
/// Rent multiplier applied in the optimistic case.
pub const DEFAULT_OPTIMISTIC_RENT_MULTIPLIER: Decimal = dec!(1.15);
/// Occupancy points removed from base occupancy in the conservative case.
pub const DEFAULT_CONSERVATIVE_OCCUPANCY_DELTA: Percent = dec!(0);
/// Occupancy points added to base occupancy in the optimistic case.
pub const DEFAULT_OPTIMISTIC_OCCUPANCY_DELTA: Percent = dec!(0);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Conservative,
    Base,
    Optimistic,
}

impl ScenarioKind {
    /// Display order.
    pub const ALL: [ScenarioKind; 3] = [
        ScenarioKind::Conservative,
        ScenarioKind::Base,
        ScenarioKind::Optimistic,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ScenarioKind::Conservative => "conservative",
            ScenarioKind::Base => "base",
            ScenarioKind::Optimistic => "optimistic",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScenarioKind::Conservative => "Conservative",
            ScenarioKind::Base => "Base",
            ScenarioKind::Optimistic => "Optimistic",
        }
    }
}

/// One value per scenario. Serializes as `{conservative, base, optimistic}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet<T> {
    pub conservative: T,
    pub base: T,
    pub optimistic: T,
}

impl<T> ScenarioSet<T> {
    pub fn from_fn(mut f: impl FnMut(ScenarioKind) -> T) -> Self {
        Self {
            conservative: f(ScenarioKind::Conservative),
            base: f(ScenarioKind::Base),
            optimistic: f(ScenarioKind::Optimistic),
        }
    }

    pub fn try_from_fn<E>(mut f: impl FnMut(ScenarioKind) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self {
            conservative: f(ScenarioKind::Conservative)?,
            base: f(ScenarioKind::Base)?,
            optimistic: f(ScenarioKind::Optimistic)?,
        })
    }

    pub fn get(&self, kind: ScenarioKind) -> &T {
        match kind {
            ScenarioKind::Conservative => &self.conservative,
            ScenarioKind::Base => &self.base,
            ScenarioKind::Optimistic => &self.optimistic,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(ScenarioKind, &T) -> U) -> ScenarioSet<U> {
        ScenarioSet::from_fn(|kind| f(kind, self.get(kind)))
    }

    /// Entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = (ScenarioKind, &T)> + '_ {
        ScenarioKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}

/// Variance factors used to derive the three scenarios from base assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub conservative_occupancy_delta: Percent,
    pub optimistic_occupancy_delta: Percent,
    pub conservative_rent_multiplier: Decimal,
    pub optimistic_rent_multiplier: Decimal,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            conservative_occupancy_delta: DEFAULT_CONSERVATIVE_OCCUPANCY_DELTA,
            optimistic_occupancy_delta: DEFAULT_OPTIMISTIC_OCCUPANCY_DELTA,
            conservative_rent_multiplier: DEFAULT_CONSERVATIVE_RENT_MULTIPLIER,
            optimistic_rent_multiplier: DEFAULT_OPTIMISTIC_RENT_MULTIPLIER,
        }
    }
}

impl ScenarioConfig {
    /// Rejects any configuration that could break the conservative <= base
    /// <= optimistic ordering or push occupancy outside [0, 100].
    pub fn validate(&self) -> EvalResult<()> {
        for (option, delta) in [
            ("conservative_occupancy_delta", self.conservative_occupancy_delta),
            ("optimistic_occupancy_delta", self.optimistic_occupancy_delta),
        ] {
            if delta < Decimal::ZERO || delta > dec!(100) {
                return Err(EvalError::configuration(option, "must be within [0, 100]"));
            }
        }
        if self.conservative_rent_multiplier <= Decimal::ZERO
            || self.conservative_rent_multiplier > Decimal::ONE
        {
            return Err(EvalError::configuration(
                "conservative_rent_multiplier",
                "must be within (0, 1]",
            ));
        }
        if self.optimistic_rent_multiplier < Decimal::ONE {
            return Err(EvalError::configuration(
                "optimistic_rent_multiplier",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    fn rent_multiplier(&self, kind: ScenarioKind) -> Decimal {
        match kind {
            ScenarioKind::Conservative => self.conservative_rent_multiplier,
            ScenarioKind::Base => Decimal::ONE,
            ScenarioKind::Optimistic => self.optimistic_rent_multiplier,
        }
    }

    fn occupancy(&self, kind: ScenarioKind, base: Percent) -> Percent {
        let adjusted = match kind {
            ScenarioKind::Conservative => base - self.conservative_occupancy_delta,
            ScenarioKind::Base => base,
            ScenarioKind::Optimistic => base + self.optimistic_occupancy_delta,
        };
        adjusted.clamp(Decimal::ZERO, dec!(100))
    }
}

/// Assumptions for one scenario, in year-1 terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAssumptions {
    pub kind: ScenarioKind,
    pub rent_multiplier: Decimal,
    /// Adjusted occupancy, 0-100
    pub occupancy_rate: Percent,
    /// Gross monthly rent after the multiplier, before occupancy
    pub monthly_rent: Money,
    /// monthly_rent * occupancy_rate / 100
    pub effective_monthly_rent: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derive the conservative, base and optimistic assumptions from the base
/// rent and occupancy. `config` is expected to be validated.
pub fn generate_scenarios(
    property: &PropertyInputs,
    config: &ScenarioConfig,
) -> ScenarioSet<ScenarioAssumptions> {
    let base_monthly_rent = property.annual_rent / dec!(12);

    ScenarioSet::from_fn(|kind| {
        let rent_multiplier = config.rent_multiplier(kind);
        let occupancy_rate = config.occupancy(kind, property.occupancy_rate);
        let monthly_rent = base_monthly_rent * rent_multiplier;
        ScenarioAssumptions {
            kind,
            rent_multiplier,
            occupancy_rate,
            monthly_rent,
            effective_monthly_rent: monthly_rent * occupancy_rate / dec!(100),
        }
    })
}
