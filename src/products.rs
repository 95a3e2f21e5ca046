//! Product identity
//!
//! Every savings product the engine understands is one variant here, and
//! each variant maps to exactly one interest rule. Adding a product means
//! adding a variant and letting the compiler point at every dispatch site.

use crate::error::OptimizerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProductKind {
    #[serde(rename = "UOB One")]
    UobOne,
    #[serde(rename = "SC BonusSaver")]
    ScBonusSaver,
    #[serde(rename = "OCBC 360")]
    Ocbc360,
    #[serde(rename = "BOC SmartSaver")]
    BocSmartSaver,
    #[serde(rename = "Chocolate")]
    Chocolate,
    #[serde(rename = "DBS Multiplier")]
    DbsMultiplier,
}

impl ProductKind {
    pub const ALL: [ProductKind; 6] = [
        ProductKind::UobOne,
        ProductKind::ScBonusSaver,
        ProductKind::Ocbc360,
        ProductKind::BocSmartSaver,
        ProductKind::Chocolate,
        ProductKind::DbsMultiplier,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProductKind::UobOne => "UOB One",
            ProductKind::ScBonusSaver => "SC BonusSaver",
            ProductKind::Ocbc360 => "OCBC 360",
            ProductKind::BocSmartSaver => "BOC SmartSaver",
            ProductKind::Chocolate => "Chocolate",
            ProductKind::DbsMultiplier => "DBS Multiplier",
        }
    }

    /// Case-insensitive lookup by display name
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
    }

    /// Ceiling on the deposit the distribution optimizer will place here
    pub fn default_bonus_cap(&self) -> u64 {
        match self {
            ProductKind::UobOne => 150_000,
            ProductKind::ScBonusSaver
            | ProductKind::Ocbc360
            | ProductKind::BocSmartSaver
            | ProductKind::DbsMultiplier => 100_000,
            ProductKind::Chocolate => 50_000,
        }
    }

    /// Smallest card spend that unlocks this product's spend bonus
    pub fn min_qualifying_spend(&self) -> Option<f64> {
        match self {
            ProductKind::UobOne | ProductKind::Ocbc360 | ProductKind::BocSmartSaver => {
                Some(500.0)
            }
            ProductKind::ScBonusSaver => Some(1_000.0),
            ProductKind::Chocolate | ProductKind::DbsMultiplier => None,
        }
    }

    /// Higher spend sub-tier worth trying on top of the minimum
    pub fn elevated_spend(&self) -> Option<f64> {
        match self {
            ProductKind::BocSmartSaver => Some(1_500.0),
            _ => None,
        }
    }

    /// Whether salary credit counts only for the scenario's salary assignee.
    ///
    /// UOB One keys its ladder off the customer's salary flag directly, so
    /// it never competes for the salary credit.
    pub fn salary_is_exclusive(&self) -> bool {
        !matches!(self, ProductKind::UobOne)
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProductKind {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| OptimizerError::UnknownProduct(s.to_string()))
    }
}
