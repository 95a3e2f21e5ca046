//! Core data models for the interest engine

use crate::products::ProductKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

//
// ================= Rate Sheet =================
//

/// One interest band of a product, immutable once loaded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tier {
    pub tier_type: String,
    pub balance_tier: String,
    /// Fraction, e.g. 0.036 for "3.60%"
    pub interest_rate: f64,
    pub requirement_type: String,
    pub min_spend: f64,
    pub min_salary: f64,
    pub giro_count: u32,
    pub salary_credit: bool,
    /// Ceiling on the amount this tier's rate applies to
    pub cap_amount: f64,
    pub remarks: String,
}

//
// ================= Customer Profile =================
//

/// What the customer does each month. Absent fields mean "not done".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Requirements {
    pub has_salary: bool,
    pub salary_amount: f64,
    pub spend_amount: f64,
    pub giro_count: u32,
    pub has_insurance: bool,
    pub insurance_amount: f64,
    pub has_investments: bool,
    pub investment_amount: f64,
    pub has_home_loan: bool,
    pub home_loan_amount: f64,
    pub increased_balance: bool,
    pub grew_wealth: bool,
}

//
// ================= Calculation =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierApplication {
    pub amount_in_tier: f64,
    pub tier_rate: f64,
    /// Annual interest earned in this tier
    pub tier_interest: f64,
    pub monthly_interest: f64,
    pub description: String,
}

impl TierApplication {
    pub fn new(amount: f64, rate: f64, description: impl Into<String>) -> Self {
        let interest = amount * rate;
        Self {
            amount_in_tier: amount,
            tier_rate: rate,
            tier_interest: interest,
            monthly_interest: interest / 12.0,
            description: description.into().trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CalculationResult {
    /// Annual interest, always the sum of the breakdown
    pub total_interest: f64,
    pub breakdown: Vec<TierApplication>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl CalculationResult {
    pub fn from_breakdown(breakdown: Vec<TierApplication>, warnings: Vec<String>) -> Self {
        let total_interest = breakdown.iter().map(|t| t.tier_interest).sum();
        Self {
            total_interest,
            breakdown,
            warnings,
        }
    }

    pub fn monthly_interest(&self) -> f64 {
        self.total_interest / 12.0
    }
}

/// Outcome of one product in a multi-product calculation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCalculation {
    pub product: ProductKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CalculationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

//
// ================= Optimization =================
//

/// Deposit placed with each product, in whole dollars
pub type Distribution = BTreeMap<ProductKind, u64>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Solution {
    pub distribution: Distribution,
    pub total_interest: f64,
    pub breakdown: BTreeMap<ProductKind, Vec<TierApplication>>,
    pub salary_product: Option<ProductKind>,
}

impl Solution {
    pub fn allocated(&self) -> u64 {
        self.distribution.values().sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    /// Best first, always `top_k` long
    pub solutions: Vec<Solution>,
    /// Leaves visited by the search
    pub evaluated: u64,
    /// Leaves within tolerance of the target amount
    pub accepted: u64,
    /// Products whose calculation failed at least once, with the first error
    pub faults: BTreeMap<ProductKind, String>,
}

impl OptimizationOutcome {
    pub fn best(&self) -> Option<&Solution> {
        self.solutions.first()
    }
}

//
// ================= Spend Allocation =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpendAllocation {
    pub allocation: BTreeMap<ProductKind, f64>,
    pub total_interest: f64,
    pub breakdown: BTreeMap<ProductKind, CalculationResult>,
}
