//! Derived eligibility figures
//!
//! Pure helpers over [`Requirements`]. The transaction-volume product keys its
//! tiers off these, and the optimizers use [`requirements_for`] to build the
//! per-product view of a customer for one salary scenario.

use crate::models::Requirements;
use crate::products::ProductKind;
use serde::{Deserialize, Serialize};

pub const HIGH_VOLUME_THRESHOLD: f64 = 30_000.0;
pub const MID_VOLUME_THRESHOLD: f64 = 15_000.0;

/// Monthly transactions that count towards the volume tiers
pub fn eligible_transaction_volume(reqs: &Requirements) -> f64 {
    let mut total = reqs.spend_amount;

    if reqs.has_salary {
        total += reqs.salary_amount;
    }
    if reqs.has_insurance {
        total += reqs.insurance_amount;
    }
    if reqs.has_investments {
        total += reqs.investment_amount;
    }
    if reqs.has_home_loan {
        total += reqs.home_loan_amount;
    }

    total
}

/// Number of non-salary categories with actual activity
pub fn active_category_count(reqs: &Requirements) -> u32 {
    [
        reqs.spend_amount > 0.0,
        reqs.has_insurance && reqs.insurance_amount > 0.0,
        reqs.has_investments && reqs.investment_amount > 0.0,
        reqs.has_home_loan && reqs.home_loan_amount > 0.0,
    ]
    .into_iter()
    .filter(|active| *active)
    .count() as u32
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VolumeBand {
    Low,
    Mid,
    High,
}

impl VolumeBand {
    pub fn from_volume(volume: f64) -> Self {
        if volume >= HIGH_VOLUME_THRESHOLD {
            VolumeBand::High
        } else if volume >= MID_VOLUME_THRESHOLD {
            VolumeBand::Mid
        } else {
            VolumeBand::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeBand::Low => "low",
            VolumeBand::Mid => "mid",
            VolumeBand::High => "high",
        }
    }
}

/// Rate sheet `tier_type` for a category count and volume, e.g. `cat2_mid`
pub fn transaction_tier_key(category_count: u32, volume: f64) -> String {
    format!(
        "cat{}_{}",
        category_count,
        VolumeBand::from_volume(volume).as_str()
    )
}

/// The customer as seen by `product` when `salary_product` holds the salary credit
pub fn requirements_for(
    product: ProductKind,
    base: &Requirements,
    salary_product: Option<ProductKind>,
) -> Requirements {
    let mut reqs = base.clone();
    if product.salary_is_exclusive() {
        reqs.has_salary = base.has_salary && salary_product == Some(product);
    }
    reqs
}
