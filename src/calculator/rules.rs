//! Interest rules, one per product

use super::{format_money, format_money_cents, Ledger, RuleInput};
use crate::eligibility::{active_category_count, eligible_transaction_volume, transaction_tier_key};
use crate::error::OptimizerError;
use crate::models::Tier;
use crate::Result;
use tracing::warn;

/// Bonus interest on the multi-category product stops here
const MULTI_CATEGORY_BONUS_CAP: f64 = 100_000.0;

const LADDER_MIN_SPEND: f64 = 500.0;
const LADDER_MIN_BILL_PAYMENTS: u32 = 3;

const DUAL_BAND_FIRST: f64 = 75_000.0;
const DUAL_BAND_SECOND: f64 = 25_000.0;

const BAND_GATE_MIN_DEPOSIT: f64 = 1_500.0;
const BAND_MIN_SALARY: f64 = 2_000.0;
const BAND_MIN_SPEND: f64 = 500.0;
const BAND_HIGH_SPEND: f64 = 1_500.0;
const BAND_MIN_BILL_PAYMENTS: u32 = 3;

const FIXED_FIRST_BAND: f64 = 20_000.0;
const FIXED_SECOND_BAND: f64 = 30_000.0;

const VOLUME_BASE_RATE: f64 = 0.0005;
const VOLUME_MIN_TRANSACTIONS: f64 = 500.0;

/// Base on the whole deposit; salary, spend, investment and insurance
/// bonuses each stack on the first $100,000.
pub(super) fn capped_multi_category(input: &RuleInput<'_>, ledger: &mut Ledger) -> Result<()> {
    let RuleInput {
        product,
        deposit,
        table,
        reqs,
    } = *input;

    let salary_tier = table.require(product, "salary")?;
    let spend_tier = table.require(product, "spend")?;
    let base_tier = table.require(product, "base")?;

    ledger.apply(deposit, base_tier.interest_rate, "Base Interest");

    let eligible = deposit.min(MULTI_CATEGORY_BONUS_CAP);

    if reqs.has_salary && reqs.salary_amount >= salary_tier.min_salary {
        ledger.apply(
            eligible,
            salary_tier.interest_rate,
            format!("Salary Credit Bonus (>= {})", format_money(salary_tier.min_salary)),
        );
    }

    if reqs.spend_amount >= spend_tier.min_spend {
        ledger.apply(
            eligible,
            spend_tier.interest_rate,
            format!("Card Spend Bonus (>= {})", format_money(spend_tier.min_spend)),
        );
    }

    if reqs.has_investments {
        let tier = table.require(product, "invest")?;
        ledger.apply(eligible, tier.interest_rate, "Investment Bonus");
    }

    if reqs.has_insurance {
        let tier = table.require(product, "insure")?;
        ledger.apply(eligible, tier.interest_rate, "Insurance Bonus");
    }

    Ok(())
}

/// Below the minimum spend only the capped base tier applies. Otherwise one
/// ladder is chosen (salary beats bill payments beats spend alone) and its
/// tiers are filled in order.
pub(super) fn priority_ladder(input: &RuleInput<'_>, ledger: &mut Ledger) -> Result<()> {
    let RuleInput {
        product,
        deposit,
        table,
        reqs,
    } = *input;

    if reqs.spend_amount < LADDER_MIN_SPEND {
        let base_tier = table.require(product, "base")?;
        ledger.apply(
            deposit.min(base_tier.cap_amount),
            base_tier.interest_rate,
            format!("Base Interest ({})", base_tier.balance_tier),
        );
        return Ok(());
    }

    let (requirement, label) = if reqs.has_salary {
        ("salary", "Salary + Spend")
    } else if reqs.giro_count >= LADDER_MIN_BILL_PAYMENTS {
        ("giro", "GIRO + Spend")
    } else {
        ("spend_only", "Spend Only")
    };

    let ladder: Vec<&Tier> = table
        .tiers(product)
        .iter()
        .filter(|t| t.requirement_type == requirement)
        .collect();

    if ladder.is_empty() {
        return Err(OptimizerError::missing_tier(product, requirement));
    }

    let mut remaining = deposit;
    for tier in ladder {
        let amount = remaining.min(tier.cap_amount);
        if amount <= 0.0 {
            break;
        }
        ledger.apply(
            amount,
            tier.interest_rate,
            format!("{} ({})", label, tier.balance_tier),
        );
        remaining -= amount;
    }

    Ok(())
}

/// Base on the whole deposit plus, for each qualifying category, its own
/// rate on the first $75,000 and another on the next $25,000.
pub(super) fn dual_band(input: &RuleInput<'_>, ledger: &mut Ledger) -> Result<()> {
    let RuleInput {
        product,
        deposit,
        table,
        reqs,
    } = *input;

    let base_tier = table.require(product, "base")?;
    ledger.apply(deposit, base_tier.interest_rate, "Base Interest");

    let first_band = deposit.min(DUAL_BAND_FIRST);
    let second_band = (deposit - DUAL_BAND_FIRST).max(0.0).min(DUAL_BAND_SECOND);

    let salary_tier = table.require(product, "salary")?;
    let spend_tier = table.require(product, "spend")?;

    let categories = [
        (
            "salary",
            reqs.has_salary && reqs.salary_amount >= salary_tier.min_salary,
        ),
        ("save", reqs.increased_balance),
        ("spend", reqs.spend_amount >= spend_tier.min_spend),
        ("insure", reqs.has_insurance),
        ("invest", reqs.has_investments),
        ("grow", reqs.grew_wealth),
    ];

    for (category, qualifies) in categories {
        if !qualifies {
            continue;
        }

        // a qualifying category must exist; either band may be absent
        table.require(product, category)?;

        let bands = [(DUAL_BAND_FIRST, first_band), (DUAL_BAND_SECOND, second_band)];
        for (cap, amount) in bands {
            let tier = table.find(product, |t| t.tier_type == category && t.cap_amount == cap);
            if let Some(tier) = tier {
                if amount > 0.0 {
                    ledger.apply(amount, tier.interest_rate, band_description(tier, category));
                }
            }
        }
    }

    Ok(())
}

fn band_description(tier: &Tier, category: &str) -> String {
    if tier.remarks.is_empty() {
        format!("{} Bonus ({})", category, tier.balance_tier)
    } else {
        tier.remarks.clone()
    }
}

/// Stacked base bands, then flat bonuses that only unlock from $1,500.
pub(super) fn ascending_band(input: &RuleInput<'_>, ledger: &mut Ledger) -> Result<()> {
    let RuleInput {
        product,
        deposit,
        table,
        reqs,
    } = *input;

    let mut bands: Vec<&Tier> = table
        .tiers(product)
        .iter()
        .filter(|t| t.tier_type == "base")
        .collect();

    if bands.is_empty() {
        return Err(OptimizerError::missing_tier(product, "base"));
    }
    bands.sort_by(|a, b| a.cap_amount.total_cmp(&b.cap_amount));

    let mut previous_cap = 0.0;
    for tier in bands {
        let band_size = tier.cap_amount - previous_cap;
        let amount = (deposit - previous_cap).max(0.0).min(band_size);
        if amount <= 0.0 {
            break;
        }
        ledger.apply(
            amount,
            tier.interest_rate,
            format!("Base Interest ({})", tier.balance_tier),
        );
        previous_cap = tier.cap_amount;
    }

    if deposit < BAND_GATE_MIN_DEPOSIT {
        return Ok(());
    }

    if reqs.has_salary && reqs.salary_amount >= BAND_MIN_SALARY {
        let tier = table.require(product, "salary")?;
        ledger.apply(
            deposit.min(tier.cap_amount),
            tier.interest_rate,
            format!("Salary Credit Bonus (>= {})", format_money(BAND_MIN_SALARY)),
        );
    }

    if reqs.has_insurance {
        let tier = table.require(product, "wealth")?;
        ledger.apply(
            deposit.min(tier.cap_amount),
            tier.interest_rate,
            "Wealth Bonus (Insurance)",
        );
    }

    if reqs.spend_amount >= BAND_MIN_SPEND {
        let sub_tier = if reqs.spend_amount >= BAND_HIGH_SPEND { "2" } else { "1" };
        let tier = table.require_where(product, &format!("spend {}", sub_tier), |t| {
            t.tier_type == "spend" && t.balance_tier == sub_tier
        })?;
        ledger.apply(
            deposit.min(tier.cap_amount),
            tier.interest_rate,
            format!("Spend Bonus ({})", format_money(reqs.spend_amount)),
        );
    }

    if reqs.giro_count >= BAND_MIN_BILL_PAYMENTS {
        let tier = table.require(product, "payment")?;
        ledger.apply(
            deposit.min(tier.cap_amount),
            tier.interest_rate,
            format!("Payment Bonus ({} bill payments)", reqs.giro_count),
        );
    }

    Ok(())
}

/// First $20,000 at one rate, next $30,000 at another, nothing beyond $50,000.
pub(super) fn two_fixed_bands(input: &RuleInput<'_>, ledger: &mut Ledger) -> Result<()> {
    let RuleInput {
        product,
        deposit,
        table,
        ..
    } = *input;

    let first_tier = table.require_where(product, "base (first $20,000)", |t| {
        t.tier_type == "base" && t.cap_amount == FIXED_FIRST_BAND
    })?;
    ledger.apply(
        deposit.min(FIXED_FIRST_BAND),
        first_tier.interest_rate,
        format!("First {}", format_money(FIXED_FIRST_BAND)),
    );

    if deposit > FIXED_FIRST_BAND {
        let second_tier = table.require_where(product, "base (next $30,000)", |t| {
            t.tier_type == "base" && t.cap_amount == FIXED_SECOND_BAND
        })?;
        ledger.apply(
            (deposit - FIXED_FIRST_BAND).min(FIXED_SECOND_BAND),
            second_tier.interest_rate,
            format!("Next {}", format_money(FIXED_SECOND_BAND)),
        );
    }

    Ok(())
}

/// Salary credit is a prerequisite; the bonus tier is then picked by the
/// number of active categories and the total transaction volume.
pub(super) fn transaction_volume(input: &RuleInput<'_>, ledger: &mut Ledger) -> Result<()> {
    let RuleInput {
        product,
        deposit,
        table,
        reqs,
    } = *input;

    if !reqs.has_salary {
        ledger.apply(deposit, VOLUME_BASE_RATE, "Base Interest (No Salary Credit)");
        return Ok(());
    }

    let volume = eligible_transaction_volume(reqs);
    let categories = active_category_count(reqs);

    if volume < VOLUME_MIN_TRANSACTIONS || categories == 0 {
        ledger.apply(
            deposit,
            VOLUME_BASE_RATE,
            "Base Interest (Min Transaction Not Met)",
        );
        return Ok(());
    }

    let key = transaction_tier_key(categories, volume);

    match table.find(product, |t| t.tier_type == key) {
        Some(tier) => {
            let eligible = deposit.min(tier.cap_amount);
            if eligible > 0.0 {
                ledger.apply(
                    eligible,
                    tier.interest_rate,
                    format!(
                        "Bonus Interest (Income + {} categories, {} transactions)",
                        categories,
                        format_money_cents(volume)
                    ),
                );
            }
            if deposit > tier.cap_amount {
                ledger.apply(
                    deposit - tier.cap_amount,
                    VOLUME_BASE_RATE,
                    "Base Interest (Amount Above Cap)",
                );
            }
        }
        None => {
            warn!(product = %product, tier = %key, "No matching interest rate tier, using base rate");
            ledger.warn(format!("No matching interest rate tier found for {}", key));
            ledger.apply(deposit, VOLUME_BASE_RATE, "Base Interest (No Matching Tier)");
        }
    }

    Ok(())
}
