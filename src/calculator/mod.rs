//! Product interest calculator
//!
//! `calculate` is pure and deterministic: one deposit, one product, one
//! customer profile in; annual interest with an itemised breakdown out.
//! Each [`ProductKind`] maps to exactly one rule in [`rules`].

mod rules;

use crate::error::OptimizerError;
use crate::models::{CalculationResult, ProductCalculation, Requirements, TierApplication};
use crate::products::ProductKind;
use crate::tiers::TierTable;
use crate::Result;
use tracing::warn;

/// Accumulates tier applications for a single calculation
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    entries: Vec<TierApplication>,
    warnings: Vec<String>,
}

impl Ledger {
    pub(crate) fn apply(&mut self, amount: f64, rate: f64, description: impl Into<String>) {
        self.entries.push(TierApplication::new(amount, rate, description));
    }

    pub(crate) fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    fn finish(self) -> CalculationResult {
        CalculationResult::from_breakdown(self.entries, self.warnings)
    }
}

/// Inputs shared by every rule
#[derive(Clone, Copy)]
pub(crate) struct RuleInput<'a> {
    pub product: ProductKind,
    pub deposit: f64,
    pub table: &'a TierTable,
    pub reqs: &'a Requirements,
}

/// Annual interest for `deposit` held in `product`
pub fn calculate(
    product: ProductKind,
    deposit: f64,
    table: &TierTable,
    reqs: &Requirements,
) -> Result<CalculationResult> {
    if !deposit.is_finite() || deposit < 0.0 {
        return Err(OptimizerError::InvalidInput(format!(
            "deposit must be a non-negative amount, got {}",
            deposit
        )));
    }

    let input = RuleInput {
        product,
        deposit,
        table,
        reqs,
    };
    let mut ledger = Ledger::default();

    match product {
        ProductKind::ScBonusSaver => rules::capped_multi_category(&input, &mut ledger)?,
        ProductKind::UobOne => rules::priority_ladder(&input, &mut ledger)?,
        ProductKind::Ocbc360 => rules::dual_band(&input, &mut ledger)?,
        ProductKind::BocSmartSaver => rules::ascending_band(&input, &mut ledger)?,
        ProductKind::Chocolate => rules::two_fixed_bands(&input, &mut ledger)?,
        ProductKind::DbsMultiplier => rules::transaction_volume(&input, &mut ledger)?,
    }

    Ok(ledger.finish())
}

/// Calculate every product in the table independently.
///
/// A misconfigured product yields an error entry; the rest still compute.
pub fn calculate_all(
    deposit: f64,
    table: &TierTable,
    reqs: &Requirements,
) -> Vec<ProductCalculation> {
    table
        .products()
        .map(|product| match calculate(product, deposit, table, reqs) {
            Ok(result) => ProductCalculation {
                product,
                result: Some(result),
                error: None,
            },
            Err(e) => {
                warn!(product = %product, error = %e, "Product calculation failed");
                ProductCalculation {
                    product,
                    result: None,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect()
}

/// `$12,345` style formatting
pub fn format_money(amount: f64) -> String {
    format!("${}", group_thousands(&format!("{:.0}", amount)))
}

/// `$12,345.67` style formatting
pub fn format_money_cents(amount: f64) -> String {
    format!("${}", group_thousands(&format!("{:.2}", amount)))
}

fn group_thousands(number: &str) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}
