//! Card spend allocator
//!
//! Given where the deposits already sit, decide which products the monthly
//! card spend should go to. Each product with a deposit either gets nothing,
//! its minimum qualifying spend, or (where it has one) its elevated spend
//! sub-tier. The single best allocation by total interest wins.

use crate::calculator::calculate;
use crate::eligibility::requirements_for;
use crate::error::OptimizerError;
use crate::models::{Distribution, Requirements, SpendAllocation};
use crate::optimizer::{Ranked, TopK};
use crate::products::ProductKind;
use crate::tiers::TierTable;
use crate::Result;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

impl Ranked for SpendAllocation {
    fn score(&self) -> f64 {
        self.total_interest
    }
}

struct SpendSearch<'a> {
    table: &'a TierTable,
    base: &'a Requirements,
    deposits: &'a Distribution,
    eligible: Vec<(ProductKind, f64)>,
    salary_product: Option<ProductKind>,
    smallest_minimum: f64,
}

struct SpendState {
    best: TopK<SpendAllocation>,
    evaluated: u64,
    faulted: BTreeSet<ProductKind>,
}

impl SpendSearch<'_> {
    fn descend(
        &self,
        state: &mut SpendState,
        remaining: f64,
        position: usize,
        allocation: &mut BTreeMap<ProductKind, f64>,
    ) {
        if position >= self.eligible.len() || remaining < self.smallest_minimum {
            self.evaluate(state, allocation);
            return;
        }

        let (product, minimum) = self.eligible[position];

        self.descend(state, remaining, position + 1, allocation);

        let mut levels = vec![minimum];
        if let Some(elevated) = product.elevated_spend() {
            levels.push(elevated);
        }

        for level in levels {
            if remaining < level {
                continue;
            }
            allocation.insert(product, level);
            self.descend(state, remaining - level, position + 1, allocation);
            allocation.remove(&product);
        }
    }

    fn evaluate(&self, state: &mut SpendState, allocation: &BTreeMap<ProductKind, f64>) {
        state.evaluated += 1;

        let mut total_interest = 0.0;
        let mut breakdown = BTreeMap::new();

        for &(product, _) in &self.eligible {
            let mut reqs = requirements_for(product, self.base, self.salary_product);
            reqs.spend_amount = allocation.get(&product).copied().unwrap_or(0.0);

            let deposit = self.deposits.get(&product).copied().unwrap_or(0) as f64;
            match calculate(product, deposit, self.table, &reqs) {
                Ok(result) => {
                    total_interest += result.total_interest;
                    breakdown.insert(product, result);
                }
                Err(e) => {
                    if state.faulted.insert(product) {
                        warn!(product = %product, error = %e, "Product excluded from spend allocation");
                    }
                }
            }
        }

        if !state.best.admits(total_interest) {
            return;
        }

        state.best.offer(SpendAllocation {
            allocation: allocation.clone(),
            total_interest,
            breakdown,
        });
    }
}

/// Best split of `total_spend` across the products holding a deposit.
///
/// Products are priced with their allocated spend and everything else from
/// `base`. With `salary_product` set, only that product (and products that
/// do not compete for salary credit) see the salary.
pub fn allocate_spend(
    total_spend: f64,
    deposits: &Distribution,
    table: &TierTable,
    base: &Requirements,
    salary_product: Option<ProductKind>,
) -> Result<SpendAllocation> {
    if !total_spend.is_finite() || total_spend < 0.0 {
        return Err(OptimizerError::InvalidInput(format!(
            "total spend must be a non-negative amount, got {}",
            total_spend
        )));
    }

    let eligible: Vec<(ProductKind, f64)> = deposits
        .iter()
        .filter(|(_, amount)| **amount > 0)
        .filter_map(|(product, _)| product.min_qualifying_spend().map(|min| (*product, min)))
        .collect();

    let smallest_minimum = ProductKind::ALL
        .into_iter()
        .filter_map(|p| p.min_qualifying_spend())
        .fold(f64::INFINITY, f64::min);

    let search = SpendSearch {
        table,
        base,
        deposits,
        eligible,
        salary_product,
        smallest_minimum,
    };
    let mut state = SpendState {
        best: TopK::new(1),
        evaluated: 0,
        faulted: BTreeSet::new(),
    };

    search.descend(&mut state, total_spend, 0, &mut BTreeMap::new());

    debug!(
        total_spend = total_spend,
        products = search.eligible.len(),
        evaluated = state.evaluated,
        "Spend allocation finished"
    );

    Ok(state.best.into_vec().into_iter().next().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn deposits(entries: &[(ProductKind, u64)]) -> Distribution {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_spend_goes_to_larger_bonus() {
        let table = TierTable::builtin().unwrap();
        let held = deposits(&[(ProductKind::UobOne, 50_000), (ProductKind::ScBonusSaver, 50_000)]);

        let best = allocate_spend(1_000.0, &held, &table, &Requirements::default(), None).unwrap();

        assert_eq!(best.allocation.len(), 1);
        assert_eq!(best.allocation.get(&ProductKind::ScBonusSaver), Some(&1_000.0));
        // UOB base 25, SC base 25 + spend bonus 500
        assert!(close(best.total_interest, 550.0));
        assert_eq!(best.breakdown.len(), 2);
    }

    #[test]
    fn test_elevated_tier_tried() {
        let table = TierTable::builtin().unwrap();
        let held = deposits(&[(ProductKind::BocSmartSaver, 50_000)]);

        let best = allocate_spend(1_500.0, &held, &table, &Requirements::default(), None).unwrap();

        assert_eq!(best.allocation.get(&ProductKind::BocSmartSaver), Some(&1_500.0));
        // 7.50 + 22.50 base, 0.80% spend bonus on 50,000
        assert!(close(best.total_interest, 430.0));
    }

    #[test]
    fn test_products_without_deposit_ignored() {
        let table = TierTable::builtin().unwrap();
        let held = deposits(&[
            (ProductKind::ScBonusSaver, 0),
            (ProductKind::Ocbc360, 20_000),
            (ProductKind::Chocolate, 20_000),
        ]);

        let best = allocate_spend(5_000.0, &held, &table, &Requirements::default(), None).unwrap();

        assert!(!best.allocation.contains_key(&ProductKind::ScBonusSaver));
        assert!(!best.allocation.contains_key(&ProductKind::Chocolate));
        assert_eq!(best.allocation.get(&ProductKind::Ocbc360), Some(&500.0));
    }

    #[test]
    fn test_budget_below_every_minimum_allocates_nothing() {
        let table = TierTable::builtin().unwrap();
        let held = deposits(&[(ProductKind::UobOne, 50_000)]);

        let best = allocate_spend(100.0, &held, &table, &Requirements::default(), None).unwrap();

        assert!(best.allocation.is_empty());
        assert!(close(best.total_interest, 25.0));
    }

    #[test]
    fn test_salary_assignee_respected() {
        let table = TierTable::builtin().unwrap();
        let held = deposits(&[(ProductKind::ScBonusSaver, 50_000)]);
        let base = Requirements {
            has_salary: true,
            salary_amount: 5_000.0,
            ..Default::default()
        };

        let elsewhere =
            allocate_spend(0.0, &held, &table, &base, Some(ProductKind::Ocbc360)).unwrap();
        let here =
            allocate_spend(0.0, &held, &table, &base, Some(ProductKind::ScBonusSaver)).unwrap();

        assert!(close(elsewhere.total_interest, 25.0));
        assert!(close(here.total_interest, 525.0));
    }

    #[test]
    fn test_negative_budget_rejected() {
        let table = TierTable::builtin().unwrap();
        let result = allocate_spend(-1.0, &Distribution::new(), &table, &Requirements::default(), None);
        assert!(matches!(result, Err(OptimizerError::InvalidInput(_))));
    }
}
