//! Distribution optimizer
//!
//! Exhaustive search over how a lump sum can be split across products in
//! fixed increments, once per possible salary assignee and once with no
//! salary credit at all. Every complete split is priced with the calculator
//! and the best `top_k` are kept.
//!
//! The search space is `(amount / increment + 1) ^ products` per salary
//! scenario. That is the scaling ceiling of this module: large amounts or
//! many products need a coarser increment or an external deadline.

mod top_k;

pub use top_k::{Ranked, TopK};

use crate::calculator::{calculate, format_money, format_money_cents};
use crate::eligibility::requirements_for;
use crate::error::OptimizerError;
use crate::models::{Distribution, OptimizationOutcome, Requirements, Solution};
use crate::products::ProductKind;
use crate::progress::ProgressSink;
use crate::tiers::TierTable;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Allocation step in dollars
    pub increment: u64,
    /// How many solutions to keep
    pub top_k: usize,
    /// Emit a progress message every this many evaluated splits
    pub report_every: u64,
    /// Products to distribute across, in search order
    pub products: Vec<ProductKind>,
    /// Products that may receive the salary credit
    pub salary_products: Vec<ProductKind>,
    /// Overrides for [`ProductKind::default_bonus_cap`]
    pub bonus_caps: BTreeMap<ProductKind, u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            increment: 5_000,
            top_k: 3,
            report_every: 100,
            products: vec![
                ProductKind::UobOne,
                ProductKind::ScBonusSaver,
                ProductKind::Ocbc360,
                ProductKind::BocSmartSaver,
                ProductKind::Chocolate,
            ],
            salary_products: vec![
                ProductKind::ScBonusSaver,
                ProductKind::Ocbc360,
                ProductKind::BocSmartSaver,
            ],
            bonus_caps: BTreeMap::new(),
        }
    }
}

impl OptimizerConfig {
    pub fn bonus_cap(&self, product: ProductKind) -> u64 {
        self.bonus_caps
            .get(&product)
            .copied()
            .unwrap_or_else(|| product.default_bonus_cap())
    }

    pub fn validate(&self) -> Result<()> {
        if self.increment == 0 {
            return Err(OptimizerError::InvalidInput(
                "increment must be greater than zero".to_string(),
            ));
        }
        if self.report_every == 0 {
            return Err(OptimizerError::InvalidInput(
                "report_every must be greater than zero".to_string(),
            ));
        }
        reject_duplicates("products", &self.products)?;
        reject_duplicates("salary_products", &self.salary_products)?;
        Ok(())
    }
}

fn reject_duplicates(field: &str, products: &[ProductKind]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for product in products {
        if !seen.insert(*product) {
            return Err(OptimizerError::InvalidInput(format!(
                "{} lists {} more than once",
                field, product
            )));
        }
    }
    Ok(())
}

/// Upper bound on splits the search will visit, for progress reporting
pub fn estimate_scenarios(total: u64, config: &OptimizerConfig, has_salary: bool) -> u64 {
    let increment = config.increment.max(1);
    let steps = |amount: u64| amount / increment + 1;
    let n = config.products.len() as u32;

    let mut scenarios = steps(total).saturating_pow(n);

    if has_salary && n > 0 {
        for &product in &config.salary_products {
            if !config.products.contains(&product) {
                continue;
            }
            let salary_steps = steps(total.min(config.bonus_cap(product)));
            scenarios = scenarios
                .saturating_add(salary_steps.saturating_mul(steps(total).saturating_pow(n - 1)));
        }
    }

    scenarios
}

/// Mutable accumulators for one optimizer run
struct SearchState {
    top: TopK<Solution>,
    evaluated: u64,
    accepted: u64,
    faults: BTreeMap<ProductKind, String>,
}

impl SearchState {
    fn record_fault(&mut self, product: ProductKind, error: &OptimizerError) {
        if !self.faults.contains_key(&product) {
            warn!(product = %product, error = %error, "Product excluded from search results");
            self.faults.insert(product, error.to_string());
        }
    }
}

/// Fixed inputs of one optimizer run
struct Search<'a> {
    table: &'a TierTable,
    base: &'a Requirements,
    config: &'a OptimizerConfig,
    target: u64,
    scenarios: u64,
}

impl Search<'_> {
    /// Place `products` one at a time. A split is only priced once less
    /// than one increment is left unplaced; running out of products with
    /// more than that left over is a dead end, not a candidate.
    fn descend(
        &self,
        state: &mut SearchState,
        progress: &mut dyn ProgressSink,
        remaining: u64,
        products: &[ProductKind],
        distribution: &mut Distribution,
        salary_product: Option<ProductKind>,
    ) {
        if remaining < self.config.increment {
            self.evaluate(state, progress, distribution, salary_product);
            return;
        }

        let Some((&product, rest)) = products.split_first() else {
            return;
        };

        let max_amount = remaining.min(self.config.bonus_cap(product));
        for amount in (0..=max_amount).step_by(self.config.increment as usize) {
            if amount > 0 {
                distribution.insert(product, amount);
            }
            self.descend(
                state,
                progress,
                remaining - amount,
                rest,
                distribution,
                salary_product,
            );
            distribution.remove(&product);
        }
    }

    fn evaluate(
        &self,
        state: &mut SearchState,
        progress: &mut dyn ProgressSink,
        distribution: &Distribution,
        salary_product: Option<ProductKind>,
    ) {
        state.evaluated += 1;

        if state.evaluated % self.config.report_every == 0 {
            let percent = if self.scenarios == 0 {
                100.0
            } else {
                state.evaluated as f64 / self.scenarios as f64 * 100.0
            };
            progress.progress(&format!(
                "Checking scenario {} of {} ({:.1}%)",
                state.evaluated, self.scenarios, percent
            ));
        }

        let allocated: u64 = distribution.values().sum();
        if allocated.abs_diff(self.target) > self.config.increment {
            return;
        }
        state.accepted += 1;

        let mut total_interest = 0.0;
        let mut breakdown = BTreeMap::new();

        for (&product, &amount) in distribution {
            if amount == 0 {
                continue;
            }
            let reqs = requirements_for(product, self.base, salary_product);
            match calculate(product, amount as f64, self.table, &reqs) {
                Ok(result) => {
                    total_interest += result.total_interest;
                    breakdown.insert(product, result.breakdown);
                }
                Err(e) => state.record_fault(product, &e),
            }
        }

        if !state.top.admits(total_interest) {
            return;
        }

        let solution = Solution {
            distribution: distribution.clone(),
            total_interest,
            breakdown,
            salary_product,
        };

        if state.top.offer(solution) == Some(0) {
            progress.best(&format!(
                "New best found: {} with {}",
                format_money_cents(total_interest),
                describe_distribution(distribution)
            ));
        }
    }
}

/// `UOB One: $75,000, Chocolate: $50,000`
pub fn describe_distribution(distribution: &Distribution) -> String {
    if distribution.is_empty() {
        return "no allocation".to_string();
    }
    distribution
        .iter()
        .map(|(product, amount)| format!("{}: {}", product, format_money(*amount as f64)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Find the `config.top_k` best ways to split `total` across `config.products`.
///
/// Always returns exactly `top_k` solutions, best first; unused slots are
/// empty zero-interest placeholders. A product whose calculation fails is
/// priced at zero and listed in `faults`.
pub fn optimize(
    total: u64,
    table: &TierTable,
    base: &Requirements,
    config: &OptimizerConfig,
    progress: &mut dyn ProgressSink,
) -> Result<OptimizationOutcome> {
    config.validate()?;

    let mut state = SearchState {
        top: TopK::new(config.top_k),
        evaluated: 0,
        accepted: 0,
        faults: BTreeMap::new(),
    };

    let products: Vec<ProductKind> = config
        .products
        .iter()
        .copied()
        .filter(|p| {
            let loaded = table.contains(*p);
            if !loaded {
                state.record_fault(*p, &OptimizerError::missing_tier(*p, "any"));
            }
            loaded
        })
        .collect();

    let search = Search {
        table,
        base,
        config,
        target: total,
        scenarios: estimate_scenarios(total, config, base.has_salary),
    };

    info!(
        total = total,
        products = products.len(),
        increment = config.increment,
        scenarios = search.scenarios,
        "Optimizing distribution"
    );
    progress.progress(&format!("Total scenarios to check: {}", search.scenarios));

    let mut distribution = Distribution::new();

    if base.has_salary {
        for &salary_product in &config.salary_products {
            if !products.contains(&salary_product) {
                continue;
            }
            progress.status(&format!(
                "Trying combinations with salary credit to {}...",
                salary_product
            ));

            let others: Vec<ProductKind> = products
                .iter()
                .copied()
                .filter(|p| *p != salary_product)
                .collect();

            let max_amount = total.min(config.bonus_cap(salary_product));
            for amount in (0..=max_amount).step_by(config.increment as usize) {
                if amount > 0 {
                    distribution.insert(salary_product, amount);
                }
                search.descend(
                    &mut state,
                    progress,
                    total - amount,
                    &others,
                    &mut distribution,
                    Some(salary_product),
                );
                distribution.remove(&salary_product);
            }
        }
    }

    progress.status("Trying combinations without salary credit...");
    search.descend(
        &mut state,
        progress,
        total,
        &products,
        &mut distribution,
        None,
    );
    progress.status("Optimization complete!");

    debug!(
        evaluated = state.evaluated,
        accepted = state.accepted,
        "Search finished"
    );

    let outcome = OptimizationOutcome {
        solutions: state.top.into_vec(),
        evaluated: state.evaluated,
        accepted: state.accepted,
        faults: state.faults,
    };

    if let Some(best) = outcome.best() {
        info!(
            best_interest = best.total_interest,
            salary_product = ?best.salary_product,
            "Optimization complete"
        );
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{NoProgress, RecordingProgress};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn salaried() -> Requirements {
        Requirements {
            has_salary: true,
            salary_amount: 5_000.0,
            spend_amount: 600.0,
            ..Default::default()
        }
    }

    fn two_product_config() -> OptimizerConfig {
        OptimizerConfig {
            increment: 25_000,
            products: vec![ProductKind::ScBonusSaver, ProductKind::Chocolate],
            salary_products: vec![ProductKind::ScBonusSaver],
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_amount_returns_placeholders() {
        let table = TierTable::builtin().unwrap();
        let outcome = optimize(
            0,
            &table,
            &salaried(),
            &OptimizerConfig::default(),
            &mut NoProgress,
        )
        .unwrap();

        assert_eq!(outcome.solutions.len(), 3);
        for solution in &outcome.solutions {
            assert_eq!(solution.total_interest, 0.0);
            assert!(solution.distribution.is_empty());
        }
    }

    #[test]
    fn test_no_products_is_not_an_error() {
        let table = TierTable::builtin().unwrap();
        let config = OptimizerConfig {
            products: vec![],
            ..Default::default()
        };
        let outcome = optimize(50_000, &table, &salaried(), &config, &mut NoProgress).unwrap();
        assert_eq!(outcome.solutions.len(), 3);
        assert!(outcome.solutions.iter().all(|s| s.total_interest == 0.0));
    }

    #[test]
    fn test_zero_increment_rejected() {
        let table = TierTable::builtin().unwrap();
        let config = OptimizerConfig {
            increment: 0,
            ..Default::default()
        };
        let result = optimize(10_000, &table, &salaried(), &config, &mut NoProgress);
        assert!(matches!(result, Err(OptimizerError::InvalidInput(_))));
    }

    #[test]
    fn test_salary_assignment_wins() {
        let table = TierTable::builtin().unwrap();
        let outcome = optimize(
            100_000,
            &table,
            &salaried(),
            &two_product_config(),
            &mut NoProgress,
        )
        .unwrap();

        let best = &outcome.solutions[0];
        assert_eq!(best.salary_product, Some(ProductKind::ScBonusSaver));
        assert_eq!(best.distribution.get(&ProductKind::Chocolate), Some(&50_000));
        assert_eq!(best.distribution.get(&ProductKind::ScBonusSaver), Some(&50_000));
        // Chocolate 720 + 960, SC 25 base + 500 salary
        assert!(close(best.total_interest, 2_205.0));

        assert_eq!(outcome.solutions[1].salary_product, None);
        assert!(close(outcome.solutions[1].total_interest, 1_705.0));
        assert!(close(outcome.solutions[2].total_interest, 1_667.5));
    }

    #[test]
    fn test_without_salary_only_one_pass() {
        let table = TierTable::builtin().unwrap();
        let reqs = Requirements {
            has_salary: false,
            ..salaried()
        };
        let outcome =
            optimize(100_000, &table, &reqs, &two_product_config(), &mut NoProgress).unwrap();
        assert!(outcome.solutions.iter().all(|s| s.salary_product.is_none()));
        assert_eq!(outcome.evaluated, 3);
    }

    #[test]
    fn test_solutions_respect_tolerance_caps_and_order() {
        let table = TierTable::builtin().unwrap();
        let config = OptimizerConfig {
            increment: 20_000,
            ..Default::default()
        };
        let total = 130_000;
        let base = salaried();
        let outcome = optimize(total, &table, &base, &config, &mut NoProgress).unwrap();

        let scores: Vec<f64> = outcome.solutions.iter().map(|s| s.total_interest).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert!(scores[0] > 0.0);

        for solution in &outcome.solutions {
            assert!(solution.allocated().abs_diff(total) <= config.increment);
            for (product, amount) in &solution.distribution {
                assert!(*amount <= config.bonus_cap(*product));
            }

            // re-pricing the split reproduces the recorded total exactly
            let mut repriced = 0.0;
            for (&product, &amount) in &solution.distribution {
                let reqs = requirements_for(product, &base, solution.salary_product);
                repriced += calculate(product, amount as f64, &table, &reqs)
                    .unwrap()
                    .total_interest;
            }
            assert_eq!(repriced, solution.total_interest);
        }
    }

    #[test]
    fn test_progress_channels_are_fed() {
        let table = TierTable::builtin().unwrap();
        let config = OptimizerConfig {
            report_every: 1,
            ..two_product_config()
        };
        let mut progress = RecordingProgress::default();
        let outcome = optimize(100_000, &table, &salaried(), &config, &mut progress).unwrap();

        // one "total scenarios" line plus one per evaluated split
        assert_eq!(progress.progress.len() as u64, outcome.evaluated + 1);
        assert!(!progress.best.is_empty());
        assert!(progress.best.last().unwrap().contains("$2,205.00"));
        assert_eq!(
            progress.status.last().map(String::as_str),
            Some("Optimization complete!")
        );
    }

    #[test]
    fn test_faulty_product_does_not_abort_search() {
        let json = r#"[
            {"product": "Chocolate", "tier_type": "base", "interest_rate": "3.60%", "cap_amount": "20000"},
            {"product": "Chocolate", "tier_type": "base", "interest_rate": "3.20%", "cap_amount": "30000"},
            {"product": "SC BonusSaver", "tier_type": "base", "interest_rate": "0.05%"}
        ]"#;
        let table = TierTable::from_json_str(json).unwrap().table;
        let config = OptimizerConfig {
            increment: 10_000,
            products: vec![ProductKind::ScBonusSaver, ProductKind::Chocolate, ProductKind::UobOne],
            salary_products: vec![],
            ..Default::default()
        };

        let outcome = optimize(50_000, &table, &Requirements::default(), &config, &mut NoProgress).unwrap();

        assert!(outcome.faults.contains_key(&ProductKind::ScBonusSaver));
        assert!(outcome.faults.contains_key(&ProductKind::UobOne));
        let best = outcome.best().unwrap();
        assert_eq!(best.distribution.get(&ProductKind::Chocolate), Some(&50_000));
        assert!(close(best.total_interest, 1_680.0));
    }

    #[test]
    fn test_duplicate_products_rejected() {
        let table = TierTable::builtin().unwrap();
        let config = OptimizerConfig {
            increment: 50_000,
            products: vec![ProductKind::Chocolate, ProductKind::Chocolate],
            salary_products: vec![],
            ..Default::default()
        };
        let result = optimize(100_000, &table, &Requirements::default(), &config, &mut NoProgress);
        assert!(matches!(result, Err(OptimizerError::InvalidInput(ref m)) if m.contains("Chocolate")));

        let config = OptimizerConfig {
            salary_products: vec![ProductKind::Ocbc360, ProductKind::Ocbc360],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unplaceable_remainder_is_not_a_candidate() {
        let table = TierTable::builtin().unwrap();
        let config = OptimizerConfig {
            increment: 50_000,
            products: vec![ProductKind::Chocolate],
            salary_products: vec![],
            ..Default::default()
        };

        // Chocolate takes at most 50,000 of the 100,000
        let outcome =
            optimize(100_000, &table, &Requirements::default(), &config, &mut NoProgress).unwrap();
        assert_eq!(outcome.evaluated, 0);
        assert!(outcome.solutions.iter().all(|s| s.distribution.is_empty()));
    }

    #[test]
    fn test_estimate_counts_salary_scenarios() {
        let config = two_product_config();
        // no salary: 5 steps for each of 2 products
        assert_eq!(estimate_scenarios(100_000, &config, false), 25);
        // plus 5 salary steps times 5 steps for the other product
        assert_eq!(estimate_scenarios(100_000, &config, true), 50);
    }
}
