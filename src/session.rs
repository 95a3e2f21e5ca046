//! Calculator session context
//!
//! Holds what one user last asked for and what came back, so a front end
//! can redisplay results without recomputing. Owned by the caller and
//! passed explicitly; nothing here is global.

use crate::calculator::format_money_cents;
use crate::models::{OptimizationOutcome, ProductCalculation, Requirements, SpendAllocation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use uuid::Uuid;

/// Inputs behind the currently displayed results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInputs {
    pub deposit: f64,
    pub requirements: Requirements,
    #[serde(default)]
    pub total_spend: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatorSession {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub inputs: Option<SessionInputs>,
    pub calculations: Vec<ProductCalculation>,
    pub optimization: Option<OptimizationOutcome>,
    pub spend: Option<SpendAllocation>,
}

impl Default for CalculatorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CalculatorSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            inputs: None,
            calculations: Vec::new(),
            optimization: None,
            spend: None,
        }
    }

    /// Record the inputs about to be computed.
    ///
    /// Returns `true` when they differ from the previous inputs, in which
    /// case every stored result is dropped.
    pub fn record_inputs(&mut self, inputs: SessionInputs) -> bool {
        if self.inputs.as_ref() == Some(&inputs) {
            return false;
        }

        self.inputs = Some(inputs);
        self.calculations.clear();
        self.optimization = None;
        self.spend = None;
        self.touch();
        true
    }

    pub fn record_calculations(&mut self, calculations: Vec<ProductCalculation>) {
        self.calculations = calculations;
        self.touch();
    }

    pub fn record_optimization(&mut self, outcome: OptimizationOutcome) {
        self.optimization = Some(outcome);
        self.touch();
    }

    pub fn record_spend(&mut self, allocation: SpendAllocation) {
        self.spend = Some(allocation);
        self.touch();
    }

    pub fn has_results(&self) -> bool {
        !self.calculations.is_empty() || self.optimization.is_some() || self.spend.is_some()
    }

    /// Plain-text digest of the inputs and per-product results, highest
    /// interest first. Empty until something has been calculated.
    pub fn summary(&self) -> String {
        let Some(inputs) = &self.inputs else {
            return String::new();
        };
        if self.calculations.is_empty() {
            return String::new();
        }

        let reqs = &inputs.requirements;
        let yes_no = |flag: bool| if flag { "Yes" } else { "No" };

        let mut out = String::new();
        let _ = writeln!(out, "Savings amount: {}", format_money_cents(inputs.deposit));
        let _ = writeln!(out, "Has salary credited: {}", yes_no(reqs.has_salary));
        if reqs.has_salary {
            let _ = writeln!(out, "Salary amount: {}", format_money_cents(reqs.salary_amount));
        }
        let _ = writeln!(out, "Card spend: {}", format_money_cents(reqs.spend_amount));
        let _ = writeln!(out, "Bill payments: {}", reqs.giro_count);
        let _ = writeln!(out, "Has insurance: {}", yes_no(reqs.has_insurance));
        let _ = writeln!(out, "Has investments: {}", yes_no(reqs.has_investments));
        out.push('\n');

        let mut ranked: Vec<&ProductCalculation> = self.calculations.iter().collect();
        ranked.sort_by(|a, b| annual(b).total_cmp(&annual(a)));

        out.push_str("Interest by product (highest first):\n");
        for calc in ranked {
            match (&calc.result, &calc.error) {
                (Some(result), _) => {
                    let _ = writeln!(
                        out,
                        "- {}: {} per year ({} per month)",
                        calc.product,
                        format_money_cents(result.total_interest),
                        format_money_cents(result.monthly_interest())
                    );
                }
                (None, error) => {
                    let _ = writeln!(
                        out,
                        "- {}: unavailable ({})",
                        calc.product,
                        error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }

        out
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn annual(calc: &ProductCalculation) -> f64 {
    calc.result
        .as_ref()
        .map(|r| r.total_interest)
        .unwrap_or(f64::NEG_INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::calculate_all;
    use crate::tiers::TierTable;

    fn inputs(deposit: f64) -> SessionInputs {
        SessionInputs {
            deposit,
            requirements: Requirements {
                has_salary: true,
                salary_amount: 4_000.0,
                spend_amount: 800.0,
                ..Default::default()
            },
            total_spend: None,
        }
    }

    #[test]
    fn test_new_inputs_clear_results() {
        let table = TierTable::builtin().unwrap();
        let mut session = CalculatorSession::new();

        assert!(session.record_inputs(inputs(30_000.0)));
        let first = inputs(30_000.0);
        session.record_calculations(calculate_all(first.deposit, &table, &first.requirements));
        session.record_spend(SpendAllocation::default());
        assert!(session.has_results());

        assert!(!session.record_inputs(inputs(30_000.0)));
        assert!(session.has_results());

        assert!(session.record_inputs(inputs(40_000.0)));
        assert!(!session.has_results());
        assert!(session.updated_at >= session.created_at);
    }

    #[test]
    fn test_summary_ranks_products() {
        let table = TierTable::builtin().unwrap();
        let mut session = CalculatorSession::new();
        assert_eq!(session.summary(), "");

        let current = inputs(50_000.0);
        session.record_inputs(current.clone());
        session.record_calculations(calculate_all(current.deposit, &table, &current.requirements));

        let summary = session.summary();
        assert!(summary.contains("Savings amount: $50,000.00"));
        assert!(summary.contains("Salary amount: $4,000.00"));

        // Chocolate pays 1,680 on 50,000, ahead of everything else here
        let first_product = summary
            .lines()
            .find(|l| l.starts_with("- "))
            .unwrap();
        assert!(first_product.starts_with("- Chocolate: $1,680.00"));
    }
}
