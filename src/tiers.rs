//! Rate sheet loading
//!
//! Rows arrive as loosely typed records (the same columns a published rate
//! sheet carries) and are normalised into [`Tier`] values grouped by
//! product. A bad row is skipped and reported; it never takes the rest of
//! its product, or any other product, down with it.

use crate::error::OptimizerError;
use crate::models::Tier;
use crate::products::ProductKind;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

const BUILTIN_RATE_SHEET: &str = include_str!("../data/interest_rates.json");

/// A cell that may have been written as text or as a number
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl RawValue {
    fn as_text(&self) -> String {
        match self {
            RawValue::Number(n) => n.to_string(),
            RawValue::Bool(b) => b.to_string(),
            RawValue::Text(s) => s.trim().to_string(),
        }
    }
}

/// One unparsed rate sheet row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TierRow {
    pub product: Option<String>,
    pub tier_type: Option<RawValue>,
    pub balance_tier: Option<RawValue>,
    pub interest_rate: Option<RawValue>,
    pub requirement_type: Option<RawValue>,
    pub min_spend: Option<RawValue>,
    pub min_salary: Option<RawValue>,
    pub giro_count: Option<RawValue>,
    pub salary_credit: Option<RawValue>,
    pub cap_amount: Option<RawValue>,
    pub remarks: Option<RawValue>,
}

/// A row that did not make it into the table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedRow {
    pub index: usize,
    pub product: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub table: TierTable,
    pub skipped: Vec<SkippedRow>,
}

/// Parse a percentage such as `"3.60%"` (or a bare `3.6`) into a fraction.
///
/// Anything outside 0% to 100% is rejected.
pub fn parse_rate(raw: &str) -> Result<f64> {
    let cleaned = raw.trim().trim_end_matches('%').trim();
    cleaned
        .parse::<f64>()
        .ok()
        .and_then(percent_to_fraction)
        .ok_or_else(|| OptimizerError::InvalidRate(raw.to_string()))
}

fn percent_to_fraction(percent: f64) -> Option<f64> {
    (percent.is_finite() && (0.0..=100.0).contains(&percent)).then(|| percent / 100.0)
}

/// Parse a dollar amount; blank and placeholder cells read as zero
pub fn parse_amount(field: &'static str, raw: &str) -> Result<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();

    if is_blank(&cleaned) {
        return Ok(0.0);
    }

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| OptimizerError::InvalidAmount {
            field,
            value: raw.to_string(),
        })
}

fn is_blank(cell: &str) -> bool {
    matches!(
        cell.to_ascii_lowercase().as_str(),
        "" | "nan" | "-" | "n/a" | "na" | "none"
    )
}

fn text(cell: &Option<RawValue>) -> String {
    cell.as_ref().map(RawValue::as_text).unwrap_or_default()
}

fn amount(field: &'static str, cell: &Option<RawValue>) -> Result<f64> {
    match cell {
        Some(RawValue::Number(n)) if n.is_finite() && *n >= 0.0 => Ok(*n),
        Some(other) => parse_amount(field, &other.as_text()),
        None => Ok(0.0),
    }
}

fn flag(cell: &Option<RawValue>) -> bool {
    match cell {
        Some(RawValue::Bool(b)) => *b,
        Some(RawValue::Number(n)) => *n != 0.0,
        Some(RawValue::Text(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "yes" | "y" | "true" | "1"
        ),
        None => false,
    }
}

impl TierRow {
    fn product_kind(&self) -> Result<ProductKind> {
        let name = self.product.as_deref().unwrap_or_default();
        name.parse()
    }

    fn to_tier(&self) -> Result<Tier> {
        let rate = match &self.interest_rate {
            Some(RawValue::Number(n)) => percent_to_fraction(*n)
                .ok_or_else(|| OptimizerError::InvalidRate(n.to_string()))?,
            Some(cell) => parse_rate(&cell.as_text())?,
            None => return Err(OptimizerError::InvalidRate(String::new())),
        };

        Ok(Tier {
            tier_type: text(&self.tier_type),
            balance_tier: text(&self.balance_tier),
            interest_rate: rate,
            requirement_type: text(&self.requirement_type),
            min_spend: amount("min_spend", &self.min_spend)?,
            min_salary: amount("min_salary", &self.min_salary)?,
            giro_count: amount("giro_count", &self.giro_count)?.round() as u32,
            salary_credit: flag(&self.salary_credit),
            cap_amount: amount("cap_amount", &self.cap_amount)?,
            remarks: text(&self.remarks),
        })
    }
}

//
// ================= Tier Table =================
//

/// Product → ordered tiers, as published
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierTable {
    products: BTreeMap<ProductKind, Vec<Tier>>,
}

impl TierTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from raw rows, skipping the ones that do not parse
    pub fn load(rows: Vec<TierRow>) -> LoadOutcome {
        Self::load_indexed(rows.into_iter().enumerate().collect(), Vec::new())
    }

    fn load_indexed(rows: Vec<(usize, TierRow)>, mut skipped: Vec<SkippedRow>) -> LoadOutcome {
        let mut table = TierTable::new();

        for (index, row) in rows {
            let parsed = row
                .product_kind()
                .and_then(|product| row.to_tier().map(|tier| (product, tier)));

            match parsed {
                Ok((product, tier)) => table.push(product, tier),
                Err(e) => {
                    warn!(row = index, product = ?row.product, error = %e, "Skipping rate sheet row");
                    skipped.push(SkippedRow {
                        index,
                        product: row.product.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        skipped.sort_by_key(|s| s.index);

        for (product, tiers) in &table.products {
            info!(product = %product, tiers = tiers.len(), "Loaded tiers");
        }

        LoadOutcome { table, skipped }
    }

    /// Parse a JSON array of rows.
    ///
    /// Only a document that is not an array is an error; a row whose cells
    /// have the wrong shape is skipped like any other bad row.
    pub fn from_json_str(json: &str) -> Result<LoadOutcome> {
        let values: Vec<serde_json::Value> = serde_json::from_str(json)?;

        let mut rows = Vec::with_capacity(values.len());
        let mut skipped = Vec::new();

        for (index, value) in values.into_iter().enumerate() {
            let product = value
                .get("product")
                .map(|p| p.as_str().map(str::to_string).unwrap_or_else(|| p.to_string()));

            match serde_json::from_value::<TierRow>(value) {
                Ok(row) => rows.push((index, row)),
                Err(e) => {
                    warn!(row = index, product = ?product, error = %e, "Skipping malformed rate sheet row");
                    skipped.push(SkippedRow {
                        index,
                        product,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(Self::load_indexed(rows, skipped))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<LoadOutcome> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// The rate sheet bundled with the crate
    pub fn builtin() -> Result<TierTable> {
        Ok(Self::from_json_str(BUILTIN_RATE_SHEET)?.table)
    }

    pub fn push(&mut self, product: ProductKind, tier: Tier) {
        self.products.entry(product).or_default().push(tier);
    }

    pub fn tiers(&self, product: ProductKind) -> &[Tier] {
        self.products
            .get(&product)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, product: ProductKind) -> bool {
        !self.tiers(product).is_empty()
    }

    pub fn products(&self) -> impl Iterator<Item = ProductKind> + '_ {
        self.products.keys().copied()
    }

    pub fn find<P>(&self, product: ProductKind, predicate: P) -> Option<&Tier>
    where
        P: Fn(&Tier) -> bool,
    {
        self.tiers(product).iter().find(|t| predicate(t))
    }

    /// First tier of the given type, or a configuration fault
    pub fn require(&self, product: ProductKind, tier_type: &str) -> Result<&Tier> {
        self.find(product, |t| t.tier_type == tier_type)
            .ok_or_else(|| OptimizerError::missing_tier(product, tier_type))
    }

    /// Like [`require`](Self::require) with an extra condition; `label` names the tier in the error
    pub fn require_where<P>(&self, product: ProductKind, label: &str, predicate: P) -> Result<&Tier>
    where
        P: Fn(&Tier) -> bool,
    {
        self.find(product, predicate)
            .ok_or_else(|| OptimizerError::missing_tier(product, label))
    }
}
