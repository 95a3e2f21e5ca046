//! Savings Optimizer
//!
//! Interest calculator and deposit planner for tiered bonus-savings
//! accounts:
//! - Prices a deposit against each product's tiered rate sheet
//! - Searches for the split of a lump sum across products that earns the most
//! - Decides where monthly card spend unlocks the most bonus interest
//!
//! FLOW:
//! RATE SHEET → TIER TABLE → CALCULATOR → OPTIMIZER / SPEND ALLOCATOR

pub mod api;
pub mod calculator;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod models;
pub mod optimizer;
pub mod products;
pub mod progress;
pub mod session;
pub mod spend;
pub mod tiers;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use calculator::{calculate, calculate_all};
pub use config::AppConfig;
pub use error::OptimizerError;
pub use optimizer::{optimize, OptimizerConfig};
pub use products::ProductKind;
pub use progress::{NoProgress, ProgressSink, RecordingProgress, TracingProgress};
pub use session::CalculatorSession;
pub use spend::allocate_spend;
pub use tiers::TierTable;
