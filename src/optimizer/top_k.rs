//! Bounded best-of-K collection

use crate::models::Solution;
use serde::Serialize;

/// Anything with a score to rank by
pub trait Ranked {
    fn score(&self) -> f64;
}

impl Ranked for Solution {
    fn score(&self) -> f64 {
        self.total_interest
    }
}

/// Fixed-length list kept sorted by descending score.
///
/// Seeded with `k` default entries, so a candidate has to strictly beat a
/// kept entry to get in; on ties the earlier entry stays ahead.
#[derive(Debug, Clone, Serialize)]
pub struct TopK<T> {
    entries: Vec<T>,
}

impl<T: Ranked + Default> TopK<T> {
    pub fn new(k: usize) -> Self {
        Self {
            entries: (0..k).map(|_| T::default()).collect(),
        }
    }
}

impl<T: Ranked> TopK<T> {
    /// Would `score` make it into the list?
    pub fn admits(&self, score: f64) -> bool {
        self.entries.last().is_some_and(|worst| score > worst.score())
    }

    /// Insert `candidate`, returning its rank if it was kept
    pub fn offer(&mut self, candidate: T) -> Option<usize> {
        let score = candidate.score();
        let rank = self.entries.iter().position(|e| score > e.score())?;

        self.entries.pop();
        self.entries.insert(rank, candidate);
        Some(rank)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.entries
    }
}
