//! Suspiciousness ranking.
//!
//! A ranking is a sortable collection of `(element, score)` entries built
//! from a coverage spectrum. Entries are created once at construction and
//! never removed; the adjusters in [`crate::adjust`] zero or rescale them
//! in place, after which the ranking re-sorts before answering rank or
//! top-N queries.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::element::{Element, Granularity};
use crate::spectrum::{SbflFormula, SpectrumData};

/// Boundary errors for rank-indexed operations and adjuster parameters.
/// The ranking is left unchanged whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RankingError {
    #[error("rank index {index} out of bounds, len = {len}")]
    RankOutOfBounds { index: usize, len: usize },
    #[error("element not found in ranking: {0}")]
    ElementNotFound(String),
    #[error("remove constant must be below 1, got {0}")]
    InvalidRemoveConst(f64),
    #[error("base factor must be in (0, 1], got {0}")]
    InvalidBaseFactor(f64),
}

/// One scored element. Owned exclusively by its [`Ranking`]; scores change
/// only through the adjuster operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingEntry {
    pub element: Element,
    pub score: f64,
}

/// Sorted suspiciousness ranking over program elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ranking {
    entries: Vec<RankingEntry>,
    granularity: Granularity,
    formula: SbflFormula,
}

impl Ranking {
    /// Build one entry per spectrum element, score = formula(counts),
    /// sorted descending. A NaN formula result (0/0) is stored as 0.
    pub fn build(spectrum: &SpectrumData, formula: SbflFormula) -> Self {
        let entries = spectrum
            .elements()
            .into_iter()
            .map(|element| {
                let score = nan_as_zero(formula.score(&spectrum.counts(&element)));
                RankingEntry { element, score }
            })
            .collect();
        let mut ranking = Self {
            entries,
            granularity: spectrum.granularity(),
            formula,
        };
        ranking.sort();
        ranking
    }

    /// Build directly from precomputed scores. NaN scores are stored
    /// as 0, like a formula's 0/0 result.
    pub fn from_scores(
        scores: Vec<(Element, f64)>,
        granularity: Granularity,
        formula: SbflFormula,
    ) -> Self {
        let entries = scores
            .into_iter()
            .map(|(element, score)| RankingEntry {
                element,
                score: nan_as_zero(score),
            })
            .collect();
        let mut ranking = Self {
            entries,
            granularity,
            formula,
        };
        ranking.sort();
        ranking
    }

    /// Descending by score; ties broken by element natural order. Scores
    /// are NaN-free from construction, and `total_cmp` keeps the
    /// comparator a total order either way.
    fn sort(&mut self) {
        self.entries.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.element.cmp(&b.element))
        });
    }

    /// Re-sort after a batch of score mutations.
    pub(crate) fn resort(&mut self) {
        self.sort();
    }

    /// Entry at a 0-based rank index, best first.
    pub fn at(&self, index: usize) -> Option<&RankingEntry> {
        self.entries.get(index)
    }

    /// Current score of an element, if ranked.
    pub fn score_of(&self, element: &Element) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| &entry.element == element)
            .map(|entry| entry.score)
    }

    /// Half-integer competition rank: the number of strictly higher-scored
    /// elements plus half the tie block, where ties are judged after
    /// rounding scores to 4 decimal places. With scores
    /// `[1.0, 0.8, 0.8, 0.5]` the tied pair ranks 2.5 and the last
    /// element ranks 4.
    pub fn rank_of(&self, element: &Element) -> Option<f64> {
        let target = round4(self.score_of(element)?);
        let mut higher = 0usize;
        let mut tied = 0usize;
        for entry in &self.entries {
            let score = round4(entry.score);
            if score > target {
                higher += 1;
            } else if score == target {
                tied += 1;
            }
        }
        Some(higher as f64 + (1.0 + tied as f64) / 2.0)
    }

    /// The best `n` entries (fewer when the ranking is smaller).
    pub fn top_n(&self, n: usize) -> &[RankingEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// All other ranked elements sharing the target's enclosing scope.
    pub fn neighbors_of(&self, element: &Element) -> Vec<&Element> {
        self.entries
            .iter()
            .map(|entry| &entry.element)
            .filter(|other| *other != element && other.is_neighbor(element))
            .collect()
    }

    /// Overwrite an element's score. Returns false when the element is
    /// not ranked; the caller decides whether that is an error.
    pub(crate) fn set_score(&mut self, element: &Element, score: f64) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|entry| &entry.element == element)
        {
            Some(entry) => {
                entry.score = score;
                true
            }
            None => false,
        }
    }

    /// Multiply an element's score in place. Returns false when absent.
    pub(crate) fn scale_score(&mut self, element: &Element, factor: f64) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|entry| &entry.element == element)
        {
            Some(entry) => {
                entry.score *= factor;
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[RankingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn formula(&self) -> SbflFormula {
        self.formula
    }

    /// Write the ranking as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing ranking {}", path.display()))?;
        Ok(())
    }

    /// Read a ranking back from JSON, re-sorting in case the file was
    /// edited by hand.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading ranking {}", path.display()))?;
        let mut ranking: Ranking = serde_json::from_str(&content)
            .with_context(|| format!("parsing ranking {}", path.display()))?;
        ranking.sort();
        Ok(ranking)
    }
}

/// NaN scores (a formula's 0/0) enter the ranking as 0, the same
/// reading as Ochiai's zero-denominator guard.
fn nan_as_zero(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score
    }
}

/// Round to 4 decimal places, the tie-comparison resolution.
fn round4(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
#[path = "ranking_tests.rs"]
mod tests;
