//! Ranking adjusters.
//!
//! Feedback operators applied between localization rounds: ruling an
//! element out, confirming a neighborhood as suspicious, and folding a
//! cause tree back into the scores. Each operator mutates scores in
//! place and re-sorts once at the end, or returns an error and leaves
//! the ranking untouched.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::causal::tree::{CauseTree, NodeId};
use crate::element::{Element, Granularity};
use crate::ranking::{Ranking, RankingError};

/// Rule out the element at `rank_index`: its score drops to zero and its
/// neighborhood is dampened by `remove_const`, which must stay below 1.
pub fn remove(
    ranking: &mut Ranking,
    rank_index: usize,
    remove_const: f64,
) -> Result<(), RankingError> {
    if remove_const >= 1.0 {
        return Err(RankingError::InvalidRemoveConst(remove_const));
    }
    let target = target_at(ranking, rank_index)?;
    rescale(ranking, &target, remove_const);
    Ok(())
}

/// Confirm the neighborhood of the element at `rank_index` as suspicious,
/// scaling every neighbor by `susp_const`. The marked element itself
/// drops to zero and leaves its neighborhood carrying the signal.
pub fn mark_suspicious(
    ranking: &mut Ranking,
    rank_index: usize,
    susp_const: f64,
) -> Result<(), RankingError> {
    let target = target_at(ranking, rank_index)?;
    rescale(ranking, &target, susp_const);
    Ok(())
}

fn target_at(ranking: &Ranking, rank_index: usize) -> Result<Element, RankingError> {
    ranking
        .at(rank_index)
        .map(|entry| entry.element.clone())
        .ok_or(RankingError::RankOutOfBounds {
            index: rank_index,
            len: ranking.len(),
        })
}

/// Zero the target, scale its neighbors, re-sort.
fn rescale(ranking: &mut Ranking, target: &Element, factor: f64) {
    let neighbors: Vec<Element> = ranking
        .neighbors_of(target)
        .into_iter()
        .cloned()
        .collect();
    ranking.set_score(target, 0.0);
    for neighbor in &neighbors {
        ranking.scale_score(neighbor, factor);
    }
    debug!(
        target = %target,
        neighbors = neighbors.len(),
        factor,
        "rescaled neighborhood"
    );
    ranking.resort();
}

/// Multiplicative boost derived from a cause tree. Elements implicated
/// close to the seed gain more: an element whose shallowest cause
/// expression sits at depth `d` is scaled by `1 + base_factor^d`.
#[derive(Debug, Clone, Copy)]
pub struct ProbeBoost {
    base_factor: f64,
}

impl ProbeBoost {
    /// `base_factor` must lie in `(0, 1]`.
    pub fn new(base_factor: f64) -> Result<Self, RankingError> {
        if !(base_factor > 0.0 && base_factor <= 1.0) {
            return Err(RankingError::InvalidBaseFactor(base_factor));
        }
        Ok(Self { base_factor })
    }

    pub fn base_factor(&self) -> f64 {
        self.base_factor
    }

    /// Scale every ranked element the tree implicates, then re-sort once.
    /// Cause locations absent from the ranking are skipped.
    pub fn apply(&self, tree: &CauseTree, ranking: &mut Ranking) {
        let depths = self.min_depths(tree, ranking.granularity());
        let mut boosted = 0usize;
        for (element, depth) in &depths {
            let multiplier = 1.0 + self.base_factor.powi(*depth as i32);
            if ranking.scale_score(element, multiplier) {
                boosted += 1;
            } else {
                debug!(element = %element, "cause element not ranked, skipping");
            }
        }
        ranking.resort();
        debug!(boosted, implicated = depths.len(), "applied cause-tree boost");
    }

    /// Shallowest depth per coarsened cause location. The seed's own
    /// explanation sits at depth 1.
    fn min_depths(&self, tree: &CauseTree, granularity: Granularity) -> HashMap<Element, u32> {
        let mut depths: HashMap<Element, u32> = HashMap::new();
        let mut queue: VecDeque<(NodeId, u32)> = tree
            .children_of(tree.root())
            .iter()
            .map(|id| (*id, 1))
            .collect();
        while let Some((id, depth)) = queue.pop_front() {
            if let Some(expr) = tree.expression(id) {
                let element = expr.location().coarsen(granularity);
                depths
                    .entry(element)
                    .and_modify(|d| *d = (*d).min(depth))
                    .or_insert(depth);
            }
            for child in tree.children_of(id) {
                queue.push_back((*child, depth + 1));
            }
        }
        depths
    }
}
