//! Leaky PageRank over the category hierarchy.
//!
//! Pages are not nodes of the iteration; they only seed their categories
//! with one extra credit each. Mass flows from a category to its parents, and
//! categories without parents leak theirs.

use crate::model::{CategoryIndex, PageId};
use tracing::debug;

pub const DAMPING_FACTOR: f64 = 0.85;
pub const MAX_ITERATIONS: usize = 20;

#[derive(Debug, Clone)]
pub struct Ranking {
    /// Finalized costs, `1 / -ln(p)`.
    pub costs: Vec<f64>,
    pub min_cost: f64,
    /// Rounds actually performed, at most [`MAX_ITERATIONS`].
    pub iterations: usize,
}

/// Runs the iteration to its cap (or an exact fixed point) and finalizes.
#[must_use]
pub fn rank(pages: &[Vec<PageId>], parents: &[Vec<CategoryIndex>]) -> Ranking {
    let mut costs = initial_costs(pages);
    let mut iterations = 0;
    while iterations < MAX_ITERATIONS {
        let (next, diff) = iterate_once(&costs, parents);
        costs = next;
        iterations += 1;
        debug!(iteration = iterations, error = diff, "page rank iteration");
        // Exact comparison: most runs use every round.
        if diff == 0.0 {
            break;
        }
    }
    let min_cost = finalize(&mut costs);
    Ranking { costs, min_cost, iterations }
}

/// One credit per category plus one per page filed directly under it, normalized.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn initial_costs(pages: &[Vec<PageId>]) -> Vec<f64> {
    let sum_credits: usize = pages.len() + pages.iter().map(Vec::len).sum::<usize>();
    pages.iter().map(|p| (1.0 + p.len() as f64) / sum_credits as f64).collect()
}

/// One propagation round. Returns the next distribution and the L1 distance to `costs`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn iterate_once(costs: &[f64], parents: &[Vec<CategoryIndex>]) -> (Vec<f64>, f64) {
    let mut next = vec![(1.0 - DAMPING_FACTOR) / costs.len() as f64; costs.len()];
    for (c, ps) in parents.iter().enumerate() {
        if ps.is_empty() {
            continue;
        }
        let share = DAMPING_FACTOR * costs[c] / ps.len() as f64;
        for &p in ps {
            next[p] += share;
        }
    }
    let diff = costs.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum::<f64>();
    (next, diff)
}

/// Replaces each probability with `1 / -ln(p)` and returns the smallest result.
/// `p == 1` gives `-inf`, `p == 0` gives `0`; nothing is clamped.
pub fn finalize(costs: &mut [f64]) -> f64 {
    for cost in costs.iter_mut() {
        *cost = 1.0 / -cost.ln();
    }
    costs.iter().copied().fold(f64::NAN, f64::min)
}
