//! Milne-Witten relatedness from two sets of linked pages.
//!
//! `1 - (ln max(|A|,|B|) - ln |A∩B|) / (ln N - ln min(|A|,|B|))`
//!
//! The formula is left unguarded: when a link set is as large as the corpus,
//! or larger, the result may be NaN, infinite or outside `[0, 1]`.

use super::{Explanation, ExplanationTemplate, SrResult};
use crate::model::PageId;
use std::collections::HashSet;

/// Scores two link sets against a corpus of `num_pages` articles.
/// With `want_explanation`, every shared page yields one explanation, in id order.
pub fn similarity(links_a: &HashSet<PageId>, links_b: &HashSet<PageId>, num_pages: usize, want_explanation: bool) -> SrResult {
    let mut shared: Vec<PageId> = links_a.intersection(links_b).copied().collect();
    if shared.is_empty() {
        return SrResult::new(0.0);
    }
    let score = score_from_counts(links_a.len(), links_b.len(), shared.len(), num_pages);
    if !want_explanation {
        return SrResult::new(score);
    }
    shared.sort_unstable();
    let explanations = shared
        .into_iter()
        .map(|id| Explanation::new(ExplanationTemplate::SharedLink, vec![id]))
        .collect();
    SrResult::new(score).with_explanations(explanations)
}

/// The same measure over set sizes only. No shared links scores exactly 0.
#[allow(clippy::cast_precision_loss)]
pub fn score_from_counts(a: usize, b: usize, shared: usize, num_pages: usize) -> f64 {
    if shared == 0 {
        return 0.0;
    }
    let (a, b, shared, n) = (a as f64, b as f64, shared as f64, num_pages as f64);
    1.0 - (a.max(b).ln() - shared.ln()) / (n.ln() - a.min(b).ln())
}
