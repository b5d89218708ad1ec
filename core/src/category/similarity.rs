//! Relatedness from the ranked category graph: the cheapest path joining
//! two pages through a shared ancestor, mapped onto a score.

use super::distance::{ancestor_distances, Frontier};
use super::CategoryGraph;
use crate::model::PageId;
use crate::sr::SrResult;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// `ln(max(d, min_cost)) / ln(min_cost)`: 1 at the cheapest possible path,
/// falling as paths grow. An infinite distance scores 0.
pub fn distance_to_score(graph: &CategoryGraph, distance: f64) -> f64 {
    if distance.is_infinite() {
        return 0.0;
    }
    let min_cost = graph.min_cost();
    distance.max(min_cost).ln() / min_cost.ln()
}

/// Shortest path from the categories of one page up to a common ancestor and
/// down to the categories of the other. The meeting category is only
/// counted once. Infinite when the pages share no ancestor.
pub fn category_distance(graph: &CategoryGraph, categories1: &[PageId], categories2: &[PageId]) -> f64 {
    let d1 = ancestor_distances(graph, categories1);
    let d2 = ancestor_distances(graph, categories2);
    d1.iter()
        .filter_map(|(c, a)| d2.get(c).map(|b| a + b - graph.cost(*c)))
        .fold(f64::INFINITY, f64::min)
}

pub fn category_similarity(graph: &CategoryGraph, categories1: &[PageId], categories2: &[PageId]) -> f64 {
    distance_to_score(graph, category_distance(graph, categories1, categories2))
}

/// Pages closest to `page` in the hierarchy, best first.
///
/// Walks up from the page's categories and back down through children,
/// never turning up again once heading down. Pages filed under a visited
/// category take its distance. Stops after `max_results` pages are found.
pub fn category_most_similar(
    graph: &CategoryGraph,
    page: PageId,
    start_categories: &[PageId],
    max_results: usize,
    valid_ids: Option<&HashSet<PageId>>,
) -> Vec<SrResult> {
    let mut frontier: BinaryHeap<Frontier> = start_categories
        .iter()
        .filter_map(|&id| graph.category_index(id))
        .map(|c| Frontier { cost: graph.cost(c), category: c, upward: true })
        .collect();
    let mut visited = HashSet::new();
    let mut pages: HashMap<PageId, f64> = HashMap::new();

    'search: while pages.len() < max_results {
        let Some(Frontier { cost, category, upward }) = frontier.pop() else {
            break;
        };
        if !visited.insert(category) {
            continue;
        }
        for &member in graph.pages(category) {
            if member == page || valid_ids.is_some_and(|ids| !ids.contains(&member)) {
                continue;
            }
            pages.entry(member).or_insert(cost);
            if pages.len() >= max_results {
                break 'search;
            }
        }
        for &child in graph.children(category) {
            if !visited.contains(&child) {
                frontier.push(Frontier { cost: cost + graph.cost(child), category: child, upward: false });
            }
        }
        if upward {
            for &parent in graph.parents(category) {
                if !visited.contains(&parent) {
                    frontier.push(Frontier { cost: cost + graph.cost(parent), category: parent, upward: true });
                }
            }
        }
    }

    let mut results: Vec<SrResult> =
        pages.into_iter().map(|(id, d)| SrResult::new(distance_to_score(graph, d)).with_id(id)).collect();
    results.sort_by(|a, b| b.score().total_cmp(&a.score()).then(a.id.cmp(&b.id)));
    results
}
