//! Shortest weighted paths through the category hierarchy.

use super::CategoryGraph;
use crate::model::{CategoryIndex, PageId};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

#[derive(Debug, PartialEq)]
pub(super) struct Frontier {
    pub cost: f64,
    pub category: CategoryIndex,
    /// False once the path has turned down towards descendants.
    pub upward: bool,
}

impl Eq for Frontier {}

// Reversed so the BinaryHeap pops the cheapest entry.
impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.category.cmp(&self.category))
            .then_with(|| other.upward.cmp(&self.upward))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

/// Dijkstra upward through the hierarchy, starting at `start_categories` (the
/// categories a page is filed under) and stopping at any of `goals`.
///
/// When `weighted`, entering a category costs its finalized cost, so paths
/// through general categories are longer. Otherwise every step costs 1.
/// Returns the distance to every goal reached, keyed by category page id.
pub fn category_distances(
    graph: &CategoryGraph,
    start_categories: &[PageId],
    goals: &HashSet<PageId>,
    weighted: bool,
) -> HashMap<PageId, f64> {
    let step = |c: CategoryIndex| if weighted { graph.cost(c) } else { 1.0 };
    let goal_indexes: HashSet<CategoryIndex> = goals.iter().filter_map(|&id| graph.category_index(id)).collect();

    let mut frontier: BinaryHeap<Frontier> = start_categories
        .iter()
        .filter_map(|&id| graph.category_index(id))
        .map(|c| Frontier { cost: step(c), category: c, upward: true })
        .collect();

    let mut visited = HashSet::new();
    let mut distances = HashMap::new();
    while distances.len() < goal_indexes.len() {
        let Some(Frontier { cost, category, .. }) = frontier.pop() else {
            break;
        };
        if !visited.insert(category) {
            continue;
        }
        if goal_indexes.contains(&category) {
            distances.insert(graph.category_id(category), cost);
            continue;
        }
        for &parent in graph.parents(category) {
            if !visited.contains(&parent) {
                frontier.push(Frontier { cost: cost + step(parent), category: parent, upward: true });
            }
        }
    }
    distances
}

/// Weighted distance from `start_categories` to every ancestor, each
/// category on the path (both ends included) adding its cost.
pub fn ancestor_distances(graph: &CategoryGraph, start_categories: &[PageId]) -> HashMap<CategoryIndex, f64> {
    let mut frontier: BinaryHeap<Frontier> = start_categories
        .iter()
        .filter_map(|&id| graph.category_index(id))
        .map(|c| Frontier { cost: graph.cost(c), category: c, upward: true })
        .collect();
    let mut distances = HashMap::new();
    while let Some(Frontier { cost, category, .. }) = frontier.pop() {
        if distances.contains_key(&category) {
            continue;
        }
        distances.insert(category, cost);
        for &parent in graph.parents(category) {
            if !distances.contains_key(&parent) {
                frontier.push(Frontier { cost: cost + graph.cost(parent), category: parent, upward: true });
            }
        }
    }
    distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::model::{Language, LocalPage, NameSpace};
    use crate::CategoryGraphBuilder;

    fn en() -> Language { "en".parse().unwrap() }

    // Science(1) <- Biology(2) <- Zoology(3); Science(1) <- Physics(4).
    fn hierarchy() -> CategoryGraph {
        let mut store = MemoryStore::new();
        for (id, name) in [(1, "Science"), (2, "Biology"), (3, "Zoology"), (4, "Physics"), (5, "Orphan")] {
            store.add_page(LocalPage::new(en(), id, format!("Category:{name}"), NameSpace::Category));
        }
        store
            .add_membership(&en(), 2, 1)
            .add_membership(&en(), 3, 2)
            .add_membership(&en(), 4, 1)
            .add_membership(&en(), 100, 3);
        CategoryGraphBuilder::new(&store, &store).build(&en()).unwrap()
    }

    #[test]
    fn unweighted_distances_count_steps() {
        let graph = hierarchy();
        let goals = HashSet::from([1, 2]);
        let d = category_distances(&graph, &[3], &goals, false);
        assert_eq!(d.get(&2), Some(&2.0));
        // Science lies behind Biology, which is a goal and is not expanded.
        assert_eq!(d.get(&1), None);
    }

    #[test]
    fn weighted_distances_sum_costs() {
        let graph = hierarchy();
        let goals = HashSet::from([1]);
        let d = category_distances(&graph, &[3], &goals, true);
        let (zoo, bio, sci) = (graph.category_index(3).unwrap(), graph.category_index(2).unwrap(), graph.category_index(1).unwrap());
        let expected = graph.cost(zoo) + graph.cost(bio) + graph.cost(sci);
        assert!((d[&1] - expected).abs() < 1e-12);
    }

    #[test]
    fn ancestors_carry_cumulative_costs() {
        let graph = hierarchy();
        let d = ancestor_distances(&graph, &[3]);
        let (zoo, bio, sci) = (graph.category_index(3).unwrap(), graph.category_index(2).unwrap(), graph.category_index(1).unwrap());
        assert_eq!(d.len(), 3);
        assert_eq!(d[&zoo], graph.cost(zoo));
        assert!((d[&sci] - (graph.cost(zoo) + graph.cost(bio) + graph.cost(sci))).abs() < 1e-12);
        assert!(ancestor_distances(&graph, &[777]).is_empty());
    }

    #[test]
    fn unreachable_goals_are_absent() {
        let graph = hierarchy();
        let goals = HashSet::from([4, 5, 777]);
        assert!(category_distances(&graph, &[3], &goals, false).is_empty());
        assert!(category_distances(&graph, &[100], &goals, false).is_empty());
    }
}
