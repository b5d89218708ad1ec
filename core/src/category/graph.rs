use crate::model::{CategoryIndex, Language, PageId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Immutable category graph. Categories are addressed by a dense index;
/// non-category pages only appear as leaves in [`CategoryGraph::pages`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryGraph {
    pub(crate) language: Language,
    pub(crate) index: HashMap<PageId, CategoryIndex>,
    pub(crate) ids: Vec<PageId>,
    pub(crate) names: Vec<String>,
    pub(crate) pages: Vec<Vec<PageId>>,
    pub(crate) parents: Vec<Vec<CategoryIndex>>,
    pub(crate) children: Vec<Vec<CategoryIndex>>,
    pub(crate) costs: Vec<f64>,
    pub(crate) min_cost: f64,
    pub(crate) num_edges: usize,
}

impl CategoryGraph {
    pub fn language(&self) -> &Language { &self.language }
    pub fn len(&self) -> usize { self.ids.len() }
    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    /// Dense index of a category page, `None` when `page_id` is not a category.
    pub fn category_index(&self, page_id: PageId) -> Option<CategoryIndex> { self.index.get(&page_id).copied() }

    pub fn category_id(&self, c: CategoryIndex) -> PageId { self.ids[c] }
    pub fn name(&self, c: CategoryIndex) -> &str { &self.names[c] }
    pub fn pages(&self, c: CategoryIndex) -> &[PageId] { &self.pages[c] }
    pub fn parents(&self, c: CategoryIndex) -> &[CategoryIndex] { &self.parents[c] }
    pub fn children(&self, c: CategoryIndex) -> &[CategoryIndex] { &self.children[c] }

    /// Finalized cost `1 / -ln(p)`; larger means a more general category.
    pub fn cost(&self, c: CategoryIndex) -> f64 { self.costs[c] }
    pub fn costs(&self) -> &[f64] { &self.costs }

    /// Smallest finalized cost, NaN for a graph without categories.
    pub fn min_cost(&self) -> f64 { self.min_cost }

    /// Membership records seen while building, including ignored ones.
    pub fn num_edges(&self) -> usize { self.num_edges }

    /// A category takes part in the hierarchy or groups more than one page.
    pub fn is_useful(&self, c: CategoryIndex) -> bool {
        !self.parents[c].is_empty() || !self.children[c].is_empty() || self.pages[c].len() > 1
    }

    /// The `n` categories with the highest cost, best first.
    pub fn top_categories(&self, n: usize) -> Vec<(CategoryIndex, f64)> {
        let mut ranked: Vec<(CategoryIndex, f64)> = self.costs.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}
