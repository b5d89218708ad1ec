//! Graph construction: category catalog, two-pass edge fill, ranking.

use super::pagerank;
use super::{CategoryGraph, GraphError};
use crate::dao::{CategoryMemberSource, PageSource};
use crate::model::{CategoryIndex, Language, NameSpace, PageId};
use std::collections::HashMap;
use tracing::{info, warn};

const LOGGED_TOP_CATEGORIES: usize = 20;

/// Builds a ranked [`CategoryGraph`] from a page source and the membership relation.
pub struct CategoryGraphBuilder<'a, P: ?Sized, M: ?Sized> {
    pages: &'a P,
    members: &'a M,
}

struct Catalog {
    index: HashMap<PageId, CategoryIndex>,
    ids: Vec<PageId>,
    names: Vec<String>,
}

struct Edges {
    pages: Vec<Vec<PageId>>,
    parents: Vec<Vec<CategoryIndex>>,
    children: Vec<Vec<CategoryIndex>>,
    total: usize,
}

impl<'a, P, M> CategoryGraphBuilder<'a, P, M>
where
    P: PageSource + ?Sized,
    M: CategoryMemberSource + ?Sized,
{
    pub fn new(pages: &'a P, members: &'a M) -> Self {
        Self { pages, members }
    }

    pub fn build(&self, language: &Language) -> Result<CategoryGraph, GraphError> {
        let catalog = self.load_categories(language)?;
        let edges = self.build_edges(language, &catalog)?;

        let (costs, min_cost) = if catalog.ids.is_empty() {
            info!(%language, "no categories found, skipping page rank");
            (Vec::new(), f64::NAN)
        } else {
            info!(%language, "computing category page ranks");
            let ranking = pagerank::rank(&edges.pages, &edges.parents);
            info!(iterations = ranking.iterations, min_cost = ranking.min_cost, "finished computing page ranks");
            (ranking.costs, ranking.min_cost)
        };

        let graph = CategoryGraph {
            language: language.clone(),
            index: catalog.index,
            ids: catalog.ids,
            names: catalog.names,
            pages: edges.pages,
            parents: edges.parents,
            children: edges.children,
            costs,
            min_cost,
            num_edges: edges.total,
        };
        log_top_categories(&graph);
        Ok(graph)
    }

    fn load_categories(&self, language: &Language) -> Result<Catalog, GraphError> {
        info!(%language, "loading categories");
        let mut catalog = Catalog { index: HashMap::new(), ids: Vec::new(), names: Vec::new() };
        for page in self.pages.pages(language, NameSpace::Category)? {
            let page = page?;
            if catalog.index.contains_key(&page.id) {
                continue;
            }
            catalog.index.insert(page.id, catalog.ids.len());
            catalog.ids.push(page.id);
            catalog.names.push(page.title);
        }
        info!(categories = catalog.ids.len(), "finished loading categories");
        Ok(catalog)
    }

    /// Counts every bucket on a first pass over the memberships, then fills
    /// exactly-sized buffers on a second one. Each counter must end at zero.
    fn build_edges(&self, language: &Language, catalog: &Catalog) -> Result<Edges, GraphError> {
        info!(%language, "building category graph");
        let n = catalog.ids.len();
        let mut num_pages = vec![0i64; n];
        let mut num_parents = vec![0i64; n];
        let mut num_children = vec![0i64; n];

        let mut total = 0;
        let mut ignored = 0;
        for member in self.members.memberships(language)? {
            let member = member?;
            match classify(catalog, member.member_id, member.category_id) {
                Slot::Subcategory { child, parent } => {
                    num_children[parent] += 1;
                    num_parents[child] += 1;
                }
                Slot::Page { category } => num_pages[category] += 1,
                Slot::Ignored => ignored += 1,
            }
            total += 1;
        }
        if ignored > 0 {
            warn!(ignored, "memberships in non-category containers were ignored");
        }

        let mut pages: Vec<Vec<PageId>> = num_pages.iter().map(|&k| Vec::with_capacity(to_len(k))).collect();
        let mut parents: Vec<Vec<CategoryIndex>> = num_parents.iter().map(|&k| Vec::with_capacity(to_len(k))).collect();
        let mut children: Vec<Vec<CategoryIndex>> = num_children.iter().map(|&k| Vec::with_capacity(to_len(k))).collect();

        for member in self.members.memberships(language)? {
            let member = member?;
            match classify(catalog, member.member_id, member.category_id) {
                Slot::Subcategory { child, parent } => {
                    children[parent].push(child);
                    parents[child].push(parent);
                    num_children[parent] -= 1;
                    num_parents[child] -= 1;
                }
                Slot::Page { category } => {
                    pages[category].push(member.member_id);
                    num_pages[category] -= 1;
                }
                Slot::Ignored => {}
            }
        }

        check_drained(catalog, &num_pages, "pages")?;
        check_drained(catalog, &num_parents, "parents")?;
        check_drained(catalog, &num_children, "children")?;
        info!(edges = total, "loaded edges in category graph");
        Ok(Edges { pages, parents, children, total })
    }
}

enum Slot {
    Subcategory { child: CategoryIndex, parent: CategoryIndex },
    Page { category: CategoryIndex },
    Ignored,
}

fn classify(catalog: &Catalog, member_id: PageId, category_id: PageId) -> Slot {
    match (catalog.index.get(&member_id), catalog.index.get(&category_id)) {
        (Some(&child), Some(&parent)) => Slot::Subcategory { child, parent },
        (None, Some(&category)) => Slot::Page { category },
        (_, None) => Slot::Ignored,
    }
}

fn to_len(count: i64) -> usize { usize::try_from(count).unwrap_or(0) }

fn check_drained(catalog: &Catalog, remaining: &[i64], relation: &'static str) -> Result<(), GraphError> {
    match remaining.iter().position(|&r| r != 0) {
        Some(c) => Err(GraphError::EdgeCountMismatch {
            category: catalog.names[c].clone(),
            relation,
            remaining: remaining[c],
        }),
        None => Ok(()),
    }
}

fn log_top_categories(graph: &CategoryGraph) {
    let top = graph
        .top_categories(LOGGED_TOP_CATEGORIES)
        .into_iter()
        .enumerate()
        .map(|(rank, (c, cost))| format!("{rank}. {}={cost}", graph.name(c)))
        .collect::<Vec<_>>()
        .join(", ");
    info!(min_cost = graph.min_cost(), "top category costs: {top}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{DaoIter, DaoResult};
    use crate::memory::MemoryStore;
    use crate::model::{CategoryMember, LocalPage};
    use std::cell::Cell;

    fn en() -> Language { "en".parse().unwrap() }

    fn category(id: PageId, title: &str) -> LocalPage { LocalPage::new(en(), id, title, NameSpace::Category) }

    #[test]
    fn records_edges_and_pages() {
        let mut store = MemoryStore::new();
        store
            .add_page(category(10, "Category:X"))
            .add_page(category(20, "Category:Y"))
            .add_page(LocalPage::new(en(), 1, "P", NameSpace::Article))
            .add_membership(&en(), 20, 10)
            .add_membership(&en(), 1, 20);

        let graph = CategoryGraphBuilder::new(&store, &store).build(&en()).unwrap();
        let x = graph.category_index(10).unwrap();
        let y = graph.category_index(20).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.children(x), &[y]);
        assert_eq!(graph.parents(y), &[x]);
        assert_eq!(graph.pages(y), &[1]);
        assert!(graph.pages(x).is_empty());
        assert_eq!(graph.category_index(1), None);
        assert_eq!(graph.name(x), "Category:X");
        assert_eq!(graph.category_id(y), 20);
        assert_eq!(graph.num_edges(), 2);
    }

    #[test]
    fn ignores_memberships_in_non_categories() {
        let mut store = MemoryStore::new();
        store.add_page(category(10, "Category:X")).add_membership(&en(), 1, 999).add_membership(&en(), 2, 10);
        let graph = CategoryGraphBuilder::new(&store, &store).build(&en()).unwrap();
        assert_eq!(graph.pages(0), &[2]);
        assert_eq!(graph.num_edges(), 2);
    }

    #[test]
    fn duplicate_category_pages_are_indexed_once() {
        struct Twice(MemoryStore);
        impl PageSource for Twice {
            fn pages(&self, language: &Language, namespace: NameSpace) -> DaoResult<DaoIter<'_, LocalPage>> {
                Ok(Box::new(self.0.pages(language, namespace)?.chain(self.0.pages(language, namespace)?)))
            }
            fn page(&self, language: &Language, id: PageId) -> DaoResult<Option<LocalPage>> { self.0.page(language, id) }
            fn count_articles(&self, language: &Language) -> DaoResult<usize> { self.0.count_articles(language) }
        }
        let mut store = MemoryStore::new();
        store.add_page(category(10, "Category:X")).add_page(category(11, "Category:Z"));
        let pages = Twice(store);
        let graph = CategoryGraphBuilder::new(&pages, &pages.0).build(&en()).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.category_index(11), Some(1));
    }

    #[test]
    fn empty_language_builds_empty_graph() {
        let store = MemoryStore::new();
        let graph = CategoryGraphBuilder::new(&store, &store).build(&en()).unwrap();
        assert!(graph.is_empty());
        assert!(graph.min_cost().is_nan());
    }

    #[test]
    fn changing_relation_between_passes_fails_fast() {
        // Second read of the relation returns one more row than the first.
        struct Growing {
            store: MemoryStore,
            reads: Cell<usize>,
        }
        impl CategoryMemberSource for Growing {
            fn memberships(&self, language: &Language) -> DaoResult<DaoIter<'_, CategoryMember>> {
                let read = self.reads.get();
                self.reads.set(read + 1);
                let extra = (read > 0).then_some(Ok(CategoryMember { member_id: 5, category_id: 10 }));
                Ok(Box::new(self.store.memberships(language)?.chain(extra)))
            }
            fn categories_of(&self, language: &Language, page_id: PageId) -> DaoResult<Vec<PageId>> {
                self.store.categories_of(language, page_id)
            }
        }
        let mut store = MemoryStore::new();
        store.add_page(category(10, "Category:X")).add_membership(&en(), 4, 10);
        let members = Growing { store, reads: Cell::new(0) };
        let err = CategoryGraphBuilder::new(&members.store, &members).build(&en()).unwrap_err();
        match err {
            GraphError::EdgeCountMismatch { category, relation, remaining } => {
                assert_eq!(category, "Category:X");
                assert_eq!(relation, "pages");
                assert_eq!(remaining, -1);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn data_access_errors_propagate() {
        struct Broken;
        impl CategoryMemberSource for Broken {
            fn memberships(&self, _: &Language) -> DaoResult<DaoIter<'_, CategoryMember>> {
                Err(crate::dao::DaoError::Malformed("connection reset".into()))
            }
            fn categories_of(&self, _: &Language, _: PageId) -> DaoResult<Vec<PageId>> { Ok(Vec::new()) }
        }
        let store = MemoryStore::new();
        let err = CategoryGraphBuilder::new(&store, &Broken).build(&en()).unwrap_err();
        assert!(matches!(err, GraphError::Dao(_)));
    }
}
