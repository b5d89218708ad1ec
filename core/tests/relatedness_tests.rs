use std::collections::HashSet;
use std::sync::Arc;
use wikirel_core::category::distance::category_distances;
use wikirel_core::memory::MemoryStore;
use wikirel_core::store::SledStore;
use wikirel_core::{
    CategoryGraphBuilder, CategoryMember, CategoryMemberSource, ExplanationFormatter, Language, LinkDirection, LocalPage,
    MilneWittenMetric, NameSpace,
};

fn en() -> Language { "en".parse().unwrap() }

#[test]
fn animals_and_mammals_rank_as_expected() {
    let mut store = MemoryStore::new();
    store
        .add_page(LocalPage::new(en(), 1, "Category:Animals", NameSpace::Category))
        .add_page(LocalPage::new(en(), 2, "Category:Mammals", NameSpace::Category));
    for page in [10, 11, 12] {
        store.add_membership(&en(), page, 2);
    }
    store.add_membership(&en(), 2, 1);

    let graph = CategoryGraphBuilder::new(&store, &store).build(&en()).unwrap();
    let animals = graph.category_index(1).unwrap();
    let mammals = graph.category_index(2).unwrap();
    assert_eq!(graph.parents(mammals), &[animals]);
    assert_eq!(graph.pages(mammals), &[10, 11, 12]);
    // Animals collects Mammals' mass, so it is the more general category.
    assert!(graph.cost(animals) > graph.cost(mammals));
    assert_eq!(graph.min_cost(), graph.cost(mammals));
    assert_eq!(graph.top_categories(1)[0].0, animals);
    assert!(graph.is_useful(animals) && graph.is_useful(mammals));
}

#[test]
fn sled_store_feeds_builder_and_metric() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SledStore::open(dir.path()).unwrap());
    let lang = en();
    for (id, title) in [(1, "Dog"), (2, "Cat"), (3, "Mammal"), (4, "Pet")] {
        store.put_page(&LocalPage::new(lang.clone(), id, title, NameSpace::Article)).unwrap();
    }
    store.put_page(&LocalPage::new(lang.clone(), 100, "Category:Carnivores", NameSpace::Category)).unwrap();
    store.put_page(&LocalPage::new(lang.clone(), 101, "Category:Animals", NameSpace::Category)).unwrap();
    for (src, dst) in [(1, 3), (1, 4), (2, 3), (2, 4)] {
        store.put_link(&lang, src, dst).unwrap();
    }
    for (member_id, category_id) in [(1, 100), (2, 100), (100, 101)] {
        store.put_membership(&lang, CategoryMember { member_id, category_id }).unwrap();
    }
    store.flush().unwrap();

    let graph = CategoryGraphBuilder::new(store.as_ref(), store.as_ref()).build(&lang).unwrap();
    assert_eq!(graph.len(), 2);
    let start = store.categories_of(&lang, 1).unwrap();
    assert_eq!(start, vec![100]);
    let distances = category_distances(&graph, &start, &HashSet::from([101]), false);
    assert_eq!(distances.get(&101), Some(&2.0));

    let metric = MilneWittenMetric::new(Arc::clone(&store));
    let result = metric.similarity_by_id(&lang, 1, 2, LinkDirection::Out, true).unwrap();
    // Identical out-link sets.
    assert_eq!(result.score(), 1.0);
    let formatter = ExplanationFormatter::new(store.as_ref());
    let texts: Vec<String> = result.explanations().iter().map(|e| formatter.format(&lang, e).unwrap()).collect();
    assert_eq!(texts, vec!["Both Dog and Cat link to Mammal", "Both Dog and Cat link to Pet"]);
}
