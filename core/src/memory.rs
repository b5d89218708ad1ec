//! In-memory implementation of the data-access traits, for fixtures and tests.

use crate::dao::{CategoryMemberSource, DaoIter, DaoResult, LinkDirection, PageLinkSource, PageSource};
use crate::model::{CategoryMember, Language, LocalPage, NameSpace, PageId};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Default)]
pub struct MemoryStore {
    // BTreeMap keeps page enumeration in id order.
    pages: HashMap<Language, BTreeMap<PageId, LocalPage>>,
    out_links: HashMap<(Language, PageId), HashSet<PageId>>,
    in_links: HashMap<(Language, PageId), HashSet<PageId>>,
    members: HashMap<Language, Vec<CategoryMember>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn add_page(&mut self, page: LocalPage) -> &mut Self {
        self.pages.entry(page.language.clone()).or_default().insert(page.id, page);
        self
    }

    pub fn add_link(&mut self, language: &Language, src: PageId, dst: PageId) -> &mut Self {
        self.out_links.entry((language.clone(), src)).or_default().insert(dst);
        self.in_links.entry((language.clone(), dst)).or_default().insert(src);
        self
    }

    pub fn add_membership(&mut self, language: &Language, member_id: PageId, category_id: PageId) -> &mut Self {
        self.members.entry(language.clone()).or_default().push(CategoryMember { member_id, category_id });
        self
    }
}

impl PageSource for MemoryStore {
    fn pages(&self, language: &Language, namespace: NameSpace) -> DaoResult<DaoIter<'_, LocalPage>> {
        let iter = self
            .pages
            .get(language)
            .into_iter()
            .flat_map(|pages| pages.values())
            .filter(move |p| p.namespace == namespace)
            .map(|p| Ok(p.clone()));
        Ok(Box::new(iter))
    }

    fn page(&self, language: &Language, id: PageId) -> DaoResult<Option<LocalPage>> {
        Ok(self.pages.get(language).and_then(|pages| pages.get(&id)).cloned())
    }

    fn count_articles(&self, language: &Language) -> DaoResult<usize> {
        Ok(self
            .pages
            .get(language)
            .map(|pages| pages.values().filter(|p| p.is_valid_article()).count())
            .unwrap_or(0))
    }
}

impl CategoryMemberSource for MemoryStore {
    fn memberships(&self, language: &Language) -> DaoResult<DaoIter<'_, CategoryMember>> {
        let iter = self.members.get(language).into_iter().flatten().map(|m| Ok(*m));
        Ok(Box::new(iter))
    }

    fn categories_of(&self, language: &Language, page_id: PageId) -> DaoResult<Vec<PageId>> {
        Ok(self
            .members
            .get(language)
            .into_iter()
            .flatten()
            .filter(|m| m.member_id == page_id)
            .map(|m| m.category_id)
            .collect())
    }
}

impl PageLinkSource for MemoryStore {
    fn linked_page_ids(&self, language: &Language, page_id: PageId, direction: LinkDirection) -> DaoResult<HashSet<PageId>> {
        let links = match direction {
            LinkDirection::Out => &self.out_links,
            LinkDirection::In => &self.in_links,
        };
        Ok(links.get(&(language.clone(), page_id)).cloned().unwrap_or_default())
    }
}
