//! Data-access capabilities consumed by the graph builder and the
//! relatedness metric. Storage lives behind these traits.

use crate::model::{CategoryMember, Language, LocalPage, NameSpace, PageId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaoError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("malformed record: {0}")]
    Malformed(String),
}

pub type DaoResult<T> = Result<T, DaoError>;

/// Streaming result set; each item may fail independently.
pub type DaoIter<'a, T> = Box<dyn Iterator<Item = DaoResult<T>> + 'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkDirection {
    /// Pages the given page links to.
    Out,
    /// Pages linking to the given page.
    In,
}

impl LinkDirection {
    pub fn from_out_links(out_links: bool) -> Self {
        if out_links { LinkDirection::Out } else { LinkDirection::In }
    }

    pub fn reverse(self) -> Self {
        match self {
            LinkDirection::Out => LinkDirection::In,
            LinkDirection::In => LinkDirection::Out,
        }
    }
}

pub trait PageSource {
    /// All pages of `language` in `namespace`.
    fn pages(&self, language: &Language, namespace: NameSpace) -> DaoResult<DaoIter<'_, LocalPage>>;

    fn page(&self, language: &Language, id: PageId) -> DaoResult<Option<LocalPage>>;

    /// Number of articles that are neither redirects nor disambiguation pages.
    fn count_articles(&self, language: &Language) -> DaoResult<usize>;

    /// Looks up a page and follows a single redirect hop to its canonical page.
    fn resolve(&self, language: &Language, id: PageId) -> DaoResult<Option<LocalPage>> {
        match self.page(language, id)? {
            Some(LocalPage { redirect_to: Some(target), .. }) => self.page(language, target),
            other => Ok(other),
        }
    }
}

pub trait CategoryMemberSource {
    /// The full membership relation of `language`. Called once per pass.
    fn memberships(&self, language: &Language) -> DaoResult<DaoIter<'_, CategoryMember>>;

    /// Ids of the categories `page_id` is filed under.
    fn categories_of(&self, language: &Language, page_id: PageId) -> DaoResult<Vec<PageId>>;
}

pub trait PageLinkSource {
    fn linked_page_ids(&self, language: &Language, page_id: PageId, direction: LinkDirection) -> DaoResult<HashSet<PageId>>;
}

impl<T: PageSource + ?Sized> PageSource for Arc<T> {
    fn pages(&self, language: &Language, namespace: NameSpace) -> DaoResult<DaoIter<'_, LocalPage>> {
        (**self).pages(language, namespace)
    }
    fn page(&self, language: &Language, id: PageId) -> DaoResult<Option<LocalPage>> { (**self).page(language, id) }
    fn count_articles(&self, language: &Language) -> DaoResult<usize> { (**self).count_articles(language) }
    fn resolve(&self, language: &Language, id: PageId) -> DaoResult<Option<LocalPage>> { (**self).resolve(language, id) }
}

impl<T: CategoryMemberSource + ?Sized> CategoryMemberSource for Arc<T> {
    fn memberships(&self, language: &Language) -> DaoResult<DaoIter<'_, CategoryMember>> { (**self).memberships(language) }
    fn categories_of(&self, language: &Language, page_id: PageId) -> DaoResult<Vec<PageId>> {
        (**self).categories_of(language, page_id)
    }
}

impl<T: PageLinkSource + ?Sized> PageLinkSource for Arc<T> {
    fn linked_page_ids(&self, language: &Language, page_id: PageId, direction: LinkDirection) -> DaoResult<HashSet<PageId>> {
        (**self).linked_page_ids(language, page_id, direction)
    }
}
