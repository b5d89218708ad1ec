//! Persistent page, link and category-membership store on sled.
//!
//! Keys are `<language code> 0x00 <u32 big-endian>...` so a language (or a
//! language + page) prefix scan yields its rows in id order.

use crate::dao::{CategoryMemberSource, DaoError, DaoIter, DaoResult, LinkDirection, PageLinkSource, PageSource};
use crate::model::{CategoryMember, Language, LocalPage, NameSpace, PageId};
use std::collections::HashSet;
use std::path::Path;

const EMPTY: &[u8] = &[];

pub struct SledStore {
    db: sled::Db,
    pages: sled::Tree,
    links_out: sled::Tree,
    links_in: sled::Tree,
    members: sled::Tree,
    member_of: sled::Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> DaoResult<Self> {
        let db = sled::open(path)?;
        Ok(Self {
            pages: db.open_tree("pages")?,
            links_out: db.open_tree("links_out")?,
            links_in: db.open_tree("links_in")?,
            members: db.open_tree("members")?,
            member_of: db.open_tree("member_of")?,
            db,
        })
    }

    pub fn put_page(&self, page: &LocalPage) -> DaoResult<()> {
        let bytes = bincode::serialize(page)?;
        self.pages.insert(key(&page.language, &[page.id]), bytes)?;
        Ok(())
    }

    pub fn put_link(&self, language: &Language, src: PageId, dst: PageId) -> DaoResult<()> {
        self.links_out.insert(key(language, &[src, dst]), EMPTY)?;
        self.links_in.insert(key(language, &[dst, src]), EMPTY)?;
        Ok(())
    }

    pub fn put_membership(&self, language: &Language, member: CategoryMember) -> DaoResult<()> {
        self.members.insert(key(language, &[member.category_id, member.member_id]), EMPTY)?;
        self.member_of.insert(key(language, &[member.member_id, member.category_id]), EMPTY)?;
        Ok(())
    }

    pub fn flush(&self) -> DaoResult<usize> { Ok(self.db.flush()?) }
}

fn key(language: &Language, ids: &[PageId]) -> Vec<u8> {
    let code = language.code().as_bytes();
    let mut k = Vec::with_capacity(code.len() + 1 + ids.len() * 4);
    k.extend_from_slice(code);
    k.push(0);
    for id in ids {
        k.extend_from_slice(&id.to_be_bytes());
    }
    k
}

/// Decodes the trailing `n` ids of a key produced by [`key`].
fn trailing_ids<const N: usize>(k: &[u8]) -> DaoResult<[PageId; N]> {
    if k.len() < N * 4 {
        return Err(DaoError::Malformed(format!("key of {} bytes is too short", k.len())));
    }
    let tail = &k[k.len() - N * 4..];
    let mut ids = [0; N];
    for (i, chunk) in tail.chunks_exact(4).enumerate() {
        ids[i] = PageId::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(ids)
}

impl PageSource for SledStore {
    fn pages(&self, language: &Language, namespace: NameSpace) -> DaoResult<DaoIter<'_, LocalPage>> {
        let iter = self.pages.scan_prefix(key(language, &[])).filter_map(move |row| {
            let decoded = row
                .map_err(DaoError::from)
                .and_then(|(_, v)| bincode::deserialize::<LocalPage>(&v).map_err(DaoError::from));
            match decoded {
                Ok(page) if page.namespace != namespace => None,
                other => Some(other),
            }
        });
        Ok(Box::new(iter))
    }

    fn page(&self, language: &Language, id: PageId) -> DaoResult<Option<LocalPage>> {
        match self.pages.get(key(language, &[id]))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn count_articles(&self, language: &Language) -> DaoResult<usize> {
        let mut n = 0;
        for page in self.pages(language, NameSpace::Article)? {
            if page?.is_valid_article() {
                n += 1;
            }
        }
        Ok(n)
    }
}

impl CategoryMemberSource for SledStore {
    fn memberships(&self, language: &Language) -> DaoResult<DaoIter<'_, CategoryMember>> {
        let iter = self.members.scan_prefix(key(language, &[])).map(|row| -> DaoResult<CategoryMember> {
            let (k, _) = row?;
            let [category_id, member_id] = trailing_ids::<2>(&k)?;
            Ok(CategoryMember { member_id, category_id })
        });
        Ok(Box::new(iter))
    }

    fn categories_of(&self, language: &Language, page_id: PageId) -> DaoResult<Vec<PageId>> {
        self.member_of
            .scan_prefix(key(language, &[page_id]))
            .map(|row| -> DaoResult<PageId> {
                let (k, _) = row?;
                let [category_id] = trailing_ids::<1>(&k)?;
                Ok(category_id)
            })
            .collect()
    }
}

impl PageLinkSource for SledStore {
    fn linked_page_ids(&self, language: &Language, page_id: PageId, direction: LinkDirection) -> DaoResult<HashSet<PageId>> {
        let tree = match direction {
            LinkDirection::Out => &self.links_out,
            LinkDirection::In => &self.links_in,
        };
        tree.scan_prefix(key(language, &[page_id]))
            .map(|row| -> DaoResult<PageId> {
                let (k, _) = row?;
                let [other] = trailing_ids::<1>(&k)?;
                Ok(other)
            })
            .collect()
    }
}
