use super::milne_witten;
use super::{Explanation, ExplanationTemplate, SrResult};
use crate::dao::{DaoResult, LinkDirection, PageLinkSource, PageSource};
use crate::model::{Language, LocalPage, PageId};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Milne-Witten relatedness between stored pages.
///
/// Fetches link sets through [`PageLinkSource`] and the corpus size through
/// [`PageSource`]; the article count is cached per language.
pub struct MilneWittenMetric<S: ?Sized> {
    source: Arc<S>,
    num_pages: RwLock<HashMap<Language, usize>>,
}

impl<S> MilneWittenMetric<S>
where
    S: PageSource + PageLinkSource + ?Sized,
{
    pub fn new(source: Arc<S>) -> Self {
        Self { source, num_pages: RwLock::new(HashMap::new()) }
    }

    pub fn source(&self) -> &S { &self.source }

    /// Relatedness of two pages. Pages of different languages score NaN.
    pub fn similarity(&self, page1: &LocalPage, page2: &LocalPage, direction: LinkDirection, explain: bool) -> DaoResult<SrResult> {
        if page1.language != page2.language {
            debug!(lang1 = %page1.language, lang2 = %page2.language, "cross-language similarity requested");
            return Ok(SrResult::nan().with_id(page2.id));
        }
        let language = &page1.language;
        let a = self.source.linked_page_ids(language, page1.id, direction)?;
        let b = self.source.linked_page_ids(language, page2.id, direction)?;
        let num_pages = self.num_pages(language)?;

        let result = milne_witten::similarity(&a, &b, num_pages, explain).with_id(page2.id);
        if !explain {
            return Ok(result);
        }
        let explanations = self.reword(result.explanations(), page1, page2, direction)?;
        Ok(result.with_explanations(explanations))
    }

    /// Like [`Self::similarity`], resolving ids (and redirects) first.
    /// An id that names no page scores NaN.
    pub fn similarity_by_id(&self, language: &Language, id1: PageId, id2: PageId, direction: LinkDirection, explain: bool) -> DaoResult<SrResult> {
        let page1 = self.source.resolve(language, id1)?;
        let page2 = self.source.resolve(language, id2)?;
        match (page1, page2) {
            (Some(p1), Some(p2)) => self.similarity(&p1, &p2, direction, explain),
            _ => Ok(SrResult::nan().with_id(id2)),
        }
    }

    /// Mean of the in-link and out-link scores, with both explanation lists
    /// (in-links first). NaN when either direction is not a valid score.
    pub fn combined_similarity(&self, page1: &LocalPage, page2: &LocalPage, explain: bool) -> DaoResult<SrResult> {
        let inlink = self.similarity(page1, page2, LinkDirection::In, explain)?;
        let outlink = self.similarity(page1, page2, LinkDirection::Out, explain)?;
        if !inlink.is_valid() || !outlink.is_valid() {
            return Ok(SrResult::nan().with_id(page2.id));
        }
        let score = 0.5 * inlink.score() + 0.5 * outlink.score();
        let mut explanations = inlink.explanations().to_vec();
        explanations.extend_from_slice(outlink.explanations());
        Ok(SrResult::new(score).with_id(page2.id).with_explanations(explanations))
    }

    pub fn combined_similarity_by_id(&self, language: &Language, id1: PageId, id2: PageId, explain: bool) -> DaoResult<SrResult> {
        let page1 = self.source.resolve(language, id1)?;
        let page2 = self.source.resolve(language, id2)?;
        match (page1, page2) {
            (Some(p1), Some(p2)) => self.combined_similarity(&p1, &p2, explain),
            _ => Ok(SrResult::nan().with_id(id2)),
        }
    }

    /// Pages sharing at least one link with `page`, best first.
    ///
    /// Candidates come from walking each linked page back in the opposite
    /// direction; `valid_ids` restricts them when given.
    pub fn most_similar(
        &self,
        page: &LocalPage,
        direction: LinkDirection,
        max_results: usize,
        valid_ids: Option<&HashSet<PageId>>,
    ) -> DaoResult<Vec<SrResult>> {
        let language = &page.language;
        let links = self.source.linked_page_ids(language, page.id, direction)?;

        let mut shared: HashMap<PageId, usize> = HashMap::new();
        for &linked in &links {
            for other in self.source.linked_page_ids(language, linked, direction.reverse())? {
                if other == page.id || valid_ids.is_some_and(|ids| !ids.contains(&other)) {
                    continue;
                }
                *shared.entry(other).or_insert(0) += 1;
            }
        }

        let num_pages = self.num_pages(language)?;
        let mut results = Vec::with_capacity(shared.len());
        for (candidate, count) in shared {
            let candidate_links = self.source.linked_page_ids(language, candidate, direction)?.len();
            let score = milne_witten::score_from_counts(links.len(), candidate_links, count, num_pages);
            results.push(SrResult::new(score).with_id(candidate));
        }
        results.sort_by(by_score_desc);
        results.truncate(max_results);
        Ok(results)
    }

    /// Number of valid articles in `language`, counted once.
    pub fn num_pages(&self, language: &Language) -> DaoResult<usize> {
        if let Some(&n) = self.num_pages.read().get(language) {
            return Ok(n);
        }
        let n = self.source.count_articles(language)?;
        self.num_pages.write().insert(language.clone(), n);
        Ok(n)
    }

    fn reword(&self, explanations: &[Explanation], page1: &LocalPage, page2: &LocalPage, direction: LinkDirection) -> DaoResult<Vec<Explanation>> {
        let mut out = Vec::with_capacity(explanations.len());
        for explanation in explanations {
            let Some(&shared) = explanation.refs.first() else {
                continue;
            };
            // Shared pages that no longer resolve are dropped.
            if self.source.page(&page1.language, shared)?.is_none() {
                continue;
            }
            out.push(match direction {
                LinkDirection::Out => Explanation::new(ExplanationTemplate::BothLinkTo, vec![page1.id, page2.id, shared]),
                LinkDirection::In => Explanation::new(ExplanationTemplate::LinksToBoth, vec![shared, page1.id, page2.id]),
            });
        }
        Ok(out)
    }
}

/// Descending score, NaN last, ties by ascending id.
fn by_score_desc(a: &SrResult, b: &SrResult) -> Ordering {
    match (a.score().is_nan(), b.score().is_nan()) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => b.score().total_cmp(&a.score()).then(a.id.cmp(&b.id)),
    }
}
