use super::Explanation;
use crate::dao::{DaoResult, PageSource};
use crate::model::Language;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\?(\d+)").expect("valid regex");
}

/// Renders explanations as text, naming referenced pages by title.
pub struct ExplanationFormatter<'a, P: ?Sized> {
    pages: &'a P,
}

impl<'a, P: PageSource + ?Sized> ExplanationFormatter<'a, P> {
    pub fn new(pages: &'a P) -> Self {
        Self { pages }
    }

    /// `?N` becomes the title of the N-th reference, or `#id` when the page
    /// is unknown. Placeholders without a reference are left as written.
    pub fn format(&self, language: &Language, explanation: &Explanation) -> DaoResult<String> {
        let mut titles = Vec::with_capacity(explanation.refs.len());
        for &id in &explanation.refs {
            titles.push(match self.pages.page(language, id)? {
                Some(page) => page.title,
                None => format!("#{id}"),
            });
        }
        let text = PLACEHOLDER.replace_all(explanation.template.text(), |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| titles.get(i))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        });
        Ok(text.into_owned())
    }
}
