use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use lazy_static::lazy_static;
use regex::Regex;

pub type PageId = u32;
/// Dense position of a category inside a [`crate::CategoryGraph`].
pub type CategoryIndex = usize;

lazy_static! {
    static ref LANG_CODE: Regex = Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$").expect("valid regex");
}

#[derive(Debug, Error)]
#[error("invalid language code {0:?}")]
pub struct ParseLanguageError(pub String);

/// A wiki language edition, identified by its lowercase code ("en", "simple", "zh-yue").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    pub fn code(&self) -> &str { &self.0 }
}

impl FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_lowercase();
        if code.len() > 16 || !LANG_CODE.is_match(&code) {
            return Err(ParseLanguageError(s.to_string()));
        }
        Ok(Language(code))
    }
}

impl TryFrom<String> for Language {
    type Error = ParseLanguageError;
    fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<Language> for String {
    fn from(lang: Language) -> String { lang.0 }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameSpace {
    Article,
    Category,
    Talk,
    User,
    Template,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalPage {
    pub language: Language,
    pub id: PageId,
    /// Canonical title, see [`crate::title::canonicalize`].
    pub title: String,
    pub namespace: NameSpace,
    /// Target of the redirect when this page is one.
    pub redirect_to: Option<PageId>,
    pub disambig: bool,
}

impl LocalPage {
    pub fn new(language: Language, id: PageId, title: impl AsRef<str>, namespace: NameSpace) -> Self {
        Self {
            language,
            id,
            title: crate::title::canonicalize(title.as_ref()),
            namespace,
            redirect_to: None,
            disambig: false,
        }
    }

    pub fn is_redirect(&self) -> bool { self.redirect_to.is_some() }

    /// Articles counted towards the corpus size: no redirects, no disambiguation pages.
    pub fn is_valid_article(&self) -> bool {
        self.namespace == NameSpace::Article && !self.is_redirect() && !self.disambig
    }
}

/// One row of the membership relation: `member_id` is filed under `category_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryMember {
    pub member_id: PageId,
    pub category_id: PageId,
}
