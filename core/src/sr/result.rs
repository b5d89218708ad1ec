use crate::model::PageId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationTemplate {
    /// A single shared linked page, before the caller knows the direction.
    SharedLink,
    /// Out-links: refs are `[page1, page2, shared]`.
    BothLinkTo,
    /// In-links: refs are `[shared, page1, page2]`.
    LinksToBoth,
}

impl ExplanationTemplate {
    /// Template text; `?N` stands for the N-th reference.
    pub fn text(self) -> &'static str {
        match self {
            ExplanationTemplate::SharedLink => "?1",
            ExplanationTemplate::BothLinkTo => "Both ?1 and ?2 link to ?3",
            ExplanationTemplate::LinksToBoth => "?1 links to both ?2 and ?3",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub template: ExplanationTemplate,
    pub refs: Vec<PageId>,
}

impl Explanation {
    pub fn new(template: ExplanationTemplate, refs: Vec<PageId>) -> Self {
        Self { template, refs }
    }
}

/// Outcome of one relatedness computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrResult {
    /// The page the score is about, when known (the second page of a pair).
    pub id: Option<PageId>,
    score: f64,
    explanations: Vec<Explanation>,
}

impl SrResult {
    pub fn new(score: f64) -> Self {
        Self { id: None, score, explanations: Vec::new() }
    }

    pub fn nan() -> Self { Self::new(f64::NAN) }

    pub fn with_id(mut self, id: PageId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_explanations(mut self, explanations: Vec<Explanation>) -> Self {
        self.explanations = explanations;
        self
    }

    pub fn score(&self) -> f64 { self.score }
    pub fn explanations(&self) -> &[Explanation] { &self.explanations }

    /// False for NaN and infinite scores.
    pub fn is_valid(&self) -> bool { self.score.is_finite() }
}
