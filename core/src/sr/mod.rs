//! Semantic relatedness between pages.

mod explain;
mod metric;
pub mod milne_witten;
mod result;

pub use explain::ExplanationFormatter;
pub use metric::MilneWittenMetric;
pub use result::{Explanation, ExplanationTemplate, SrResult};
