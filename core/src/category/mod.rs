//! Category hierarchy of a language edition, ranked by a leaky PageRank.

mod builder;
pub mod distance;
mod graph;
pub mod pagerank;
pub mod similarity;

pub use builder::CategoryGraphBuilder;
pub use graph::CategoryGraph;

use crate::dao::DaoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error(transparent)]
    Dao(#[from] DaoError),
    /// The fill pass over the membership relation disagreed with the count pass.
    #[error("{relation} of category {category:?} left {remaining} unfilled slots after the fill pass")]
    EdgeCountMismatch { category: String, relation: &'static str, remaining: i64 },
}
