//! Structural relatedness between encyclopedia pages: a ranked category
//! graph and the Milne-Witten link-overlap measure.

pub mod category;
pub mod dao;
pub mod memory;
pub mod model;
pub mod persist;
pub mod sr;
pub mod store;
pub mod title;

pub use category::{CategoryGraph, CategoryGraphBuilder, GraphError};
pub use dao::{CategoryMemberSource, DaoError, DaoResult, LinkDirection, PageLinkSource, PageSource};
pub use model::{CategoryIndex, CategoryMember, Language, LocalPage, NameSpace, PageId};
pub use sr::{Explanation, ExplanationFormatter, ExplanationTemplate, MilneWittenMetric, SrResult};
