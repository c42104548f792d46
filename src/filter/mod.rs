//! Diary search statement builder: composes the owner scope with optional
//! date, category and tag-set predicates behind one placeholder cursor.

pub mod error;
pub mod filter;
pub mod filter_order;
pub mod filter_where;
pub mod tags;
pub mod types;

pub use error::FilterError;
pub use filter::{search_rules, DiaryFilter};
pub use filter_order::SortDirection;
pub use filter_where::{FilterWhere, Predicate};
pub use tags::TagSet;
pub use types::*;
