//! Query shapes, fetch templates, local evaluation, and the paged executor.

pub mod eval;
pub mod expression;
pub mod fetch;
pub mod markup;
pub mod pager;

pub use expression::{
    ColumnSet, Condition, ConditionOperator, FilterExpression, JoinOperator, LinkEntity, LogicalOperator,
    OrderExpression, QueryByAttribute, QueryExpression,
};
pub use fetch::{FetchQuery, FetchTemplate};
pub use pager::{CursorState, PagedQueryExecutor};

use crate::record::Record;
use serde::{Deserialize, Serialize};

/// Largest page a store hands back in one call.
pub const DEFAULT_PAGE_SIZE: u32 = 5000;

/// Paging request attached to structured queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingInfo {
    /// 1-based.
    pub page_number: u32,
    pub count: u32,
    /// Opaque resume token from the previous page, if any.
    #[serde(default)]
    pub paging_cookie: Option<String>,
}

impl PagingInfo {
    pub fn first(count: u32) -> Self {
        Self {
            page_number: 1,
            count,
            paging_cookie: None,
        }
    }
}

impl Default for PagingInfo {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

/// One of the three query shapes a store accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuerySpec {
    Expression(QueryExpression),
    ByAttribute(QueryByAttribute),
    Fetch(FetchQuery),
}

impl QuerySpec {
    pub fn fetch(markup: impl Into<String>) -> Self {
        QuerySpec::Fetch(FetchQuery::new(markup))
    }

    /// Kind label for logs.
    pub fn shape(&self) -> &'static str {
        match self {
            QuerySpec::Expression(_) => "expression",
            QuerySpec::ByAttribute(_) => "by_attribute",
            QuerySpec::Fetch(_) => "fetch",
        }
    }
}

impl From<QueryExpression> for QuerySpec {
    fn from(query: QueryExpression) -> Self {
        QuerySpec::Expression(query)
    }
}

impl From<QueryByAttribute> for QuerySpec {
    fn from(query: QueryByAttribute) -> Self {
        QuerySpec::ByAttribute(query)
    }
}

impl From<FetchQuery> for QuerySpec {
    fn from(query: FetchQuery) -> Self {
        QuerySpec::Fetch(query)
    }
}

/// One page of results from `retrieve_multiple`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    pub records: Vec<Record>,
    #[serde(default)]
    pub paging_cookie: Option<String>,
    #[serde(default)]
    pub more_records: bool,
}

impl RecordPage {
    pub fn last(records: Vec<Record>) -> Self {
        Self {
            records,
            paging_cookie: None,
            more_records: false,
        }
    }
}
