//! Paged retrieval
//!
//! Stores return at most one page per call. The executor keeps asking for the next page,
//! carrying the resume token forward, until the store reports there is nothing more.

use super::fetch::FetchTemplate;
use super::{PagingInfo, QuerySpec, RecordPage, DEFAULT_PAGE_SIZE};
use crate::error::ContextError;
use crate::record::Record;
use crate::store::RecordStore;
use tracing::debug;

/// Position of a paged retrieval between store calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorState {
    /// 1-based number of the next page to request.
    pub page_number: u32,
    pub resume_token: String,
    pub has_more: bool,
}

impl CursorState {
    pub fn start() -> Self {
        Self {
            page_number: 1,
            resume_token: String::new(),
            has_more: true,
        }
    }

    fn paging(&self, count: u32) -> PagingInfo {
        PagingInfo {
            page_number: self.page_number,
            count,
            paging_cookie: (!self.resume_token.is_empty()).then(|| self.resume_token.clone()),
        }
    }

    fn advance(&mut self, page: &RecordPage) {
        self.has_more = page.more_records;
        self.resume_token = page.paging_cookie.clone().unwrap_or_default();
        self.page_number += 1;
    }
}

impl Default for CursorState {
    fn default() -> Self {
        Self::start()
    }
}

/// A query prepared once and rendered for each page.
enum Prepared<'q> {
    Structured(&'q QuerySpec),
    Fetch(FetchTemplate),
}

impl Prepared<'_> {
    fn new(spec: &QuerySpec, count: u32) -> Result<Prepared<'_>, ContextError> {
        match spec {
            QuerySpec::Fetch(fetch) => Ok(Prepared::Fetch(FetchTemplate::normalize(&fetch.markup, count)?)),
            other => Ok(Prepared::Structured(other)),
        }
    }

    fn page(&self, cursor: &CursorState, count: u32) -> QuerySpec {
        match self {
            Prepared::Fetch(template) => QuerySpec::fetch(template.render(cursor.page_number, &cursor.resume_token)),
            Prepared::Structured(QuerySpec::Expression(query)) => {
                let mut query = query.clone();
                query.paging = Some(cursor.paging(count));
                QuerySpec::Expression(query)
            }
            Prepared::Structured(QuerySpec::ByAttribute(query)) => {
                let mut query = query.clone();
                query.paging = Some(cursor.paging(count));
                QuerySpec::ByAttribute(query)
            }
            Prepared::Structured(other) => (*other).clone(),
        }
    }
}

/// Drives a store page by page.
pub struct PagedQueryExecutor<'s> {
    store: &'s dyn RecordStore,
    page_size: u32,
}

impl<'s> PagedQueryExecutor<'s> {
    /// `page_size` is clamped to `1..=5000`.
    pub fn new(store: &'s dyn RecordStore, page_size: u32) -> Self {
        Self {
            store,
            page_size: page_size.clamp(1, DEFAULT_PAGE_SIZE),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Every matching record, concatenated in page order.
    ///
    /// Stops when the store reports no more pages or returns an empty page. A store failure on
    /// any page aborts the run; records from earlier pages are dropped.
    pub fn run_all(&self, spec: &QuerySpec) -> Result<Vec<Record>, ContextError> {
        let prepared = Prepared::new(spec, self.page_size)?;
        let mut cursor = CursorState::start();
        let mut records = Vec::new();
        while cursor.has_more {
            let request = prepared.page(&cursor, self.page_size);
            let page = self
                .store
                .retrieve_multiple(&request)
                .map_err(|source| ContextError::QueryFailed {
                    page: cursor.page_number,
                    source,
                })?;
            debug!(
                shape = spec.shape(),
                page = cursor.page_number,
                records = page.records.len(),
                more = page.more_records,
                "Fetched page"
            );
            if page.records.is_empty() {
                break;
            }
            cursor.advance(&page);
            records.extend(page.records);
        }
        debug!(total = records.len(), pages = cursor.page_number - 1, "Paged query complete");
        Ok(records)
    }

    /// First record of the first page of `first_page_size` records, or the empty sentinel.
    pub fn retrieve_first(&self, spec: &QuerySpec, first_page_size: u32) -> Result<Record, ContextError> {
        let count = first_page_size.clamp(1, DEFAULT_PAGE_SIZE);
        let prepared = Prepared::new(spec, count)?;
        let cursor = CursorState::start();
        let page = self
            .store
            .retrieve_multiple(&prepared.page(&cursor, count))
            .map_err(|source| ContextError::QueryFailed { page: 1, source })?;
        Ok(page.records.into_iter().next().unwrap_or_else(Record::empty))
    }
}
