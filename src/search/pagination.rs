//! Pagination state for one query
//!
//! A cursor hands out page numbers until one of three things happens: a
//! page comes back empty, the items seen so far reach the reported total,
//! or the per-query page ceiling is hit.

use crate::search::SearchPage;

/// Sequential page cursor for a single query
#[derive(Debug, Clone)]
pub struct PageCursor {
    query: String,
    max_pages: u32,
    next_page: u32,
    cumulative: u64,
    finished: bool,
}

impl PageCursor {
    pub fn new(query: impl Into<String>, max_pages: u32) -> Self {
        Self {
            query: query.into(),
            max_pages,
            next_page: 1,
            cumulative: 0,
            finished: false,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// The next 1-based page to request, or `None` when pagination is over
    pub fn next_page(&self) -> Option<u32> {
        if self.finished || self.next_page > self.max_pages {
            None
        } else {
            Some(self.next_page)
        }
    }

    /// Records a fetched page and returns whether another page should follow
    pub fn advance(&mut self, page: &SearchPage) -> bool {
        self.cumulative += page.items.len() as u64;
        self.next_page += 1;

        if page.items.is_empty() || self.cumulative >= page.total_count {
            self.finished = true;
        }

        self.next_page().is_some()
    }

    /// Ends pagination early (used when a page could not be fetched)
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Items seen across all pages so far
    pub fn cumulative(&self) -> u64 {
        self.cumulative
    }

    pub fn is_finished(&self) -> bool {
        self.next_page().is_none()
    }
}
