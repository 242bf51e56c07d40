//! Common types

use serde::{Deserialize, Serialize};

/// Page request. Pages are 1-based; a page past the end resolves to the last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, per_page: super::constants::DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.clamp(1, super::constants::MAX_PAGE_SIZE),
        }
    }

    pub fn total_pages(&self, total: i64) -> u32 {
        if total <= 0 {
            return 1;
        }
        let per_page = i64::from(self.per_page);
        ((total + per_page - 1) / per_page) as u32
    }

    /// Clamp the requested page into `1..=total_pages` for the given row count.
    pub fn clamp_to(&self, total: i64) -> Self {
        Self {
            page: self.page.min(self.total_pages(total)).max(1),
            per_page: self.per_page,
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total: i64) -> Self {
        Self {
            items,
            page: pagination.page,
            per_page: pagination.per_page,
            total,
            total_pages: pagination.total_pages(total),
        }
    }

    pub fn empty(pagination: Pagination) -> Self {
        Self::new(Vec::new(), pagination, 0)
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_offsets() {
        let p = Pagination::new(Some(3), 25);
        assert_eq!(p.offset(), 50);
        assert_eq!(p.limit(), 25);
    }

    #[test]
    fn test_pagination_zero_page_is_first() {
        let p = Pagination::new(Some(0), 20);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_clamp_past_last_page() {
        let p = Pagination::new(Some(9), 25).clamp_to(51);
        assert_eq!(p.page, 3);
        let empty = Pagination::new(Some(4), 25).clamp_to(0);
        assert_eq!(empty.page, 1);
    }

    #[test]
    fn test_page_map_keeps_counts() {
        let page = Page::new(vec![1, 2, 3], Pagination::new(Some(1), 3), 7);
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20, 30]);
        assert_eq!(mapped.total_pages, 3);
        assert!(mapped.has_next());
    }
}
