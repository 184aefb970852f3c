//! Offset pagination.

use serde::{Deserialize, Serialize};

/// Default page size for list endpoints.
pub const DEFAULT_LIMIT: u32 = 20;

/// Largest page size a client may request.
pub const MAX_LIMIT: u32 = 100;

/// A clamped page request. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Build a request from optional client input, clamping page to at least
    /// 1 and limit to `1..=100`.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    /// Rows to skip.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    #[must_use]
    pub const fn limit_i64(&self) -> i64 {
        self.limit as i64
    }
}

/// Pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_items: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    /// 1-based index of the first item on this page (0 when empty).
    pub start_index: i64,
    /// 1-based index of the last item on this page (0 when empty).
    pub end_index: i64,
}

impl Pagination {
    #[must_use]
    pub fn new(request: PageRequest, total_items: i64) -> Self {
        let total_items = total_items.max(0);
        let limit = request.limit_i64();
        let offset = request.offset();
        let total_pages = (total_items + limit - 1) / limit;
        let (start_index, end_index) = if offset < total_items {
            (offset + 1, (offset + limit).min(total_items))
        } else {
            (0, 0)
        };

        Self {
            page: request.page,
            limit: request.limit,
            total_items,
            total_pages,
            has_next_page: i64::from(request.page) < total_pages,
            has_prev_page: request.page > 1,
            start_index,
            end_index,
        }
    }
}

/// A page of items with its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total_items: i64) -> Self {
        Self {
            items,
            pagination: Pagination::new(request, total_items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamping() {
        assert_eq!(PageRequest::new(None, None), PageRequest { page: 1, limit: 20 });
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::new(Some(3), Some(500)).limit, 100);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn test_middle_page() {
        let p = Pagination::new(PageRequest::new(Some(2), Some(20)), 45);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next_page);
        assert!(p.has_prev_page);
        assert_eq!((p.start_index, p.end_index), (21, 40));
    }

    #[test]
    fn test_last_partial_page() {
        let p = Pagination::new(PageRequest::new(Some(3), Some(20)), 45);
        assert!(!p.has_next_page);
        assert_eq!((p.start_index, p.end_index), (41, 45));
    }

    #[test]
    fn test_exact_multiple() {
        let p = Pagination::new(PageRequest::new(Some(2), Some(10)), 20);
        assert_eq!(p.total_pages, 2);
        assert!(!p.has_next_page);
    }

    #[test]
    fn test_empty() {
        let p = Pagination::new(PageRequest::default(), 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next_page);
        assert!(!p.has_prev_page);
        assert_eq!((p.start_index, p.end_index), (0, 0));
    }

    #[test]
    fn test_page_past_end() {
        let p = Pagination::new(PageRequest::new(Some(9), Some(10)), 15);
        assert_eq!((p.start_index, p.end_index), (0, 0));
        assert!(!p.has_next_page);
    }
}
