//! Page-based pagination shared by catalog and order queries.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Build from optional query parameters, clamping `per_page` to `[1, max]`
    /// and `page` to at least 1.
    pub fn new(page: Option<u32>, per_page: Option<u32>, default_size: u32, max_size: u32) -> Self {
        let max_size = max_size.max(1);
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(default_size).clamp(1, max_size),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }
}

/// One page of results plus totals across all pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let per_page = u64::from(request.per_page.max(1));
        let pages = u32::try_from(total.div_ceil(per_page)).unwrap_or(u32::MAX);
        Self {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
            pages,
        }
    }

    /// Slice an already filtered and sorted collection.
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(request.per_page as usize)
            .collect();
        Self::new(items, total, request)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_clamped() {
        let req = PageRequest::new(Some(0), Some(1_000), 10, 100);
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 100);

        let req = PageRequest::new(None, Some(0), 10, 100);
        assert_eq!(req.per_page, 1);

        assert_eq!(PageRequest::new(None, None, 10, 100), PageRequest::default());
    }

    #[test]
    fn slices_and_counts_pages() {
        let req = PageRequest { page: 2, per_page: 3 };
        let page = Page::from_sorted((1..=7).collect::<Vec<_>>(), req);
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 7);
        assert_eq!(page.pages, 3);

        let past_end = Page::from_sorted((1..=7).collect::<Vec<_>>(), PageRequest { page: 9, per_page: 3 });
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.pages, 3);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let page: Page<u8> = Page::new(vec![], 0, PageRequest::default());
        assert_eq!(page.pages, 0);
    }
}
