use crate::error::InventoryError;
use serde::Serialize;

/// Page cursor over the filtered listing (pages are 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    page_size: usize,
}

/// Resolved page bounds for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageWindow {
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub start: usize,
    pub end: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

impl Pagination {
    pub fn new(page_size: usize) -> Result<Self, InventoryError> {
        if page_size == 0 {
            return Err(InventoryError::InvalidPageSize);
        }
        Ok(Self { page: 1, page_size })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Change page size; always returns to page 1
    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), InventoryError> {
        if page_size == 0 {
            return Err(InventoryError::InvalidPageSize);
        }
        self.page_size = page_size;
        self.page = 1;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn total_pages(&self, total_items: usize) -> usize {
        total_items.div_ceil(self.page_size)
    }

    fn last_page(&self, total_items: usize) -> usize {
        self.total_pages(total_items).max(1)
    }

    /// Jump to a page; out-of-range requests are ignored. Returns true on change.
    pub fn go_to(&mut self, page: usize, total_items: usize) -> bool {
        if page == 0 || page > self.last_page(total_items) || page == self.page {
            return false;
        }
        self.page = page;
        true
    }

    pub fn next(&mut self, total_items: usize) -> bool {
        self.go_to(self.page + 1, total_items)
    }

    pub fn prev(&mut self) -> bool {
        if self.page <= 1 {
            return false;
        }
        self.page -= 1;
        true
    }

    /// Pull a stale page index back into range after the listing shrank
    pub fn clamp(&mut self, total_items: usize) -> usize {
        let last = self.last_page(total_items);
        if self.page > last {
            tracing::debug!(from = self.page, to = last, "clamping stale page index");
            self.page = last;
        }
        self.page
    }

    /// Bounds of the current page; assumes `clamp` already ran
    pub fn window(&self, total_items: usize) -> PageWindow {
        let total_pages = self.total_pages(total_items);
        let start = ((self.page - 1) * self.page_size).min(total_items);
        let end = (start + self.page_size).min(total_items);

        PageWindow {
            page: self.page,
            page_size: self.page_size,
            total_pages,
            total_items,
            start,
            end,
            has_prev: self.page > 1,
            has_next: self.page < total_pages,
        }
    }

    /// Items of the current page
    pub fn slice<'s, T>(&self, items: &'s [T]) -> &'s [T] {
        let window = self.window(items.len());
        &items[window.start..window.end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_page_size_rejected() {
        assert_eq!(Pagination::new(0), Err(InventoryError::InvalidPageSize));
        let mut pagination = Pagination::new(5).unwrap();
        assert!(pagination.set_page_size(0).is_err());
        assert_eq!(pagination.page_size(), 5);
    }

    #[test]
    fn test_window_bounds() {
        let mut pagination = Pagination::new(4).unwrap();
        assert!(pagination.go_to(3, 10));

        let window = pagination.window(10);
        assert_eq!((window.start, window.end), (8, 10));
        assert_eq!(window.total_pages, 3);
        assert!(window.has_prev);
        assert!(!window.has_next);
    }

    #[test]
    fn test_navigation_stops_at_boundaries() {
        let mut pagination = Pagination::new(5).unwrap();
        assert!(!pagination.prev());
        assert!(pagination.next(6));
        assert!(!pagination.next(6));
        assert_eq!(pagination.page(), 2);
        assert!(!pagination.go_to(0, 6));
    }

    #[test]
    fn test_page_size_change_resets_page() {
        let mut pagination = Pagination::new(2).unwrap();
        pagination.go_to(3, 10);
        pagination.set_page_size(3).unwrap();
        assert_eq!(pagination.page(), 1);
    }

    #[test]
    fn test_clamp_after_shrink() {
        let mut pagination = Pagination::new(10).unwrap();
        pagination.go_to(4, 40);
        assert_eq!(pagination.clamp(15), 2);
        assert_eq!(pagination.clamp(0), 1);

        let window = pagination.window(0);
        assert_eq!((window.start, window.end, window.total_pages), (0, 0, 0));
    }

    #[test]
    fn test_pages_cover_listing_exactly() {
        let items: Vec<usize> = (0..23).collect();
        for page_size in 1..=25 {
            let mut pagination = Pagination::new(page_size).unwrap();
            let mut seen = Vec::new();
            loop {
                seen.extend_from_slice(pagination.slice(&items));
                if !pagination.next(items.len()) {
                    break;
                }
            }
            assert_eq!(seen, items, "page size {}", page_size);
        }
    }
}
