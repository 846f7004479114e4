//! Page/offset pagination

/// Requested page of a list query (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    /// Number of rows to skip
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, 10)
    }
}

/// One page of results together with the size of the whole result set
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub per_page: u32,
    pub current_page: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            per_page: request.per_page,
            current_page: request.page,
        }
    }

    /// Last page number, never below 1
    pub fn last_page(&self) -> u32 {
        let pages = self.total.div_ceil(u64::from(self.per_page.max(1)));
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }

    /// 1-based position of the first item on this page
    pub fn from(&self) -> Option<u64> {
        if self.items.is_empty() {
            return None;
        }
        Some(u64::from(self.current_page - 1) * u64::from(self.per_page) + 1)
    }

    /// 1-based position of the last item on this page
    pub fn to(&self) -> Option<u64> {
        self.from().map(|from| from + self.items.len() as u64 - 1)
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page()
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            per_page: self.per_page,
            current_page: self.current_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_clamps_to_first_page() {
        let request = PageRequest::new(Some(0), 10);
        assert_eq!(request.page, 1);
        assert_eq!(request.offset(), 0);
        assert_eq!(PageRequest::new(Some(3), 10).offset(), 20);
    }

    #[test]
    fn test_metadata_for_middle_page() {
        // 25 records, 10 per page, page 2
        let page = Page::new((11..=20).collect::<Vec<u64>>(), 25, PageRequest::new(Some(2), 10));
        assert_eq!(page.last_page(), 3);
        assert_eq!(page.from(), Some(11));
        assert_eq!(page.to(), Some(20));
        assert!(page.has_more_pages());
    }

    #[test]
    fn test_metadata_for_last_partial_page() {
        let page = Page::new(vec![21u64, 22, 23, 24, 25], 25, PageRequest::new(Some(3), 10));
        assert_eq!(page.from(), Some(21));
        assert_eq!(page.to(), Some(25));
        assert!(!page.has_more_pages());
    }

    #[test]
    fn test_empty_result() {
        let page: Page<u64> = Page::new(vec![], 0, PageRequest::new(None, 10));
        assert_eq!(page.last_page(), 1);
        assert_eq!(page.from(), None);
        assert_eq!(page.to(), None);
    }
}
