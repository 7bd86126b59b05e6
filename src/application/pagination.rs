//! Offset pagination for post listings.

use std::fmt;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A validated `(page, page_size)` pair. Both components are at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    page: u32,
    page_size: u32,
}

impl PageKey {
    /// Returns `None` when either component is zero.
    pub fn new(page: u32, page_size: u32) -> Option<Self> {
        (page >= 1 && page_size >= 1).then_some(Self { page, page_size })
    }

    /// Builds a key from raw query values.
    ///
    /// Absent, unparsable or non-positive values fall back to the defaults; the page size is
    /// capped at `max_page_size`.
    pub fn from_query(page: Option<&str>, page_size: Option<&str>, max_page_size: u32) -> Self {
        let page = parse_positive(page).unwrap_or(DEFAULT_PAGE);
        let page_size = parse_positive(page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(max_page_size.max(1));
        Self { page, page_size }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

impl Default for PageKey {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page, self.page_size)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
}
