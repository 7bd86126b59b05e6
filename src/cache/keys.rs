//! Cache key definitions.
//!
//! Keys render to the strings stored in the backend: `posts:{page}:{page_size}` for a paginated
//! listing and `posts` for the whole list. The backend namespace is prepended by
//! [`PageCache`](super::PageCache).

use std::fmt;

use crate::application::pagination::PageKey;

const POSTS_PREFIX: &str = "posts";

/// Identifies one cached post listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// One page of the listing.
    Page(PageKey),
    /// The unpaginated listing.
    AllPosts,
}

impl CacheKey {
    /// Prefix shared by every key this module renders.
    pub const fn family() -> &'static str {
        POSTS_PREFIX
    }
}

impl From<PageKey> for CacheKey {
    fn from(key: PageKey) -> Self {
        Self::Page(key)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Page(page) => write!(f, "{POSTS_PREFIX}:{page}"),
            CacheKey::AllPosts => f.write_str(POSTS_PREFIX),
        }
    }
}
