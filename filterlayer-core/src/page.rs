//! Zero-based pagination over filtered sequences.
//!
//! Pagination only happens when both a page and a page size are supplied. With
//! `page = p` and `page_size = s`, the window is the elements at offsets `[p*s, p*s+s)`.
//!
//! ```ignore
//! use filterlayer::page::Pagination;
//!
//! let pagination = Pagination::from_parts(Some(1), Some(2)).unwrap();
//! assert_eq!(pagination.offset(), 2);
//! assert_eq!(pagination.paginate(1..=5).collect::<Vec<_>>(), vec![3, 4]);
//!
//! // Either half missing disables pagination entirely.
//! assert!(Pagination::from_parts(Some(1), None).is_none());
//! ```

use crate::query::QueryBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// The page number, starting at 0.
    pub page: usize,
    /// Number of items per page.
    pub page_size: usize,
}

impl Pagination {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    /// Returns pagination parameters only when both halves are present.
    pub fn from_parts(page: Option<usize>, page_size: Option<usize>) -> Option<Self> {
        match (page, page_size) {
            (Some(page), Some(page_size)) => Some(Self::new(page, page_size)),
            _ => None,
        }
    }

    /// Number of matching items skipped before this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.page_size)
    }

    /// Skips to this page and takes at most `page_size` items.
    pub fn paginate<I>(self, items: I) -> impl Iterator<Item = I::Item>
    where
        I: IntoIterator,
    {
        items
            .into_iter()
            .skip(self.offset())
            .take(self.page_size)
    }

    /// Sets the offset and limit of a query to this page.
    pub fn apply(&self, builder: QueryBuilder) -> QueryBuilder {
        builder
            .offset(self.offset())
            .limit(self.page_size)
    }
}
