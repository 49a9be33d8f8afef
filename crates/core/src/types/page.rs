//! Fixed-size pagination for product listings.

/// Rows per page of a product listing.
pub const PAGE_SIZE: i64 = 6;

/// A resolved page number with its row window.
///
/// Requested pages that are absent, zero, or negative resolve to page 1.
///
/// ```
/// use tanam_core::Pagination;
///
/// let page = Pagination::new(Some(3));
/// assert_eq!(page.offset(), 12);
/// assert_eq!(Pagination::new(None).page(), 1);
/// assert_eq!(Pagination::total_pages(7), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: i64,
}

impl Pagination {
    /// Resolve a requested page number.
    #[must_use]
    pub fn new(requested: Option<i64>) -> Self {
        let page = requested.filter(|p| *p > 0).unwrap_or(1);
        Self { page }
    }

    /// The 1-based page number.
    #[must_use]
    pub const fn page(&self) -> i64 {
        self.page
    }

    /// Maximum rows on this page.
    #[must_use]
    pub const fn limit(&self) -> i64 {
        PAGE_SIZE
    }

    /// Rows to skip before this page.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(PAGE_SIZE)
    }

    /// Number of pages needed for `total_rows` rows.
    #[must_use]
    pub const fn total_pages(total_rows: i64) -> i64 {
        if total_rows <= 0 {
            return 0;
        }
        (total_rows + PAGE_SIZE - 1) / PAGE_SIZE
    }
}
