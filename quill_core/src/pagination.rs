//! Page slicing over already ordered sequences.
//!
//! Lookups are forgiving: a page number past either end clamps to the first
//! or last page instead of failing, and an empty sequence still has one
//! (empty) page.

use serde::Serialize;

/// A requested page number, 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest(usize);

impl PageRequest {
    pub fn first() -> Self {
        Self(1)
    }

    /// Always clamps to the last page.
    pub fn last() -> Self {
        Self(usize::MAX)
    }

    /// Reads a raw `page` query value.
    ///
    /// Missing or unparsable input means the first page and `"last"` means
    /// the last one.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("last") => Self::last(),
            Some(value) => value.parse().map(Self).unwrap_or_else(|_| Self::first()),
            None => Self::first(),
        }
    }

    pub fn number(&self) -> usize {
        self.0
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

impl From<usize> for PageRequest {
    fn from(number: usize) -> Self {
        Self(number)
    }
}

/// One slice of an ordered sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// The page actually served, after clamping.
    pub number: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub num_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// The paginator half of a render context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginatorSummary {
    pub count: usize,
    pub num_pages: usize,
    pub per_page: usize,
}

impl<T> Page<T> {
    pub fn summary(&self) -> PaginatorSummary {
        PaginatorSummary {
            count: self.total_count,
            num_pages: self.num_pages,
            per_page: self.page_size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            page_size: self.page_size,
            total_count: self.total_count,
            num_pages: self.num_pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}

/// Number of pages needed for `total` items. Never less than one.
pub fn page_count(total: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    total.div_ceil(page_size).max(1)
}

/// Slices `items` into the page named by `request`.
///
/// `items` must already be in display order; slicing never reorders.
pub fn paginate<T>(items: Vec<T>, page_size: usize, request: PageRequest) -> Page<T> {
    let page_size = page_size.max(1);
    let total_count = items.len();
    let num_pages = page_count(total_count, page_size);
    let number = request.number().clamp(1, num_pages);

    let start = (number - 1) * page_size;
    let items: Vec<T> = items.into_iter().skip(start).take(page_size).collect();

    Page {
        items,
        number,
        page_size,
        total_count,
        num_pages,
        has_next: number < num_pages,
        has_prev: number > 1,
    }
}
