// Pagination - 1-based page slicing applied after every other pipeline stage

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Build from raw query-string values. Missing values fall back to the
    /// defaults, zero or non-numeric values are rejected, and the page size
    /// is capped at `MAX_LIMIT`.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> AppResult<Self> {
        let page = parse_positive(page, "page")?.unwrap_or(DEFAULT_PAGE);
        let limit = parse_positive(limit, "limit")?
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        Ok(Self { page, limit })
    }

    /// Documents skipped before this page. Saturates for pages far past
    /// the end, which then come back empty.
    pub fn offset(&self) -> usize {
        usize::try_from(self.skipped()).unwrap_or(usize::MAX)
    }

    fn skipped(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

fn parse_positive(raw: Option<&str>, name: &str) -> AppResult<Option<u64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => match raw.parse::<u64>() {
            Ok(n) if n >= 1 => Ok(Some(n)),
            _ => Err(AppError::Validation(format!("{} must be a positive integer", name))),
        },
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T = Value> {
    pub docs: Vec<T>,
    pub total_docs: u64,
    pub limit: u64,
    pub page: u64,
    pub total_pages: u64,
    pub paging_counter: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<u64>,
    pub next_page: Option<u64>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            docs: self.docs.into_iter().map(f).collect(),
            total_docs: self.total_docs,
            limit: self.limit,
            page: self.page,
            total_pages: self.total_pages,
            paging_counter: self.paging_counter,
            has_prev_page: self.has_prev_page,
            has_next_page: self.has_next_page,
            prev_page: self.prev_page,
            next_page: self.next_page,
        }
    }
}

/// Slice an already filtered, sorted and joined result set.
pub fn paginate<T>(all: Vec<T>, request: PageRequest) -> Page<T> {
    let total_docs = all.len() as u64;
    let total_pages = total_docs.div_ceil(request.limit).max(1);
    let docs: Vec<T> = all
        .into_iter()
        .skip(request.offset())
        .take(request.limit as usize)
        .collect();

    let has_prev_page = request.page > 1;
    let has_next_page = request.page < total_pages;

    Page {
        docs,
        total_docs,
        limit: request.limit,
        page: request.page,
        total_pages,
        paging_counter: request.skipped().saturating_add(1),
        has_prev_page,
        has_next_page,
        prev_page: has_prev_page.then(|| request.page - 1),
        next_page: has_next_page.then(|| request.page.saturating_add(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_validation() {
        assert_eq!(PageRequest::from_query(None, None).unwrap(), PageRequest { page: 1, limit: 10 });
        assert_eq!(
            PageRequest::from_query(Some("3"), Some("500")).unwrap(),
            PageRequest { page: 3, limit: MAX_LIMIT }
        );
        assert!(PageRequest::from_query(Some("0"), None).is_err());
        assert!(PageRequest::from_query(None, Some("ten")).is_err());
    }

    #[test]
    fn test_page_slices_and_flags() {
        let items: Vec<u32> = (1..=25).collect();

        let first = paginate(items.clone(), PageRequest { page: 1, limit: 10 });
        assert_eq!(first.docs, (1..=10).collect::<Vec<_>>());
        assert_eq!(first.total_docs, 25);
        assert_eq!(first.total_pages, 3);
        assert!(!first.has_prev_page && first.has_next_page);
        assert_eq!(first.next_page, Some(2));

        let last = paginate(items.clone(), PageRequest { page: 3, limit: 10 });
        assert_eq!(last.docs, vec![21, 22, 23, 24, 25]);
        assert_eq!(last.paging_counter, 21);
        assert_eq!(last.prev_page, Some(2));
        assert_eq!(last.next_page, None);

        let beyond = paginate(items, PageRequest { page: 9, limit: 10 });
        assert!(beyond.docs.is_empty());
        assert_eq!(beyond.total_docs, 25);
    }

    #[test]
    fn test_huge_page_number_is_empty_not_a_panic() {
        let request = PageRequest::from_query(Some("18446744073709551615"), Some("10")).unwrap();
        assert_eq!(request.page, u64::MAX);

        let page = paginate(vec![1, 2, 3], request);
        assert!(page.docs.is_empty());
        assert_eq!(page.total_docs, 3);
        assert_eq!(page.paging_counter, u64::MAX);
        assert!(page.has_prev_page);
        assert_eq!(page.prev_page, Some(u64::MAX - 1));
        assert_eq!(page.next_page, None);
    }

    #[test]
    fn test_empty_result_has_one_page() {
        let page = paginate(Vec::<u32>::new(), PageRequest::default());
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next_page);
    }
}
