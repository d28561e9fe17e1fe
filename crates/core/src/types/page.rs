//! Offset pagination parameters.

use serde::{Deserialize, Serialize};

/// A 1-based page request.
///
/// Deserializes from `?page=2&limit=12`. Missing values fall back to the
/// first page and [`PageRequest::DEFAULT_LIMIT`]; out-of-range values are
/// clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

const fn default_page() -> u32 {
    1
}

const fn default_limit() -> u32 {
    PageRequest::DEFAULT_LIMIT
}

impl PageRequest {
    /// Items per page when the client does not ask for a size.
    pub const DEFAULT_LIMIT: u32 = 12;
    /// Largest page size a client may request.
    pub const MAX_LIMIT: u32 = 100;

    /// Create a page request, clamping both values into range.
    #[must_use]
    pub const fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }.clamped()
    }

    const fn clamped(self) -> Self {
        let page = if self.page == 0 { 1 } else { self.page };
        let limit = if self.limit == 0 {
            1
        } else if self.limit > Self::MAX_LIMIT {
            Self::MAX_LIMIT
        } else {
            self.limit
        };
        Self { page, limit }
    }

    /// The 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.clamped().page
    }

    /// Page size.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.clamped().limit
    }

    /// Page size as the `i64` SQL `LIMIT` expects.
    #[must_use]
    pub const fn sql_limit(&self) -> i64 {
        self.limit() as i64
    }

    /// Rows to skip, as the `i64` SQL `OFFSET` expects.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page() as i64 - 1) * self.limit() as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_LIMIT)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(1, 12).offset(), 0);
        assert_eq!(PageRequest::new(3, 10).offset(), 20);
    }

    #[test]
    fn test_clamping() {
        let page = PageRequest::new(0, 0);
        assert_eq!(page.page(), 1);
        assert_eq!(page.limit(), 1);

        let page = PageRequest::new(2, 10_000);
        assert_eq!(page.limit(), PageRequest::MAX_LIMIT);
    }

    #[test]
    fn test_deserialize_defaults() {
        let page: PageRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(page.page(), 1);
        assert_eq!(page.limit(), PageRequest::DEFAULT_LIMIT);
    }

    #[test]
    fn test_deserialize_clamps_untrusted_values() {
        let page: PageRequest = serde_json::from_str(r#"{"page":0,"limit":500}"#).unwrap();
        assert_eq!(page.page(), 1);
        assert_eq!(page.limit(), PageRequest::MAX_LIMIT);
        assert_eq!(page.offset(), 0);
    }
}
