//! Limit/offset pagination for catalog listings

use crate::error::ApiError;

/// Page size used when the client gives none
pub const DEFAULT_LIMIT: i64 = 50;

/// Largest accepted page size
pub const MAX_LIMIT: i64 = 100;

/// Validated page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Parse raw query values
    ///
    /// `limit` must be an integer in 1..=MAX_LIMIT and `offset` a
    /// non-negative integer; anything else is a 400.
    ///
    /// # Examples
    /// ```
    /// use hermon_api::pagination::Page;
    ///
    /// let page = Page::parse(None, None).unwrap();
    /// assert_eq!((page.limit, page.offset), (50, 0));
    ///
    /// assert!(Page::parse(Some("0"), None).is_err());
    /// assert!(Page::parse(Some("20"), Some("-1")).is_err());
    /// ```
    pub fn parse(limit: Option<&str>, offset: Option<&str>) -> Result<Self, ApiError> {
        let limit = match limit.map(str::trim).filter(|s| !s.is_empty()) {
            None => DEFAULT_LIMIT,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if (1..=MAX_LIMIT).contains(&n) => n,
                _ => {
                    return Err(ApiError::BadRequest(format!(
                        "limit must be an integer between 1 and {}",
                        MAX_LIMIT
                    )))
                }
            },
        };

        let offset = match offset.map(str::trim).filter(|s| !s.is_empty()) {
            None => 0,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n >= 0 => n,
                _ => {
                    return Err(ApiError::BadRequest(
                        "offset must be a non-negative integer".to_string(),
                    ))
                }
            },
        };

        Ok(Self { limit, offset })
    }

    /// Whether more results follow this page
    pub fn has_more(&self, total: i64) -> bool {
        self.offset.saturating_add(self.limit) < total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(
            Page::parse(None, None).unwrap(),
            Page {
                limit: DEFAULT_LIMIT,
                offset: 0
            }
        );
    }

    #[test]
    fn test_bounds() {
        assert_eq!(Page::parse(Some("1"), None).unwrap().limit, 1);
        assert_eq!(Page::parse(Some("100"), None).unwrap().limit, 100);
        assert!(Page::parse(Some("101"), None).is_err());
        assert!(Page::parse(Some("abc"), None).is_err());
        assert!(Page::parse(None, Some("x")).is_err());
    }

    #[test]
    fn test_has_more() {
        let page = Page::parse(Some("10"), Some("20")).unwrap();
        assert!(page.has_more(31));
        assert!(!page.has_more(30));
    }

    #[test]
    fn test_has_more_at_max_offset() {
        let page = Page::parse(Some("50"), Some("9223372036854775807")).unwrap();
        assert_eq!(page.offset, i64::MAX);
        assert!(!page.has_more(3));
        assert!(!page.has_more(i64::MAX));
    }
}
