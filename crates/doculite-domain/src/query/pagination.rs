//! Page-based pagination (spec §4.3): `page(p, s)` requires `p >= 1, s >= 1`.

use crate::error::{Error, Result};

/// A resolved `LIMIT`/`OFFSET` pair derived from a 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Build a page from a 1-based page number and page size. Returns
    /// [`Error::Config`] when either is less than 1 (spec §4.3: "negative
    /// limit/offset are build-time errors").
    pub fn new(page: i64, size: i64) -> Result<Self> {
        if page < 1 {
            return Err(Error::config(format!("page number must be >= 1, got {page}")));
        }
        if size < 1 {
            return Err(Error::config(format!("page size must be >= 1, got {size}")));
        }
        Ok(Self {
            limit: size,
            offset: (page - 1) * size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_has_zero_offset() {
        let page = Page::new(1, 20).unwrap();
        assert_eq!(page.limit, 20);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn third_page_offsets_by_two_sizes() {
        let page = Page::new(3, 20).unwrap();
        assert_eq!(page.offset, 40);
    }

    #[test]
    fn rejects_page_zero() {
        assert!(Page::new(0, 20).is_err());
    }

    #[test]
    fn rejects_zero_size() {
        assert!(Page::new(1, 0).is_err());
    }
}
