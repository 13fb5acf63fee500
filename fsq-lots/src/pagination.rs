//! Offset pagination for lot listings

/// Default page size when the caller gives none
pub const DEFAULT_LIMIT: i64 = 100;

/// Largest page a caller may request
pub const MAX_LIMIT: i64 = 1000;

/// Sanitized skip/limit window for a list query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Rows to skip (OFFSET)
    pub skip: i64,
    /// Rows to return (LIMIT)
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Clamp a requested window into valid bounds
///
/// Negative skips become 0; limits are clamped to [1, MAX_LIMIT].
///
/// # Examples
/// ```
/// use fsq_lots::pagination::page;
///
/// let p = page(20, 50);
/// assert_eq!((p.skip, p.limit), (20, 50));
///
/// let p = page(-5, 5000);
/// assert_eq!((p.skip, p.limit), (0, 1000));
/// ```
pub fn page(skip: i64, limit: i64) -> Page {
    Page {
        skip: skip.max(0),
        limit: limit.clamp(1, MAX_LIMIT),
    }
}
