use std::fmt::Display;

/// Zero-based index of the first game on a page.
pub type Offset = u64;

/// Games requested per page by the upstream API.
pub const PAGE_SIZE: u64 = 39;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub provider_slug: String,
    pub provider_name: String,
    pub offset: Offset,
    pub limit: u64,
}

impl Display for PageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}+{}",
            self.provider_slug, self.offset, self.limit
        )
    }
}

pub fn is_page_aligned(offset: Offset, page_size: u64) -> bool {
    page_size > 0 && offset % page_size == 0
}

/// Number of games to request at `offset`, clipped to the advertised total.
/// With no known total the full page is requested.
pub fn page_limit(offset: Offset, total: Option<u64>, page_size: u64) -> u64 {
    match total {
        Some(total) => total.saturating_sub(offset).min(page_size),
        None => page_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_limit_clips_last_page() {
        assert_eq!(page_limit(0, Some(100), PAGE_SIZE), 39);
        assert_eq!(page_limit(39, Some(100), PAGE_SIZE), 39);
        assert_eq!(page_limit(78, Some(100), PAGE_SIZE), 22);
        assert_eq!(page_limit(39, Some(78), PAGE_SIZE), 39);
        assert_eq!(page_limit(0, Some(0), PAGE_SIZE), 0);
    }

    #[test]
    fn test_page_limit_without_total() {
        assert_eq!(page_limit(390, None, PAGE_SIZE), PAGE_SIZE);
        assert_eq!(page_limit(390, Some(100), PAGE_SIZE), 0);
    }

    #[test]
    fn test_page_alignment() {
        assert!(is_page_aligned(0, PAGE_SIZE));
        assert!(is_page_aligned(78, PAGE_SIZE));
        assert!(!is_page_aligned(40, PAGE_SIZE));
        assert!(!is_page_aligned(0, 0));
    }
}
