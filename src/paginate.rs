// 📄 Paginator - bounded windows over an ordered row set
//
// Out-of-range page requests clamp to the nearest valid page instead of
// failing. An empty input still produces one empty page.

use serde::Serialize;

/// Page sizes offered by the presentation layers
pub const PAGE_SIZE_OPTIONS: [usize; 4] = [10, 25, 50, 100];

pub const DEFAULT_PAGE_SIZE: usize = 10;

// ============================================================================
// PAGE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Index actually served after clamping
    pub page_index: usize,
    pub page_size: usize,
    /// 0 when there are no items
    pub total_pages: usize,
    pub total_items: usize,
    /// 1-based display range, `0..0` when empty
    pub from: usize,
    pub to: usize,
}

pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    total_items.div_ceil(page_size.max(1))
}

/// Clamp `page_index` into `[0, total_pages - 1]`, 0 when there are no pages
pub fn clamp_index(page_index: usize, total_pages: usize) -> usize {
    page_index.min(total_pages.saturating_sub(1))
}

/// Window `rows` into page `page_index` of `page_size` items
pub fn page<T: Clone>(rows: &[T], page_size: usize, page_index: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = rows.len();
    let total_pages = total_pages(total_items, page_size);
    let page_index = clamp_index(page_index, total_pages);

    let start = (page_index * page_size).min(total_items);
    let end = (start + page_size).min(total_items);
    let items = rows[start..end].to_vec();
    let (from, to) = if items.is_empty() { (0, 0) } else { (start + 1, end) };

    Page {
        items,
        page_index,
        page_size,
        total_pages,
        total_items,
        from,
        to,
    }
}

// ============================================================================
// PAGINATION STATE
// ============================================================================

/// Active page and size for an interactive view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    page_index: usize,
    page_size: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        PaginationState::new(DEFAULT_PAGE_SIZE)
    }
}

impl PaginationState {
    pub fn new(page_size: usize) -> Self {
        PaginationState {
            page_index: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Always returns to the first page, even when the size is unchanged
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page_index = 0;
    }

    /// Step to the next preset size, wrapping
    pub fn cycle_page_size(&mut self) {
        let next = PAGE_SIZE_OPTIONS
            .iter()
            .copied()
            .find(|&size| size > self.page_size)
            .unwrap_or(PAGE_SIZE_OPTIONS[0]);
        self.set_page_size(next);
    }

    pub fn go_to(&mut self, page_index: usize, total_items: usize) {
        self.page_index = clamp_index(page_index, total_pages(total_items, self.page_size));
    }

    pub fn next(&mut self, total_items: usize) {
        self.go_to(self.page_index.saturating_add(1), total_items);
    }

    pub fn previous(&mut self, total_items: usize) {
        self.go_to(self.page_index.saturating_sub(1), total_items);
    }

    /// Filter or sort changed; start over from the first page
    pub fn reset(&mut self) {
        self.page_index = 0;
    }

    pub fn apply<T: Clone>(&self, rows: &[T]) -> Page<T> {
        page(rows, self.page_size, self.page_index)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_twenty_three_rows_in_pages_of_ten() {
        let r = rows(23);
        let sizes: Vec<usize> = (0..3).map(|i| page(&r, 10, i).items.len()).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
        assert_eq!(page(&r, 10, 0).total_pages, 3);
    }

    #[test]
    fn test_out_of_range_index_clamps_to_last_page() {
        let p = page(&rows(23), 10, 5);
        assert_eq!(p.page_index, 2);
        assert_eq!(p.items, vec![20, 21, 22]);
        assert_eq!((p.from, p.to), (21, 23));
    }

    #[test]
    fn test_empty_input_returns_one_empty_page() {
        let p = page(&rows(0), 10, 3);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.page_index, 0);
        assert!(p.items.is_empty());
        assert_eq!((p.from, p.to), (0, 0));
    }

    #[test]
    fn test_zero_page_size_is_treated_as_one() {
        let p = page(&rows(3), 0, 1);
        assert_eq!(p.page_size, 1);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.items, vec![1]);
    }

    #[test]
    fn test_exact_multiple() {
        let p = page(&rows(20), 10, 1);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.items.len(), 10);
    }

    #[test]
    fn test_changing_page_size_resets_to_first_page() {
        let mut state = PaginationState::new(10);
        state.go_to(2, 23);
        assert_eq!(state.page_index(), 2);

        state.set_page_size(25);
        assert_eq!(state.page_index(), 0);
        assert_eq!(state.apply(&rows(23)).items.len(), 23);
    }

    #[test]
    fn test_next_and_previous_stay_in_bounds() {
        let mut state = PaginationState::new(10);
        state.previous(23);
        assert_eq!(state.page_index(), 0);
        for _ in 0..10 {
            state.next(23);
        }
        assert_eq!(state.page_index(), 2);
        state.previous(23);
        assert_eq!(state.page_index(), 1);
    }

    #[test]
    fn test_cycle_page_size_wraps() {
        let mut state = PaginationState::new(50);
        state.go_to(1, 200);
        state.cycle_page_size();
        assert_eq!(state.page_size(), 100);
        assert_eq!(state.page_index(), 0);
        state.cycle_page_size();
        assert_eq!(state.page_size(), 10);
    }
}
