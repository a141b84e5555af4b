use serde::{Deserialize, Serialize};

/// One page of a listing, 1-based.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub total_pages: usize,
    pub current_page: usize,
}

impl<T> Page<T> {
    pub fn paginate(items: Vec<T>, page: usize, limit: usize) -> Self {
        let limit = limit.max(1);
        let page = page.max(1);
        let total = items.len();
        let items = items
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();
        Self {
            items,
            total,
            total_pages: total.div_ceil(limit),
            current_page: page,
        }
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}
