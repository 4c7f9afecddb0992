pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod coupon;
pub mod errors;
pub mod order;
pub mod ports;
pub mod user;

/// One page of a listing plus the total row count across all pages.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// Clamps caller-supplied pagination to `page >= 1` and `1..=100` items.
pub fn clamp_page(page: i64, limit: i64) -> (i64, i64) {
    (page.max(1), limit.clamp(1, 100))
}
