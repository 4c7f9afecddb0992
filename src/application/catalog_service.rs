use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::catalog::{
    Category, CategoryInput, Deal, DealInput, Product, ProductFilter, ProductInput,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CategoryRepository, DealRepository, ProductRepository};
use crate::domain::{clamp_page, Page};

/// Products, categories and deals.
pub struct CatalogService {
    categories: Arc<dyn CategoryRepository>,
    products: Arc<dyn ProductRepository>,
    deals: Arc<dyn DealRepository>,
}

impl CatalogService {
    pub fn new(
        categories: Arc<dyn CategoryRepository>,
        products: Arc<dyn ProductRepository>,
        deals: Arc<dyn DealRepository>,
    ) -> Self {
        Self {
            categories,
            products,
            deals,
        }
    }

    // ── Products ─────────────────────────────────────────────────────────────

    pub fn list_products(&self, mut filter: ProductFilter) -> Result<Page<Product>, DomainError> {
        (filter.page, filter.limit) = clamp_page(filter.page, filter.limit);
        filter.search = filter
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        filter.check()?;
        self.products.list(&filter)
    }

    pub fn get_product(&self, id: Uuid) -> Result<Product, DomainError> {
        self.products
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Product"))
    }

    pub fn create_product(&self, input: ProductInput) -> Result<Product, DomainError> {
        self.check_product(&input)?;
        let product = self.products.create(input)?;
        log::info!("Created product {} ({})", product.id, product.name);
        Ok(product)
    }

    pub fn update_product(&self, id: Uuid, input: ProductInput) -> Result<Product, DomainError> {
        self.check_product(&input)?;
        self.products
            .update(id, input)?
            .ok_or(DomainError::NotFound("Product"))
    }

    pub fn delete_product(&self, id: Uuid) -> Result<(), DomainError> {
        if self.products.delete(id)? {
            Ok(())
        } else {
            Err(DomainError::NotFound("Product"))
        }
    }

    fn check_product(&self, input: &ProductInput) -> Result<(), DomainError> {
        if let Some(category_id) = input.category_id {
            if self.categories.find_by_id(category_id)?.is_none() {
                return Err(DomainError::InvalidInput(format!(
                    "category {} does not exist",
                    category_id
                )));
            }
        }
        Ok(())
    }

    // ── Categories ───────────────────────────────────────────────────────────

    pub fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        self.categories.list()
    }

    pub fn get_category(&self, id: Uuid) -> Result<Category, DomainError> {
        self.categories
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Category"))
    }

    pub fn create_category(&self, input: CategoryInput) -> Result<Category, DomainError> {
        self.categories.create(input)
    }

    pub fn update_category(&self, id: Uuid, input: CategoryInput) -> Result<Category, DomainError> {
        self.categories
            .update(id, input)?
            .ok_or(DomainError::NotFound("Category"))
    }

    pub fn delete_category(&self, id: Uuid) -> Result<(), DomainError> {
        if self.categories.delete(id)? {
            Ok(())
        } else {
            Err(DomainError::NotFound("Category"))
        }
    }

    // ── Deals ────────────────────────────────────────────────────────────────

    /// Deals shoppers can use right now.
    pub fn live_deals(&self) -> Result<Vec<Deal>, DomainError> {
        let now = Utc::now();
        Ok(self
            .deals
            .list()?
            .into_iter()
            .filter(|deal| deal.is_live_at(now))
            .collect())
    }

    pub fn all_deals(&self) -> Result<Vec<Deal>, DomainError> {
        self.deals.list()
    }

    pub fn create_deal(&self, input: DealInput) -> Result<Deal, DomainError> {
        self.check_deal(&input)?;
        self.deals.create(input)
    }

    pub fn update_deal(&self, id: Uuid, input: DealInput) -> Result<Deal, DomainError> {
        self.check_deal(&input)?;
        self.deals
            .update(id, input)?
            .ok_or(DomainError::NotFound("Deal"))
    }

    pub fn delete_deal(&self, id: Uuid) -> Result<(), DomainError> {
        if self.deals.delete(id)? {
            Ok(())
        } else {
            Err(DomainError::NotFound("Deal"))
        }
    }

    fn check_deal(&self, input: &DealInput) -> Result<(), DomainError> {
        input.check()?;
        if self.products.find_by_id(input.product_id)?.is_none() {
            return Err(DomainError::InvalidInput(format!(
                "product {} does not exist",
                input.product_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use chrono::Duration;

    use super::*;
    use crate::infrastructure::memory::MemoryStore;

    fn service() -> CatalogService {
        let store = Arc::new(MemoryStore::default());
        CatalogService::new(store.clone(), store.clone(), store)
    }

    fn product(name: &str, price: &str, stock: i32, category_id: Option<Uuid>) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            description: Some(format!("A fine {}", name.to_lowercase())),
            price: BigDecimal::from_str(price).unwrap(),
            stock,
            image_url: None,
            category_id,
        }
    }

    fn first_page() -> ProductFilter {
        ProductFilter {
            page: 1,
            limit: 20,
            ..Default::default()
        }
    }

    #[test]
    fn product_with_unknown_category_is_rejected() {
        let svc = service();
        let err = svc
            .create_product(product("Lamp", "30", 1, Some(Uuid::new_v4())))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn list_filters_by_category_search_and_price() {
        let svc = service();
        let books = svc
            .create_category(CategoryInput {
                name: "Books".to_string(),
                description: None,
            })
            .unwrap();
        svc.create_product(product("Rust Book", "40", 3, Some(books.id))).unwrap();
        svc.create_product(product("Cook Book", "15", 0, Some(books.id))).unwrap();
        svc.create_product(product("Desk", "120", 2, None)).unwrap();

        let in_books = svc
            .list_products(ProductFilter {
                category_id: Some(books.id),
                ..first_page()
            })
            .unwrap();
        assert_eq!(in_books.total, 2);

        let cheap_in_stock = svc
            .list_products(ProductFilter {
                max_price: Some(BigDecimal::from(50)),
                in_stock: true,
                ..first_page()
            })
            .unwrap();
        assert_eq!(cheap_in_stock.total, 1);
        assert_eq!(cheap_in_stock.items[0].name, "Rust Book");

        let search = svc
            .list_products(ProductFilter {
                search: Some("  desk ".to_string()),
                ..first_page()
            })
            .unwrap();
        assert_eq!(search.total, 1);
    }

    #[test]
    fn pagination_is_clamped() {
        let svc = service();
        for i in 0..3 {
            svc.create_product(product(&format!("P{}", i), "1", 1, None)).unwrap();
        }
        let page = svc
            .list_products(ProductFilter {
                page: 0,
                limit: 2,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn missing_product_is_not_found() {
        let svc = service();
        assert!(matches!(
            svc.get_product(Uuid::new_v4()),
            Err(DomainError::NotFound("Product"))
        ));
    }

    #[test]
    fn live_deals_hide_expired_and_inactive() {
        let svc = service();
        let p = svc.create_product(product("Chair", "50", 5, None)).unwrap();
        let deal = |title: &str, active: bool, end_offset_days: i64| DealInput {
            product_id: p.id,
            title: title.to_string(),
            discount: BigDecimal::from_str("0.1").unwrap(),
            start_date: None,
            end_date: Some(Utc::now() + Duration::days(end_offset_days)),
            active,
        };
        svc.create_deal(deal("live", true, 1)).unwrap();
        svc.create_deal(deal("expired", true, -1)).unwrap();
        svc.create_deal(deal("off", false, 1)).unwrap();

        let live = svc.live_deals().unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].title, "live");
        assert_eq!(svc.all_deals().unwrap().len(), 3);
    }

    #[test]
    fn deal_for_unknown_product_is_rejected() {
        let svc = service();
        let err = svc
            .create_deal(DealInput {
                product_id: Uuid::new_v4(),
                title: "Ghost".to_string(),
                discount: BigDecimal::from_str("0.5").unwrap(),
                start_date: None,
                end_date: None,
                active: true,
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn deleting_category_uncategorises_products() {
        let svc = service();
        let toys = svc
            .create_category(CategoryInput {
                name: "Toys".to_string(),
                description: None,
            })
            .unwrap();
        let kite = svc.create_product(product("Kite", "9", 1, Some(toys.id))).unwrap();

        svc.delete_category(toys.id).unwrap();

        assert_eq!(svc.get_product(kite.id).unwrap().category_id, None);
    }
}
