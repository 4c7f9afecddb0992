use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{
    Category, CategoryInput, Deal, DealInput, Product, ProductFilter, ProductInput,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CategoryRepository, DealRepository, ProductRepository};
use crate::domain::Page;
use crate::schema::{categories, deals, products};

use super::models::{
    CategoryChangeset, CategoryRow, DealChangeset, DealRow, NewCategoryRow, NewDealRow,
    NewProductRow, ProductChangeset, ProductRow,
};
use super::on_unique;

const CATEGORY_TAKEN: &str = "Category name already exists";

// ── Categories ───────────────────────────────────────────────────────────────

pub struct DieselCategoryRepository {
    pool: DbPool,
}

impl DieselCategoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CategoryRepository for DieselCategoryRepository {
    fn list(&self) -> Result<Vec<Category>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = categories::table
            .select(CategoryRow::as_select())
            .order(categories::name.asc())
            .load::<CategoryRow>(&mut conn)?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = categories::table
            .find(id)
            .select(CategoryRow::as_select())
            .first::<CategoryRow>(&mut conn)
            .optional()?;
        Ok(row.map(Category::from))
    }

    fn create(&self, input: CategoryInput) -> Result<Category, DomainError> {
        let mut conn = self.pool.get()?;
        let row: CategoryRow = diesel::insert_into(categories::table)
            .values(&NewCategoryRow {
                id: Uuid::new_v4(),
                name: input.name,
                description: input.description,
            })
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)
            .map_err(on_unique(CATEGORY_TAKEN))?;
        Ok(row.into())
    }

    fn update(&self, id: Uuid, input: CategoryInput) -> Result<Option<Category>, DomainError> {
        let mut conn = self.pool.get()?;
        let row: Option<CategoryRow> = diesel::update(categories::table.find(id))
            .set(&CategoryChangeset {
                name: input.name,
                description: input.description,
                updated_at: Utc::now(),
            })
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)
            .optional()
            .map_err(on_unique(CATEGORY_TAKEN))?;
        Ok(row.map(Category::from))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(categories::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}

// ── Products ─────────────────────────────────────────────────────────────────

pub struct DieselProductRepository {
    pool: DbPool,
}

impl DieselProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Builds the filtered product query. Called once for the count and once
/// for the page, since boxed queries cannot be cloned.
fn filtered(filter: &ProductFilter) -> products::BoxedQuery<'static, Pg> {
    let mut query = products::table.into_boxed();
    if let Some(category_id) = filter.category_id {
        query = query.filter(products::category_id.eq(category_id));
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        query = query.filter(
            products::name
                .ilike(pattern.clone())
                .or(products::description.ilike(pattern)),
        );
    }
    if let Some(min) = &filter.min_price {
        query = query.filter(products::price.ge(min.clone()));
    }
    if let Some(max) = &filter.max_price {
        query = query.filter(products::price.le(max.clone()));
    }
    if filter.in_stock {
        query = query.filter(products::stock.gt(0));
    }
    query
}

impl ProductRepository for DieselProductRepository {
    fn list(&self, filter: &ProductFilter) -> Result<Page<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let total: i64 = filtered(filter).count().get_result(&mut conn)?;
        let rows = filtered(filter)
            .select(ProductRow::as_select())
            .order(products::created_at.desc())
            .limit(filter.limit)
            .offset(filter.offset())
            .load::<ProductRow>(&mut conn)?;
        Ok(Page {
            items: rows.into_iter().map(Product::from).collect(),
            total,
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first::<ProductRow>(&mut conn)
            .optional()?;
        Ok(row.map(Product::from))
    }

    fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = products::table
            .filter(products::id.eq_any(ids))
            .select(ProductRow::as_select())
            .load::<ProductRow>(&mut conn)?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    fn create(&self, input: ProductInput) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;
        let row: ProductRow = diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: Uuid::new_v4(),
                name: input.name,
                description: input.description,
                price: input.price,
                stock: input.stock,
                image_url: input.image_url,
                category_id: input.category_id,
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn update(&self, id: Uuid, input: ProductInput) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let row: Option<ProductRow> = diesel::update(products::table.find(id))
            .set(&ProductChangeset {
                name: input.name,
                description: input.description,
                price: input.price,
                stock: input.stock,
                image_url: input.image_url,
                category_id: input.category_id,
                updated_at: Utc::now(),
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        Ok(row.map(Product::from))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(products::table.find(id))
            .execute(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                    _,
                ) => DomainError::Conflict("Product is referenced by existing orders".to_string()),
                other => other.into(),
            })?;
        Ok(deleted > 0)
    }
}

// ── Deals ────────────────────────────────────────────────────────────────────

pub struct DieselDealRepository {
    pool: DbPool,
}

impl DieselDealRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl DealRepository for DieselDealRepository {
    fn list(&self) -> Result<Vec<Deal>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = deals::table
            .select(DealRow::as_select())
            .order(deals::created_at.desc())
            .load::<DealRow>(&mut conn)?;
        Ok(rows.into_iter().map(Deal::from).collect())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Deal>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = deals::table
            .find(id)
            .select(DealRow::as_select())
            .first::<DealRow>(&mut conn)
            .optional()?;
        Ok(row.map(Deal::from))
    }

    fn create(&self, input: DealInput) -> Result<Deal, DomainError> {
        let mut conn = self.pool.get()?;
        let row: DealRow = diesel::insert_into(deals::table)
            .values(&NewDealRow {
                id: Uuid::new_v4(),
                product_id: input.product_id,
                title: input.title,
                discount: input.discount,
                start_date: input.start_date,
                end_date: input.end_date,
                active: input.active,
            })
            .returning(DealRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn update(&self, id: Uuid, input: DealInput) -> Result<Option<Deal>, DomainError> {
        let mut conn = self.pool.get()?;
        let row: Option<DealRow> = diesel::update(deals::table.find(id))
            .set(&DealChangeset {
                product_id: input.product_id,
                title: input.title,
                discount: input.discount,
                start_date: input.start_date,
                end_date: input.end_date,
                active: input.active,
                updated_at: Utc::now(),
            })
            .returning(DealRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        Ok(row.map(Deal::from))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(deals::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}
