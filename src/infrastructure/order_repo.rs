use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, OrderItemInput, OrderStatus, OrderView};
use crate::domain::ports::OrderRepository;
use crate::domain::Page;
use crate::schema::{order_items, orders, products};

use super::models::{NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow};

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn load_view(conn: &mut PgConnection, order: OrderRow) -> Result<OrderView, DomainError> {
    let items = OrderItemRow::belonging_to(&order)
        .select(OrderItemRow::as_select())
        .load::<OrderItemRow>(conn)?;
    order.into_view(items)
}

/// Product rows are locked in id order so concurrent orders never wait on
/// each other in a cycle.
fn lock_order(items: &[OrderItemInput]) -> Vec<&OrderItemInput> {
    let mut sorted: Vec<&OrderItemInput> = items.iter().collect();
    sorted.sort_by_key(|item| item.product_id);
    sorted
}

fn scoped(user_id: Option<Uuid>) -> orders::BoxedQuery<'static, Pg> {
    let mut query = orders::table.into_boxed();
    if let Some(user_id) = user_id {
        query = query.filter(orders::user_id.eq(user_id));
    }
    query
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: NewOrder) -> Result<Uuid, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Lock each product row, then check and take its stock
            for item in lock_order(&order.items) {
                let stock: i32 = products::table
                    .find(item.product_id)
                    .select(products::stock)
                    .for_update()
                    .first::<i32>(conn)
                    .optional()?
                    .ok_or(DomainError::NotFound("Product"))?;
                if stock < item.quantity {
                    return Err(DomainError::InsufficientStock {
                        product_id: item.product_id,
                        requested: item.quantity,
                        available: stock,
                    });
                }
                diesel::update(products::table.find(item.product_id))
                    .set((
                        products::stock.eq(products::stock - item.quantity),
                        products::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)?;
            }

            // 2. Insert the order
            let order_id = Uuid::new_v4();
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    user_id: order.user_id,
                    status: OrderStatus::Pending.as_str().to_string(),
                    shipping_name: order.shipping.name.clone(),
                    shipping_email: order.shipping.email.clone(),
                    shipping_phone: order.shipping.phone.clone(),
                    shipping_address: order.shipping.address.clone(),
                    shipping_city: order.shipping.city.clone(),
                    shipping_postal_code: order.shipping.postal_code.clone(),
                    shipping_country: order.shipping.country.clone(),
                    delivery_method: order.delivery_method.clone(),
                    payment_method: order.payment_method.clone(),
                    notes: order.notes.clone(),
                    coupon_code: order.coupon_code.clone(),
                    subtotal: order.subtotal.clone(),
                    delivery_cost: order.delivery_cost.clone(),
                    discount: order.discount.clone(),
                    total: order.total.clone(),
                })
                .execute(conn)?;

            // 3. Insert its items
            let new_items: Vec<NewOrderItemRow> = order
                .items
                .iter()
                .map(|i| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: i.product_id,
                    quantity: i.quantity,
                    unit_price: i.unit_price.clone(),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_items)
                .execute(conn)?;

            Ok(order_id)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first::<OrderRow>(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };
        load_view(&mut conn, order).map(Some)
    }

    fn list(
        &self,
        user_id: Option<Uuid>,
        page: i64,
        limit: i64,
    ) -> Result<Page<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page - 1) * limit;
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = scoped(user_id).count().get_result(conn)?;

            let rows = scoped(user_id)
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load::<OrderRow>(conn)?;

            let items = OrderItemRow::belonging_to(&rows)
                .select(OrderItemRow::as_select())
                .load::<OrderItemRow>(conn)?
                .grouped_by(&rows);

            let views = rows
                .into_iter()
                .zip(items)
                .map(|(order, items)| order.into_view(items))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Page {
                items: views,
                total,
            })
        })
    }

    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<OrderView>, DomainError> {
        if status == OrderStatus::Cancelled {
            return Err(DomainError::InvalidInput(
                "orders are cancelled through the cancel operation".to_string(),
            ));
        }
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let current: Option<String> = orders::table
                .find(id)
                .select(orders::status)
                .for_update()
                .first::<String>(conn)
                .optional()?;
            let Some(current) = current else {
                return Ok(None);
            };
            if current == OrderStatus::Cancelled.as_str() {
                return Err(DomainError::Conflict(
                    "Cancelled orders cannot change status".to_string(),
                ));
            }

            let order: OrderRow = diesel::update(orders::table.find(id))
                .set((
                    orders::status.eq(status.as_str()),
                    orders::updated_at.eq(Utc::now()),
                ))
                .returning(OrderRow::as_returning())
                .get_result(conn)?;
            load_view(conn, order).map(Some)
        })
    }

    fn cancel(&self, id: Uuid) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = orders::table
                .find(id)
                .select(OrderRow::as_select())
                .for_update()
                .first::<OrderRow>(conn)
                .optional()?
                .ok_or(DomainError::NotFound("Order"))?;

            if order.status != OrderStatus::Pending.as_str() {
                return Err(DomainError::Conflict(format!(
                    "Only pending orders can be cancelled (order is {})",
                    order.status
                )));
            }

            let items = OrderItemRow::belonging_to(&order)
                .select(OrderItemRow::as_select())
                .load::<OrderItemRow>(conn)?;
            for item in &items {
                diesel::update(products::table.find(item.product_id))
                    .set(products::stock.eq(products::stock + item.quantity))
                    .execute(conn)?;
            }

            let order: OrderRow = diesel::update(orders::table.find(id))
                .set((
                    orders::status.eq(OrderStatus::Cancelled.as_str()),
                    orders::updated_at.eq(Utc::now()),
                ))
                .returning(OrderRow::as_returning())
                .get_result(conn)?;
            order.into_view(items)
        })
    }
}
