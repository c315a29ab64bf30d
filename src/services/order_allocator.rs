//! Order Allocator: validates and executes a single order placement
//! atomically against product stock.
//!
//! The row lock taken in step 1 serializes contenders against a single
//! product row, which is sufficient in the common single-process case. The
//! conditional version update in step 5 is defense in depth: if any path
//! ever bypasses the lock, the update still refuses to oversell.

use uuid::Uuid;

use crate::db::{orders, products, Database};
use crate::error::{AppError, NotFoundKind};
use crate::metrics;
use crate::models::order::{CreateOrderRequest, Order, OrderWithProduct};
use crate::models::product::{DecrementOutcome, ProductSnapshot};

pub struct OrderAllocator {
    db: Database,
}

impl OrderAllocator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn validate(req: &CreateOrderRequest) -> Result<(), AppError> {
        if req.product_id < 1 {
            return Err(AppError::Validation("product_id must be >= 1".to_string()));
        }
        if req.quantity < 1 {
            return Err(AppError::Validation("quantity must be >= 1".to_string()));
        }
        if req.buyer_id.trim().is_empty() {
            return Err(AppError::Validation("buyer_id must not be empty".to_string()));
        }
        Ok(())
    }

    /// Creates a CONFIRMED order inside a single storage transaction, or
    /// fails with a domain error. See module docs for the concurrency story.
    pub async fn create_order(&self, req: CreateOrderRequest) -> Result<Order, AppError> {
        Self::validate(&req)?;

        let order_id = Uuid::new_v4();

        let order = self
            .db
            .with_transaction(|mut tx| async move {
                let product = products::lock_for_update(&mut tx, req.product_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(NotFoundKind::Product, format!("product {} not found", req.product_id))
                    })?;

                if product.stock < req.quantity {
                    metrics::record_order_out_of_stock();
                    return Err(AppError::OutOfStock(req.product_id));
                }

                let total = product.price * req.quantity;

                let order = orders::insert(
                    &mut tx,
                    order_id,
                    req.product_id,
                    &req.buyer_id,
                    req.quantity,
                    total,
                )
                .await?;

                let outcome =
                    products::decrement_stock(&mut tx, req.product_id, req.quantity, product.version).await?;

                match outcome {
                    DecrementOutcome::Ok => {}
                    DecrementOutcome::OutOfStock => {
                        metrics::record_order_out_of_stock();
                        return Err(AppError::OutOfStock(req.product_id));
                    }
                    DecrementOutcome::ConcurrencyConflict => {
                        metrics::record_order_concurrency_conflict();
                        return Err(AppError::ConcurrencyConflict(req.product_id));
                    }
                }

                Ok((order, tx))
            })
            .await?;

        metrics::record_order_created();
        tracing::info!(
            order_id = %order.id,
            buyer_id = %order.buyer_id,
            product_id = order.product_id,
            quantity = order.quantity,
            "order created"
        );

        Ok(order)
    }

    pub async fn get_order(&self, id: Uuid) -> Result<OrderWithProduct, AppError> {
        let order = orders::find(&self.db.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(NotFoundKind::Order, format!("order {} not found", id)))?;

        let product = products::find(&self.db.pool, order.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(NotFoundKind::Product, format!("product {} not found", order.product_id)))?;

        Ok(OrderWithProduct {
            order: order.into(),
            product: ProductSnapshot::from(product),
        })
    }

    /// `limit` clamped to `[1, 100]` (default 10); negative `offset` becomes 0.
    pub async fn list_orders(&self, limit: Option<i64>, offset: Option<i64>) -> Result<(Vec<Order>, i64, i64), AppError> {
        let limit = limit.unwrap_or(10).clamp(1, 100);
        let offset = offset.unwrap_or(0).max(0);

        let orders = orders::list(&self.db.pool, limit, offset).await?;
        Ok((orders, limit, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(product_id: i64, quantity: i64, buyer_id: &str) -> CreateOrderRequest {
        CreateOrderRequest {
            product_id,
            quantity,
            buyer_id: buyer_id.to_string(),
        }
    }

    #[test]
    fn rejects_non_positive_product_id() {
        assert!(matches!(
            OrderAllocator::validate(&req(0, 1, "buyer")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn rejects_zero_quantity() {
        assert!(matches!(
            OrderAllocator::validate(&req(1, 0, "buyer")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn rejects_empty_buyer_id() {
        assert!(matches!(
            OrderAllocator::validate(&req(1, 1, "   ")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn accepts_well_formed_request() {
        assert!(OrderAllocator::validate(&req(1, 1, "buyer-1")).is_ok());
    }

    #[test]
    fn list_orders_clamps_limit_and_offset_logic() {
        // Pure clamp logic mirrored here since list_orders itself needs a pool;
        // exercised end-to-end against a real database in integration tests.
        assert_eq!(None::<i64>.unwrap_or(10).clamp(1, 100), 10);
        assert_eq!(Some(500i64).unwrap_or(10).clamp(1, 100), 100);
        assert_eq!(Some(-5i64).unwrap_or(0).max(0), 0);
    }
}
