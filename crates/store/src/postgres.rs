use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::CustomerId;
use domain::{Money, Order, OrderStatus};
use sqlx::{
    PgConnection, PgPool, Postgres, Row, Transaction,
    postgres::{PgArguments, PgRow},
    query::Query,
};
use uuid::Uuid;

use crate::{
    Notification, NotificationId, OrderId, Product, ProductId, Result, StockLevel, StoreError,
    VendorId, Version,
    store::{NotificationStore, OrderStore, ProductStore, StockTransaction},
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get::<String, _>("id")?),
            vendor_id: VendorId::new(row.try_get::<String, _>("vendor_id")?),
            name: row.try_get("name")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            stock: row.try_get("stock")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let document: serde_json::Value = row.try_get("document")?;
        let mut order: Order = serde_json::from_value(document)?;
        order.set_version(Version::new(row.try_get("version")?));
        Ok(order)
    }

    fn row_to_notification(row: PgRow) -> Result<Notification> {
        Ok(Notification {
            id: NotificationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            vendor_id: VendorId::new(row.try_get::<String, _>("vendor_id")?),
            message: row.try_get("message")?,
            is_read: row.try_get("is_read")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    async fn fetch_orders(&self, query: Query<'_, Postgres, PgArguments>) -> Result<Vec<Order>> {
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }
}

/// SQLSTATE raised when `stock + delta` leaves the bigint range.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// Conditionally adjusts stock on one connection; reports why when the
/// update matched no row.
async fn adjust_stock(
    conn: &mut PgConnection,
    product_id: &ProductId,
    delta: i64,
) -> Result<StockLevel> {
    let row = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock + $2
        WHERE id = $1 AND stock + $2 >= 0
        RETURNING vendor_id, stock
        "#,
    )
    .bind(product_id.as_str())
    .bind(delta)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE)
        {
            return StoreError::StockOverflow {
                product_id: product_id.clone(),
                delta,
            };
        }
        StoreError::Database(e)
    })?;

    if let Some(row) = row {
        return Ok(StockLevel {
            product_id: product_id.clone(),
            vendor_id: VendorId::new(row.try_get::<String, _>("vendor_id")?),
            quantity: row.try_get("stock")?,
        });
    }

    let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
        .bind(product_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;

    match available {
        Some(available) => Err(StoreError::InsufficientStock {
            product_id: product_id.clone(),
            requested: -delta,
            available,
        }),
        None => Err(StoreError::ProductNotFound(product_id.clone())),
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    type Transaction = PostgresStockTransaction;

    async fn insert_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, vendor_id, name, unit_price_cents, stock)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(product.id.as_str())
        .bind(product.vendor_id.as_str())
        .bind(&product.name)
        .bind(product.unit_price.cents())
        .bind(product.stock)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("products_pkey")
            {
                return StoreError::DuplicateProduct(product.id.clone());
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, vendor_id, name, unit_price_cents, stock FROM products WHERE id = $1",
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"SELECT id, vendor_id, name, unit_price_cents, stock FROM products ORDER BY id COLLATE "C""#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn try_adjust(&self, product_id: &ProductId, delta: i64) -> Result<StockLevel> {
        let mut conn = self.pool.acquire().await?;
        adjust_stock(&mut conn, product_id, delta).await
    }

    async fn begin(&self, product_ids: &[ProductId]) -> Result<Self::Transaction> {
        let mut tx = self.pool.begin().await?;

        let ids: Vec<String> = product_ids.iter().map(|id| id.to_string()).collect();

        // Row locks in byte order of the id, same order as every other
        // transaction opened here.
        sqlx::query(
            r#"
            SELECT id FROM products
            WHERE id = ANY($1)
            ORDER BY id COLLATE "C"
            FOR UPDATE
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;

        Ok(PostgresStockTransaction { tx })
    }
}

/// Stock transaction backed by a real database transaction.
///
/// Order rows written through it share the transaction, so the reservation
/// and the order record commit together. Dropping it without commit lets
/// sqlx roll the transaction back.
pub struct PostgresStockTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StockTransaction for PostgresStockTransaction {
    async fn adjust(&mut self, product_id: &ProductId, delta: i64) -> Result<StockLevel> {
        adjust_stock(&mut *self.tx, product_id, delta).await
    }

    async fn insert_order(&mut self, order: &Order) -> Result<Version> {
        insert_order_row(&mut *self.tx, order).await
    }

    async fn update_order(&mut self, order: &Order) -> Result<Version> {
        update_order_row(&mut *self.tx, order).await
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Inserts an order row on one connection.
async fn insert_order_row(conn: &mut PgConnection, order: &Order) -> Result<Version> {
    let version = Version::first();
    let document = serde_json::to_value(order)?;

    sqlx::query(
        r#"
        INSERT INTO orders (id, version, customer_id, status, created_at, document)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(order.id().as_uuid())
    .bind(version.as_i64())
    .bind(order.customer_id().as_uuid())
    .bind(order.status().as_str())
    .bind(order.created_at())
    .bind(&document)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.constraint() == Some("orders_pkey")
        {
            return StoreError::DuplicateOrder(order.id());
        }
        StoreError::Database(e)
    })?;

    Ok(version)
}

/// Replaces an order row on one connection if its version still matches.
async fn update_order_row(conn: &mut PgConnection, order: &Order) -> Result<Version> {
    let expected = order.version();
    let new_version = expected.next();
    let document = serde_json::to_value(order)?;

    let result = sqlx::query(
        r#"
        UPDATE orders
        SET version = $2, status = $3, document = $4
        WHERE id = $1 AND version = $5
        "#,
    )
    .bind(order.id().as_uuid())
    .bind(new_version.as_i64())
    .bind(order.status().as_str())
    .bind(&document)
    .bind(expected.as_i64())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(new_version);
    }

    let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
        .bind(order.id().as_uuid())
        .fetch_optional(&mut *conn)
        .await?;

    match actual {
        Some(actual) => Err(StoreError::ConcurrencyConflict {
            order_id: order.id(),
            expected,
            actual: Version::new(actual),
        }),
        None => Err(StoreError::OrderNotFound(order.id())),
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: &Order) -> Result<Version> {
        let mut conn = self.pool.acquire().await?;
        insert_order_row(&mut conn, order).await
    }

    async fn update_order(&self, order: &Order) -> Result<Version> {
        let mut conn = self.pool.acquire().await?;
        update_order_row(&mut conn, order).await
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT version, document FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        self.fetch_orders(sqlx::query(
            "SELECT version, document FROM orders ORDER BY created_at ASC, id ASC",
        ))
        .await
    }

    async fn orders_for_vendor(&self, vendor_id: &VendorId) -> Result<Vec<Order>> {
        let needle = serde_json::json!([{ "vendor_id": vendor_id }]);
        self.fetch_orders(
            sqlx::query(
                r#"
                SELECT version, document FROM orders
                WHERE document -> 'items' @> $1
                ORDER BY created_at ASC, id ASC
                "#,
            )
            .bind(needle),
        )
        .await
    }

    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        self.fetch_orders(
            sqlx::query(
                r#"
                SELECT version, document FROM orders
                WHERE customer_id = $1
                ORDER BY created_at ASC, id ASC
                "#,
            )
            .bind(customer_id.as_uuid()),
        )
        .await
    }

    async fn has_pending_orders(&self, product_id: &ProductId) -> Result<bool> {
        let needle = serde_json::json!([{ "product_id": product_id }]);
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM orders
                WHERE status = $1 AND document -> 'items' @> $2
            )
            "#,
        )
        .bind(OrderStatus::Pending.as_str())
        .bind(needle)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn save_notification(&self, notification: Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, vendor_id, message, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.vendor_id.as_str())
        .bind(&notification.message)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn notifications_for_vendor(&self, vendor_id: &VendorId) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, vendor_id, message, is_read, created_at
            FROM notifications
            WHERE vendor_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(vendor_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_notification).collect()
    }

    async fn all_notifications(&self) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            "SELECT id, vendor_id, message, is_read, created_at FROM notifications ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_notification).collect()
    }

    async fn mark_notification_read(&self, notification_id: NotificationId) -> Result<()> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(notification_id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotificationNotFound(notification_id));
        }
        Ok(())
    }
}
