//! # Catalog Repository
//!
//! Warehouses, products and variants: the reference data every stock
//! ledger key points at.
//!
//! Unlike the ledgers these rows are plain CRUD. They are created through
//! the pool directly; workflows only ever read them, inside their own
//! transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tradebook_core::validation::{validate_name, validate_price_cents, validate_sku};
use tradebook_core::{CoreError, Money, Product, ProductVariant, Warehouse};

/// Input for [`CatalogRepository::create_product`].
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub price_cents: i64,
    pub cost_cents: Option<i64>,
    pub reorder_level: i64,
}

/// Repository for warehouses, products and variants.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Warehouses
    // =========================================================================

    pub async fn create_warehouse(&self, code: &str, name: &str) -> DbResult<Warehouse> {
        validate_name("warehouse code", code).map_err(CoreError::from)?;
        validate_name("warehouse name", name).map_err(CoreError::from)?;

        let warehouse = Warehouse {
            id: Uuid::new_v4().to_string(),
            code: code.trim().to_string(),
            name: name.trim().to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %warehouse.id, code = %warehouse.code, "Creating warehouse");

        sqlx::query(
            r#"
            INSERT INTO warehouses (id, code, name, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&warehouse.id)
        .bind(&warehouse.code)
        .bind(&warehouse.name)
        .bind(warehouse.is_active)
        .bind(warehouse.created_at)
        .execute(&self.pool)
        .await?;

        Ok(warehouse)
    }

    pub async fn find_warehouse_in(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Warehouse>> {
        let warehouse = sqlx::query_as::<_, Warehouse>(
            r#"
            SELECT id, code, name, is_active, created_at
            FROM warehouses
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(warehouse)
    }

    /// Loads an active warehouse or fails with `WarehouseNotFound`.
    pub async fn require_warehouse_in(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Warehouse> {
        match self.find_warehouse_in(conn, id).await? {
            Some(warehouse) if warehouse.is_active => Ok(warehouse),
            _ => Err(CoreError::WarehouseNotFound(id.to_string()).into()),
        }
    }

    pub async fn find_warehouse(&self, id: &str) -> DbResult<Option<Warehouse>> {
        let mut conn = self.pool.acquire().await?;
        self.find_warehouse_in(&mut conn, id).await
    }

    pub async fn list_warehouses(&self) -> DbResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(
            r#"
            SELECT id, code, name, is_active, created_at
            FROM warehouses
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(warehouses)
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn create_product(&self, input: NewProduct) -> DbResult<Product> {
        validate_sku(&input.sku).map_err(CoreError::from)?;
        validate_name("name", &input.name).map_err(CoreError::from)?;
        validate_price_cents(input.price_cents).map_err(CoreError::from)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: input.sku.trim().to_string(),
            name: input.name.trim().to_string(),
            price_cents: input.price_cents,
            cost_cents: input.cost_cents,
            reorder_level: input.reorder_level,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, sku = %product.sku, "Creating product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, price_cents, cost_cents,
                reorder_level, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.reorder_level)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    pub async fn find_product_in(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, price_cents, cost_cents,
                   reorder_level, is_active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(product)
    }

    /// Loads an active product or fails with `ProductNotFound`.
    pub async fn require_product_in(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Product> {
        match self.find_product_in(conn, id).await? {
            Some(product) if product.is_active => Ok(product),
            _ => Err(CoreError::ProductNotFound(id.to_string()).into()),
        }
    }

    pub async fn find_product(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        self.find_product_in(&mut conn, id).await
    }

    /// Lists active products, optionally filtered by SKU/name substring.
    pub async fn list_products(&self, query: Option<&str>, limit: u32) -> DbResult<Vec<Product>> {
        let pattern = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q));

        debug!(query = ?pattern, limit = %limit, "Listing products");

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, price_cents, cost_cents,
                   reorder_level, is_active, created_at, updated_at
            FROM products
            WHERE is_active = 1
              AND (?1 IS NULL OR sku LIKE ?1 OR name LIKE ?1)
            ORDER BY name
            LIMIT ?2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    // =========================================================================
    // Variants
    // =========================================================================

    pub async fn create_variant(
        &self,
        product_id: &str,
        sku: &str,
        name: &str,
        price_cents: Option<i64>,
    ) -> DbResult<ProductVariant> {
        validate_sku(sku).map_err(CoreError::from)?;
        validate_name("variant name", name).map_err(CoreError::from)?;
        if let Some(price) = price_cents {
            validate_price_cents(price).map_err(CoreError::from)?;
        }
        if self.find_product(product_id).await?.is_none() {
            return Err(CoreError::ProductNotFound(product_id.to_string()).into());
        }

        let variant = ProductVariant {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            sku: sku.trim().to_string(),
            name: name.trim().to_string(),
            price_cents,
            created_at: Utc::now(),
        };

        debug!(id = %variant.id, product_id = %product_id, "Creating variant");

        sqlx::query(
            r#"
            INSERT INTO product_variants (id, product_id, sku, name, price_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(&variant.sku)
        .bind(&variant.name)
        .bind(variant.price_cents)
        .bind(variant.created_at)
        .execute(&self.pool)
        .await?;

        Ok(variant)
    }

    /// Loads a variant that belongs to `product_id`, or fails with
    /// `VariantNotFound`.
    pub async fn require_variant_in(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        variant_id: &str,
    ) -> DbResult<ProductVariant> {
        let variant = sqlx::query_as::<_, ProductVariant>(
            r#"
            SELECT id, product_id, sku, name, price_cents, created_at
            FROM product_variants
            WHERE id = ?1 AND product_id = ?2
            "#,
        )
        .bind(variant_id)
        .bind(product_id)
        .fetch_optional(conn)
        .await?;

        variant.ok_or_else(|| {
            CoreError::VariantNotFound {
                product_id: product_id.to_string(),
                variant_id: variant_id.to_string(),
            }
            .into()
        })
    }

    /// List price of a product, or of one of its variants.
    ///
    /// A variant's own price overrides the product price; a variant with
    /// no price sells at the product price.
    pub async fn list_price_in(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        variant_id: Option<&str>,
    ) -> DbResult<Money> {
        let product = self.require_product_in(conn, product_id).await?;
        let variant_price = match variant_id {
            Some(variant_id) => {
                self.require_variant_in(conn, product_id, variant_id)
                    .await?
                    .price_cents
            }
            None => None,
        };

        Ok(Money::from_cents(variant_price.unwrap_or(product.price_cents)))
    }

    pub async fn list_price(&self, product_id: &str, variant_id: Option<&str>) -> DbResult<Money> {
        let mut conn = self.pool.acquire().await?;
        self.list_price_in(&mut conn, product_id, variant_id).await
    }

    pub async fn variants_for(&self, product_id: &str) -> DbResult<Vec<ProductVariant>> {
        let variants = sqlx::query_as::<_, ProductVariant>(
            r#"
            SELECT id, product_id, sku, name, price_cents, created_at
            FROM product_variants
            WHERE product_id = ?1
            ORDER BY sku
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(variants)
    }
}
