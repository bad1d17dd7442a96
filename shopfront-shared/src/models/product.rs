/// Product catalogue model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TYPE product_status AS ENUM ('active', 'inactive');
/// CREATE TYPE shipping_class AS ENUM ('standard', 'express', 'overnight');
///
/// CREATE TABLE products (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name TEXT NOT NULL,
///     sku TEXT NOT NULL UNIQUE,
///     price DOUBLE PRECISION NOT NULL CHECK (price >= 0),
///     stock INTEGER NOT NULL CHECK (stock >= 0),
///     category TEXT NOT NULL,
///     description TEXT,
///     status product_status NOT NULL DEFAULT 'active',
///     weight DOUBLE PRECISION CHECK (weight >= 0),
///     dimensions JSONB,
///     shipping_class shipping_class NOT NULL DEFAULT 'standard',
///     features TEXT[] NOT NULL DEFAULT '{}',
///     images TEXT[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `images` holds public paths such as `/uploads/1735689600000-4f1c...png`;
/// the files themselves are managed by [`crate::storage`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use std::{fmt, str::FromStr};
use uuid::Uuid;
use validator::Validate;

/// Columns selected for every product query
const PRODUCT_COLUMNS: &str = "id, name, sku, price, stock, category, description, status, \
     weight, dimensions, shipping_class, features, images, created_at, updated_at";

/// Whether a product is offered for sale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "product_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProductStatus::Active),
            "inactive" => Ok(ProductStatus::Inactive),
            other => Err(format!(
                "Status must be one of: active, inactive (got '{}')",
                other
            )),
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery speed tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "shipping_class", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ShippingClass {
    #[default]
    Standard,
    Express,
    Overnight,
}

impl ShippingClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingClass::Standard => "standard",
            ShippingClass::Express => "express",
            ShippingClass::Overnight => "overnight",
        }
    }
}

impl FromStr for ShippingClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(ShippingClass::Standard),
            "express" => Ok(ShippingClass::Express),
            "overnight" => Ok(ShippingClass::Overnight),
            other => Err(format!(
                "Shipping class must be one of: standard, express, overnight (got '{}')",
                other
            )),
        }
    }
}

impl fmt::Display for ShippingClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Package dimensions; every side is optional but never negative
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Dimensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "Length must be at least 0"))]
    pub length: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "Width must be at least 0"))]
    pub width: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "Height must be at least 0"))]
    pub height: Option<f64>,
}

impl Dimensions {
    /// True when no side has been given
    pub fn is_empty(&self) -> bool {
        self.length.is_none() && self.width.is_none() && self.height.is_none()
    }
}

/// A catalogue entry
///
/// Serializes to camelCase JSON (`shippingClass`, `createdAt`, ...).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,

    /// Unique across all products
    pub sku: String,

    pub price: f64,
    pub stock: i32,
    pub category: String,
    pub description: Option<String>,
    pub status: ProductStatus,
    pub weight: Option<f64>,
    pub dimensions: Option<Json<Dimensions>>,
    pub shipping_class: ShippingClass,
    pub features: Vec<String>,

    /// Public paths of the product's images, in upload order
    pub images: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product
///
/// Field checks (non-empty text, non-negative numbers) happen in the API
/// layer before this is built; the table CHECK constraints back them up.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub price: f64,
    pub stock: i32,
    pub category: String,
    pub description: Option<String>,
    pub status: ProductStatus,
    pub weight: Option<f64>,
    pub dimensions: Option<Dimensions>,
    pub shipping_class: ShippingClass,
    pub features: Vec<String>,
    pub images: Vec<String>,
}

/// Partial update; only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProductStatus>,
    pub weight: Option<f64>,
    pub dimensions: Option<Dimensions>,
    pub shipping_class: Option<ShippingClass>,
    pub features: Option<Vec<String>>,

    /// Replaces the whole image list when set
    pub images: Option<Vec<String>>,
}

impl ProductChanges {
    /// True when no column would change
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.sku.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.weight.is_none()
            && self.dimensions.is_none()
            && self.shipping_class.is_none()
            && self.features.is_none()
            && self.images.is_none()
    }
}

impl Product {
    /// Inserts a new product
    ///
    /// # Errors
    ///
    /// Returns a database error with constraint `products_sku_key` if the SKU
    /// is taken. Callers check [`Product::find_by_sku`] first.
    pub async fn create(pool: &PgPool, data: NewProduct) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO products (name, sku, price, stock, category, description, status,
                                  weight, dimensions, shipping_class, features, images)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );

        let product = sqlx::query_as::<_, Product>(&query)
            .bind(data.name)
            .bind(data.sku)
            .bind(data.price)
            .bind(data.stock)
            .bind(data.category)
            .bind(data.description)
            .bind(data.status)
            .bind(data.weight)
            .bind(data.dimensions.map(Json))
            .bind(data.shipping_class)
            .bind(data.features)
            .bind(data.images)
            .fetch_one(pool)
            .await?;

        Ok(product)
    }

    /// Finds a product by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);

        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a product by exact SKU
    pub async fn find_by_sku(pool: &PgPool, sku: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM products WHERE sku = $1", PRODUCT_COLUMNS);

        sqlx::query_as::<_, Product>(&query)
            .bind(sku)
            .fetch_optional(pool)
            .await
    }

    /// Lists every product, newest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM products ORDER BY created_at DESC",
            PRODUCT_COLUMNS
        );

        sqlx::query_as::<_, Product>(&query).fetch_all(pool).await
    }

    /// Applies a partial update and bumps `updated_at`
    ///
    /// Returns `None` if no product has this ID. An empty change set still
    /// touches `updated_at` and returns the current row.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: ProductChanges,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE products SET updated_at = NOW()");
        let mut bind_count = 1;

        let mut push_column = |query: &mut String, column: &str| {
            bind_count += 1;
            query.push_str(&format!(", {} = ${}", column, bind_count));
        };

        if data.name.is_some() {
            push_column(&mut query, "name");
        }
        if data.sku.is_some() {
            push_column(&mut query, "sku");
        }
        if data.price.is_some() {
            push_column(&mut query, "price");
        }
        if data.stock.is_some() {
            push_column(&mut query, "stock");
        }
        if data.category.is_some() {
            push_column(&mut query, "category");
        }
        if data.description.is_some() {
            push_column(&mut query, "description");
        }
        if data.status.is_some() {
            push_column(&mut query, "status");
        }
        if data.weight.is_some() {
            push_column(&mut query, "weight");
        }
        if data.dimensions.is_some() {
            push_column(&mut query, "dimensions");
        }
        if data.shipping_class.is_some() {
            push_column(&mut query, "shipping_class");
        }
        if data.features.is_some() {
            push_column(&mut query, "features");
        }
        if data.images.is_some() {
            push_column(&mut query, "images");
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", PRODUCT_COLUMNS));

        // Bind order must match the push order above
        let mut q = sqlx::query_as::<_, Product>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(sku) = data.sku {
            q = q.bind(sku);
        }
        if let Some(price) = data.price {
            q = q.bind(price);
        }
        if let Some(stock) = data.stock {
            q = q.bind(stock);
        }
        if let Some(category) = data.category {
            q = q.bind(category);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(weight) = data.weight {
            q = q.bind(weight);
        }
        if let Some(dimensions) = data.dimensions {
            q = q.bind(Json(dimensions));
        }
        if let Some(shipping_class) = data.shipping_class {
            q = q.bind(shipping_class);
        }
        if let Some(features) = data.features {
            q = q.bind(features);
        }
        if let Some(images) = data.images {
            q = q.bind(images);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a product and returns the removed row
    ///
    /// The returned row lets the caller clean up the product's image files.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("DELETE FROM products WHERE id = $1 RETURNING {}", PRODUCT_COLUMNS);

        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Every image path referenced by any product
    ///
    /// Used by the janitor to tell live files from orphans.
    pub async fn referenced_images(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT DISTINCT unnest(images) FROM products")
            .fetch_all(pool)
            .await
    }
}
