/// Product catalogue endpoints
///
/// # Endpoints
///
/// - `GET /api/products` - List products, newest first
/// - `POST /api/products` - Create a product (multipart, one or more `images`)
/// - `GET /api/products/:id` - Fetch one product
/// - `PUT /api/products/:id` - Partial update (multipart, optional `images`)
/// - `DELETE /api/products/:id` - Delete a product
///
/// Image files are written before the row that references them. Files that
/// end up unreferenced (replaced, deleted, or written for a failed insert)
/// go to the cleanup queue instead of being removed inline.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    forms::ProductForm,
};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use shopfront_shared::models::product::Product;
use tracing::info;
use uuid::Uuid;

fn not_found() -> ApiError {
    ApiError::NotFound("Product not found".to_string())
}

fn sku_conflict() -> ApiError {
    ApiError::Conflict("Product with this SKU already exists".to_string())
}

/// Malformed IDs are reported exactly like unknown ones
fn parse_product_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| not_found())
}

/// List all products
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    let products = Product::list(&state.db).await?;
    Ok(Json(products))
}

/// Fetch one product
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let id = parse_product_id(&id)?;

    let product = Product::find_by_id(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(product))
}

/// Create a product
///
/// ```text
/// POST /api/products
/// Content-Type: multipart/form-data
///
/// name=Test Product, sku=TEST-123, price=99.99, stock=100,
/// category=Electronics, images=@front.png
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: no images, missing or invalid field, rejected file,
///   duplicate SKU
pub async fn create_product(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let mut form = ProductForm::from_multipart(multipart?, state.images.config()).await?;
    let uploads = std::mem::take(&mut form.images);

    if uploads.is_empty() {
        return Err(ApiError::invalid("images", "At least one image is required"));
    }

    let mut new_product = form.into_new_product(Vec::new())?;

    if Product::find_by_sku(&state.db, &new_product.sku).await?.is_some() {
        return Err(sku_conflict());
    }

    let stored = state.images.save_all(&uploads).await?;
    new_product.images = stored.into_iter().map(|image| image.url).collect();

    let product = match Product::create(&state.db, new_product.clone()).await {
        Ok(product) => product,
        Err(e) => {
            state.cleanup.enqueue(new_product.images);
            return Err(e.into());
        }
    };

    info!(
        product_id = %product.id,
        sku = %product.sku,
        images = product.images.len(),
        "Product created"
    );

    Ok((StatusCode::CREATED, Json(product)))
}

/// Partially update a product
///
/// Only non-empty, non-zero fields are applied. Uploading new images
/// replaces the whole image list; the previous files are cleaned up once
/// the update is committed.
///
/// # Errors
///
/// - `404 Not Found`: unknown or malformed ID
/// - `400 Bad Request`: invalid field, rejected file, SKU owned by another
///   product
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Product>> {
    let id = parse_product_id(&id)?;

    let existing = Product::find_by_id(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    let mut form = ProductForm::from_multipart(multipart?, state.images.config()).await?;
    let uploads = std::mem::take(&mut form.images);
    let mut changes = form.into_changes()?;

    if let Some(sku) = changes.sku.as_deref() {
        if let Some(owner) = Product::find_by_sku(&state.db, sku).await? {
            if owner.id != id {
                return Err(sku_conflict());
            }
        }
    }

    let new_images: Vec<String> = if uploads.is_empty() {
        Vec::new()
    } else {
        let stored = state.images.save_all(&uploads).await?;
        stored.into_iter().map(|image| image.url).collect()
    };

    if !new_images.is_empty() {
        changes.images = Some(new_images.clone());
    }

    let updated = match Product::update(&state.db, id, changes).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            // Deleted between the lookup and the update
            state.cleanup.enqueue(new_images);
            return Err(not_found());
        }
        Err(e) => {
            state.cleanup.enqueue(new_images);
            return Err(e.into());
        }
    };

    if !new_images.is_empty() {
        let replaced: Vec<String> = existing
            .images
            .into_iter()
            .filter(|url| !updated.images.contains(url))
            .collect();
        state.cleanup.enqueue(replaced);
    }

    info!(product_id = %updated.id, sku = %updated.sku, "Product updated");

    Ok(Json(updated))
}

/// Delete a product
///
/// Responds `{"message": "Product deleted successfully"}`.
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_product_id(&id)?;

    let deleted = Product::delete(&state.db, id)
        .await?
        .ok_or_else(not_found)?;

    state.cleanup.enqueue(deleted.images);

    info!(product_id = %deleted.id, sku = %deleted.sku, "Product deleted");

    Ok(Json(json!({ "message": "Product deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_id_is_not_found() {
        assert!(matches!(parse_product_id("not-a-uuid"), Err(ApiError::NotFound(_))));
        assert!(matches!(parse_product_id("64b7f0c2e4b0a1a2b3c4d5e6"), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_valid_id_parses() {
        let id = Uuid::new_v4();
        assert_eq!(parse_product_id(&id.to_string()).unwrap(), id);
    }
}
