/// Multipart product forms
///
/// Product create and update requests arrive as `multipart/form-data`: text
/// fields by name plus zero or more image parts named `images`. This module
/// reads the stream into a [`ProductForm`], parses every value into its
/// typed form and checks ranges with `validator`.
///
/// # Field conventions
///
/// - scalars: `name`, `sku`, `price`, `stock`, `category`, `description`,
///   `status`, `weight`, `shippingClass`
/// - `dimensions` as a JSON object, or `dimensions[length]`,
///   `dimensions[width]`, `dimensions[height]`
/// - `features` repeated (`features`, `features[]`, `features[0]`, ...) or a
///   single JSON array string
/// - files: `images` or `images[]`
///
/// Text values are trimmed and an empty value counts as absent.

use axum::extract::{multipart::Field, Multipart};
use bytes::BytesMut;
use shopfront_shared::{
    models::product::{Dimensions, NewProduct, ProductChanges, ProductStatus, ShippingClass},
    storage::{ImageUpload, StorageConfig, StorageError},
};
use std::str::FromStr;
use tracing::debug;
use validator::Validate;

use crate::error::{ApiError, ApiResult, ValidationErrorDetail};

/// Parsed product form, before create/update semantics are applied
#[derive(Debug, Clone, Default, Validate)]
pub struct ProductForm {
    pub name: Option<String>,
    pub sku: Option<String>,

    #[validate(range(min = 0.0, message = "Price must be at least 0"))]
    pub price: Option<f64>,

    #[validate(range(
        min = 0,
        max = 2147483647,
        message = "Stock must be a whole number between 0 and 2147483647"
    ))]
    pub stock: Option<i64>,

    pub category: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProductStatus>,

    #[validate(range(min = 0.0, message = "Weight must be at least 0"))]
    pub weight: Option<f64>,

    #[validate(nested)]
    pub dimensions: Option<Dimensions>,

    pub shipping_class: Option<ShippingClass>,
    pub features: Option<Vec<String>>,

    /// Uploaded files in request order; empty file parts are dropped
    pub images: Vec<ImageUpload>,
}

impl ProductForm {
    /// Reads a whole multipart request
    ///
    /// Enforces the per-file size limit while streaming and the file count
    /// limit from `limits`. Returns a validation error if any field fails to
    /// parse or is out of range.
    pub async fn from_multipart(mut multipart: Multipart, limits: &StorageConfig) -> ApiResult<Self> {
        let mut text_fields = Vec::new();
        let mut images = Vec::new();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if is_image_field(&name) {
                if images.len() >= limits.max_files {
                    return Err(ApiError::BadRequest(format!(
                        "Too many images; at most {} allowed",
                        limits.max_files
                    )));
                }

                if let Some(upload) = read_image(field, limits.max_file_bytes).await? {
                    images.push(upload);
                }
            } else if field.file_name().is_some() {
                debug!(field = %name, "Ignoring file in non-image field");
            } else {
                let value = field.text().await?;
                text_fields.push((name, value));
            }
        }

        Self::from_fields(text_fields, images)
    }

    /// Builds a form from already-collected text fields and files
    pub fn from_fields(
        fields: impl IntoIterator<Item = (String, String)>,
        images: Vec<ImageUpload>,
    ) -> ApiResult<Self> {
        let mut form = ProductForm {
            images,
            ..Default::default()
        };
        let mut errors = Vec::new();
        let mut dimensions = Dimensions::default();
        let mut features: Vec<String> = Vec::new();

        for (name, raw) in fields {
            let value = raw.trim();

            match name.as_str() {
                "name" => form.name = non_empty(value),
                "sku" => form.sku = non_empty(value),
                "category" => form.category = non_empty(value),
                "description" => form.description = non_empty(value),
                "price" => form.price = parse_number(&name, value, &mut errors),
                "weight" => form.weight = parse_number(&name, value, &mut errors),
                "stock" => form.stock = parse_whole_number(&name, value, &mut errors),
                "status" => form.status = parse_choice(&name, value, &mut errors),
                "shippingClass" => form.shipping_class = parse_choice(&name, value, &mut errors),
                "dimensions" => {
                    if !value.is_empty() {
                        match serde_json::from_str::<Dimensions>(value) {
                            Ok(parsed) => dimensions = parsed,
                            Err(_) => errors.push(detail(
                                "dimensions",
                                "Dimensions must be a JSON object with numeric length, width and height",
                            )),
                        }
                    }
                }
                "dimensions[length]" => {
                    dimensions.length = parse_number("dimensions.length", value, &mut errors)
                }
                "dimensions[width]" => {
                    dimensions.width = parse_number("dimensions.width", value, &mut errors)
                }
                "dimensions[height]" => {
                    dimensions.height = parse_number("dimensions.height", value, &mut errors)
                }
                "features" if value.starts_with('[') => {
                    match serde_json::from_str::<Vec<String>>(value) {
                        Ok(list) => features.extend(list.iter().filter_map(|f| non_empty(f.trim()))),
                        Err(_) => errors.push(detail(
                            "features",
                            "Features must be a JSON array of strings",
                        )),
                    }
                }
                other if is_features_field(other) => features.extend(non_empty(value)),
                other => debug!(field = %other, "Ignoring unknown product field"),
            }
        }

        if !errors.is_empty() {
            return Err(ApiError::ValidationError(errors));
        }

        if !dimensions.is_empty() {
            form.dimensions = Some(dimensions);
        }
        if !features.is_empty() {
            form.features = Some(features);
        }

        form.validate()?;
        Ok(form)
    }

    /// Checks required fields and builds the record to insert
    ///
    /// `images` are the public paths of the already-stored uploads.
    pub fn into_new_product(self, images: Vec<String>) -> ApiResult<NewProduct> {
        let missing: Vec<ValidationErrorDetail> = [
            ("name", self.name.is_none()),
            ("sku", self.sku.is_none()),
            ("price", self.price.is_none()),
            ("stock", self.stock.is_none()),
            ("category", self.category.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(field, _)| detail(field, &format!("{} is required", field)))
        .collect();

        let (Some(name), Some(sku), Some(price), Some(stock), Some(category)) =
            (self.name, self.sku, self.price, self.stock, self.category)
        else {
            return Err(ApiError::ValidationError(missing));
        };

        Ok(NewProduct {
            name,
            sku,
            price,
            stock: to_stock(stock)?,
            category,
            description: self.description,
            status: self.status.unwrap_or_default(),
            weight: self.weight,
            dimensions: self.dimensions,
            shipping_class: self.shipping_class.unwrap_or_default(),
            features: self.features.unwrap_or_default(),
            images,
        })
    }

    /// Builds a partial update from the fields that were supplied
    ///
    /// Zero numbers count as "not provided" here, the same as empty text.
    /// Images are left to the caller.
    pub fn into_changes(self) -> ApiResult<ProductChanges> {
        let stock = match self.stock.filter(|s| *s != 0) {
            Some(stock) => Some(to_stock(stock)?),
            None => None,
        };

        Ok(ProductChanges {
            name: self.name,
            sku: self.sku,
            price: self.price.filter(|p| *p != 0.0),
            stock,
            category: self.category,
            description: self.description,
            status: self.status,
            weight: self.weight.filter(|w| *w != 0.0),
            dimensions: self.dimensions,
            shipping_class: self.shipping_class,
            features: self.features,
            images: None,
        })
    }
}

async fn read_image(mut field: Field<'_>, max_bytes: u64) -> ApiResult<Option<ImageUpload>> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);
    let mut data = BytesMut::new();

    while let Some(chunk) = field.chunk().await? {
        if (data.len() + chunk.len()) as u64 > max_bytes {
            return Err(StorageError::TooLarge {
                file_name,
                limit: max_bytes,
            }
            .into());
        }
        data.extend_from_slice(&chunk);
    }

    // Browsers send an empty part for an untouched file input
    if file_name.is_empty() && data.is_empty() {
        return Ok(None);
    }

    Ok(Some(ImageUpload {
        file_name,
        content_type,
        data: data.freeze(),
    }))
}

fn is_image_field(name: &str) -> bool {
    matches!(name, "images" | "images[]")
}

fn is_features_field(name: &str) -> bool {
    name == "features"
        || name
            .strip_prefix("features[")
            .and_then(|rest| rest.strip_suffix(']'))
            .is_some_and(|index| index.chars().all(|c| c.is_ascii_digit()))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn detail(field: &str, message: &str) -> ValidationErrorDetail {
    ValidationErrorDetail {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn parse_number(field: &str, value: &str, errors: &mut Vec<ValidationErrorDetail>) -> Option<f64> {
    if value.is_empty() {
        return None;
    }

    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n),
        _ => {
            errors.push(detail(field, &format!("{} must be a number", field)));
            None
        }
    }
}

fn parse_whole_number(
    field: &str,
    value: &str,
    errors: &mut Vec<ValidationErrorDetail>,
) -> Option<i64> {
    if value.is_empty() {
        return None;
    }

    match value.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => {
            errors.push(detail(field, &format!("{} must be a whole number", field)));
            None
        }
    }
}

fn parse_choice<T>(field: &str, value: &str, errors: &mut Vec<ValidationErrorDetail>) -> Option<T>
where
    T: FromStr<Err = String>,
{
    if value.is_empty() {
        return None;
    }

    match value.to_ascii_lowercase().parse::<T>() {
        Ok(choice) => Some(choice),
        Err(message) => {
            errors.push(detail(field, &message));
            None
        }
    }
}

fn to_stock(stock: i64) -> ApiResult<i32> {
    i32::try_from(stock).map_err(|_| ApiError::invalid("stock", "Stock is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{header, Request},
    };

    const BOUNDARY: &str = "form-boundary";

    async fn multipart_of(files: &[(&str, &[u8])]) -> Multipart {
        let mut body = Vec::new();
        for (file_name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                    BOUNDARY, file_name
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::post("/api/products")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();

        Multipart::from_request(request, &()).await.unwrap()
    }

    fn limits(max_file_bytes: u64, max_files: usize) -> StorageConfig {
        let mut config = StorageConfig::new("uploads");
        config.max_file_bytes = max_file_bytes;
        config.max_files = max_files;
        config
    }

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn complete() -> Vec<(String, String)> {
        fields(&[
            ("name", "  Test Product "),
            ("sku", "TEST-123"),
            ("price", "99.99"),
            ("stock", "100"),
            ("category", "Electronics"),
        ])
    }

    fn error_fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::ValidationError(details) => details.into_iter().map(|d| d.field).collect(),
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_complete_form_builds_product_with_defaults() {
        let form = ProductForm::from_fields(complete(), Vec::new()).unwrap();
        let product = form
            .into_new_product(vec!["/uploads/a.png".to_string()])
            .unwrap();

        assert_eq!(product.name, "Test Product");
        assert_eq!(product.sku, "TEST-123");
        assert_eq!(product.price, 99.99);
        assert_eq!(product.stock, 100);
        assert_eq!(product.status, ProductStatus::Active);
        assert_eq!(product.shipping_class, ShippingClass::Standard);
        assert!(product.features.is_empty());
        assert!(product.dimensions.is_none());
        assert_eq!(product.images, vec!["/uploads/a.png"]);
    }

    #[test]
    fn test_missing_required_fields_are_reported() {
        let form = ProductForm::from_fields(fields(&[("name", "Only a name"), ("sku", "  ")]), Vec::new())
            .unwrap();
        let err = form.into_new_product(Vec::new()).unwrap_err();

        assert_eq!(error_fields(err), vec!["sku", "price", "stock", "category"]);
    }

    #[test]
    fn test_zero_price_and_stock_allowed_on_create() {
        let mut input = complete();
        input.push(("price".to_string(), "0".to_string()));
        input.push(("stock".to_string(), "0".to_string()));

        let product = ProductForm::from_fields(input, Vec::new())
            .unwrap()
            .into_new_product(Vec::new())
            .unwrap();

        assert_eq!(product.price, 0.0);
        assert_eq!(product.stock, 0);
    }

    #[test]
    fn test_negative_values_rejected() {
        let err = ProductForm::from_fields(
            fields(&[("price", "-1"), ("stock", "-5"), ("weight", "-0.5")]),
            Vec::new(),
        )
        .unwrap_err();

        assert_eq!(error_fields(err), vec!["price", "stock", "weight"]);
    }

    #[test]
    fn test_malformed_values_rejected() {
        let err = ProductForm::from_fields(
            fields(&[
                ("price", "cheap"),
                ("stock", "1.5"),
                ("status", "archived"),
                ("shippingClass", "teleport"),
            ]),
            Vec::new(),
        )
        .unwrap_err();

        assert_eq!(
            error_fields(err),
            vec!["price", "stock", "status", "shippingClass"]
        );
    }

    #[test]
    fn test_enums_are_case_insensitive() {
        let form = ProductForm::from_fields(
            fields(&[("status", "Inactive"), ("shippingClass", "OVERNIGHT")]),
            Vec::new(),
        )
        .unwrap();

        assert_eq!(form.status, Some(ProductStatus::Inactive));
        assert_eq!(form.shipping_class, Some(ShippingClass::Overnight));
    }

    #[test]
    fn test_dimensions_from_brackets() {
        let form = ProductForm::from_fields(
            fields(&[
                ("dimensions[length]", "10"),
                ("dimensions[width]", "5"),
                ("dimensions[height]", ""),
            ]),
            Vec::new(),
        )
        .unwrap();

        assert_eq!(
            form.dimensions,
            Some(Dimensions {
                length: Some(10.0),
                width: Some(5.0),
                height: None,
            })
        );
    }

    #[test]
    fn test_dimensions_from_json() {
        let form = ProductForm::from_fields(
            fields(&[("dimensions", r#"{"length": 10, "width": 5, "height": 2}"#)]),
            Vec::new(),
        )
        .unwrap();

        assert_eq!(form.dimensions.and_then(|d| d.height), Some(2.0));
    }

    #[test]
    fn test_negative_dimension_rejected() {
        let err = ProductForm::from_fields(fields(&[("dimensions[height]", "-2")]), Vec::new())
            .unwrap_err();

        assert_eq!(error_fields(err), vec!["dimensions.height"]);
    }

    #[test]
    fn test_features_variants() {
        let repeated = ProductForm::from_fields(
            fields(&[
                ("features", "Waterproof"),
                ("features[]", " Bluetooth "),
                ("features[2]", ""),
                ("features[3]", "USB-C"),
            ]),
            Vec::new(),
        )
        .unwrap();
        assert_eq!(
            repeated.features,
            Some(vec![
                "Waterproof".to_string(),
                "Bluetooth".to_string(),
                "USB-C".to_string()
            ])
        );

        let json = ProductForm::from_fields(
            fields(&[("features", r#"["Feature 1", "Feature 2"]"#)]),
            Vec::new(),
        )
        .unwrap();
        assert_eq!(
            json.features,
            Some(vec!["Feature 1".to_string(), "Feature 2".to_string()])
        );
    }

    #[test]
    fn test_update_skips_empty_and_zero_values() {
        let changes = ProductForm::from_fields(
            fields(&[
                ("name", ""),
                ("price", "0"),
                ("stock", "0"),
                ("weight", "0"),
                ("category", "Garden"),
            ]),
            Vec::new(),
        )
        .unwrap()
        .into_changes()
        .unwrap();

        assert!(changes.name.is_none());
        assert!(changes.price.is_none());
        assert!(changes.stock.is_none());
        assert!(changes.weight.is_none());
        assert_eq!(changes.category.as_deref(), Some("Garden"));
        assert!(changes.images.is_none());
    }

    #[test]
    fn test_empty_update_has_no_changes() {
        let changes = ProductForm::from_fields(Vec::new(), Vec::new())
            .unwrap()
            .into_changes()
            .unwrap();

        assert!(changes.is_empty());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let form = ProductForm::from_fields(fields(&[("colour", "red")]), Vec::new()).unwrap();
        assert!(form.name.is_none());
    }

    #[test]
    fn test_feature_field_names() {
        assert!(is_features_field("features"));
        assert!(is_features_field("features[]"));
        assert!(is_features_field("features[12]"));
        assert!(!is_features_field("features[x]"));
        assert!(!is_features_field("featured"));
    }

    #[tokio::test]
    async fn test_file_over_size_limit_rejected() {
        let multipart = multipart_of(&[("a.png", &[0u8; 11])]).await;

        match ProductForm::from_multipart(multipart, &limits(10, 5)).await {
            Err(ApiError::BadRequest(message)) => assert!(message.contains("a.png")),
            other => panic!("Expected bad request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_file_at_size_limit_accepted() {
        let multipart = multipart_of(&[("a.png", &[0u8; 10])]).await;

        let form = ProductForm::from_multipart(multipart, &limits(10, 5))
            .await
            .unwrap();

        assert_eq!(form.images.len(), 1);
        assert_eq!(form.images[0].file_name, "a.png");
        assert_eq!(form.images[0].data.len(), 10);
    }

    #[tokio::test]
    async fn test_too_many_files_rejected() {
        let multipart = multipart_of(&[("a.png", b"one"), ("b.png", b"two")]).await;

        match ProductForm::from_multipart(multipart, &limits(10, 1)).await {
            Err(ApiError::BadRequest(message)) => {
                assert_eq!(message, "Too many images; at most 1 allowed")
            }
            other => panic!("Expected bad request, got {:?}", other),
        }
    }
}
