/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use shopfront_api::{app::{build_router, AppState}, config::Config};
/// use shopfront_shared::{db::pool::create_pool, storage::{CleanupQueue, ImageStore}};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(config.pool_config()).await?;
/// let images = ImageStore::new(config.uploads.clone());
/// let (cleanup, _worker) = CleanupQueue::start(images.clone());
///
/// let app = build_router(AppState::new(pool, config, images, cleanup));
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use shopfront_shared::{
    auth::jwt,
    storage::{CleanupQueue, ImageStore},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use uuid::Uuid;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every member is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Product image files
    pub images: ImageStore,

    /// Deferred removal of files that lost their product
    pub cleanup: CleanupQueue,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, images: ImageStore, cleanup: CleanupQueue) -> Self {
        Self {
            db,
            config: Arc::new(config),
            images,
            cleanup,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Identity of an authenticated caller, inserted by [`jwt_auth_layer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                   # Health check
/// ├── /api/
/// │   ├── /auth/
/// │   │   ├── POST /register
/// │   │   ├── POST /login
/// │   │   ├── GET  /customers
/// │   │   └── GET  /me          # Bearer token required
/// │   └── /products/
/// │       ├── GET    /
/// │       ├── POST   /          # multipart
/// │       ├── GET    /:id
/// │       ├── PUT    /:id       # multipart
/// │       └── DELETE /:id
/// └── /uploads/<file>           # Static images (mirror as fallback)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Body size limit (product routes)
/// 4. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let me_route = Router::new()
        .route("/me", get(routes::auth::me))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/customers", get(routes::auth::list_customers))
        .merge(me_route);

    let product_routes = Router::new()
        .route(
            "/",
            get(routes::products::list_products).post(routes::products::create_product),
        )
        .route(
            "/:id",
            get(routes::products::get_product)
                .put(routes::products::update_product)
                .delete(routes::products::delete_product),
        )
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes()));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/products", product_routes);

    let uploads = &state.config.uploads;
    let router = Router::new()
        .merge(health_routes)
        .nest("/api", api_routes);

    let router = match &uploads.mirror_dir {
        Some(mirror) => router.nest_service(
            &uploads.public_prefix,
            ServeDir::new(&uploads.dir).fallback(ServeDir::new(mirror)),
        ),
        None => router.nest_service(&uploads.public_prefix, ServeDir::new(&uploads.dir)),
    };

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .with_state(state)
}

/// CORS for the configured origins; `*` allows any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// JWT authentication middleware layer
///
/// Extracts and validates the bearer token from the Authorization header,
/// then injects [`AuthUser`] into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;

    let claims = jwt::validate_token(token, state.jwt_secret())?;

    req.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
    });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_accepts_wildcard_and_lists() {
        let _ = cors_layer(&["*".to_string()]);
        let _ = cors_layer(&[
            "http://localhost:5173".to_string(),
            "not a header\nvalue".to_string(),
        ]);
    }
}
