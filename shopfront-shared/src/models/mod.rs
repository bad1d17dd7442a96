/// Database models
///
/// Each model owns its table and exposes its queries as associated async
/// functions taking a `&PgPool`.
///
/// - `user`: customer accounts
/// - `product`: catalogue entries with image references

pub mod product;
pub mod user;
