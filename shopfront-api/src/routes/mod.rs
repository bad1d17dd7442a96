/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Customer registration, login and listing
/// - `products`: Product catalogue with image uploads

pub mod auth;
pub mod health;
pub mod products;
