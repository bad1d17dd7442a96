//! # Shopfront Shared Library
//!
//! Types and logic shared by the Shopfront API server and the upload janitor.
//!
//! ## Module Organization
//!
//! - `auth`: password hashing and session tokens
//! - `config`: environment-backed settings
//! - `db`: connection pool and migrations
//! - `models`: users and products
//! - `storage`: product image files

pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod storage;

/// Current version of the Shopfront shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
