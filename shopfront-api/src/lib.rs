//! # Shopfront API Server Library
//!
//! This library provides the core functionality for the Shopfront API server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `forms`: Multipart product form parsing
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod forms;
pub mod routes;
