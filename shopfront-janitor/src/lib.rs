//! # Shopfront Janitor Library
//!
//! Background maintenance for the Shopfront upload directories.
//!
//! ## Modules
//!
//! - `cli`: command-line arguments of the janitor binary
//! - `sweeper`: removal of image files that no product references

pub mod cli;
pub mod sweeper;
