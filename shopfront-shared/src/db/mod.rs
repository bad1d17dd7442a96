/// Database plumbing: connection pool and migrations
///
/// Table models live in [`crate::models`].

pub mod migrations;
pub mod pool;
