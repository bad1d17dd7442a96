/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: HS256 session token issuance and validation
///
/// The HTTP side (extracting the bearer token, mapping failures to 401) lives
/// in the API crate.

pub mod jwt;
pub mod password;
