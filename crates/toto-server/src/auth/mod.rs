//! Authentication for the admin surface.
//!
//! Provides JWT access/refresh tokens carrying the `admin` custom claim, and
//! argon2id password hashing.

pub mod claims;
pub mod jwt;
pub mod password;

pub use claims::{Claims, TokenType};
pub use jwt::JwtManager;
