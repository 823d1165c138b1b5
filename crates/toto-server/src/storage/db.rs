//! SQLite database for the Toto Live server.

pub use toto_core::db::DatabaseError;

toto_core::define_database!(Database, "Database migrations complete");
