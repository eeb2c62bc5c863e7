//! Persistence layer for the billing engine.
//!
//! Provides:
//! - PostgreSQL-backed [`PgBillRepository`] storing bills document-style
//!   (JSONB aggregate plus indexed columns)
//! - Connection pooling with health checks
//! - Environment-driven backend selection between postgres and the
//!   in-process repository

pub mod config;
pub mod connection;
pub mod postgres;

pub use config::{StoreBackend, StoreConfig};
pub use connection::DatabasePool;
pub use postgres::PgBillRepository;
