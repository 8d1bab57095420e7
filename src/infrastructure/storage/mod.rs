//! Storage infrastructure - PostgreSQL pool and schema migrations

pub mod migrations;
mod postgres;

pub use migrations::{run_migrations, Migration, PostgresMigrator};
pub use postgres::{connect, PostgresConfig};
pub(crate) use postgres::{is_unique_violation, storage_error};
