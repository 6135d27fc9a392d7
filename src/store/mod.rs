//! Persistence layer: libSQL-backed log of agent interactions.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{Database, Interaction};
