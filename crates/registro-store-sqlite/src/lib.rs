//! SQLite backend for the Registro enrollment engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. That thread is also what
//! serializes writers: every registry write is one `BEGIN IMMEDIATE`
//! transaction on it.

mod catalog;
mod encode;
mod schema;
mod store;

pub mod error;

pub use catalog::SqliteCatalog;
pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
