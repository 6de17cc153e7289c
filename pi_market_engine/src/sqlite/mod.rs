//! SQLite backend for the Pi marketplace payment engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
