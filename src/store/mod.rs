// src/store/mod.rs
pub mod snapshot;
pub mod sql;

pub use snapshot::{snapshot_path, write_invalid, write_records};
pub use sql::{check_table_name, SqlStore};
