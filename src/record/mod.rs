// src/record/mod.rs
pub mod clean;
pub mod identity;
pub mod types;

pub use clean::{clean_table, merge_tables, DEFAULT_SCORE};
pub use identity::{assign_ids, content_id, dedup_by_id};
pub use types::{InvalidRow, WatcherRecord};
