// src/lib.rs
pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod process;
pub mod record;
pub mod store;
pub mod validate;
