// src/fetch/mod.rs
pub mod archive;
pub mod download;
pub mod urls;
