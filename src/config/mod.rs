// src/config/mod.rs
pub mod ranklist;

pub use ranklist::{parse_base_url, RanklistConfig};
