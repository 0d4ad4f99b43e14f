// src/lib.rs

//! refstats: collects NBA game logs with their officiating crews into SQLite.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;
