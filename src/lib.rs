pub mod app;
pub mod config;
pub mod crypto;
pub mod error;
pub mod export;
pub mod filter;
pub mod gate;
pub mod import;
pub mod logging;
pub mod models;
pub mod pattern;
pub mod storage;
pub mod store;
pub mod ui;
