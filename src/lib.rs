// src/lib.rs

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod output;
pub mod report;
pub mod routes;
pub mod state;
pub mod utils;

// Re-export specific items for convenience if needed
pub use routes::create_router;
