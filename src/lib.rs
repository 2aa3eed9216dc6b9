// Library interface for testing

// Declare all modules
pub mod archive;
pub mod backfill;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod history;
pub mod proxy;
pub mod queries;
pub mod schema;
pub mod seed;
pub mod serve;

// Re-export the placeholder sentinel for convenience
pub use constants::DURATION_PLACEHOLDER;
