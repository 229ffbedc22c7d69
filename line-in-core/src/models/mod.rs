pub mod chunk;
pub mod config;
pub mod error;
pub mod format;
pub mod slot;
pub mod state;
