#![forbid(unsafe_code)]

// Modules
pub mod api;
pub mod server;
pub mod utils;
