pub mod config;
pub mod demo_utils;
pub mod errors;
