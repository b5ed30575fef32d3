pub mod hello;
pub mod name;
