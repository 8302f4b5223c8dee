pub mod catalog;
pub mod clustering;
pub mod config;
pub mod errors;
