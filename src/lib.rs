pub mod config;
pub mod errors;
pub mod market;
pub mod monitoring;
pub mod presentation;
pub mod scoring;
pub mod window;
