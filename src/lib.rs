pub mod app;
pub mod common;
