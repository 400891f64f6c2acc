pub mod api;
pub mod cli;
pub mod config;
pub mod engine;
pub mod extract;
pub mod format;
pub mod postprocess;
pub mod response;
pub mod staging;
pub mod util;
pub mod vision;
