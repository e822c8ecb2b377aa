pub mod cli;
pub mod config;
pub mod pipelines;
pub mod samples;
pub mod utils;
pub use cli::Arguments;
