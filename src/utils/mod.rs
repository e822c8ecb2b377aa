pub mod command;
pub mod executor;
pub mod fastq;
pub mod file;
pub mod streams;
pub mod system;
