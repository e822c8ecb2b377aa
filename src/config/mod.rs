pub mod defs;
pub mod layout;
pub mod references;
