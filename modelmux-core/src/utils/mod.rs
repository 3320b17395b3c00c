//! Shared helpers used by the credential store and the config loader.

pub mod fs;

pub use fs::write_private_file;
