// Library target exists to expose internal modules for integration tests.
// The binary entry point is in main.rs.

pub mod cdp;
pub mod chrome;
pub mod cli;
pub mod error;
pub mod papers;
pub mod pdf;
pub mod render;
pub mod serve;
