// Crate root library declaration and module exports.
pub mod batch;
pub mod cli;
pub mod config;
pub mod context;
pub mod extract;
pub mod model;
pub mod rewriter;
pub mod storage;
pub mod system;
