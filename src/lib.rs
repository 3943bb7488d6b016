pub mod config;
pub mod embedding;
pub mod errors;
pub mod extract;
pub mod grading;
pub mod index;
pub mod pipeline;
pub mod retrieval;

pub use errors::{Error, Result};
