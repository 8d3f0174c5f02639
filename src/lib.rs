pub mod error;
pub mod config;
pub mod topology;
pub mod tape;
pub mod registers;
pub mod substrate;
pub mod bff;
pub mod world;
pub mod seed;
pub mod metrics;
pub mod render;

pub use error::{Error, Result};
