pub mod config;
pub mod error;
pub mod llm;
pub mod params;
pub mod proxy;
pub mod queue;
pub mod server;
pub mod upload;

pub use error::{Error, Result};
