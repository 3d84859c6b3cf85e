pub mod config;
pub mod error;
pub mod index;
pub mod ranges;
pub mod source;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use index::BamIndex;
