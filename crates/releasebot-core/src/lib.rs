pub mod config;
pub mod error;
pub mod types;

pub use config::ReleasebotConfig;
pub use error::{ReleasebotError, Result};
pub use types::*;
