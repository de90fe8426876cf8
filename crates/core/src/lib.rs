pub mod config;
pub mod error;
pub mod text;
pub mod types;

pub use config::{BlogConfig, load_config};
pub use error::{Error, Result, StoreErrorKind};
pub use types::*;
