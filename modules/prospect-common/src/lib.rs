pub mod config;
pub mod email;
pub mod error;
pub mod types;

pub use config::{Config, PipelineSettings};
pub use email::*;
pub use error::ProspectError;
pub use types::*;
