pub mod deps;
pub mod infra;
pub mod pipeline;
pub mod rate_limit;
pub mod stages;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use deps::PipelineDeps;
pub use pipeline::{Pipeline, Resolution};
