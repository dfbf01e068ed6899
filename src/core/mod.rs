pub mod aggregator;
pub mod cache;
pub mod classifier;
pub mod etl;
pub mod exporter;
pub mod loader;
pub mod pipeline;
pub mod report;

pub use crate::domain::model::{Dataset, FilteredResult, Record, RegionSummary, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
