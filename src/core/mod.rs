pub mod classifier;
pub mod etl;
pub mod metric;
pub mod pipeline;
pub mod report;
pub mod validator;

pub use crate::domain::model::{Record, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
