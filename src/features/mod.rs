//! Feature engineering: stateless stage functions, the learned spec, and the
//! fit/transform pipeline that ties them together.

pub mod pipeline;
pub mod spec;
pub mod stages;

pub use pipeline::{FeaturePipeline, AMOUNT_CATEGORY, TIME_OF_DAY};
pub use spec::{CategoryMapping, ColumnStats, FeatureSpec};
pub use stages::{AmountCategory, TimeOfDay};
