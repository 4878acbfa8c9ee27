//! Type definitions for the fraud modeling pipeline

pub mod dataset;
pub mod label;

pub use dataset::{Dataset, Partition, PartitionRole, Record};
pub use label::{normalize_pair, Label, LabelColumn, LabelEncoding, TextFamily};
