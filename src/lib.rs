pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod labels;
pub mod telemetry;

pub use labels::{canonicalize, CanonicalMapping, LabelCanonicalizer, SimilarityMetric};
