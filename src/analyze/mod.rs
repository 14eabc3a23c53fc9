pub mod analyzer;
pub mod model;

pub use analyzer::Analyzer;
pub use model::{Analysis, DataSet, EffectiveMetrics, Leaderboards, RepoBucket};
