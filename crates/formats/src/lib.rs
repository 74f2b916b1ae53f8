pub mod dataset;
pub mod feature_collection;

pub use dataset::*;
pub use feature_collection::*;
