pub mod filters;
pub mod hover;
pub mod selection;
pub mod store;
pub mod visibility;

pub use filters::*;
pub use hover::*;
pub use selection::*;
pub use store::*;
pub use visibility::*;
