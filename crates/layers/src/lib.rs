pub mod filter;
pub mod layer;
pub mod recording;
pub mod surface;
pub mod symbology;

pub use filter::*;
pub use layer::*;
pub use recording::*;
pub use surface::*;
pub use symbology::*;
