pub mod camera;
pub mod config;
pub mod counts;
pub mod driver;
pub mod engine;
pub mod events;
mod handlers;
pub mod inspector;
pub mod legend;
pub mod session;

pub use camera::*;
pub use config::*;
pub use counts::*;
pub use driver::*;
pub use engine::*;
pub use events::*;
pub use inspector::*;
pub use legend::*;
pub use session::*;
