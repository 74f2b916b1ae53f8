pub mod error;
pub mod request;
pub mod source;

pub use error::*;
pub use request::*;
pub use source::*;
