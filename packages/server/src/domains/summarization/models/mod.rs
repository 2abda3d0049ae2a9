pub mod request;
pub mod responses;

pub use request::*;
pub use responses::*;
