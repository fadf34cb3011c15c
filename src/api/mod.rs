pub mod http;
pub mod remote;

pub use http::*;
pub use remote::*;
