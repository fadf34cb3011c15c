pub mod engine;
pub mod toolbar;

pub use engine::*;
pub use toolbar::*;
