pub mod history;
pub mod stack;

pub use history::*;
pub use stack::*;
