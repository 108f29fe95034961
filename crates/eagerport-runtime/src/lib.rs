pub mod interpreter;

pub use interpreter::*;
