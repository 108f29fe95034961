pub mod delegate;
pub mod error;
pub mod kernel;
pub mod tensor;

pub use delegate::*;
pub use error::*;
pub use kernel::*;
pub use tensor::*;
