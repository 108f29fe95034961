pub mod blob_store;
pub mod builtin;
pub mod logging;
pub mod op_catalog;

pub use blob_store::*;
pub use builtin::*;
pub use logging::*;
pub use model_test::*;
pub use op_catalog::*;

pub use eagerport_core::DType;
