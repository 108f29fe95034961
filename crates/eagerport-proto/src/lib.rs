pub mod blob;
pub mod error;
pub mod node_def;
pub mod text_format;

pub use blob::*;
pub use error::*;
pub use node_def::*;
pub use text_format::parse_node_def;
