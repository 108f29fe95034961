use std::sync::Arc;

use crate::{Kernel, Node};

/// An external execution engine that takes over graph nodes it recognises.
pub trait Delegate: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Whether this delegate will execute `node`.
    fn claims(&self, node: &Node) -> bool;

    /// Kernel installed on every claimed node.
    fn kernel(&self) -> Arc<dyn Kernel>;
}
