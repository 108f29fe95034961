pub mod kernels;
pub mod op_defs;

pub use kernels::*;
pub use op_defs::*;

use std::sync::Arc;

use eagerport_core::{Delegate, Kernel, Node};

/// Custom names carrying this prefix are routed to the delegate.
pub const EAGER_PREFIX: &str = "Eager";

pub struct EagerDelegate {
    kernel: Arc<EagerKernel>,
}

impl EagerDelegate {
    pub fn new() -> Self {
        Self::with_registry(OpRegistry::with_standard_ops())
    }

    pub fn with_registry(registry: OpRegistry) -> Self {
        Self {
            kernel: Arc::new(EagerKernel::new(Arc::new(registry))),
        }
    }
}

impl Default for EagerDelegate {
    fn default() -> Self {
        Self::new()
    }
}

impl Delegate for EagerDelegate {
    fn name(&self) -> &'static str {
        "eager"
    }

    fn claims(&self, node: &Node) -> bool {
        node.registration
            .custom_name
            .as_deref()
            .is_some_and(|name| name.starts_with(EAGER_PREFIX))
    }

    fn kernel(&self) -> Arc<dyn Kernel> {
        self.kernel.clone()
    }
}
