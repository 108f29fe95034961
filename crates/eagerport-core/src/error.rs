use crate::DType;

/// Failures reported by the interpreter runtime and the tensor accessors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("tensor index {index} out of range for graph with {len} tensors")]
    TensorIndexOutOfRange { index: usize, len: usize },

    /// A write would run past the tensor's current byte capacity.
    #[error("write of {requested} bytes exceeds tensor capacity of {capacity} bytes")]
    OutOfBounds { requested: usize, capacity: usize },

    #[error("dtype mismatch: expected {expected:?}, got {got:?}")]
    DTypeMismatch { expected: DType, got: DType },

    #[error("node has {count} {kind}s, {kind} {position} requested")]
    MissingOperand {
        kind: &'static str,
        position: usize,
        count: usize,
    },

    #[error("graph is not ready to invoke; allocate_tensors must succeed first")]
    NotReady,

    #[error("node {node}: no kernel registered for op '{name}'")]
    UnresolvedCustomOp { node: usize, name: String },

    #[error("node {node} ({op}) failed: {message}")]
    Kernel {
        node: usize,
        op: String,
        message: String,
    },

    #[error("allocation failed: {0}")]
    Allocation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
