use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use smallvec::SmallVec;

use crate::{Error, Result, Shape, Tensor};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinOperator {
    Mul,
    Custom,
}

/// Native implementation of a graph node.
///
/// Kernels are shared between nodes and hold no per-node mutable state;
/// everything a call needs comes from the context and the node.
pub trait Kernel: Send + Sync + 'static {
    /// Shape propagation, run by `allocate_tensors` before buffers are sized.
    fn prepare(&self, _ctx: &mut KernelContext<'_>, _node: &Node) -> anyhow::Result<()> {
        Ok(())
    }

    fn invoke(&self, ctx: &mut KernelContext<'_>, node: &Node) -> anyhow::Result<()>;
}

/// Describes how a node is executed. Built fresh for every registration.
#[derive(Clone)]
pub struct OpRegistration {
    pub builtin: BuiltinOperator,
    pub custom_name: Option<String>,
    pub kernel: Option<Arc<dyn Kernel>>,
}

impl OpRegistration {
    pub fn builtin(builtin: BuiltinOperator, kernel: Arc<dyn Kernel>) -> Self {
        Self {
            builtin,
            custom_name: None,
            kernel: Some(kernel),
        }
    }

    /// A custom node with no kernel; a delegate has to claim it before it can run.
    pub fn custom(name: impl Into<String>) -> Self {
        Self {
            builtin: BuiltinOperator::Custom,
            custom_name: Some(name.into()),
            kernel: None,
        }
    }

    pub fn op_name(&self) -> &str {
        match (&self.builtin, &self.custom_name) {
            (_, Some(name)) => name,
            (BuiltinOperator::Mul, None) => "MUL",
            (BuiltinOperator::Custom, None) => "CUSTOM",
        }
    }
}

impl fmt::Debug for OpRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpRegistration")
            .field("builtin", &self.builtin)
            .field("custom_name", &self.custom_name)
            .field("has_kernel", &self.kernel.is_some())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub inputs: SmallVec<[usize; 4]>,
    pub outputs: SmallVec<[usize; 4]>,
    /// Opaque parameters; for custom nodes this is a shared view of the harness-owned blob.
    pub init_data: Bytes,
    pub registration: OpRegistration,
}

impl Node {
    pub fn input(&self, position: usize) -> Result<usize> {
        operand(&self.inputs, "input", position)
    }

    pub fn output(&self, position: usize) -> Result<usize> {
        operand(&self.outputs, "output", position)
    }
}

fn operand(indices: &[usize], kind: &'static str, position: usize) -> Result<usize> {
    indices
        .get(position)
        .copied()
        .ok_or(Error::MissingOperand {
            kind,
            position,
            count: indices.len(),
        })
}

/// Tensor access handed to kernels while a node runs.
pub struct KernelContext<'a> {
    tensors: &'a mut [Tensor],
}

impl<'a> KernelContext<'a> {
    pub fn new(tensors: &'a mut [Tensor]) -> Self {
        Self { tensors }
    }

    pub fn tensor(&self, index: usize) -> Result<&Tensor> {
        let len = self.tensors.len();
        self.tensors
            .get(index)
            .ok_or(Error::TensorIndexOutOfRange { index, len })
    }

    pub fn tensor_mut(&mut self, index: usize) -> Result<&mut Tensor> {
        let len = self.tensors.len();
        self.tensors
            .get_mut(index)
            .ok_or(Error::TensorIndexOutOfRange { index, len })
    }

    /// Sets the shape and resizes the buffer immediately.
    pub fn resize_tensor(&mut self, index: usize, shape: Shape) -> Result<()> {
        let tensor = self.tensor_mut(index)?;
        tensor.shape = shape;
        tensor.reallocate()?;
        Ok(())
    }

    pub fn read_f32(&self, index: usize) -> Result<Vec<f32>> {
        self.tensor(index)?.read_f32()
    }

    pub fn write_f32(&mut self, index: usize, values: &[f32]) -> Result<()> {
        self.tensor_mut(index)?.write_f32(values)
    }
}
