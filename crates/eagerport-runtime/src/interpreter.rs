use bytes::Bytes;
use eagerport_core::{
    DType, Delegate, Error, KernelContext, Node, OpRegistration, QuantizationParams, Result,
    Shape, Tensor,
};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GraphState {
    /// Structure or shapes changed since the last successful allocation.
    Uninvokable,
    Invokable,
}

/// Owns the tensors and nodes of one graph and runs them in insertion order.
pub struct Interpreter {
    tensors: Vec<Tensor>,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
    nodes: Vec<Node>,
    state: GraphState,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            tensors: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            nodes: Vec::new(),
            state: GraphState::Uninvokable,
        }
    }

    pub fn tensors_size(&self) -> usize {
        self.tensors.len()
    }

    pub fn nodes_size(&self) -> usize {
        self.nodes.len()
    }

    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[usize] {
        &self.outputs
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn is_invokable(&self) -> bool {
        self.state == GraphState::Invokable
    }

    /// Appends `count` default slots and returns the index of the first one.
    pub fn add_tensors(&mut self, count: usize) -> usize {
        let first = self.tensors.len();
        self.tensors.resize_with(first + count, Tensor::default);
        self.state = GraphState::Uninvokable;
        debug!(first, count, "added tensors");
        first
    }

    pub fn set_tensor_parameters_read_write(
        &mut self,
        index: usize,
        dtype: DType,
        name: &str,
        dims: &[usize],
        quantization: QuantizationParams,
    ) -> Result<()> {
        let tensor = Tensor::new(name, dtype, Shape::from_slice(dims), quantization)?;
        *self.tensor_mut(index)? = tensor;
        self.state = GraphState::Uninvokable;
        Ok(())
    }

    pub fn set_inputs(&mut self, inputs: &[usize]) -> Result<()> {
        self.check_indices(inputs)?;
        self.inputs = inputs.to_vec();
        Ok(())
    }

    pub fn set_outputs(&mut self, outputs: &[usize]) -> Result<()> {
        self.check_indices(outputs)?;
        self.outputs = outputs.to_vec();
        Ok(())
    }

    /// Registers a node and returns its index. `init_data` is stored as a shared
    /// view, so the caller's buffer is never copied.
    pub fn add_node_with_parameters(
        &mut self,
        inputs: &[usize],
        outputs: &[usize],
        init_data: Bytes,
        registration: OpRegistration,
    ) -> Result<usize> {
        self.check_indices(inputs)?;
        self.check_indices(outputs)?;

        let index = self.nodes.len();
        debug!(
            node = index,
            op = registration.op_name(),
            ?inputs,
            ?outputs,
            init_bytes = init_data.len(),
            "added node"
        );
        self.nodes.push(Node {
            inputs: inputs.iter().copied().collect(),
            outputs: outputs.iter().copied().collect(),
            init_data,
            registration,
        });
        self.state = GraphState::Uninvokable;
        Ok(index)
    }

    /// Records a new shape; the buffer follows on the next `allocate_tensors`.
    pub fn resize_input_tensor(&mut self, index: usize, dims: &[usize]) -> Result<()> {
        let tensor = self.tensor_mut(index)?;
        tensor.shape = Shape::from_slice(dims);
        self.state = GraphState::Uninvokable;
        Ok(())
    }

    /// Runs every kernel's shape propagation, then resizes every tensor buffer in
    /// the graph whose size no longer matches its shape.
    pub fn allocate_tensors(&mut self) -> Result<()> {
        self.state = GraphState::Uninvokable;

        for (index, node) in self.nodes.iter().enumerate() {
            let Some(kernel) = node.registration.kernel.as_ref() else {
                continue;
            };
            let mut ctx = KernelContext::new(&mut self.tensors);
            kernel
                .prepare(&mut ctx, node)
                .map_err(|err| kernel_error(index, node, err))?;
        }

        let mut reallocated = 0;
        for (index, tensor) in self.tensors.iter_mut().enumerate() {
            match tensor.reallocate() {
                Ok(true) => reallocated += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(tensor = index, error = %err, "tensor allocation failed");
                    return Err(err);
                }
            }
        }

        self.state = GraphState::Invokable;
        debug!(
            tensors = self.tensors.len(),
            reallocated, "allocated tensors"
        );
        Ok(())
    }

    pub fn invoke(&mut self) -> Result<()> {
        if self.state != GraphState::Invokable {
            return Err(Error::NotReady);
        }

        for (index, node) in self.nodes.iter().enumerate() {
            let Some(kernel) = node.registration.kernel.as_ref() else {
                let err = Error::UnresolvedCustomOp {
                    node: index,
                    name: node.registration.op_name().to_string(),
                };
                warn!(error = %err, "invoke failed");
                return Err(err);
            };
            let mut ctx = KernelContext::new(&mut self.tensors);
            if let Err(err) = kernel.invoke(&mut ctx, node) {
                let err = kernel_error(index, node, err);
                warn!(error = %err, "invoke failed");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Installs the delegate's kernel on every node it claims and returns how many
    /// nodes were taken over. Allocation has to be redone afterwards.
    pub fn modify_graph_with_delegate(&mut self, delegate: &dyn Delegate) -> usize {
        let mut claimed = 0;
        for node in &mut self.nodes {
            if delegate.claims(node) {
                node.registration.kernel = Some(delegate.kernel());
                claimed += 1;
            }
        }
        self.state = GraphState::Uninvokable;
        info!(
            delegate = delegate.name(),
            claimed,
            nodes = self.nodes.len(),
            "applied delegate"
        );
        claimed
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

    fn check_indices(&self, indices: &[usize]) -> Result<()> {
        let len = self.tensors.len();
        match indices.iter().find(|&&index| index >= len) {
            Some(&index) => Err(Error::TensorIndexOutOfRange { index, len }),
            None => Ok(()),
        }
    }
}

fn kernel_error(index: usize, node: &Node, err: anyhow::Error) -> Error {
    Error::Kernel {
        node: index,
        op: node.registration.op_name().to_string(),
        message: format!("{err:#}"),
    }
}
