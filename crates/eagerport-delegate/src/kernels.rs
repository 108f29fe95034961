use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use eagerport_core::{Kernel, KernelContext, Node, Shape};
use eagerport_proto::CustomOpBlob;
use tracing::debug;

use crate::{EagerOp, OpRegistry};

/// Decodes a node's parameter blob on every call and runs the op it names.
pub struct EagerKernel {
    registry: Arc<OpRegistry>,
}

impl EagerKernel {
    pub fn new(registry: Arc<OpRegistry>) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, node: &Node) -> Result<EagerOp> {
        let blob = CustomOpBlob::decode(&node.init_data)
            .context("malformed custom op parameters")?;
        let node_def = blob.decode_node_def()?;
        ensure!(
            node_def.op == blob.op,
            "parameters name op '{}' but the NodeDef names '{}'",
            blob.op,
            node_def.op
        );
        self.registry
            .validate(&node_def, node.inputs.len(), node.outputs.len())
    }
}

impl Kernel for EagerKernel {
    // Validation errors surface from `invoke`, so a graph holding a bad node
    // can still be allocated.
    fn prepare(&self, ctx: &mut KernelContext<'_>, node: &Node) -> Result<()> {
        match self.resolve(node) {
            Ok(op) => propagate_shapes(op, ctx, node),
            Err(err) => {
                debug!(
                    op = node.registration.op_name(),
                    error = %format!("{err:#}"),
                    "skipping shape propagation for invalid node"
                );
                Ok(())
            }
        }
    }

    fn invoke(&self, ctx: &mut KernelContext<'_>, node: &Node) -> Result<()> {
        let op = self.resolve(node)?;
        execute(op, ctx, node)
    }
}

fn propagate_shapes(op: EagerOp, ctx: &mut KernelContext<'_>, node: &Node) -> Result<()> {
    let input = ctx.tensor(node.input(0)?)?.shape.clone();
    match op {
        EagerOp::Unpack { num, axis } => {
            let axis = unpack_axis(&input, num, axis)?;
            let dims: Vec<usize> = input
                .dims()
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != axis)
                .map(|(_, &d)| d)
                .collect();
            for &output in &node.outputs {
                ctx.resize_tensor(output, Shape::from_slice(&dims))?;
            }
        }
        EagerOp::Identity | EagerOp::Add | EagerOp::Mul | EagerOp::Cast => {
            ctx.resize_tensor(node.output(0)?, input)?;
        }
    }
    Ok(())
}

fn execute(op: EagerOp, ctx: &mut KernelContext<'_>, node: &Node) -> Result<()> {
    match op {
        EagerOp::Identity | EagerOp::Cast => {
            let values = ctx.read_f32(node.input(0)?)?;
            ctx.write_f32(node.output(0)?, &values)?;
        }
        EagerOp::Add | EagerOp::Mul => {
            let lhs = ctx.read_f32(node.input(0)?)?;
            let rhs = ctx.read_f32(node.input(1)?)?;
            ensure!(
                lhs.len() == rhs.len(),
                "{op:?}: operands have {} and {} elements",
                lhs.len(),
                rhs.len()
            );
            let out: Vec<f32> = lhs
                .iter()
                .zip(&rhs)
                .map(|(a, b)| if op == EagerOp::Add { a + b } else { a * b })
                .collect();
            ctx.write_f32(node.output(0)?, &out)?;
        }
        EagerOp::Unpack { num, axis } => {
            let input = node.input(0)?;
            let shape = ctx.tensor(input)?.shape.clone();
            let axis = unpack_axis(&shape, num, axis)?;
            let values = ctx.read_f32(input)?;

            let outer: usize = shape.dims()[..axis].iter().product();
            let inner: usize = shape.dims()[axis + 1..].iter().product();
            for (k, &output) in node.outputs.iter().enumerate() {
                let mut slice = Vec::with_capacity(outer * inner);
                for o in 0..outer {
                    let start = (o * num + k) * inner;
                    slice.extend_from_slice(&values[start..start + inner]);
                }
                ctx.write_f32(output, &slice)?;
            }
        }
    }
    Ok(())
}

/// Resolves a possibly negative axis and checks it has `num` entries.
fn unpack_axis(shape: &Shape, num: usize, axis: i64) -> Result<usize> {
    let rank = i64::try_from(shape.rank())?;
    ensure!(
        (-rank..rank).contains(&axis),
        "Unpack: axis {axis} out of range for rank {rank}"
    );
    let axis = (if axis < 0 { axis + rank } else { axis }) as usize;
    ensure!(
        shape.dims()[axis] == num,
        "Unpack: dimension {axis} has size {}, expected num={num}",
        shape.dims()[axis]
    );
    Ok(axis)
}
