use anyhow::{ensure, Result};
use eagerport_core::{Kernel, KernelContext, Node};

/// Elementwise float multiply of inputs 0 and 1.
///
/// The output takes the shape of input 0; the inputs are expected to have the
/// same byte extent.
pub struct MulKernel;

impl Kernel for MulKernel {
    fn prepare(&self, ctx: &mut KernelContext<'_>, node: &Node) -> Result<()> {
        let shape = ctx.tensor(node.input(0)?)?.shape.clone();
        ctx.resize_tensor(node.output(0)?, shape)?;
        Ok(())
    }

    fn invoke(&self, ctx: &mut KernelContext<'_>, node: &Node) -> Result<()> {
        let lhs = ctx.read_f32(node.input(0)?)?;
        let rhs = ctx.read_f32(node.input(1)?)?;
        let output = node.output(0)?;
        let len = ctx.tensor(output)?.byte_len() / 4;
        ensure!(
            lhs.len() >= len && rhs.len() >= len,
            "MUL: output has {len} elements but inputs have {} and {}",
            lhs.len(),
            rhs.len()
        );

        let product: Vec<f32> = lhs.iter().zip(&rhs).take(len).map(|(a, b)| a * b).collect();
        ctx.write_f32(output, &product)?;
        Ok(())
    }
}
