use std::sync::Arc;

use anyhow::{ensure, Result};
use bytes::Bytes;
use eagerport_core::{
    BuiltinOperator, DType, Delegate, Error, Kernel, KernelContext, Node, OpRegistration,
    QuantizationParams,
};
use eagerport_runtime::Interpreter;

/// Copies input 0 into output 0, resizing the output to match.
struct CopyKernel;

impl Kernel for CopyKernel {
    fn prepare(&self, ctx: &mut KernelContext<'_>, node: &Node) -> Result<()> {
        let shape = ctx.tensor(node.input(0)?)?.shape.clone();
        ctx.resize_tensor(node.output(0)?, shape)?;
        Ok(())
    }

    fn invoke(&self, ctx: &mut KernelContext<'_>, node: &Node) -> Result<()> {
        let values = ctx.read_f32(node.input(0)?)?;
        ctx.write_f32(node.output(0)?, &values)?;
        Ok(())
    }
}

struct FailingKernel;

impl Kernel for FailingKernel {
    fn invoke(&self, _ctx: &mut KernelContext<'_>, _node: &Node) -> Result<()> {
        anyhow::bail!("refusing to run")
    }
}

struct ClaimEverything;

impl Delegate for ClaimEverything {
    fn name(&self) -> &'static str {
        "claim-everything"
    }

    fn claims(&self, node: &Node) -> bool {
        node.registration.custom_name.is_some()
    }

    fn kernel(&self) -> Arc<dyn Kernel> {
        Arc::new(CopyKernel)
    }
}

fn graph_with_tensors(count: usize, dims: &[usize]) -> Result<Interpreter> {
    let mut interpreter = Interpreter::new();
    let first = interpreter.add_tensors(count);
    ensure!(first == 0, "first tensor index should be 0");
    for i in 0..count {
        interpreter.set_tensor_parameters_read_write(
            i,
            DType::F32,
            "",
            dims,
            QuantizationParams::default(),
        )?;
    }
    Ok(interpreter)
}

#[test]
fn invoke_requires_allocation() -> Result<()> {
    let mut interpreter = graph_with_tensors(2, &[2])?;
    interpreter.add_node_with_parameters(
        &[0],
        &[1],
        Bytes::new(),
        OpRegistration::builtin(BuiltinOperator::Mul, Arc::new(CopyKernel)),
    )?;
    assert!(matches!(interpreter.invoke(), Err(Error::NotReady)));

    interpreter.allocate_tensors()?;
    interpreter.tensor_mut(0)?.write_f32(&[1.5, -2.0])?;
    interpreter.invoke()?;
    assert_eq!(interpreter.tensor(1)?.read_f32()?, vec![1.5, -2.0]);
    Ok(())
}

#[test]
fn rejects_indices_outside_graph() -> Result<()> {
    let mut interpreter = graph_with_tensors(2, &[1])?;
    assert!(matches!(
        interpreter.set_inputs(&[0, 2]),
        Err(Error::TensorIndexOutOfRange { index: 2, len: 2 })
    ));
    assert!(interpreter
        .add_node_with_parameters(&[0], &[5], Bytes::new(), OpRegistration::custom("X"))
        .is_err());
    assert_eq!(interpreter.nodes_size(), 0);
    assert!(interpreter.inputs().is_empty());
    Ok(())
}

#[test]
fn graph_inputs_and_outputs_are_recorded() -> Result<()> {
    let mut interpreter = graph_with_tensors(3, &[1])?;
    assert_eq!(interpreter.tensors_size(), 3);
    interpreter.set_inputs(&[0, 1])?;
    interpreter.set_outputs(&[2])?;
    assert_eq!(interpreter.inputs(), &[0, 1]);
    assert_eq!(interpreter.outputs(), &[2]);
    Ok(())
}

#[test]
fn unaddressable_shapes_fail_allocation() -> Result<()> {
    let mut interpreter = graph_with_tensors(2, &[1])?;
    interpreter.add_node_with_parameters(
        &[0],
        &[1],
        Bytes::new(),
        OpRegistration::builtin(BuiltinOperator::Mul, Arc::new(CopyKernel)),
    )?;

    interpreter.resize_input_tensor(0, &[1 << 62, 4])?;
    assert!(matches!(
        interpreter.allocate_tensors(),
        Err(Error::Kernel { node: 0, .. })
    ));
    assert!(!interpreter.is_invokable());

    // Without a kernel to propagate the shape, the reallocation pass reports it.
    let mut bare = graph_with_tensors(1, &[1])?;
    bare.resize_input_tensor(0, &[usize::MAX, 2])?;
    assert!(matches!(bare.allocate_tensors(), Err(Error::Allocation(_))));
    assert!(!bare.is_invokable());
    assert!(bare
        .set_tensor_parameters_read_write(
            0,
            DType::I64,
            "",
            &[usize::MAX / 4],
            QuantizationParams::default(),
        )
        .is_err());
    Ok(())
}

#[test]
fn resize_then_allocate_resizes_downstream_tensors() -> Result<()> {
    let mut interpreter = graph_with_tensors(2, &[1])?;
    interpreter.add_node_with_parameters(
        &[0],
        &[1],
        Bytes::new(),
        OpRegistration::builtin(BuiltinOperator::Mul, Arc::new(CopyKernel)),
    )?;

    interpreter.resize_input_tensor(0, &[2, 3])?;
    assert_eq!(interpreter.tensor(0)?.byte_len(), 4);

    interpreter.allocate_tensors()?;
    assert_eq!(interpreter.tensor(0)?.byte_len(), 24);
    assert_eq!(interpreter.tensor(1)?.shape.dims(), &[2, 3]);
    assert_eq!(interpreter.tensor(1)?.byte_len(), 24);
    Ok(())
}

#[test]
fn unresolved_custom_op_fails_invoke_but_not_allocation() -> Result<()> {
    let mut interpreter = graph_with_tensors(2, &[2])?;
    interpreter.add_node_with_parameters(
        &[0],
        &[1],
        Bytes::from_static(b"opaque"),
        OpRegistration::custom("EagerAdd"),
    )?;
    interpreter.allocate_tensors()?;

    let err = interpreter.invoke().unwrap_err();
    assert!(matches!(
        err,
        Error::UnresolvedCustomOp { node: 0, ref name } if name == "EagerAdd"
    ));
    Ok(())
}

#[test]
fn kernel_errors_name_the_node() -> Result<()> {
    let mut interpreter = graph_with_tensors(2, &[1])?;
    interpreter.add_node_with_parameters(
        &[0],
        &[1],
        Bytes::new(),
        OpRegistration::builtin(BuiltinOperator::Mul, Arc::new(CopyKernel)),
    )?;
    interpreter.add_node_with_parameters(
        &[1],
        &[0],
        Bytes::new(),
        OpRegistration::builtin(BuiltinOperator::Mul, Arc::new(FailingKernel)),
    )?;
    interpreter.allocate_tensors()?;

    match interpreter.invoke() {
        Err(Error::Kernel { node, op, message }) => {
            assert_eq!(node, 1);
            assert_eq!(op, "MUL");
            assert!(message.contains("refusing to run"));
        }
        other => panic!("expected kernel error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn delegate_takes_over_custom_nodes() -> Result<()> {
    let mut interpreter = graph_with_tensors(2, &[3])?;
    let blob = Bytes::from_static(b"params");
    interpreter.add_node_with_parameters(
        &[0],
        &[1],
        blob.clone(),
        OpRegistration::custom("EagerIdentity"),
    )?;
    interpreter.allocate_tensors()?;

    let claimed = interpreter.modify_graph_with_delegate(&ClaimEverything);
    assert_eq!(claimed, 1);
    assert!(!interpreter.is_invokable());

    let node = interpreter.node(0).expect("node 0");
    assert_eq!(node.init_data.as_ptr(), blob.as_ptr());

    interpreter.allocate_tensors()?;
    interpreter.tensor_mut(0)?.write_f32(&[1.0, 2.0, 3.0])?;
    interpreter.invoke()?;
    assert_eq!(interpreter.tensor(1)?.read_f32()?, vec![1.0, 2.0, 3.0]);
    Ok(())
}
