use anyhow::{Context, Result};
use bytes::Bytes;
use eagerport_core::{DType, Error, OpRegistration, QuantizationParams};
use eagerport_delegate::EagerDelegate;
use eagerport_proto::{parse_node_def, CustomOpBlob};
use eagerport_runtime::Interpreter;

fn blob(text: &str) -> Result<Bytes> {
    let node_def = parse_node_def(text)?;
    Ok(CustomOpBlob::from_node_def(&node_def).encode()?)
}

fn graph(count: usize, dims: &[usize]) -> Result<Interpreter> {
    let mut interpreter = Interpreter::new();
    interpreter.add_tensors(count);
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
fn unpack_splits_rows() -> Result<()> {
    let mut interpreter = graph(3, &[2])?;
    interpreter.add_node_with_parameters(
        &[0],
        &[1, 2],
        blob(
            "attr { key: 'T' value { type: DT_FLOAT } } attr { key: 'num' value { i: 2 } } \
             attr { key: 'axis' value { i: 0 } } op: 'Unpack'",
        )?,
        OpRegistration::custom("EagerUnpack"),
    )?;
    assert_eq!(interpreter.modify_graph_with_delegate(&EagerDelegate::new()), 1);

    interpreter.resize_input_tensor(0, &[2, 3])?;
    interpreter.allocate_tensors()?;
    assert_eq!(interpreter.tensor(1)?.shape.dims(), &[3]);

    interpreter
        .tensor_mut(0)?
        .write_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
    interpreter.invoke()?;
    assert_eq!(interpreter.tensor(1)?.read_f32()?, vec![1.0, 2.0, 3.0]);
    assert_eq!(interpreter.tensor(2)?.read_f32()?, vec![4.0, 5.0, 6.0]);
    Ok(())
}

#[test]
fn chained_add_and_mul() -> Result<()> {
    let float = "attr { key: 'T' value { type: DT_FLOAT } }";
    let mut interpreter = graph(4, &[2])?;
    interpreter.add_node_with_parameters(
        &[0, 1],
        &[2],
        blob(&format!("{float} op: 'Add'"))?,
        OpRegistration::custom("EagerAdd"),
    )?;
    interpreter.add_node_with_parameters(
        &[2, 1],
        &[3],
        blob(&format!("{float} op: 'Mul'"))?,
        OpRegistration::custom("EagerMul"),
    )?;
    interpreter.modify_graph_with_delegate(&EagerDelegate::new());
    interpreter.allocate_tensors()?;

    interpreter.tensor_mut(0)?.write_f32(&[1.0, 2.0])?;
    interpreter.tensor_mut(1)?.write_f32(&[3.0, 4.0])?;
    interpreter.invoke()?;
    assert_eq!(interpreter.tensor(3)?.read_f32()?, vec![12.0, 24.0]);
    Ok(())
}

#[test]
fn incompatible_cast_fails_at_invoke() -> Result<()> {
    let mut interpreter = graph(2, &[2])?;
    interpreter.add_node_with_parameters(
        &[0],
        &[1],
        blob("op: 'Cast'")?,
        OpRegistration::custom("EagerCast"),
    )?;
    interpreter.modify_graph_with_delegate(&EagerDelegate::new());
    interpreter.allocate_tensors()?;

    match interpreter.invoke().err().context("invoke should fail")? {
        Error::Kernel { op, message, .. } => {
            assert_eq!(op, "EagerCast");
            assert!(message.contains("missing required attr"), "{message}");
        }
        other => panic!("expected kernel error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn ignores_nodes_without_eager_prefix() -> Result<()> {
    let mut interpreter = graph(2, &[1])?;
    interpreter.add_node_with_parameters(
        &[0],
        &[1],
        blob("op: 'NonExistentOp'")?,
        OpRegistration::custom("NonExistentOp"),
    )?;
    assert_eq!(interpreter.modify_graph_with_delegate(&EagerDelegate::new()), 0);
    interpreter.allocate_tensors()?;
    assert!(matches!(
        interpreter.invoke(),
        Err(Error::UnresolvedCustomOp { .. })
    ));
    Ok(())
}

#[test]
fn garbage_parameters_fail_at_invoke() -> Result<()> {
    let mut interpreter = graph(2, &[1])?;
    interpreter.add_node_with_parameters(
        &[0],
        &[1],
        Bytes::from_static(b"not a blob"),
        OpRegistration::custom("EagerIdentity"),
    )?;
    interpreter.modify_graph_with_delegate(&EagerDelegate::new());
    interpreter.allocate_tensors()?;
    assert!(matches!(interpreter.invoke(), Err(Error::Kernel { .. })));
    Ok(())
}
