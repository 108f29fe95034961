use std::collections::HashMap;

use anyhow::{bail, ensure, Context, Result};
use eagerport_proto::attr_value::Value;
use eagerport_proto::{DataType, NodeDef};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrKind {
    Type,
    Int,
    Float,
    Bool,
    String,
}

impl AttrKind {
    fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (AttrKind::Type, Value::Type(_))
                | (AttrKind::Int, Value::I(_))
                | (AttrKind::Float, Value::F(_))
                | (AttrKind::Bool, Value::B(_))
                | (AttrKind::String, Value::S(_))
        )
    }
}

#[derive(Clone, Debug)]
pub struct AttrDef {
    pub name: &'static str,
    pub kind: AttrKind,
    pub required: bool,
}

impl AttrDef {
    pub const fn required(name: &'static str, kind: AttrKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: AttrKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// Count taken from an integer attribute.
    FromAttr(&'static str),
}

#[derive(Clone, Debug)]
pub struct OpDef {
    pub name: &'static str,
    pub attrs: Vec<AttrDef>,
    pub inputs: Arity,
    pub outputs: Arity,
}

/// An op whose attributes passed validation and whose dtype is supported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EagerOp {
    Identity,
    Add,
    Mul,
    Unpack { num: usize, axis: i64 },
    Cast,
}

#[derive(Default)]
pub struct OpRegistry {
    ops: HashMap<&'static str, OpDef>,
}

impl OpRegistry {
    pub fn new() -> Self {
        Self {
            ops: HashMap::new(),
        }
    }

    pub fn with_standard_ops() -> Self {
        let mut registry = Self::new();
        for name in ["Identity", "Add", "Mul"] {
            let inputs = if name == "Identity" { 1 } else { 2 };
            registry.register(OpDef {
                name,
                attrs: vec![AttrDef::required("T", AttrKind::Type)],
                inputs: Arity::Fixed(inputs),
                outputs: Arity::Fixed(1),
            });
        }
        registry.register(OpDef {
            name: "Unpack",
            attrs: vec![
                AttrDef::required("T", AttrKind::Type),
                AttrDef::required("num", AttrKind::Int),
                AttrDef::required("axis", AttrKind::Int),
            ],
            inputs: Arity::Fixed(1),
            outputs: Arity::FromAttr("num"),
        });
        registry.register(OpDef {
            name: "Cast",
            attrs: vec![
                AttrDef::required("SrcT", AttrKind::Type),
                AttrDef::required("DstT", AttrKind::Type),
                AttrDef::optional("Truncate", AttrKind::Bool),
            ],
            inputs: Arity::Fixed(1),
            outputs: Arity::Fixed(1),
        });
        registry
    }

    pub fn register(&mut self, def: OpDef) {
        self.ops.insert(def.name, def);
    }

    pub fn get(&self, name: &str) -> Option<&OpDef> {
        self.ops.get(name)
    }

    /// Checks `node_def` against its op definition and the node's operand counts.
    pub fn validate(&self, node_def: &NodeDef, inputs: usize, outputs: usize) -> Result<EagerOp> {
        let def = self
            .get(&node_def.op)
            .with_context(|| format!("op type not registered '{}'", node_def.op))?;

        for attr in &def.attrs {
            match node_def.attr_value(attr.name) {
                Some(value) => ensure!(
                    attr.kind.matches(value),
                    "{}: attr '{}' has kind '{}', expected {:?}",
                    def.name,
                    attr.name,
                    value.kind(),
                    attr.kind
                ),
                None if attr.required => {
                    bail!("{}: missing required attr '{}'", def.name, attr.name)
                }
                None => {}
            }
        }
        if let Some(unknown) = node_def
            .attr
            .keys()
            .find(|key| !def.attrs.iter().any(|a| a.name == key.as_str()))
        {
            bail!("{}: unknown attr '{}'", def.name, unknown);
        }

        check_arity(def, node_def, "input", def.inputs, inputs)?;
        check_arity(def, node_def, "output", def.outputs, outputs)?;

        match def.name {
            "Identity" | "Add" | "Mul" => {
                expect_float(node_def, "T")?;
                Ok(match def.name {
                    "Identity" => EagerOp::Identity,
                    "Add" => EagerOp::Add,
                    _ => EagerOp::Mul,
                })
            }
            "Unpack" => {
                expect_float(node_def, "T")?;
                let num = int_attr(node_def, "num")?;
                let num = usize::try_from(num).context("Unpack: 'num' must be non-negative")?;
                Ok(EagerOp::Unpack {
                    num,
                    axis: int_attr(node_def, "axis")?,
                })
            }
            "Cast" => {
                expect_float(node_def, "SrcT")?;
                expect_float(node_def, "DstT")?;
                Ok(EagerOp::Cast)
            }
            other => bail!("op '{other}' is registered but has no kernel"),
        }
    }
}

fn check_arity(def: &OpDef, node_def: &NodeDef, kind: &str, arity: Arity, got: usize) -> Result<()> {
    let expected = match arity {
        Arity::Fixed(n) => n,
        Arity::FromAttr(attr) => usize::try_from(int_attr(node_def, attr)?)
            .with_context(|| format!("{}: '{attr}' must be non-negative", def.name))?,
    };
    ensure!(
        expected == got,
        "{}: expected {expected} {kind}s, node has {got}",
        def.name
    );
    Ok(())
}

fn int_attr(node_def: &NodeDef, name: &str) -> Result<i64> {
    match node_def.attr_value(name) {
        Some(Value::I(i)) => Ok(*i),
        _ => bail!("{}: attr '{name}' is not an int", node_def.op),
    }
}

fn expect_float(node_def: &NodeDef, name: &str) -> Result<()> {
    let Some(Value::Type(raw)) = node_def.attr_value(name) else {
        bail!("{}: attr '{name}' is not a type", node_def.op);
    };
    let dtype = DataType::try_from(*raw)
        .map(DataType::as_text_name)
        .unwrap_or("unknown");
    ensure!(
        *raw == DataType::DtFloat as i32,
        "{}: {name}={dtype} is not supported, only DT_FLOAT",
        node_def.op
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eagerport_proto::parse_node_def;

    fn validate(text: &str, inputs: usize, outputs: usize) -> Result<EagerOp> {
        OpRegistry::with_standard_ops().validate(&parse_node_def(text)?, inputs, outputs)
    }

    #[test]
    fn accepts_canonical_ops() {
        let float = "attr { key: 'T' value { type: DT_FLOAT } }";
        assert_eq!(validate(&format!("{float} op: 'Add'"), 2, 1).unwrap(), EagerOp::Add);
        assert_eq!(
            validate(&format!("{float} op: 'Identity'"), 1, 1).unwrap(),
            EagerOp::Identity
        );
        assert_eq!(
            validate(
                &format!("{float} attr {{ key: 'num' value {{ i: 2 }} }} attr {{ key: 'axis' value {{ i: 0 }} }} op: 'Unpack'"),
                1,
                2
            )
            .unwrap(),
            EagerOp::Unpack { num: 2, axis: 0 }
        );
    }

    #[test]
    fn cast_without_attrs_is_incompatible() {
        let err = validate("op: 'Cast'", 1, 1).unwrap_err();
        assert!(err.to_string().contains("missing required attr 'SrcT'"));
    }

    #[test]
    fn unknown_op_is_rejected() {
        let err = validate("op: 'NonExistentOp'", 1, 1).unwrap_err();
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn wrong_kind_dtype_and_arity_are_rejected() {
        assert!(validate("attr { key: 'T' value { i: 1 } } op: 'Mul'", 2, 1).is_err());
        assert!(validate("attr { key: 'T' value { type: DT_INT32 } } op: 'Mul'", 2, 1).is_err());
        assert!(validate("attr { key: 'T' value { type: DT_FLOAT } } op: 'Mul'", 1, 1).is_err());
        assert!(validate(
            "attr { key: 'T' value { type: DT_FLOAT } } attr { key: 'extra' value { i: 1 } } op: 'Mul'",
            2,
            1
        )
        .is_err());
    }
}
