/// The fixed set of delegated ops a test can add, including two that are
/// deliberately broken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DelegatedOp {
    Unpack,
    Identity,
    Add,
    Mul,
    /// Names an op no delegate knows.
    NonExistent,
    /// A `Cast` with none of the attributes it requires.
    IncompatibleNodeDef,
}

impl DelegatedOp {
    pub const ALL: [DelegatedOp; 6] = [
        DelegatedOp::Unpack,
        DelegatedOp::Identity,
        DelegatedOp::Add,
        DelegatedOp::Mul,
        DelegatedOp::NonExistent,
        DelegatedOp::IncompatibleNodeDef,
    ];

    /// Name the node is registered under in the graph.
    pub fn custom_name(self) -> &'static str {
        match self {
            DelegatedOp::Unpack => "EagerUnpack",
            DelegatedOp::Identity => "EagerIdentity",
            DelegatedOp::Add => "EagerAdd",
            DelegatedOp::Mul => "EagerMul",
            DelegatedOp::NonExistent => "NonExistentOp",
            DelegatedOp::IncompatibleNodeDef => "EagerCast",
        }
    }

    /// Op name the delegate sees inside the parameter blob.
    pub fn op_name(self) -> &'static str {
        match self {
            DelegatedOp::Unpack => "Unpack",
            DelegatedOp::Identity => "Identity",
            DelegatedOp::Add => "Add",
            DelegatedOp::Mul => "Mul",
            DelegatedOp::NonExistent => "NonExistentOp",
            DelegatedOp::IncompatibleNodeDef => "Cast",
        }
    }

    pub fn attribute_text(self) -> String {
        let float = attr("T", "type: DT_FLOAT");
        match self {
            DelegatedOp::Unpack => float + &attr("num", "i: 2") + &attr("axis", "i: 0"),
            DelegatedOp::Identity | DelegatedOp::Add | DelegatedOp::Mul => float,
            DelegatedOp::NonExistent | DelegatedOp::IncompatibleNodeDef => String::new(),
        }
    }
}

/// One `attr` entry in NodeDef text form.
pub fn attr(key: &str, value: &str) -> String {
    format!(" attr{{ key: '{key}' value {{{value}}}}}")
}
