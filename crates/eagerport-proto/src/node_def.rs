//! Protobuf messages for an op's structured attributes.
//!
//! Field numbers follow TensorFlow's `NodeDef`/`AttrValue` so the serialized
//! record is readable by anything that speaks that schema.

use std::collections::BTreeMap;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeDef {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub op: String,
    #[prost(string, repeated, tag = "3")]
    pub input: Vec<String>,
    #[prost(string, tag = "4")]
    pub device: String,
    #[prost(btree_map = "string, message", tag = "5")]
    pub attr: BTreeMap<String, AttrValue>,
}

impl NodeDef {
    pub fn attr_value(&self, key: &str) -> Option<&attr_value::Value> {
        self.attr.get(key).and_then(|v| v.value.as_ref())
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AttrValue {
    #[prost(oneof = "attr_value::Value", tags = "1, 2, 3, 4, 5, 6")]
    pub value: Option<attr_value::Value>,
}

impl AttrValue {
    pub fn new(value: attr_value::Value) -> Self {
        Self { value: Some(value) }
    }
}

pub mod attr_value {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(message, tag = "1")]
        List(super::ListValue),
        #[prost(bytes, tag = "2")]
        S(Vec<u8>),
        #[prost(int64, tag = "3")]
        I(i64),
        #[prost(float, tag = "4")]
        F(f32),
        #[prost(bool, tag = "5")]
        B(bool),
        #[prost(enumeration = "super::DataType", tag = "6")]
        Type(i32),
    }

    impl Value {
        /// Name of the oneof case, as written in text form.
        pub fn kind(&self) -> &'static str {
            match self {
                Value::List(_) => "list",
                Value::S(_) => "s",
                Value::I(_) => "i",
                Value::F(_) => "f",
                Value::B(_) => "b",
                Value::Type(_) => "type",
            }
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListValue {
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub s: Vec<Vec<u8>>,
    #[prost(int64, repeated, tag = "3")]
    pub i: Vec<i64>,
    #[prost(float, repeated, tag = "4")]
    pub f: Vec<f32>,
    #[prost(bool, repeated, tag = "5")]
    pub b: Vec<bool>,
    #[prost(enumeration = "DataType", repeated, tag = "6")]
    pub r#type: Vec<i32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DataType {
    DtInvalid = 0,
    DtFloat = 1,
    DtDouble = 2,
    DtInt32 = 3,
    DtUint8 = 4,
    DtString = 7,
    DtInt64 = 9,
    DtBool = 10,
}

impl DataType {
    pub fn as_text_name(self) -> &'static str {
        match self {
            DataType::DtInvalid => "DT_INVALID",
            DataType::DtFloat => "DT_FLOAT",
            DataType::DtDouble => "DT_DOUBLE",
            DataType::DtInt32 => "DT_INT32",
            DataType::DtUint8 => "DT_UINT8",
            DataType::DtString => "DT_STRING",
            DataType::DtInt64 => "DT_INT64",
            DataType::DtBool => "DT_BOOL",
        }
    }

    pub fn from_text_name(name: &str) -> Option<Self> {
        Some(match name {
            "DT_INVALID" => DataType::DtInvalid,
            "DT_FLOAT" => DataType::DtFloat,
            "DT_DOUBLE" => DataType::DtDouble,
            "DT_INT32" => DataType::DtInt32,
            "DT_UINT8" => DataType::DtUint8,
            "DT_STRING" => DataType::DtString,
            "DT_INT64" => DataType::DtInt64,
            "DT_BOOL" => DataType::DtBool,
            _ => return None,
        })
    }
}
