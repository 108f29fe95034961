//! Binary vector encoding used as a custom node's parameter buffer.
//!
//! Layout (all integers little-endian):
//! `u32 count`, then per element `u8 tag`, `u32 len`, `len` payload bytes.
//! Tag 1 is a UTF-8 string, tag 2 an arbitrary byte string.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::Message;

use crate::{BlobError, NodeDef};

const TAG_STRING: u8 = 1;
const TAG_BYTES: u8 = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlobElement {
    String(String),
    Bytes(Bytes),
}

impl BlobElement {
    fn tag(&self) -> u8 {
        match self {
            BlobElement::String(_) => TAG_STRING,
            BlobElement::Bytes(_) => TAG_BYTES,
        }
    }

    fn payload(&self) -> &[u8] {
        match self {
            BlobElement::String(s) => s.as_bytes(),
            BlobElement::Bytes(b) => b,
        }
    }
}

pub fn encode_vector(elements: &[BlobElement]) -> Result<Bytes, BlobError> {
    let payload_len: usize = elements.iter().map(|e| 5 + e.payload().len()).sum();
    let mut buf = BytesMut::with_capacity(4 + payload_len);

    buf.put_u32_le(length_prefix(elements.len())?);
    for element in elements {
        let payload = element.payload();
        buf.put_u8(element.tag());
        buf.put_u32_le(length_prefix(payload.len())?);
        buf.put_slice(payload);
    }
    Ok(buf.freeze())
}

pub fn decode_vector(mut data: &[u8]) -> Result<Vec<BlobElement>, BlobError> {
    let count = take_u32(&mut data)? as usize;
    let mut elements = Vec::new();

    for _ in 0..count {
        ensure_remaining(data, 1)?;
        let tag = data.get_u8();
        let len = take_u32(&mut data)? as usize;
        ensure_remaining(data, len)?;
        let payload = &data[..len];

        let element = match tag {
            TAG_STRING => BlobElement::String(std::str::from_utf8(payload)?.to_owned()),
            TAG_BYTES => BlobElement::Bytes(Bytes::copy_from_slice(payload)),
            other => return Err(BlobError::UnknownTag(other)),
        };
        data.advance(len);
        elements.push(element);
    }

    if data.has_remaining() {
        return Err(BlobError::TrailingBytes(data.remaining()));
    }
    Ok(elements)
}

fn length_prefix(len: usize) -> Result<u32, BlobError> {
    u32::try_from(len).map_err(|_| BlobError::TooLarge(len))
}

fn ensure_remaining(data: &[u8], needed: usize) -> Result<(), BlobError> {
    if data.remaining() < needed {
        return Err(BlobError::Truncated {
            needed,
            remaining: data.remaining(),
        });
    }
    Ok(())
}

fn take_u32(data: &mut &[u8]) -> Result<u32, BlobError> {
    ensure_remaining(*data, 4)?;
    Ok(data.get_u32_le())
}

/// Parameters of a delegated node: the op name the delegate dispatches on and
/// the serialized `NodeDef` carrying its attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomOpBlob {
    pub op: String,
    pub node_def: Bytes,
}

impl CustomOpBlob {
    pub fn from_node_def(node_def: &NodeDef) -> Self {
        Self {
            op: node_def.op.clone(),
            node_def: Bytes::from(node_def.encode_to_vec()),
        }
    }

    pub fn encode(&self) -> Result<Bytes, BlobError> {
        encode_vector(&[
            BlobElement::String(self.op.clone()),
            BlobElement::Bytes(self.node_def.clone()),
        ])
    }

    pub fn decode(data: &[u8]) -> Result<Self, BlobError> {
        let elements = decode_vector(data)?;
        let got = elements.len();
        let [op, node_def]: [BlobElement; 2] = elements
            .try_into()
            .map_err(|_| BlobError::ElementCount { expected: 2, got })?;

        let BlobElement::String(op) = op else {
            return Err(BlobError::ElementKind {
                position: 0,
                expected: "string",
            });
        };
        let BlobElement::Bytes(node_def) = node_def else {
            return Err(BlobError::ElementKind {
                position: 1,
                expected: "byte string",
            });
        };
        Ok(Self { op, node_def })
    }

    pub fn decode_node_def(&self) -> Result<NodeDef, BlobError> {
        Ok(NodeDef::decode(self.node_def.clone())?)
    }
}
