use bytes::BytesMut;
use smallvec::SmallVec;

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DType {
    F32,
    I32,
    I64,
    U8,
    Bool,
}

impl DType {
    pub fn byte_size(self) -> usize {
        match self {
            DType::F32 | DType::I32 => 4,
            DType::I64 => 8,
            DType::U8 | DType::Bool => 1,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Shape(pub SmallVec<[usize; 6]>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }
    pub fn dims(&self) -> &[usize] {
        &self.0
    }
    pub fn rank(&self) -> usize {
        self.0.len()
    }
    /// Element count; a rank-0 shape holds one element and any zero dim holds none.
    /// `None` when the count does not fit in `usize`.
    pub fn numel(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Buffer size for `dtype` elements of this shape.
    pub fn byte_len(&self, dtype: DType) -> Result<usize> {
        self.numel()
            .and_then(|n| n.checked_mul(dtype.byte_size()))
            .ok_or_else(|| {
                Error::Allocation(format!(
                    "{:?} x {dtype:?} exceeds the addressable byte size",
                    self.dims()
                ))
            })
    }
}

/// Stored alongside each tensor and handed back unchanged; the runtime never interprets it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QuantizationParams {
    pub scale: f32,
    pub zero_point: i32,
}

/// A read-write tensor slot whose buffer is owned by the host.
#[derive(Clone, Debug)]
pub struct Tensor {
    pub name: String,
    pub dtype: DType,
    pub shape: Shape,
    pub quantization: QuantizationParams,
    data: BytesMut,
}

impl Default for Tensor {
    /// A scalar `F32` slot.
    fn default() -> Self {
        Self {
            name: String::new(),
            dtype: DType::F32,
            shape: Shape::default(),
            quantization: QuantizationParams::default(),
            data: BytesMut::zeroed(DType::F32.byte_size()),
        }
    }
}

impl Tensor {
    pub fn new(
        name: impl Into<String>,
        dtype: DType,
        shape: Shape,
        quantization: QuantizationParams,
    ) -> Result<Self> {
        let byte_len = shape.byte_len(dtype)?;
        Ok(Self {
            name: name.into(),
            dtype,
            shape,
            quantization,
            data: BytesMut::zeroed(byte_len),
        })
    }

    /// Current buffer size, which lags behind `shape` until the next reallocation.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn required_bytes(&self) -> Result<usize> {
        self.shape.byte_len(self.dtype)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Replaces the buffer with a zeroed one if its size no longer matches the shape.
    /// Returns whether a new buffer was allocated.
    pub fn reallocate(&mut self) -> Result<bool> {
        let required = self.required_bytes()?;
        if self.data.len() == required {
            return Ok(false);
        }
        self.data = BytesMut::zeroed(required);
        Ok(true)
    }

    /// Copies the whole buffer out as `f32` elements.
    pub fn read_f32(&self) -> Result<Vec<f32>> {
        self.expect_dtype(DType::F32)?;
        Ok(self.bytes_as_f32())
    }

    /// Overwrites the buffer front to back; bytes past `values` are left untouched.
    pub fn write_f32(&mut self, values: &[f32]) -> Result<()> {
        self.expect_dtype(DType::F32)?;
        self.write_f32_bytes(values)
    }

    /// The buffer reinterpreted as `byte_len / 4` floats, whatever `dtype` says.
    pub fn bytes_as_f32(&self) -> Vec<f32> {
        self.data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    /// Writes `values` as raw floats; only the byte capacity is checked.
    pub fn write_f32_bytes(&mut self, values: &[f32]) -> Result<()> {
        let requested = std::mem::size_of_val(values);
        if requested > self.data.len() {
            return Err(Error::OutOfBounds {
                requested,
                capacity: self.data.len(),
            });
        }
        for (dst, value) in self.data.chunks_exact_mut(4).zip(values) {
            dst.copy_from_slice(&value.to_le_bytes());
        }
        Ok(())
    }

    fn expect_dtype(&self, expected: DType) -> Result<()> {
        if self.dtype != expected {
            return Err(Error::DTypeMismatch {
                expected,
                got: self.dtype,
            });
        }
        Ok(())
    }
}
