//! Scalar values and their in-memory encoding.

use std::hash::{Hash, Hasher};

use crate::ScalarDType;

/// A scalar value held by an instruction, a register or a buffer element.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    Bool(bool),
}

// Floats compare and hash by bit pattern so instructions carrying constants
// can be used as canonical signature elements.
impl PartialEq for ConstValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ConstValue {}

impl Hash for ConstValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Int(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::Bool(v) => v.hash(state),
        }
    }
}

impl ConstValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
            Self::Bool(v) => f64::from(u8::from(v)),
        }
    }

    pub fn as_i64(&self) -> i64 {
        match *self {
            Self::Int(v) => v,
            Self::Float(v) => v as i64,
            Self::Bool(v) => i64::from(v),
        }
    }

    pub fn as_bool(&self) -> bool {
        match *self {
            Self::Int(v) => v != 0,
            Self::Float(v) => v != 0.0,
            Self::Bool(v) => v,
        }
    }

    /// Convert to the representation used for `dtype`, truncating or rounding
    /// the way a C cast would.
    pub fn cast(self, dtype: ScalarDType) -> Self {
        match dtype {
            ScalarDType::Bool => Self::Bool(self.as_bool()),
            ScalarDType::UInt8 => Self::Int(i64::from(self.as_i64() as u8)),
            ScalarDType::Int32 => Self::Int(i64::from(self.as_i64() as i32)),
            ScalarDType::Int64 | ScalarDType::Index => Self::Int(self.as_i64()),
            ScalarDType::Float32 => Self::Float(f64::from(self.as_f64() as f32)),
            ScalarDType::Float64 => Self::Float(self.as_f64()),
            ScalarDType::Void => self,
        }
    }

    /// Zero of the given type.
    pub fn zero(dtype: ScalarDType) -> Self {
        Self::Int(0).cast(dtype)
    }

    /// Decode one little-endian element. `bytes` must hold exactly `dtype.bytes()`.
    pub fn decode(dtype: ScalarDType, bytes: &[u8]) -> Option<Self> {
        Some(match dtype {
            ScalarDType::Bool => Self::Bool(*bytes.first()? != 0),
            ScalarDType::UInt8 => Self::Int(i64::from(*bytes.first()?)),
            ScalarDType::Int32 => Self::Int(i64::from(i32::from_le_bytes(bytes.try_into().ok()?))),
            ScalarDType::Int64 | ScalarDType::Index => Self::Int(i64::from_le_bytes(bytes.try_into().ok()?)),
            ScalarDType::Float32 => Self::Float(f64::from(f32::from_le_bytes(bytes.try_into().ok()?))),
            ScalarDType::Float64 => Self::Float(f64::from_le_bytes(bytes.try_into().ok()?)),
            ScalarDType::Void => return None,
        })
    }

    /// Encode as `dtype` into `out`, which must hold exactly `dtype.bytes()`.
    pub fn encode(self, dtype: ScalarDType, out: &mut [u8]) -> Option<()> {
        match (self.cast(dtype), dtype) {
            (Self::Bool(v), ScalarDType::Bool) => *out.first_mut()? = u8::from(v),
            (Self::Int(v), ScalarDType::UInt8) => *out.first_mut()? = v as u8,
            (Self::Int(v), ScalarDType::Int32) => out.get_mut(..4)?.copy_from_slice(&(v as i32).to_le_bytes()),
            (Self::Int(v), ScalarDType::Int64 | ScalarDType::Index) => {
                out.get_mut(..8)?.copy_from_slice(&v.to_le_bytes())
            }
            (Self::Float(v), ScalarDType::Float32) => out.get_mut(..4)?.copy_from_slice(&(v as f32).to_le_bytes()),
            (Self::Float(v), ScalarDType::Float64) => out.get_mut(..8)?.copy_from_slice(&v.to_le_bytes()),
            _ => return None,
        }
        Some(())
    }
}

impl From<f32> for ConstValue {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for ConstValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for ConstValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for ConstValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u8> for ConstValue {
    fn from(v: u8) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<bool> for ConstValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl std::fmt::Display for ConstValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}
