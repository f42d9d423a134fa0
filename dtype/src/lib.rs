//! Element data types for kernels and device buffers.
//!
//! Buffers are positional blocks of a single element type. Kernels and the
//! interpreter exchange scalar values through [`ConstValue`], which knows how
//! to decode and encode itself from the little-endian bytes a buffer holds.

pub mod ext;
pub mod value;


pub use ext::HasDType;
pub use value::ConstValue;

/// Address space for pointer types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum AddrSpace {
    /// Global/device memory.
    Global,
    /// Register memory (accumulators).
    Reg,
}

/// Scalar data types (base numeric types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray, strum::Display)]
pub enum ScalarDType {
    #[strum(serialize = "bool")]
    Bool,
    #[strum(serialize = "uchar")]
    UInt8,
    #[strum(serialize = "int")]
    Int32,
    #[strum(serialize = "long")]
    Int64,
    #[strum(serialize = "float")]
    Float32,
    #[strum(serialize = "double")]
    Float64,

    /// Void type for instructions that produce no value.
    #[strum(serialize = "void")]
    Void,

    /// Index type for loop counters and addressing.
    #[strum(serialize = "index")]
    Index,
}

impl ScalarDType {
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Bool => 1,
            Self::UInt8 => 1,
            Self::Int32 => 4,
            Self::Int64 => 8,
            Self::Float32 => 4,
            Self::Float64 => 8,
            Self::Void => 0,
            Self::Index => 8,
        }
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::UInt8)
    }

    pub const fn is_int(&self) -> bool {
        self.is_signed() || self.is_unsigned() || matches!(self, Self::Index)
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }
}

/// Data type of an instruction result or a buffer element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DType {
    /// Scalar type (single value).
    Scalar(ScalarDType),

    /// Pointer to elements of a scalar type.
    Ptr { base: ScalarDType, addrspace: AddrSpace },

    /// Image buffer. Stored as `float` texels but only addressable by kernels
    /// that honour the image layout constraints of the device.
    Image,
}

impl DType {
    /// Create a pointer type to elements of this dtype. A pointer is moved to
    /// `addrspace` with its element type kept.
    pub fn ptr(self, addrspace: AddrSpace) -> Self {
        match self {
            Self::Ptr { base, .. } => Self::Ptr { base, addrspace },
            Self::Image => self,
            Self::Scalar(base) => Self::Ptr { base, addrspace },
        }
    }

    pub fn scalar(&self) -> Option<ScalarDType> {
        match self {
            Self::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    /// Get the element scalar type (works for scalars, pointers and images).
    pub fn base(&self) -> ScalarDType {
        match self {
            Self::Scalar(s) => *s,
            Self::Ptr { base, .. } => *base,
            Self::Image => ScalarDType::Float32,
        }
    }

    /// Size of one element in bytes.
    pub fn bytes(&self) -> usize {
        match self {
            Self::Scalar(s) => s.bytes(),
            Self::Ptr { .. } => 8,
            Self::Image => ScalarDType::Float32.bytes(),
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.scalar(), Some(ScalarDType::Bool))
    }

    pub fn is_int(&self) -> bool {
        self.scalar().is_some_and(|s| s.is_int())
    }

    pub fn is_float(&self) -> bool {
        self.scalar().is_some_and(|s| s.is_float()) || self.is_image()
    }
}

impl From<ScalarDType> for DType {
    fn from(scalar: ScalarDType) -> Self {
        Self::Scalar(scalar)
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s}"),
            Self::Ptr { base, addrspace: AddrSpace::Global } => write!(f, "{base}*"),
            Self::Ptr { base, addrspace: AddrSpace::Reg } => write!(f, "__register {base}*"),
            Self::Image => write!(f, "image2d_t"),
        }
    }
}

#[allow(non_upper_case_globals)]
impl DType {
    pub const Bool: Self = Self::Scalar(ScalarDType::Bool);
    pub const UInt8: Self = Self::Scalar(ScalarDType::UInt8);
    pub const Int32: Self = Self::Scalar(ScalarDType::Int32);
    pub const Int64: Self = Self::Scalar(ScalarDType::Int64);
    pub const Float32: Self = Self::Scalar(ScalarDType::Float32);
    pub const Float64: Self = Self::Scalar(ScalarDType::Float64);
    pub const Void: Self = Self::Scalar(ScalarDType::Void);
    pub const Index: Self = Self::Scalar(ScalarDType::Index);
}
