use std::fmt::{self, Display};
use std::sync::Arc;

use crate::util::align_to;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Int(u32),
    Float(u32),
    Ptr,
    Struct(Arc<[Type]>),
    Array(Arc<Type>, u64),
    Opaque,
}

impl Type {
    pub fn structure(fields: impl IntoIterator<Item = Type>) -> Self {
        Self::Struct(fields.into_iter().collect())
    }

    pub fn array(elem: Type, len: u64) -> Self {
        Self::Array(Arc::new(elem), len)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Int(1))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Int(bits) => write!(f, "i{bits}"),
            Self::Float(bits) => write!(f, "f{bits}"),
            Self::Ptr => write!(f, "ptr"),

            Self::Struct(fields) => {
                write!(f, "{{")?;

                for (idx, field) in fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }

                    write!(f, "{field}")?;
                }

                write!(f, "}}")
            }

            Self::Array(elem, len) => write!(f, "[{len} x {elem}]"),
            Self::Opaque => write!(f, "opaque"),
        }
    }
}

/// Target data layout: sizes and alignments use natural alignment rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataLayout {
    pub pointer_bits: u32,
}

impl Default for DataLayout {
    fn default() -> Self {
        Self { pointer_bits: 64 }
    }
}

impl DataLayout {
    pub fn pointer_size(&self) -> u64 {
        u64::from(self.pointer_bits).div_ceil(8)
    }

    pub fn align(&self, ty: &Type) -> u64 {
        match ty {
            Type::Void | Type::Opaque => 1,
            Type::Int(bits) | Type::Float(bits) => {
                u64::from(*bits).div_ceil(8).next_power_of_two().min(16)
            }
            Type::Ptr => self.pointer_size(),
            Type::Struct(fields) => fields.iter().map(|field| self.align(field)).max().unwrap_or(1),
            Type::Array(elem, _) => self.align(elem),
        }
    }

    /// The number of bytes a store of `ty` may overwrite.
    pub fn store_size(&self, ty: &Type) -> u64 {
        match ty {
            Type::Void | Type::Opaque => 0,
            Type::Int(bits) | Type::Float(bits) => u64::from(*bits).div_ceil(8),
            Type::Ptr => self.pointer_size(),
            Type::Struct(fields) => self.struct_size(fields),
            Type::Array(elem, len) => len * self.alloc_size(elem),
        }
    }

    /// The distance between consecutive elements of type `ty` in memory.
    pub fn alloc_size(&self, ty: &Type) -> u64 {
        align_to(self.store_size(ty), self.align(ty))
    }

    pub fn field_offset(&self, fields: &[Type], field: usize) -> u64 {
        let mut offset = 0;

        for (idx, ty) in fields.iter().enumerate() {
            offset = align_to(offset, self.align(ty));

            if idx == field {
                break;
            }

            offset += self.alloc_size(ty);
        }

        offset
    }

    fn struct_size(&self, fields: &[Type]) -> u64 {
        let Some(last) = fields.last() else { return 0 };
        let end = self.field_offset(fields, fields.len() - 1) + self.alloc_size(last);
        let align = fields.iter().map(|field| self.align(field)).max().unwrap_or(1);

        align_to(end, align)
    }
}
