// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Item type descriptors.
//!
//! An [ItemType] describes the shape of one item in a typed buffer: a scalar kind, a number of
//! components per column (1 to 4), and a number of matrix columns (1 to 4).  Vectors have one
//! column; matrices are stored column-major.
//!
//! Rust types that can live in a typed buffer implement the sealed [Item] trait, which ties each
//! type to its descriptor:
//!
//! | Rust type        | descriptor                |
//! |------------------|---------------------------|
//! | `f32`            | `F32`, 1 component         |
//! | `[f32; 3]`       | `F32`, 3 components        |
//! | `[[f32; 4]; 4]`  | `F32`, 4 components × 4 columns |
//! | `half::f16`      | `F16`, 1 component         |
//!
//! # Examples
//!
//! ```
//! use typed_buffers::item_type::{ItemType, ScalarKind};
//!
//! let position = ItemType::of::<[f32; 3]>();
//! assert_eq!(position, ItemType::F32X3);
//! assert_eq!(position.byte_size(), 12);
//!
//! let transform = ItemType::new(ScalarKind::F32, 4, 4).unwrap();
//! assert_eq!(transform.components_per_item(), 16);
//! assert!(transform.is_base_compatible(&position));
//! ```

use crate::error::Error;
use std::fmt::{Display, Formatter};

pub use half::f16;

/// The scalar underlying every component of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F16,
    F32,
    F64,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 9] = [
        ScalarKind::I8,
        ScalarKind::U8,
        ScalarKind::I16,
        ScalarKind::U16,
        ScalarKind::I32,
        ScalarKind::U32,
        ScalarKind::F16,
        ScalarKind::F32,
        ScalarKind::F64,
    ];

    pub const fn byte_width(self) -> usize {
        match self {
            ScalarKind::I8 | ScalarKind::U8 => 1,
            ScalarKind::I16 | ScalarKind::U16 | ScalarKind::F16 => 2,
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 => 4,
            ScalarKind::F64 => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::I8 => "i8",
            ScalarKind::U8 => "u8",
            ScalarKind::I16 => "i16",
            ScalarKind::U16 => "u16",
            ScalarKind::I32 => "i32",
            ScalarKind::U32 => "u32",
            ScalarKind::F16 => "f16",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
        }
    }
}

const MAX_COMPONENTS: u8 = 4;
const MAX_COLUMNS: u8 = 4;

/// Shape of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemType {
    scalar: ScalarKind,
    components: u8,
    columns: u8,
}

impl ItemType {
    pub const I8: ItemType = ItemType::vector(ScalarKind::I8, 1);
    pub const U8: ItemType = ItemType::vector(ScalarKind::U8, 1);
    pub const U16: ItemType = ItemType::vector(ScalarKind::U16, 1);
    pub const U32: ItemType = ItemType::vector(ScalarKind::U32, 1);
    pub const I32: ItemType = ItemType::vector(ScalarKind::I32, 1);
    pub const F32: ItemType = ItemType::vector(ScalarKind::F32, 1);
    pub const F32X2: ItemType = ItemType::vector(ScalarKind::F32, 2);
    pub const F32X3: ItemType = ItemType::vector(ScalarKind::F32, 3);
    pub const F32X4: ItemType = ItemType::vector(ScalarKind::F32, 4);
    pub const F16X4: ItemType = ItemType::vector(ScalarKind::F16, 4);
    pub const U8X4: ItemType = ItemType::vector(ScalarKind::U8, 4);
    pub const F64: ItemType = ItemType::vector(ScalarKind::F64, 1);
    pub const F32_MAT3: ItemType = ItemType::matrix(ScalarKind::F32, 3, 3);
    pub const F32_MAT4: ItemType = ItemType::matrix(ScalarKind::F32, 4, 4);

    /// Creates a descriptor, rejecting shapes outside 1..=4 components and 1..=4 columns.
    pub fn new(scalar: ScalarKind, components: u8, columns: u8) -> Result<Self, Error> {
        if !(1..=MAX_COMPONENTS).contains(&components) {
            return Err(Error::InvalidLayout("component count must be 1 through 4"));
        }
        if !(1..=MAX_COLUMNS).contains(&columns) {
            return Err(Error::InvalidLayout("column count must be 1 through 4"));
        }
        Ok(Self {
            scalar,
            components,
            columns,
        })
    }

    //const constructors for the table above; callers guarantee the ranges
    const fn vector(scalar: ScalarKind, components: u8) -> Self {
        Self {
            scalar,
            components,
            columns: 1,
        }
    }

    const fn matrix(scalar: ScalarKind, components: u8, columns: u8) -> Self {
        Self {
            scalar,
            components,
            columns,
        }
    }

    /// The descriptor of a Rust item type.
    pub const fn of<T: Item>() -> Self {
        T::ITEM_TYPE
    }

    /// Every supported descriptor.
    pub fn all() -> impl Iterator<Item = ItemType> {
        ScalarKind::ALL.into_iter().flat_map(|scalar| {
            (1..=MAX_COLUMNS).flat_map(move |columns| {
                (1..=MAX_COMPONENTS)
                    .map(move |components| ItemType::matrix(scalar, components, columns))
            })
        })
    }

    pub const fn scalar(&self) -> ScalarKind {
        self.scalar
    }

    /// Components per column.
    pub const fn components(&self) -> usize {
        self.components as usize
    }

    pub const fn columns(&self) -> usize {
        self.columns as usize
    }

    /// Scalars per item across all columns.
    pub const fn components_per_item(&self) -> usize {
        self.components() * self.columns()
    }

    pub const fn byte_size(&self) -> usize {
        self.components_per_item() * self.scalar.byte_width()
    }

    /// Whether both descriptors share a scalar kind.
    pub fn is_base_compatible(&self, other: &ItemType) -> bool {
        self.scalar == other.scalar
    }
}

impl Display for ItemType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.components, self.columns) {
            (1, 1) => write!(f, "{}", self.scalar.name()),
            (n, 1) => write!(f, "{}x{}", self.scalar.name(), n),
            (r, c) => write!(f, "{} mat{}x{}", self.scalar.name(), c, r),
        }
    }
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// A scalar that can be a component of an item.
pub trait Scalar:
    sealed::Sealed + Copy + Default + PartialEq + std::fmt::Debug + Send + Sync + 'static
{
    const KIND: ScalarKind;
}

/**
A Rust type that can be stored as one item of a typed buffer.

Implemented for every [Scalar], for arrays `[S; N]` (vectors, `N` from 1 to 4), and for nested
arrays `[[S; R]; C]` (column-major matrices, `R` from 1 to 4 and `C` from 2 to 4).  None of these types
contain padding, so their bytes are exactly the item's bytes.
*/
pub trait Item:
    sealed::Sealed + Copy + Default + PartialEq + std::fmt::Debug + Send + Sync + 'static
{
    const ITEM_TYPE: ItemType;
}

macro_rules! scalars {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;
            }
            impl Item for $ty {
                const ITEM_TYPE: ItemType = ItemType::vector(ScalarKind::$kind, 1);
            }
        )*
    };
}

scalars! {
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    f16 => F16,
    f32 => F32,
    f64 => F64,
}

macro_rules! vectors {
    ($($n:literal),*) => {
        $(
            impl<S: Scalar> sealed::Sealed for [S; $n] {}
            impl<S: Scalar> Item for [S; $n] {
                const ITEM_TYPE: ItemType = ItemType::vector(S::KIND, $n);
            }
        )*
    };
}

vectors!(1, 2, 3, 4);

macro_rules! matrices {
    ($(($rows:literal, $cols:literal)),*) => {
        $(
            impl<S: Scalar> sealed::Sealed for [[S; $rows]; $cols] {}
            impl<S: Scalar> Item for [[S; $rows]; $cols] {
                const ITEM_TYPE: ItemType = ItemType::matrix(S::KIND, $rows, $cols);
            }
        )*
    };
}

matrices!(
    (1, 2), (1, 3), (1, 4),
    (2, 2), (2, 3), (2, 4),
    (3, 2), (3, 3), (3, 4),
    (4, 2), (4, 3), (4, 4)
);

/// Views items as their bytes.
pub(crate) fn as_bytes<T: Item>(items: &[T]) -> &[u8] {
    //safe because Item types are padding-free arrays of plain scalars
    unsafe { std::slice::from_raw_parts(items.as_ptr() as *const u8, std::mem::size_of_val(items)) }
}

/// Views items as their bytes, mutably.
pub(crate) fn as_bytes_mut<T: Item>(items: &mut [T]) -> &mut [u8] {
    //safe for the same reason as as_bytes; additionally every bit pattern is a valid scalar
    unsafe {
        std::slice::from_raw_parts_mut(items.as_mut_ptr() as *mut u8, std::mem::size_of_val(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_match_rust_sizes() {
        fn check<T: Item>() {
            assert_eq!(
                ItemType::of::<T>().byte_size(),
                std::mem::size_of::<T>(),
                "{}",
                ItemType::of::<T>()
            );
        }
        check::<u8>();
        check::<f16>();
        check::<[i16; 3]>();
        check::<[f64; 4]>();
        check::<[[f32; 4]; 4]>();
        check::<[[u8; 3]; 2]>();
        check::<[[f16; 1]; 4]>();
    }

    #[test]
    fn matrix_descriptor() {
        let m = ItemType::of::<[[f32; 3]; 2]>();
        assert_eq!(m.components(), 3);
        assert_eq!(m.columns(), 2);
        assert_eq!(m.to_string(), "f32 mat2x3");
        assert_eq!(ItemType::of::<[f32; 3]>().to_string(), "f32x3");
        assert_eq!(ItemType::of::<u16>().to_string(), "u16");
    }

    #[test]
    fn new_rejects_out_of_range() {
        assert!(matches!(
            ItemType::new(ScalarKind::F32, 0, 1),
            Err(Error::InvalidLayout(_))
        ));
        assert!(matches!(
            ItemType::new(ScalarKind::F32, 5, 1),
            Err(Error::InvalidLayout(_))
        ));
        assert!(matches!(
            ItemType::new(ScalarKind::F32, 4, 0),
            Err(Error::InvalidLayout(_))
        ));
        assert_eq!(ItemType::new(ScalarKind::F32, 4, 4).unwrap(), ItemType::F32_MAT4);
    }

    #[test]
    fn table_is_complete() {
        assert_eq!(ItemType::all().count(), 9 * 4 * 4);
        assert!(ItemType::all().all(|t| t.byte_size() > 0));
    }

    #[test]
    fn base_compatibility_ignores_shape() {
        assert!(ItemType::F32.is_base_compatible(&ItemType::F32_MAT4));
        assert!(!ItemType::F32.is_base_compatible(&ItemType::U32));
    }
}
