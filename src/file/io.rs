//! Big-endian primitive conversion for class-file reading and writing.
//!
//! Every multi-byte quantity in a class file is stored big-endian (`u1`, `u2`, `u4` and the
//! 8-byte halves of `long`/`double` constants). This module provides the [`ClassIO`] trait that
//! abstracts over the primitive types involved, plus bounds-checked readers used by
//! [`crate::file::parser::Parser`] and the conversion used by [`crate::file::writer::ByteWriter`].
//!
//! # Examples
//!
//! ```rust,ignore
//! use hugeenum::file::io::read_be_at;
//!
//! let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x37];
//! let mut offset = 0;
//!
//! let magic: u32 = read_be_at(&data, &mut offset)?;
//! let major: u16 = read_be_at(&data, &mut offset)?;
//! assert_eq!(magic, 0xCAFEBABE);
//! assert_eq!(major, 55);
//! assert_eq!(offset, 6);
//! # Ok::<(), hugeenum::Error>(())
//! ```
//!
//! # Error Handling
//!
//! Reading functions return [`crate::Error::OutOfBounds`] if there are insufficient bytes in the
//! buffer to complete the operation.

use crate::{Error::OutOfBounds, Result};

/// Trait for primitives that have a fixed-size big-endian representation.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size byte
/// array required for that particular type (e.g. `[u8; 4]` for `u32`).
pub trait ClassIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in big-endian
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_class_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl ClassIO for $ty {
                type Bytes = [u8; $len];

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_class_io!(
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
    f32 => 4,
    f64 => 8,
);

/// Reads a value of type `T` from the start of `data` in big-endian order.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_be<T: ClassIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_be_at(data, &mut offset)
}

/// Reads a value of type `T` at `offset` in big-endian order and advances `offset`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain.
pub fn read_be_at<T: ClassIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let end = offset.checked_add(type_len).ok_or(OutOfBounds)?;
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_be_bytes(read))
}
