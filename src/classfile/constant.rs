//! Constant pool entries.
//!
//! [`Constant`] models every entry kind the generators emit or may meet when a class file is
//! read back. References to other entries are stored as raw pool indices, exactly as they
//! appear on disk, so an entry can be written before or after the entries it points at.
//! Floating point values are kept as raw bit patterns which gives them total equality and
//! hashing, and lets the pool de-duplicate them like any other value.

use std::fmt;

use strum::{EnumCount, EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::{
    file::{parser::Parser, writer::ByteWriter},
    Result,
};

/// Tag byte of a constant pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, IntoStaticStr)]
#[repr(u8)]
pub enum ConstantTag {
    /// `CONSTANT_Utf8`
    Utf8 = 1,
    /// `CONSTANT_Integer`
    Integer = 3,
    /// `CONSTANT_Float`
    Float = 4,
    /// `CONSTANT_Long`
    Long = 5,
    /// `CONSTANT_Double`
    Double = 6,
    /// `CONSTANT_Class`
    Class = 7,
    /// `CONSTANT_String`
    String = 8,
    /// `CONSTANT_Fieldref`
    Fieldref = 9,
    /// `CONSTANT_Methodref`
    Methodref = 10,
    /// `CONSTANT_InterfaceMethodref`
    InterfaceMethodref = 11,
    /// `CONSTANT_NameAndType`
    NameAndType = 12,
    /// `CONSTANT_MethodHandle`
    MethodHandle = 15,
    /// `CONSTANT_MethodType`
    MethodType = 16,
    /// `CONSTANT_Dynamic`
    Dynamic = 17,
    /// `CONSTANT_InvokeDynamic`
    InvokeDynamic = 18,
}

impl TryFrom<u8> for ConstantTag {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self> {
        ConstantTag::iter()
            .find(|tag| *tag as u8 == value)
            .ok_or_else(|| malformed_error!("Unknown constant pool tag {}", value))
    }
}

/// Kind of a `CONSTANT_MethodHandle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[repr(u8)]
pub enum ReferenceKind {
    /// `REF_getField`
    GetField = 1,
    /// `REF_getStatic`
    GetStatic = 2,
    /// `REF_putField`
    PutField = 3,
    /// `REF_putStatic`
    PutStatic = 4,
    /// `REF_invokeVirtual`
    InvokeVirtual = 5,
    /// `REF_invokeStatic`
    InvokeStatic = 6,
    /// `REF_invokeSpecial`
    InvokeSpecial = 7,
    /// `REF_newInvokeSpecial`
    NewInvokeSpecial = 8,
    /// `REF_invokeInterface`
    InvokeInterface = 9,
}

impl TryFrom<u8> for ReferenceKind {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self> {
        ReferenceKind::iter()
            .find(|kind| *kind as u8 == value)
            .ok_or_else(|| malformed_error!("Unknown method handle kind {}", value))
    }
}

/// A single constant pool entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// Modified UTF-8 text
    Utf8(String),
    /// 32-bit integer
    Integer(i32),
    /// 32-bit float, as raw IEEE 754 bits
    Float(u32),
    /// 64-bit integer, occupies two pool slots
    Long(i64),
    /// 64-bit float as raw IEEE 754 bits, occupies two pool slots
    Double(u64),
    /// Class or array type, `name` points at its internal name
    Class {
        /// Utf8 index of the internal name
        name: u16,
    },
    /// String literal
    String {
        /// Utf8 index of the value
        value: u16,
    },
    /// Field reference
    Fieldref {
        /// Class index of the owner
        class: u16,
        /// NameAndType index
        name_and_type: u16,
    },
    /// Class method reference
    Methodref {
        /// Class index of the owner
        class: u16,
        /// NameAndType index
        name_and_type: u16,
    },
    /// Interface method reference
    InterfaceMethodref {
        /// Class index of the owner
        class: u16,
        /// NameAndType index
        name_and_type: u16,
    },
    /// Member name and descriptor pair
    NameAndType {
        /// Utf8 index of the name
        name: u16,
        /// Utf8 index of the descriptor
        descriptor: u16,
    },
    /// Method handle
    MethodHandle {
        /// Reference kind
        kind: ReferenceKind,
        /// Index of the referenced member
        reference: u16,
    },
    /// Method type
    MethodType {
        /// Utf8 index of the method descriptor
        descriptor: u16,
    },
    /// Dynamically computed constant
    Dynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap: u16,
        /// NameAndType index
        name_and_type: u16,
    },
    /// Dynamically computed call site
    InvokeDynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap: u16,
        /// NameAndType index
        name_and_type: u16,
    },
}

impl Constant {
    /// Builds a `CONSTANT_Float` from a value.
    #[must_use]
    pub fn float(value: f32) -> Self {
        Constant::Float(value.to_bits())
    }

    /// Builds a `CONSTANT_Double` from a value.
    #[must_use]
    pub fn double(value: f64) -> Self {
        Constant::Double(value.to_bits())
    }

    /// Tag byte of this entry.
    #[must_use]
    pub fn tag(&self) -> ConstantTag {
        match self {
            Constant::Utf8(_) => ConstantTag::Utf8,
            Constant::Integer(_) => ConstantTag::Integer,
            Constant::Float(_) => ConstantTag::Float,
            Constant::Long(_) => ConstantTag::Long,
            Constant::Double(_) => ConstantTag::Double,
            Constant::Class { .. } => ConstantTag::Class,
            Constant::String { .. } => ConstantTag::String,
            Constant::Fieldref { .. } => ConstantTag::Fieldref,
            Constant::Methodref { .. } => ConstantTag::Methodref,
            Constant::InterfaceMethodref { .. } => ConstantTag::InterfaceMethodref,
            Constant::NameAndType { .. } => ConstantTag::NameAndType,
            Constant::MethodHandle { .. } => ConstantTag::MethodHandle,
            Constant::MethodType { .. } => ConstantTag::MethodType,
            Constant::Dynamic { .. } => ConstantTag::Dynamic,
            Constant::InvokeDynamic { .. } => ConstantTag::InvokeDynamic,
        }
    }

    /// Number of pool indices this entry occupies.
    #[must_use]
    pub fn slots(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }

    /// Serializes the entry, tag byte included.
    ///
    /// # Errors
    /// Returns [`crate::Error::EncodingFailure`] if a Utf8 payload is too long.
    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.u1(self.tag() as u8);
        match self {
            Constant::Utf8(value) => writer.utf8(value)?,
            Constant::Integer(value) => writer.write_be(*value),
            Constant::Float(bits) => writer.u4(*bits),
            Constant::Long(value) => writer.write_be(*value),
            Constant::Double(bits) => writer.write_be(*bits),
            Constant::Class { name } => writer.u2(*name),
            Constant::String { value } => writer.u2(*value),
            Constant::MethodType { descriptor } => writer.u2(*descriptor),
            Constant::Fieldref {
                class,
                name_and_type,
            }
            | Constant::Methodref {
                class,
                name_and_type,
            }
            | Constant::InterfaceMethodref {
                class,
                name_and_type,
            } => {
                writer.u2(*class);
                writer.u2(*name_and_type);
            }
            Constant::NameAndType { name, descriptor } => {
                writer.u2(*name);
                writer.u2(*descriptor);
            }
            Constant::MethodHandle { kind, reference } => {
                writer.u1(*kind as u8);
                writer.u2(*reference);
            }
            Constant::Dynamic {
                bootstrap,
                name_and_type,
            }
            | Constant::InvokeDynamic {
                bootstrap,
                name_and_type,
            } => {
                writer.u2(*bootstrap);
                writer.u2(*name_and_type);
            }
        }
        Ok(())
    }

    /// Reads one entry, tag byte included.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input and [`crate::Error::Malformed`]
    /// for unknown tags, unknown handle kinds or invalid text.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        let tag = ConstantTag::try_from(parser.read_be::<u8>()?)?;
        Ok(match tag {
            ConstantTag::Utf8 => Constant::Utf8(parser.read_mutf8()?),
            ConstantTag::Integer => Constant::Integer(parser.read_be()?),
            ConstantTag::Float => Constant::Float(parser.read_be()?),
            ConstantTag::Long => Constant::Long(parser.read_be()?),
            ConstantTag::Double => Constant::Double(parser.read_be()?),
            ConstantTag::Class => Constant::Class {
                name: parser.read_be()?,
            },
            ConstantTag::String => Constant::String {
                value: parser.read_be()?,
            },
            ConstantTag::Fieldref => Constant::Fieldref {
                class: parser.read_be()?,
                name_and_type: parser.read_be()?,
            },
            ConstantTag::Methodref => Constant::Methodref {
                class: parser.read_be()?,
                name_and_type: parser.read_be()?,
            },
            ConstantTag::InterfaceMethodref => Constant::InterfaceMethodref {
                class: parser.read_be()?,
                name_and_type: parser.read_be()?,
            },
            ConstantTag::NameAndType => Constant::NameAndType {
                name: parser.read_be()?,
                descriptor: parser.read_be()?,
            },
            ConstantTag::MethodHandle => Constant::MethodHandle {
                kind: ReferenceKind::try_from(parser.read_be::<u8>()?)?,
                reference: parser.read_be()?,
            },
            ConstantTag::MethodType => Constant::MethodType {
                descriptor: parser.read_be()?,
            },
            ConstantTag::Dynamic => Constant::Dynamic {
                bootstrap: parser.read_be()?,
                name_and_type: parser.read_be()?,
            },
            ConstantTag::InvokeDynamic => Constant::InvokeDynamic {
                bootstrap: parser.read_be()?,
                name_and_type: parser.read_be()?,
            },
        })
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag: &'static str = self.tag().into();
        match self {
            Constant::Utf8(value) => write!(f, "{tag} {value:?}"),
            Constant::Integer(value) => write!(f, "{tag} {value}"),
            Constant::Float(bits) => write!(f, "{tag} {}", f32::from_bits(*bits)),
            Constant::Long(value) => write!(f, "{tag} {value}"),
            Constant::Double(bits) => write!(f, "{tag} {}", f64::from_bits(*bits)),
            Constant::Class { name } => write!(f, "{tag} #{name}"),
            Constant::String { value } => write!(f, "{tag} #{value}"),
            Constant::MethodType { descriptor } => write!(f, "{tag} #{descriptor}"),
            Constant::Fieldref {
                class,
                name_and_type,
            }
            | Constant::Methodref {
                class,
                name_and_type,
            }
            | Constant::InterfaceMethodref {
                class,
                name_and_type,
            } => write!(f, "{tag} #{class}.#{name_and_type}"),
            Constant::NameAndType { name, descriptor } => write!(f, "{tag} #{name}:#{descriptor}"),
            Constant::MethodHandle { kind, reference } => {
                let kind: &'static str = kind.into();
                write!(f, "{tag} {kind} #{reference}")
            }
            Constant::Dynamic {
                bootstrap,
                name_and_type,
            }
            | Constant::InvokeDynamic {
                bootstrap,
                name_and_type,
            } => write!(f, "{tag} #{bootstrap}:#{name_and_type}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn encode(constant: &Constant) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        constant.write(&mut writer).unwrap();
        writer.finish()
    }

    #[test]
    fn dynamic_layout() {
        let bytes = encode(&Constant::Dynamic {
            bootstrap: 3,
            name_and_type: 0x0102,
        });
        assert_eq!(bytes, vec![17, 0x00, 0x03, 0x01, 0x02]);
    }

    #[test]
    fn method_handle_layout() {
        let bytes = encode(&Constant::MethodHandle {
            kind: ReferenceKind::NewInvokeSpecial,
            reference: 9,
        });
        assert_eq!(bytes, vec![15, 8, 0x00, 0x09]);
    }

    #[test]
    fn integer_is_signed_big_endian() {
        assert_eq!(
            encode(&Constant::Integer(-2)),
            vec![3, 0xFF, 0xFF, 0xFF, 0xFE]
        );
    }

    #[test]
    fn wide_entries_take_two_slots() {
        assert_eq!(Constant::Long(1).slots(), 2);
        assert_eq!(Constant::double(1.0).slots(), 2);
        assert_eq!(Constant::Integer(1).slots(), 1);
        assert_eq!(Constant::float(f32::NAN), Constant::float(f32::NAN));
    }

    #[test]
    fn read_back_entries() {
        let entries = [
            Constant::Utf8("java/lang/Enum".to_string()),
            Constant::Long(-7),
            Constant::double(0.5),
            Constant::InterfaceMethodref {
                class: 4,
                name_and_type: 5,
            },
            Constant::MethodHandle {
                kind: ReferenceKind::InvokeStatic,
                reference: 12,
            },
        ];

        let mut writer = ByteWriter::new();
        for entry in &entries {
            entry.write(&mut writer).unwrap();
        }
        let bytes = writer.finish();

        let mut parser = Parser::new(&bytes);
        for entry in &entries {
            assert_eq!(&Constant::read(&mut parser).unwrap(), entry);
        }
        assert!(!parser.has_more_data());
    }

    #[test]
    fn unknown_tag() {
        let mut parser = Parser::new(&[2, 0, 0]);
        assert!(matches!(Constant::read(&mut parser), Err(Error::Malformed { .. })));
    }

    #[test]
    fn display() {
        assert_eq!(Constant::Class { name: 2 }.to_string(), "Class #2");
        assert_eq!(
            Constant::Utf8("LX;".to_string()).to_string(),
            "Utf8 \"LX;\""
        );
        assert_eq!(ConstantTag::COUNT, 15);
    }
}
