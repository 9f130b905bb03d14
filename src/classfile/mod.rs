//! JVM class-file assembly layer.
//!
//! Everything needed to produce, and read back, the class files emitted by the generation
//! strategies:
//!
//! - [`constant`] - Constant pool entry model and its binary form
//! - [`pool`] - De-duplicating [`pool::ConstantPool`] and the bootstrap method table
//! - [`descriptor`] - Field and method descriptor helpers (slot sizes, array/object forms)
//! - [`opcodes`] - Opcode constants and mnemonics
//! - [`frame`] - `StackMapTable` frames and verification types
//! - [`code`] - [`code::CodeEncoder`], the method body assembler with labels and stack tracking
//! - [`builder`] - [`builder::ClassBuilder`] and [`builder::MethodBuilder`]
//! - [`reader`] - [`reader::ClassFile`], a parser for complete class files
//! - [`instruction`] - Linear bytecode decoder used for inspection
//!
//! The layer covers what enum synthesis needs. Interfaces, annotations, generic signatures,
//! exception tables and debug attributes are neither produced nor interpreted.

use bitflags::bitflags;

pub mod builder;
pub mod code;
pub mod constant;
pub mod descriptor;
pub mod frame;
pub mod instruction;
pub mod opcodes;
pub mod pool;
pub mod reader;

/// Class-file magic number.
pub const MAGIC: u32 = 0xCAFE_BABE;

/// Largest value the `u2` constant pool count field can hold.
///
/// The count is one more than the highest usable index, so valid indices are `1..=65534`.
pub const MAX_POOL_COUNT: usize = 0xFFFF;

/// Largest permitted `code_length` of a method body.
pub const MAX_CODE_LENGTH: usize = 0xFFFF;

/// Largest number of entries in any `u2`-counted class-file table.
pub const MAX_TABLE_ENTRIES: usize = 0xFFFF;

/// A class-file format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassVersion {
    /// Major version (51 for Java 7, 55 for Java 11)
    pub major: u16,
    /// Minor version
    pub minor: u16,
}

impl ClassVersion {
    /// Java 7, the first version with mandatory `StackMapTable` verification by default.
    pub const JAVA_7: ClassVersion = ClassVersion {
        major: 51,
        minor: 0,
    };

    /// Java 11, the first version with `CONSTANT_Dynamic`.
    pub const JAVA_11: ClassVersion = ClassVersion {
        major: 55,
        minor: 0,
    };

    /// Combined `minor << 16 | major` form, as used by ASM-style tooling.
    #[must_use]
    pub fn packed(self) -> u32 {
        (u32::from(self.minor) << 16) | u32::from(self.major)
    }
}

impl std::fmt::Display for ClassVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    /// Access flags of a class
    pub struct ClassAccess: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared final
        const FINAL = 0x0010;
        /// Treat superclass methods specially for invokespecial
        const SUPER = 0x0020;
        /// Is an interface
        const INTERFACE = 0x0200;
        /// Declared abstract
        const ABSTRACT = 0x0400;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
        /// Declared as an annotation type
        const ANNOTATION = 0x2000;
        /// Declared as an enum type
        const ENUM = 0x4000;
    }
}

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    /// Access flags of a field
    pub struct FieldAccess: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final
        const FINAL = 0x0010;
        /// Declared volatile
        const VOLATILE = 0x0040;
        /// Declared transient
        const TRANSIENT = 0x0080;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
        /// Element of an enum
        const ENUM = 0x4000;
    }
}

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    /// Access flags of a method
    pub struct MethodAccess: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final
        const FINAL = 0x0010;
        /// Declared synchronized
        const SYNCHRONIZED = 0x0020;
        /// Compiler-generated bridge method
        const BRIDGE = 0x0040;
        /// Declared with a variable number of arguments
        const VARARGS = 0x0080;
        /// Declared native
        const NATIVE = 0x0100;
        /// Declared abstract
        const ABSTRACT = 0x0400;
        /// Declared strictfp
        const STRICT = 0x0800;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    /// Access flags of an `InnerClasses` entry
    pub struct InnerClassAccess: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final
        const FINAL = 0x0010;
        /// Is an interface
        const INTERFACE = 0x0200;
        /// Declared abstract
        const ABSTRACT = 0x0400;
        /// Not present in source code
        const SYNTHETIC = 0x1000;
        /// Declared as an annotation type
        const ANNOTATION = 0x2000;
        /// Declared as an enum type
        const ENUM = 0x4000;
    }
}
