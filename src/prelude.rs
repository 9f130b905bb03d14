//! # hugeenum Prelude
//!
//! Re-exports of the types most callers need. Import with `use hugeenum::prelude::*;`.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all hugeenum operations
pub use crate::Error;

/// The result type used throughout hugeenum
pub use crate::Result;

// ================================================================================================
// Generation
// ================================================================================================

/// Strategy selection and registry
pub use crate::generator::{Strategy, StrategyInfo, REGISTRY};

/// Name helpers
pub use crate::generator::names::{
    autogenerate_names, binary_type_name, invalid_names, is_valid_identifier, simple_name,
    validate_element_names, VALUES_FIELD,
};

// ================================================================================================
// Class File Model
// ================================================================================================

/// Class file version and access flags
pub use crate::classfile::{
    ClassAccess, ClassVersion, FieldAccess, InnerClassAccess, MethodAccess,
};

/// Assembly
pub use crate::classfile::builder::{ClassBuilder, MethodBuilder};

/// Reading class files back
pub use crate::classfile::reader::{ClassFile, CodeAttribute, MemberInfo};

/// Disassembly
pub use crate::classfile::instruction::{decode_instructions, Instruction, Operand};

/// Constant pool entries
pub use crate::classfile::constant::{Constant, ConstantTag, ReferenceKind};

// ================================================================================================
// Low-level I/O
// ================================================================================================

/// Byte-level reading and writing
pub use crate::file::{parser::Parser, writer::ByteWriter};
