//! Class file assembly from a pool, members and method bodies.
//!
//! [`ClassBuilder`] owns the constant pool and bootstrap method table of the class under
//! construction. Method bodies are written through a [`MethodBuilder`], which resolves symbolic
//! member references to pool indices as instructions are emitted, so the pool only ever holds
//! constants that some part of the class actually uses.
//!
//! Attribute names are interned lazily: `Code` when the first method body is finished,
//! `StackMapTable` only for bodies that carry frames, and `BootstrapMethods` / `InnerClasses`
//! only if those tables end up non-empty. The pool size of the finished class is therefore a
//! pure function of what was emitted.
//!
//! # Examples
//!
//! ```rust
//! use hugeenum::classfile::{
//!     builder::ClassBuilder, opcodes, ClassAccess, ClassVersion, MethodAccess,
//! };
//!
//! let mut class = ClassBuilder::new(
//!     ClassVersion::JAVA_7,
//!     ClassAccess::PUBLIC | ClassAccess::SUPER,
//!     "com/example/Empty",
//!     "java/lang/Object",
//! )?;
//! class.method(MethodAccess::PUBLIC | MethodAccess::STATIC, "run", "()V", |m| {
//!     m.insn(opcodes::RETURN)
//! })?;
//! let bytes = class.build()?;
//! assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
//! # Ok::<(), hugeenum::Error>(())
//! ```

use crate::{
    classfile::{
        code::{CodeBody, CodeEncoder, ValueKind},
        descriptor,
        frame::{write_stack_map_table, StackMapFrame, VerificationType},
        opcodes,
        pool::{BootstrapMethods, ConstantPool},
        reader::ClassFile,
        ClassAccess, ClassVersion, FieldAccess, InnerClassAccess, MethodAccess, MAGIC,
        MAX_TABLE_ENTRIES,
    },
    file::writer::ByteWriter,
    Error, Result,
};

struct FieldEntry {
    access: FieldAccess,
    name: u16,
    descriptor: u16,
}

struct MethodEntry {
    access: MethodAccess,
    name: u16,
    descriptor: u16,
    code_name: u16,
    stack_map_name: Option<u16>,
    body: CodeBody,
}

struct InnerClassEntry {
    inner: u16,
    outer: u16,
    name: u16,
    access: InnerClassAccess,
}

/// Builder for a complete class file.
pub struct ClassBuilder {
    version: ClassVersion,
    access: ClassAccess,
    this_name: String,
    this_class: u16,
    super_class: u16,
    pool: ConstantPool,
    bootstrap_methods: BootstrapMethods,
    fields: Vec<FieldEntry>,
    methods: Vec<MethodEntry>,
    inner_classes: Vec<InnerClassEntry>,
}

impl ClassBuilder {
    /// Starts an empty class named `name` (internal form) extending `super_name`.
    ///
    /// # Errors
    /// Fails only if the pool cannot take the two Class entries, which cannot happen for a
    /// fresh pool with reasonable names.
    pub fn new(
        version: ClassVersion,
        access: ClassAccess,
        name: &str,
        super_name: &str,
    ) -> Result<Self> {
        let mut pool = ConstantPool::new();
        let this_class = pool.class(name)?;
        let super_class = pool.class(super_name)?;

        Ok(ClassBuilder {
            version,
            access,
            this_name: name.to_string(),
            this_class,
            super_class,
            pool,
            bootstrap_methods: BootstrapMethods::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            inner_classes: Vec::new(),
        })
    }

    /// Continues from a parsed class.
    ///
    /// Pool entries and bootstrap methods stay at their original indices, the class and super
    /// class are taken over, and members or other attributes of `class` are dropped.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the parsed tables are inconsistent.
    pub fn from_class(
        class: &ClassFile,
        version: ClassVersion,
        access: ClassAccess,
    ) -> Result<Self> {
        let pool = ConstantPool::from_entries(&class.constants)?;
        let bootstrap_methods = BootstrapMethods::from_methods(class.bootstrap_methods()?)?;
        let this_name = class.class_name()?.to_string();

        Ok(ClassBuilder {
            version,
            access,
            this_name,
            this_class: class.this_class,
            super_class: class.super_class,
            pool,
            bootstrap_methods,
            fields: Vec::new(),
            methods: Vec::new(),
            inner_classes: Vec::new(),
        })
    }

    /// Internal name of the class being built.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.this_name
    }

    /// The constant pool under construction.
    pub fn pool(&mut self) -> &mut ConstantPool {
        &mut self.pool
    }

    /// Adds a bootstrap method record, returning its index.
    ///
    /// # Errors
    /// Returns [`crate::Error::OversizedArtifact`] if the table is full.
    pub fn bootstrap_method(&mut self, handle: u16, arguments: Vec<u16>) -> Result<u16> {
        self.bootstrap_methods.add(handle, arguments)
    }

    /// Declares a field without attributes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OversizedArtifact`] if the pool or field table overflows.
    pub fn field(&mut self, access: FieldAccess, name: &str, descriptor: &str) -> Result<()> {
        if self.fields.len() >= MAX_TABLE_ENTRIES {
            return Err(Error::OversizedArtifact(format!("more than {MAX_TABLE_ENTRIES} fields")));
        }

        let name = self.pool.utf8(name)?;
        let descriptor = self.pool.utf8(descriptor)?;
        self.fields.push(FieldEntry {
            access,
            name,
            descriptor,
        });
        Ok(())
    }

    /// Declares a method and assembles its body with `body`.
    ///
    /// Parameters (and `this` for instance methods) are preassigned to the leading local slots.
    ///
    /// # Errors
    /// Propagates errors from `body` and from finishing the code, notably
    /// [`crate::Error::OversizedRoutine`].
    pub fn method<F>(
        &mut self,
        access: MethodAccess,
        name: &str,
        method_descriptor: &str,
        body: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut MethodBuilder) -> Result<()>,
    {
        if self.methods.len() >= MAX_TABLE_ENTRIES {
            return Err(Error::OversizedArtifact(format!("more than {MAX_TABLE_ENTRIES} methods")));
        }

        let (arguments, _) = descriptor::method_slots(method_descriptor)?;
        let receiver = u16::from(!access.contains(MethodAccess::STATIC));

        let mut builder = MethodBuilder {
            pool: &mut self.pool,
            bootstrap_methods: &mut self.bootstrap_methods,
            this_name: &self.this_name,
            code: CodeEncoder::new(name, arguments + receiver),
        };
        body(&mut builder)?;
        let body = builder.code.finalize()?;

        let name = self.pool.utf8(name)?;
        let descriptor = self.pool.utf8(method_descriptor)?;
        let code_name = self.pool.utf8("Code")?;
        let stack_map_name = if body.frames.is_empty() {
            None
        } else {
            Some(self.pool.utf8("StackMapTable")?)
        };

        self.methods.push(MethodEntry {
            access,
            name,
            descriptor,
            code_name,
            stack_map_name,
            body,
        });
        Ok(())
    }

    /// Records an `InnerClasses` entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::OversizedArtifact`] if the pool overflows.
    pub fn inner_class(
        &mut self,
        inner: &str,
        outer: &str,
        simple_name: &str,
        access: InnerClassAccess,
    ) -> Result<()> {
        let inner = self.pool.class(inner)?;
        let outer = self.pool.class(outer)?;
        let name = self.pool.utf8(simple_name)?;
        self.inner_classes.push(InnerClassEntry {
            inner,
            outer,
            name,
            access,
        });
        Ok(())
    }

    /// Serializes the class.
    ///
    /// # Errors
    /// Returns [`crate::Error::OversizedArtifact`] if the attribute names no longer fit the
    /// pool, or [`crate::Error::EncodingFailure`] if a table exceeds its length field.
    pub fn build(mut self) -> Result<Vec<u8>> {
        let bootstrap_name = if self.bootstrap_methods.is_empty() {
            None
        } else {
            Some(self.pool.utf8("BootstrapMethods")?)
        };
        let inner_classes_name = if self.inner_classes.is_empty() {
            None
        } else {
            Some(self.pool.utf8("InnerClasses")?)
        };

        let mut writer = ByteWriter::with_capacity(self.pool.count() * 8);
        writer.u4(MAGIC);
        writer.u2(self.version.minor);
        writer.u2(self.version.major);
        self.pool.write(&mut writer)?;

        writer.u2(self.access.bits());
        writer.u2(self.this_class);
        writer.u2(self.super_class);
        writer.u2(0);

        writer.u2_len(self.fields.len())?;
        for field in &self.fields {
            writer.u2(field.access.bits());
            writer.u2(field.name);
            writer.u2(field.descriptor);
            writer.u2(0);
        }

        writer.u2_len(self.methods.len())?;
        for method in &self.methods {
            writer.u2(method.access.bits());
            writer.u2(method.name);
            writer.u2(method.descriptor);
            writer.u2(1);
            write_code(method, &mut writer)?;
        }

        let attributes =
            usize::from(bootstrap_name.is_some()) + usize::from(inner_classes_name.is_some());
        writer.u2_len(attributes)?;

        if let Some(name) = bootstrap_name {
            let mut body = ByteWriter::new();
            self.bootstrap_methods.write_body(&mut body)?;
            write_attribute(name, body, &mut writer)?;
        }

        if let Some(name) = inner_classes_name {
            let mut body = ByteWriter::new();
            body.u2_len(self.inner_classes.len())?;
            for entry in &self.inner_classes {
                body.u2(entry.inner);
                body.u2(entry.outer);
                body.u2(entry.name);
                body.u2(entry.access.bits());
            }
            write_attribute(name, body, &mut writer)?;
        }

        Ok(writer.finish())
    }
}

fn write_code(method: &MethodEntry, writer: &mut ByteWriter) -> Result<()> {
    let mut body = ByteWriter::with_capacity(method.body.code.len() + 32);
    body.u2(method.body.max_stack);
    body.u2(method.body.max_locals);
    body.u4_len(method.body.code.len())?;
    body.bytes(&method.body.code);
    body.u2(0);

    match method.stack_map_name {
        Some(name) => {
            body.u2(1);
            let mut table = ByteWriter::new();
            write_stack_map_table(&method.body.frames, &mut table)?;
            write_attribute(name, table, &mut body)?;
        }
        None => body.u2(0),
    }

    write_attribute(method.code_name, body, writer)
}

fn write_attribute(name: u16, body: ByteWriter, writer: &mut ByteWriter) -> Result<()> {
    writer.u2(name);
    writer.u4_len(body.len())?;
    writer.bytes(&body.finish());
    Ok(())
}

/// Emits the body of one method, resolving member references against the class pool.
pub struct MethodBuilder<'a> {
    pool: &'a mut ConstantPool,
    bootstrap_methods: &'a mut BootstrapMethods,
    this_name: &'a str,
    code: CodeEncoder,
}

impl MethodBuilder<'_> {
    /// Internal name of the enclosing class.
    #[must_use]
    pub fn this_name(&self) -> &str {
        self.this_name
    }

    /// The constant pool of the enclosing class.
    pub fn pool(&mut self) -> &mut ConstantPool {
        &mut *self.pool
    }

    /// Adds a bootstrap method record to the enclosing class.
    ///
    /// # Errors
    /// Returns [`crate::Error::OversizedArtifact`] if the table is full.
    pub fn bootstrap_method(&mut self, handle: u16, arguments: Vec<u16>) -> Result<u16> {
        self.bootstrap_methods.add(handle, arguments)
    }

    /// Bytes of code emitted so far.
    #[must_use]
    pub fn code_len(&self) -> usize {
        self.code.len()
    }

    /// Emits an instruction without operands.
    ///
    /// # Errors
    /// See [`CodeEncoder::emit_insn`].
    pub fn insn(&mut self, opcode: u8) -> Result<()> {
        self.code.emit_insn(opcode)
    }

    /// Pushes an `int` immediate.
    ///
    /// # Errors
    /// See [`CodeEncoder::emit_push_int`].
    pub fn push_int(&mut self, value: i32) -> Result<()> {
        self.code.emit_push_int(value)
    }

    /// `getstatic owner.name:descriptor`
    ///
    /// # Errors
    /// Fails on pool overflow or operand stack errors.
    pub fn getstatic(&mut self, owner: &str, name: &str, field_descriptor: &str) -> Result<()> {
        self.field_insn(opcodes::GETSTATIC, owner, name, field_descriptor)
    }

    /// `putstatic owner.name:descriptor`
    ///
    /// # Errors
    /// Fails on pool overflow or operand stack errors.
    pub fn putstatic(&mut self, owner: &str, name: &str, field_descriptor: &str) -> Result<()> {
        self.field_insn(opcodes::PUTSTATIC, owner, name, field_descriptor)
    }

    /// Emits a field access instruction.
    ///
    /// # Errors
    /// Fails on pool overflow or operand stack errors.
    pub fn field_insn(
        &mut self,
        opcode: u8,
        owner: &str,
        name: &str,
        field_descriptor: &str,
    ) -> Result<()> {
        let index = self.pool.field_ref(owner, name, field_descriptor)?;
        self.code.emit_field(opcode, index, field_descriptor)
    }

    /// Emits `invokevirtual`, `invokespecial`, `invokestatic` or `invokeinterface`.
    ///
    /// # Errors
    /// Fails on pool overflow or operand stack errors.
    pub fn invoke(
        &mut self,
        opcode: u8,
        owner: &str,
        name: &str,
        method_descriptor: &str,
    ) -> Result<()> {
        let index = if opcode == opcodes::INVOKEINTERFACE {
            self.pool
                .interface_method_ref(owner, name, method_descriptor)?
        } else {
            self.pool.method_ref(owner, name, method_descriptor)?
        };
        self.code.emit_invoke(opcode, index, method_descriptor)
    }

    /// Loads a String literal.
    ///
    /// # Errors
    /// Fails on pool overflow or if `value` exceeds the Utf8 size limit when written.
    pub fn ldc_string(&mut self, value: &str) -> Result<()> {
        let index = self.pool.string(value)?;
        self.code.emit_ldc(index, false)
    }

    /// Loads a Class literal.
    ///
    /// # Errors
    /// Fails on pool overflow.
    pub fn ldc_class(&mut self, internal_name: &str) -> Result<()> {
        let index = self.pool.class(internal_name)?;
        self.code.emit_ldc(index, false)
    }

    /// Loads an Integer constant from the pool.
    ///
    /// # Errors
    /// Fails on pool overflow.
    pub fn ldc_int(&mut self, value: i32) -> Result<()> {
        let index = self.pool.integer(value)?;
        self.code.emit_ldc(index, false)
    }

    /// Loads the single-slot constant already present at `index`.
    ///
    /// # Errors
    /// Fails on operand stack errors.
    pub fn ldc_index(&mut self, index: u16) -> Result<()> {
        self.code.emit_ldc(index, false)
    }

    /// `new class`
    ///
    /// # Errors
    /// Fails on pool overflow.
    pub fn new_object(&mut self, class: &str) -> Result<()> {
        let index = self.pool.class(class)?;
        self.code.emit_type(opcodes::NEW, index)
    }

    /// `anewarray component`
    ///
    /// # Errors
    /// Fails on pool overflow or operand stack errors.
    pub fn anewarray(&mut self, component: &str) -> Result<()> {
        let index = self.pool.class(component)?;
        self.code.emit_type(opcodes::ANEWARRAY, index)
    }

    /// `checkcast class`
    ///
    /// # Errors
    /// Fails on pool overflow or operand stack errors.
    pub fn checkcast(&mut self, class: &str) -> Result<()> {
        let index = self.pool.class(class)?;
        self.code.emit_type(opcodes::CHECKCAST, index)
    }

    /// Loads a local variable.
    ///
    /// # Errors
    /// See [`CodeEncoder::emit_load`].
    pub fn load(&mut self, kind: ValueKind, index: u16) -> Result<()> {
        self.code.emit_load(kind, index)
    }

    /// Stores into a local variable.
    ///
    /// # Errors
    /// See [`CodeEncoder::emit_store`].
    pub fn store(&mut self, kind: ValueKind, index: u16) -> Result<()> {
        self.code.emit_store(kind, index)
    }

    /// Increments an `int` local.
    ///
    /// # Errors
    /// See [`CodeEncoder::emit_iinc`].
    pub fn iinc(&mut self, index: u16, delta: i16) -> Result<()> {
        self.code.emit_iinc(index, delta)
    }

    /// Branches to `label`.
    ///
    /// # Errors
    /// See [`CodeEncoder::emit_branch`].
    pub fn branch(&mut self, opcode: u8, label: &str) -> Result<()> {
        self.code.emit_branch(opcode, label)
    }

    /// Defines `label` here.
    ///
    /// # Errors
    /// See [`CodeEncoder::define_label`].
    pub fn label(&mut self, name: &str) -> Result<()> {
        self.code.define_label(name)
    }

    /// Records a stack map frame here.
    ///
    /// # Errors
    /// See [`CodeEncoder::emit_frame`].
    pub fn frame(&mut self, frame: StackMapFrame) -> Result<()> {
        self.code.emit_frame(frame)
    }

    /// Verification type for a reference to `internal_name`.
    ///
    /// # Errors
    /// Fails on pool overflow.
    pub fn object_type(&mut self, internal_name: &str) -> Result<VerificationType> {
        Ok(VerificationType::Object(self.pool.class(internal_name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::constant::Constant;

    fn empty_class() -> ClassBuilder {
        ClassBuilder::new(
            ClassVersion::JAVA_7,
            ClassAccess::PUBLIC | ClassAccess::SUPER,
            "X",
            "java/lang/Object",
        )
        .unwrap()
    }

    #[test]
    fn minimal_class_layout() {
        let bytes = empty_class().build().unwrap();
        assert_eq!(
            bytes,
            vec![
                0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 51, // header
                0, 5, // pool count
                1, 0, 1, b'X', // #1 Utf8 "X"
                7, 0, 1, // #2 Class #1
                1, 0, 16, b'j', b'a', b'v', b'a', b'/', b'l', b'a', b'n', b'g', b'/', b'O', b'b',
                b'j', b'e', b'c', b't', // #3 Utf8
                7, 0, 3, // #4 Class #3
                0, 0x21, 0, 2, 0, 4, // access, this, super
                0, 0, 0, 0, 0, 0, 0, 0, // interfaces, fields, methods, attributes
            ]
        );
    }

    #[test]
    fn method_body_is_parsed_back() {
        let mut class = empty_class();
        class
            .field(FieldAccess::PRIVATE | FieldAccess::STATIC, "counter", "I")
            .unwrap();
        let access = MethodAccess::PRIVATE | MethodAccess::STATIC;
        class
            .method(access, "bump", "(I)I", |m| {
                m.getstatic("X", "counter", "I")?;
                m.load(ValueKind::Int, 0)?;
                m.insn(opcodes::IADD)?;
                m.insn(opcodes::DUP)?;
                m.putstatic("X", "counter", "I")?;
                m.insn(opcodes::IRETURN)
            })
            .unwrap();
        let bytes = class.build().unwrap();

        let parsed = ClassFile::parse(&bytes).unwrap();
        assert_eq!(parsed.fields.len(), 1);
        let method = parsed.find_method("bump", "(I)I").unwrap();
        let code = parsed.code(method).unwrap();
        assert_eq!(code.max_stack, 2);
        assert_eq!(code.max_locals, 1);
        assert_eq!(code.code.len(), 10);
        assert!(parsed.attributes.is_empty());
    }

    #[test]
    fn lazy_attribute_names() {
        let mut class = empty_class();
        class
            .method(
                MethodAccess::STATIC,
                "<clinit>",
                "()V",
                |m| m.insn(opcodes::RETURN),
            )
            .unwrap();

        let bytes = class.build().unwrap();
        let parsed = ClassFile::parse(&bytes).unwrap();
        let names: Vec<&str> = parsed
            .constants
            .iter()
            .flatten()
            .filter_map(|c| match c {
                Constant::Utf8(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        assert!(names.contains(&"Code"));
        assert!(!names.contains(&"StackMapTable"));
        assert!(!names.contains(&"BootstrapMethods"));
        assert!(!names.contains(&"InnerClasses"));
    }

    #[test]
    fn frames_and_inner_classes() {
        let mut class = empty_class();
        class
            .inner_class(
                "java/lang/invoke/MethodHandles$Lookup",
                "java/lang/invoke/MethodHandles",
                "Lookup",
                InnerClassAccess::PUBLIC | InnerClassAccess::STATIC | InnerClassAccess::FINAL,
            )
            .unwrap();
        class
            .method(MethodAccess::STATIC, "spin", "(I)V", |m| {
                m.label("top")?;
                m.frame(StackMapFrame::Same)?;
                m.load(ValueKind::Int, 0)?;
                m.branch(opcodes::IFEQ, "top")?;
                m.insn(opcodes::RETURN)
            })
            .unwrap();
        let bytes = class.build().unwrap();

        let parsed = ClassFile::parse(&bytes).unwrap();
        let inner = parsed.inner_classes().unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].access, 0x0019);

        let method = parsed.find_method("spin", "(I)V").unwrap();
        let code = parsed.code(method).unwrap();
        assert_eq!(code.attributes.len(), 1);
        assert_eq!(
            parsed.utf8(code.attributes[0].name_index).unwrap(),
            "StackMapTable"
        );
    }

    #[test]
    fn oversized_method_is_reported() {
        let mut class = empty_class();
        let result = class.method(MethodAccess::STATIC, "<clinit>", "()V", |m| {
            for _ in 0..70_000 {
                m.insn(opcodes::NOP)?;
            }
            m.insn(opcodes::RETURN)
        });
        assert!(matches!(result, Err(Error::OversizedRoutine { .. })));
    }

    #[test]
    fn seeded_pool_keeps_indices() {
        let mut original = empty_class();
        original.pool().integer(42).unwrap();
        let bytes = original.build().unwrap();
        let parsed = ClassFile::parse(&bytes).unwrap();

        let mut class = ClassBuilder::from_class(
            &parsed,
            ClassVersion::JAVA_11,
            ClassAccess::PUBLIC | ClassAccess::SUPER,
        )
        .unwrap();
        assert_eq!(class.name(), "X");
        assert_eq!(class.pool().integer(42).unwrap(), 5);
        assert_eq!(class.pool().class("X").unwrap(), 2);

        let bytes = class.build().unwrap();
        let reparsed = ClassFile::parse(&bytes).unwrap();
        assert_eq!(reparsed.major_version, 55);
        assert_eq!(reparsed.pool_count(), 6);
    }
}
