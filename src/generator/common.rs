//! Members every generated enum shares, whatever the initialization strategy.

use crate::{
    classfile::{
        builder::ClassBuilder, code::ValueKind, descriptor, opcodes, ClassAccess, ClassVersion,
        FieldAccess, MethodAccess,
    },
    generator::names::VALUES_FIELD,
    Result,
};

/// Internal name of the enum super class.
pub(crate) const ENUM_CLASS: &str = "java/lang/Enum";

/// Descriptor of `Enum.<init>(String, int)` and of the plain element constructor.
pub(crate) const NAME_ORDINAL_CONSTRUCTOR: &str = "(Ljava/lang/String;I)V";

pub(crate) const CLINIT: &str = "<clinit>";
pub(crate) const INIT: &str = "<init>";

/// Access flags of a generated enum class.
pub(crate) fn class_access() -> ClassAccess {
    ClassAccess::PUBLIC | ClassAccess::FINAL | ClassAccess::SUPER | ClassAccess::ENUM
}

/// Names and descriptors derived from the internal name of the enum.
pub(crate) struct EnumType {
    /// Internal name, `com/example/Color`
    pub name: String,
    /// `Lcom/example/Color;`
    pub descriptor: String,
    /// `[Lcom/example/Color;`, doubles as the internal name of the array class
    pub array: String,
}

impl EnumType {
    pub(crate) fn new(internal_name: &str) -> Self {
        let descriptor = descriptor::object(internal_name);
        let array = descriptor::array_of(&descriptor);
        EnumType {
            name: internal_name.to_string(),
            descriptor,
            array,
        }
    }

    /// `()[LX;`
    pub(crate) fn values_descriptor(&self) -> String {
        descriptor::method(&[], &self.array)
    }

    /// `(Ljava/lang/String;)LX;`
    pub(crate) fn value_of_descriptor(&self) -> String {
        descriptor::method(&[descriptor::STRING], &self.descriptor)
    }

    /// Starts a fresh enum class extending `java.lang.Enum`.
    pub(crate) fn start_class(&self, version: ClassVersion) -> Result<ClassBuilder> {
        ClassBuilder::new(version, class_access(), &self.name, ENUM_CLASS)
    }

    /// Declares the synthetic `$VALUES` array field.
    pub(crate) fn declare_values_field(&self, class: &mut ClassBuilder) -> Result<()> {
        class.field(
            FieldAccess::PRIVATE
                | FieldAccess::STATIC
                | FieldAccess::FINAL
                | FieldAccess::SYNTHETIC,
            VALUES_FIELD,
            &self.array,
        )
    }

    /// Declares one `public static final` enum field per element, in input order.
    pub(crate) fn declare_element_fields(
        &self,
        class: &mut ClassBuilder,
        names: &[String],
    ) -> Result<()> {
        let access =
            FieldAccess::PUBLIC | FieldAccess::STATIC | FieldAccess::FINAL | FieldAccess::ENUM;
        for name in names {
            class.field(access, name, &self.descriptor)?;
        }
        Ok(())
    }

    /// `public static X[] values()` returning a clone of `$VALUES`.
    pub(crate) fn emit_values(&self, class: &mut ClassBuilder) -> Result<()> {
        class.method(
            MethodAccess::PUBLIC | MethodAccess::STATIC,
            "values",
            &self.values_descriptor(),
            |m| {
                m.getstatic(&self.name, VALUES_FIELD, &self.array)?;
                m.invoke(
                    opcodes::INVOKEVIRTUAL,
                    &self.array,
                    "clone",
                    "()Ljava/lang/Object;",
                )?;
                m.checkcast(&self.array)?;
                m.insn(opcodes::ARETURN)
            },
        )
    }

    /// `public static X valueOf(String)` delegating to `Enum.valueOf(Class, String)`.
    pub(crate) fn emit_value_of(&self, class: &mut ClassBuilder) -> Result<()> {
        class.method(
            MethodAccess::PUBLIC | MethodAccess::STATIC,
            "valueOf",
            &self.value_of_descriptor(),
            |m| {
                m.ldc_class(&self.name)?;
                m.load(ValueKind::Reference, 0)?;
                m.invoke(
                    opcodes::INVOKESTATIC,
                    ENUM_CLASS,
                    "valueOf",
                    "(Ljava/lang/Class;Ljava/lang/String;)Ljava/lang/Enum;",
                )?;
                m.checkcast(&self.name)?;
                m.insn(opcodes::ARETURN)
            },
        )
    }

    /// `private X(String name, int ordinal)` passing both to `Enum.<init>`.
    pub(crate) fn emit_name_ordinal_constructor(&self, class: &mut ClassBuilder) -> Result<()> {
        class.method(MethodAccess::PRIVATE, INIT, NAME_ORDINAL_CONSTRUCTOR, |m| {
            m.load(ValueKind::Reference, 0)?;
            m.load(ValueKind::Reference, 1)?;
            m.load(ValueKind::Int, 2)?;
            m.invoke(
                opcodes::INVOKESPECIAL,
                ENUM_CLASS,
                INIT,
                NAME_ORDINAL_CONSTRUCTOR,
            )?;
            m.insn(opcodes::RETURN)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::{instruction::decode_instructions, reader::ClassFile};

    #[test]
    fn derived_descriptors() {
        let ty = EnumType::new("com/example/Color");
        assert_eq!(ty.descriptor, "Lcom/example/Color;");
        assert_eq!(ty.array, "[Lcom/example/Color;");
        assert_eq!(ty.values_descriptor(), "()[Lcom/example/Color;");
        assert_eq!(
            ty.value_of_descriptor(),
            "(Ljava/lang/String;)Lcom/example/Color;"
        );
    }

    #[test]
    fn shared_members() {
        let ty = EnumType::new("X");
        let mut class = ty.start_class(ClassVersion::JAVA_7).unwrap();
        ty.declare_values_field(&mut class).unwrap();
        ty.declare_element_fields(&mut class, &["A".to_string(), "B".to_string()])
            .unwrap();
        ty.emit_values(&mut class).unwrap();
        ty.emit_value_of(&mut class).unwrap();
        ty.emit_name_ordinal_constructor(&mut class).unwrap();
        let bytes = class.build().unwrap();

        let parsed = ClassFile::parse(&bytes).unwrap();
        assert_eq!(parsed.access_flags, 0x4031);
        assert_eq!(parsed.super_name().unwrap(), "java/lang/Enum");
        assert_eq!(parsed.fields.len(), 3);
        assert_eq!(parsed.fields[0].access_flags, 0x101A);
        assert_eq!(parsed.fields[1].access_flags, 0x4019);

        let values = parsed.find_method("values", "()[LX;").unwrap();
        let code = parsed.code(values).unwrap();
        let mnemonics: Vec<&str> = decode_instructions(&code.code)
            .unwrap()
            .iter()
            .map(|i| i.mnemonic)
            .collect();
        assert_eq!(
            mnemonics,
            vec!["getstatic", "invokevirtual", "checkcast", "areturn"]
        );
        assert_eq!((code.max_stack, code.max_locals), (1, 0));

        let value_of = parsed
            .find_method("valueOf", "(Ljava/lang/String;)LX;")
            .unwrap();
        let code = parsed.code(value_of).unwrap();
        assert_eq!((code.max_stack, code.max_locals), (2, 1));

        let init = parsed
            .find_method("<init>", "(Ljava/lang/String;I)V")
            .unwrap();
        assert_eq!(init.access_flags, 0x0002);
        let code = parsed.code(init).unwrap();
        assert_eq!(
            code.code,
            vec![0x2A, 0x2B, 0x1C, 0xB7, code.code[4], code.code[5], 0xB1]
        );
        assert_eq!((code.max_stack, code.max_locals), (3, 3));
    }
}
