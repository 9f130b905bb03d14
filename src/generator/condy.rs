//! Enum initialization through constant-dynamic entries (JEP 309).
//!
//! Each element is a `CONSTANT_Dynamic` whose bootstrap method is the element constructor
//! itself (`REF_newInvokeSpecial X.<init>(Lookup, String, Class, int)`), parameterized by the
//! ordinal. The static initializer only has to `ldc` each constant and store it, and `$VALUES`
//! is one more dynamic constant whose bootstrap method receives every element constant.
//!
//! The per-element entries come from the hand-encoded class of [`super::bootstrap`], which
//! is parsed and used to seed the pool of the real class. The two `ldc` forms bound the
//! element count: the first 255 constants are reachable with the 2 byte `ldc`, the rest need
//! `ldc_w`, so `<clinit>` takes `5 * 255 + 6 * (N - 255) + 7` bytes and 10963 elements is the
//! largest count that fits.

use log::debug;

use crate::{
    classfile::{
        builder::ClassBuilder, code::ValueKind, constant::ReferenceKind, descriptor, opcodes,
        reader::ClassFile, ClassVersion, InnerClassAccess, MethodAccess,
    },
    generator::{
        bootstrap::{encode_bootstrap_class, BootstrapLayout, BOOTSTRAP_CONSTRUCTOR},
        common::{class_access, EnumType, CLINIT, ENUM_CLASS, INIT, NAME_ORDINAL_CONSTRUCTOR},
        names::VALUES_FIELD,
    },
    Result,
};

/// Class file version, the first with `CONSTANT_Dynamic`.
pub const VERSION: ClassVersion = ClassVersion::JAVA_11;

/// Largest supported element count.
pub const MAX_ELEMENTS: usize = 10_963;

const CREATE_VALUES: &str = "createValues";
const LOOKUP: &str = "java/lang/invoke/MethodHandles$Lookup";
const METHOD_HANDLES: &str = "java/lang/invoke/MethodHandles";

/// Generates the enum `type_name` (internal form) with the given elements.
///
/// Names are used as given.
///
/// # Errors
/// Returns [`crate::Error::OversizedSymbolTable`] if the bootstrap class cannot be laid out
/// and [`crate::Error::OversizedRoutine`] if the static initializer grows too large.
pub fn generate(type_name: &str, element_names: &[String]) -> Result<Vec<u8>> {
    let layout = BootstrapLayout::new(element_names.len())?;
    let bootstrap = encode_bootstrap_class(VERSION, class_access(), type_name, element_names)?;
    let seed = ClassFile::parse(&bootstrap)?;

    let ty = EnumType::new(type_name);
    let mut class = ClassBuilder::from_class(&seed, VERSION, class_access())?;
    debug!(
        "Seeded {} from bootstrap class with {} constants",
        type_name,
        seed.pool_count()
    );

    ty.declare_values_field(&mut class)?;
    ty.declare_element_fields(&mut class, element_names)?;
    ty.emit_values(&mut class)?;
    ty.emit_value_of(&mut class)?;
    emit_constructor(&mut class)?;
    emit_static_initializer(&mut class, &ty, &layout, element_names)?;
    emit_create_values(&mut class, &ty)?;
    class.inner_class(
        LOOKUP,
        METHOD_HANDLES,
        "Lookup",
        InnerClassAccess::PUBLIC | InnerClassAccess::FINAL | InnerClassAccess::STATIC,
    )?;

    class.build()
}

/// `private X(Lookup, String name, Class, int ordinal)`, target of the bootstrap handle.
fn emit_constructor(class: &mut ClassBuilder) -> Result<()> {
    class.method(MethodAccess::PRIVATE, INIT, BOOTSTRAP_CONSTRUCTOR, |m| {
        m.load(ValueKind::Reference, 0)?;
        m.load(ValueKind::Reference, 2)?;
        m.load(ValueKind::Int, 4)?;
        m.invoke(
            opcodes::INVOKESPECIAL,
            ENUM_CLASS,
            INIT,
            NAME_ORDINAL_CONSTRUCTOR,
        )?;
        m.insn(opcodes::RETURN)
    })
}

fn create_values_descriptor(ty: &EnumType) -> String {
    let lookup = descriptor::object(LOOKUP);
    descriptor::method(
        &[
            lookup.as_str(),
            descriptor::STRING,
            descriptor::CLASS,
            ty.array.as_str(),
        ],
        &ty.array,
    )
}

fn emit_static_initializer(
    class: &mut ClassBuilder,
    ty: &EnumType,
    layout: &BootstrapLayout,
    element_names: &[String],
) -> Result<()> {
    class.method(MethodAccess::STATIC, CLINIT, "()V", |m| {
        for (i, name) in element_names.iter().enumerate() {
            m.ldc_index(layout.dynamic(i as u16))?;
            m.putstatic(&ty.name, name, &ty.descriptor)?;
        }

        let handle = m.pool().method_handle(
            ReferenceKind::InvokeStatic,
            &ty.name,
            CREATE_VALUES,
            &create_values_descriptor(ty),
            false,
        )?;
        let arguments = (0..layout.elements()).map(|i| layout.dynamic(i)).collect();
        let bootstrap = m.bootstrap_method(handle, arguments)?;
        let values = m.pool().dynamic(bootstrap, CREATE_VALUES, &ty.array)?;

        m.ldc_index(values)?;
        m.putstatic(&ty.name, VALUES_FIELD, &ty.array)?;
        m.insn(opcodes::RETURN)?;

        debug!("<clinit> of {} takes {} bytes", ty.name, m.code_len());
        Ok(())
    })
}

/// `private static varargs X[] createValues(Lookup, String, Class, X...)` returning its last
/// argument.
fn emit_create_values(class: &mut ClassBuilder, ty: &EnumType) -> Result<()> {
    class.method(
        MethodAccess::PRIVATE
            | MethodAccess::STATIC
            | MethodAccess::VARARGS
            | MethodAccess::SYNTHETIC,
        CREATE_VALUES,
        &create_values_descriptor(ty),
        |m| {
            m.load(ValueKind::Reference, 3)?;
            m.insn(opcodes::ARETURN)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classfile::{
            constant::Constant,
            instruction::{decode_instructions, Operand},
        },
        Error,
    };

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn static_initializer_loads_element_constants() {
        let bytes = generate("X", &names(&["A", "B"])).unwrap();
        let class = ClassFile::parse(&bytes).unwrap();
        let layout = BootstrapLayout::new(2).unwrap();

        let clinit = class.find_method("<clinit>", "()V").unwrap();
        let code = class.code(clinit).unwrap();
        let instructions = decode_instructions(&code.code).unwrap();
        assert_eq!(instructions.len(), 7);
        assert_eq!(instructions[0].operand, Operand::Pool(layout.dynamic(0)));
        assert_eq!(instructions[2].operand, Operand::Pool(layout.dynamic(1)));

        let Operand::Pool(values) = instructions[4].operand else {
            panic!("ldc expected");
        };
        let Some(Constant::Dynamic { bootstrap, .. }) = class.constant(values) else {
            panic!("dynamic constant expected");
        };
        let methods = class.bootstrap_methods().unwrap();
        assert_eq!(methods.len(), 3);
        assert_eq!(
            methods[usize::from(*bootstrap)].arguments,
            vec![layout.dynamic(0), layout.dynamic(1)]
        );
    }

    #[test]
    fn constructor_shape() {
        let bytes = generate("X", &names(&["A"])).unwrap();
        let class = ClassFile::parse(&bytes).unwrap();
        let init = class.find_method("<init>", BOOTSTRAP_CONSTRUCTOR).unwrap();
        let code = class.code(init).unwrap();
        assert_eq!((code.max_stack, code.max_locals), (3, 5));
        assert_eq!(&code.code[..4], &[0x2A, 0x2C, 0x15, 4]);

        let descriptor = concat!(
            "(Ljava/lang/invoke/MethodHandles$Lookup;",
            "Ljava/lang/String;Ljava/lang/Class;[LX;)[LX;"
        );
        let create = class.find_method("createValues", descriptor).unwrap();
        assert_eq!(create.access_flags, 0x108A);
        assert_eq!(class.code(create).unwrap().code, vec![0x2D, 0xB0]);
    }

    #[test]
    fn ldc_switches_to_wide_form() {
        let list: Vec<String> = (0..300).map(|i| format!("E{i}")).collect();
        let bytes = generate("X", &list).unwrap();
        let class = ClassFile::parse(&bytes).unwrap();
        let clinit = class.find_method("<clinit>", "()V").unwrap();
        let code = class.code(clinit).unwrap();
        let instructions = decode_instructions(&code.code).unwrap();

        assert_eq!(instructions[2 * 254].mnemonic, "ldc");
        assert_eq!(instructions[2 * 255].mnemonic, "ldc_w");
        assert_eq!(code.code.len(), 5 * 255 + 6 * 45 + 7);
    }

    #[test]
    fn oversized_routine_above_bound() {
        let list = crate::generator::names::autogenerate_names(MAX_ELEMENTS + 1);
        assert!(matches!(
            generate("X", &list),
            Err(Error::OversizedRoutine { size: 65536, .. })
        ));
    }
}
