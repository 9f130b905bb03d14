//! Enum initialization split over a chain of construction methods.
//!
//! Constructing an element inline costs 16 or 17 bytes of `<clinit>`, so elements are built
//! by a chain of synthetic `createValues*` methods of at most [`BATCH_SIZE`] elements each.
//! Every link fills its share of the array and tail-calls the next one. `<clinit>` then only
//! publishes the elements, fetching them one by one through `nextValue()`, which is 6 bytes
//! per element and bounds the count at 10920.

use log::debug;

use crate::{
    classfile::{
        builder::ClassBuilder, code::ValueKind, descriptor, opcodes, ClassVersion, FieldAccess,
        MethodAccess,
    },
    generator::{
        common::{EnumType, CLINIT, INIT, NAME_ORDINAL_CONSTRUCTOR},
        names::VALUES_FIELD,
    },
    Error, Result,
};

/// Class file version.
pub const VERSION: ClassVersion = ClassVersion::JAVA_7;

/// Largest supported element count.
pub const MAX_ELEMENTS: usize = 10_920;

/// Elements constructed per chain link.
pub const BATCH_SIZE: usize = 3_854;

/// Name of the synthetic publication counter.
pub const VALUE_INDEX_FIELD: &str = "valueIndex";

const CREATE_VALUES: &str = "createValues";
const NEXT_VALUE: &str = "nextValue";

/// Generates the enum `type_name` (internal form) with the given elements.
///
/// Names are used as given.
///
/// # Errors
/// Returns [`crate::Error::OversizedRoutine`] if `<clinit>` exceeds the code size limit, or
/// [`crate::Error::OversizedArtifact`] if the class outgrows its tables.
pub fn generate(type_name: &str, element_names: &[String]) -> Result<Vec<u8>> {
    let ty = EnumType::new(type_name);
    let mut class = ty.start_class(VERSION)?;

    ty.declare_values_field(&mut class)?;
    class.field(
        FieldAccess::PRIVATE | FieldAccess::STATIC | FieldAccess::SYNTHETIC,
        VALUE_INDEX_FIELD,
        "I",
    )?;
    ty.declare_element_fields(&mut class, element_names)?;
    ty.emit_values(&mut class)?;
    ty.emit_value_of(&mut class)?;
    ty.emit_name_ordinal_constructor(&mut class)?;
    emit_static_initializer(&mut class, &ty, element_names)?;
    emit_chain(&mut class, &ty, element_names)?;
    emit_next_value(&mut class, &ty)?;

    class.build()
}

/// Name of chain link `index`: `createValues`, `createValues0`, `createValues1`, ...
#[must_use]
pub fn link_name(index: usize) -> String {
    match index {
        0 => CREATE_VALUES.to_string(),
        _ => format!("{CREATE_VALUES}{}", index - 1),
    }
}

fn emit_static_initializer(
    class: &mut ClassBuilder,
    ty: &EnumType,
    element_names: &[String],
) -> Result<()> {
    let next_value = descriptor::method(&[], &ty.descriptor);

    class.method(MethodAccess::STATIC, CLINIT, "()V", |m| {
        m.invoke(
            opcodes::INVOKESTATIC,
            &ty.name,
            CREATE_VALUES,
            &ty.values_descriptor(),
        )?;
        m.putstatic(&ty.name, VALUES_FIELD, &ty.array)?;
        m.push_int(0)?;
        m.putstatic(&ty.name, VALUE_INDEX_FIELD, "I")?;

        for name in element_names {
            m.invoke(opcodes::INVOKESTATIC, &ty.name, NEXT_VALUE, &next_value)?;
            m.putstatic(&ty.name, name, &ty.descriptor)?;
        }

        m.insn(opcodes::RETURN)
    })
}

fn emit_chain(class: &mut ClassBuilder, ty: &EnumType, element_names: &[String]) -> Result<()> {
    let first = ty.values_descriptor();
    let next = descriptor::method(&[ty.array.as_str(), "I"], &ty.array);
    let count = i32::try_from(element_names.len())
        .map_err(|_| Error::OversizedArtifact(format!("{} elements", element_names.len())))?;

    let mut batches: Vec<&[String]> = element_names.chunks(BATCH_SIZE).collect();
    if batches.is_empty() {
        batches.push(&[]);
    }
    let links = batches.len();
    debug!("Building {} with {} chain links", ty.name, links);

    for (index, batch) in batches.into_iter().enumerate() {
        let descriptor = if index == 0 { &first } else { &next };
        let is_last = index + 1 == links;

        class.method(
            MethodAccess::PRIVATE | MethodAccess::STATIC | MethodAccess::SYNTHETIC,
            &link_name(index),
            descriptor,
            |m| {
                if index == 0 {
                    m.ldc_int(count)?;
                    m.anewarray(&ty.name)?;
                    m.store(ValueKind::Reference, 0)?;
                    m.push_int(0)?;
                    m.store(ValueKind::Int, 1)?;
                }

                for name in batch {
                    m.load(ValueKind::Reference, 0)?;
                    m.load(ValueKind::Int, 1)?;
                    m.new_object(&ty.name)?;
                    m.insn(opcodes::DUP)?;
                    m.ldc_string(name)?;
                    m.load(ValueKind::Int, 1)?;
                    m.invoke(
                        opcodes::INVOKESPECIAL,
                        &ty.name,
                        INIT,
                        NAME_ORDINAL_CONSTRUCTOR,
                    )?;
                    m.insn(opcodes::AASTORE)?;
                    m.iinc(1, 1)?;
                }

                m.load(ValueKind::Reference, 0)?;
                if !is_last {
                    m.load(ValueKind::Int, 1)?;
                    m.invoke(
                        opcodes::INVOKESTATIC,
                        &ty.name,
                        &link_name(index + 1),
                        &next,
                    )?;
                }
                m.insn(opcodes::ARETURN)
            },
        )?;
    }
    Ok(())
}

/// `private static X nextValue()` returning `$VALUES[valueIndex++]`.
fn emit_next_value(class: &mut ClassBuilder, ty: &EnumType) -> Result<()> {
    class.method(
        MethodAccess::PRIVATE | MethodAccess::STATIC | MethodAccess::SYNTHETIC,
        NEXT_VALUE,
        &descriptor::method(&[], &ty.descriptor),
        |m| {
            m.getstatic(&ty.name, VALUES_FIELD, &ty.array)?;
            m.getstatic(&ty.name, VALUE_INDEX_FIELD, "I")?;
            m.insn(opcodes::DUP)?;
            m.push_int(1)?;
            m.insn(opcodes::IADD)?;
            m.putstatic(&ty.name, VALUE_INDEX_FIELD, "I")?;
            m.insn(opcodes::AALOAD)?;
            m.insn(opcodes::ARETURN)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::{
        constant::Constant,
        instruction::{decode_instructions, Operand},
        reader::ClassFile,
    };

    #[test]
    fn link_names() {
        assert_eq!(link_name(0), "createValues");
        assert_eq!(link_name(1), "createValues0");
        assert_eq!(link_name(3), "createValues2");
    }

    #[test]
    fn three_elements() {
        let names: Vec<String> = vec!["A".into(), "B".into(), "C".into()];
        let bytes = generate("X", &names).unwrap();
        let class = ClassFile::parse(&bytes).unwrap();

        assert_eq!(class.major_version, 51);
        assert_eq!(class.fields.len(), 5);
        assert_eq!(class.find_field("valueIndex").unwrap().access_flags, 0x100A);

        let link = class.find_method("createValues", "()[LX;").unwrap();
        assert_eq!(link.access_flags, 0x100A);
        assert!(class.find_method("createValues0", "([LX;I)[LX;").is_none());

        let code = class.code(link).unwrap();
        assert_eq!((code.max_stack, code.max_locals), (6, 2));

        let instructions = decode_instructions(&code.code).unwrap();
        let loaded: Vec<&str> = instructions
            .iter()
            .filter(|i| i.mnemonic == "ldc")
            .filter_map(|i| match i.operand {
                Operand::Pool(index) => match class.constant(index) {
                    Some(Constant::String { value }) => class.utf8(*value).ok(),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        assert_eq!(loaded, vec!["A", "B", "C"]);

        let clinit = class.find_method("<clinit>", "()V").unwrap();
        assert_eq!(class.code(clinit).unwrap().code.len(), 6 * 3 + 11);

        let next = class.find_method("nextValue", "()LX;").unwrap();
        let code = class.code(next).unwrap();
        assert_eq!((code.max_stack, code.max_locals), (4, 0));
    }

    #[test]
    fn chain_links_for_multiple_batches() {
        let names = crate::generator::names::autogenerate_names(BATCH_SIZE * 2 + 1);
        let bytes = generate("X", &names).unwrap();
        let class = ClassFile::parse(&bytes).unwrap();

        assert!(class.find_method("createValues", "()[LX;").is_some());
        assert!(class.find_method("createValues0", "([LX;I)[LX;").is_some());
        let last = class.find_method("createValues1", "([LX;I)[LX;").unwrap();
        assert!(class.find_method("createValues2", "([LX;I)[LX;").is_none());

        let instructions = decode_instructions(&class.code(last).unwrap().code).unwrap();
        let tail: Vec<&str> = instructions[instructions.len() - 2..]
            .iter()
            .map(|i| i.mnemonic)
            .collect();
        assert_eq!(tail, vec!["aload_0", "areturn"]);
    }

    #[test]
    fn empty_enum_still_has_first_link() {
        let bytes = generate("X", &[]).unwrap();
        let class = ClassFile::parse(&bytes).unwrap();
        let link = class.find_method("createValues", "()[LX;").unwrap();
        let mnemonics: Vec<&str> = decode_instructions(&class.code(link).unwrap().code)
            .unwrap()
            .iter()
            .map(|i| i.mnemonic)
            .collect();
        assert_eq!(
            mnemonics,
            vec![
                "ldc",
                "anewarray",
                "astore_0",
                "iconst_0",
                "istore_1",
                "aload_0",
                "areturn",
            ]
        );
    }
}
