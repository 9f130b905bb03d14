//! Enum initialization through `sun.misc.Unsafe`.
//!
//! The element fields are `static final`, so ordinary bytecode outside `<clinit>` cannot set
//! them and inside `<clinit>` each store costs at least 3 bytes plus the value. This strategy
//! stores elements by reflection instead: all names travel as one comma separated string,
//! `<clinit>` splits it, looks up each field by name and writes the freshly constructed element
//! with `Unsafe.putObject(Class, staticFieldOffset(field), value)`. The code size is constant,
//! leaving the constant pool as the only bound at 65410 elements.
//!
//! A single `CONSTANT_Utf8` holds at most 65535 bytes, so the packed names are split into
//! chunks and concatenated at run time with a `StringBuilder`.

use log::debug;

use crate::{
    classfile::{
        builder::{ClassBuilder, MethodBuilder},
        code::ValueKind,
        frame::{StackMapFrame, VerificationType},
        opcodes, ClassVersion, MethodAccess,
    },
    generator::{
        common::{EnumType, CLINIT, INIT, NAME_ORDINAL_CONSTRUCTOR},
        names::VALUES_FIELD,
    },
    utils::mutf8,
    Result,
};

/// Class file version.
pub const VERSION: ClassVersion = ClassVersion::JAVA_7;

/// Largest supported element count.
pub const MAX_ELEMENTS: usize = 65_410;

/// Largest encoded size of one packed chunk, the `CONSTANT_Utf8` limit.
pub const MAX_CHUNK_BYTES: usize = 65_535;

/// Separator between packed element names.
pub const SEPARATOR: char = ',';

const UNSAFE: &str = "sun/misc/Unsafe";
const FIELD: &str = "java/lang/reflect/Field";
const FIELD_ARRAY: &str = "[Ljava/lang/reflect/Field;";
const STRING_ARRAY: &str = "[Ljava/lang/String;";
const STRING_BUILDER: &str = "java/lang/StringBuilder";
const HASH_MAP: &str = "java/util/HashMap";
const CLASS: &str = "java/lang/Class";

// Local variable slots of <clinit>.
const FIELD_SLOT: u16 = 0;
const UNSAFE_SLOT: u16 = 1;
const NAMES_SLOT: u16 = 2;
const VALUES_SLOT: u16 = 3;
const FIELDS_SLOT: u16 = 4;
const CACHE_SLOT: u16 = 5;

/// Joins `names` with [`SEPARATOR`] and splits the result into chunks of at most
/// [`MAX_CHUNK_BYTES`] bytes of modified UTF-8.
///
/// Chunks are cut greedily and never inside a character. Concatenating them restores the
/// joined string. An empty list packs into no chunks at all.
#[must_use]
pub fn pack_names(names: &[String]) -> Vec<String> {
    let mut chunks = Vec::new();
    if names.is_empty() {
        return chunks;
    }

    let joined = names.join(&SEPARATOR.to_string());
    let mut current = String::new();
    let mut current_len = 0;
    for ch in joined.chars() {
        let len = mutf8::char_len(ch);
        if current_len + len > MAX_CHUNK_BYTES {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push(ch);
        current_len += len;
    }
    chunks.push(current);
    chunks
}

/// Generates the enum `type_name` (internal form) with the given elements.
///
/// Names are used as given.
///
/// # Errors
/// Returns [`crate::Error::OversizedArtifact`] once the constant pool is exhausted, which
/// happens above [`MAX_ELEMENTS`] names of typical length.
pub fn generate(type_name: &str, element_names: &[String]) -> Result<Vec<u8>> {
    let ty = EnumType::new(type_name);
    let mut class = ty.start_class(VERSION)?;

    ty.declare_values_field(&mut class)?;
    ty.declare_element_fields(&mut class, element_names)?;
    ty.emit_values(&mut class)?;
    ty.emit_value_of(&mut class)?;
    ty.emit_name_ordinal_constructor(&mut class)?;

    if element_names.is_empty() {
        emit_empty_initializer(&mut class, &ty)?;
    } else {
        let chunks = pack_names(element_names);
        debug!(
            "Packed {} names of {} into {} chunks",
            element_names.len(),
            type_name,
            chunks.len()
        );
        emit_static_initializer(&mut class, &ty, &chunks)?;
    }

    class.build()
}

fn emit_empty_initializer(class: &mut ClassBuilder, ty: &EnumType) -> Result<()> {
    class.method(MethodAccess::STATIC, CLINIT, "()V", |m| {
        m.push_int(0)?;
        m.anewarray(&ty.name)?;
        m.putstatic(&ty.name, VALUES_FIELD, &ty.array)?;
        m.insn(opcodes::RETURN)
    })
}

fn emit_static_initializer(
    class: &mut ClassBuilder,
    ty: &EnumType,
    chunks: &[String],
) -> Result<()> {
    class.method(MethodAccess::STATIC, CLINIT, "()V", |m| {
        load_unsafe(m)?;
        load_names(m, chunks)?;

        m.ldc_string(&SEPARATOR.to_string())?;
        m.invoke(
            opcodes::INVOKEVIRTUAL,
            "java/lang/String",
            "split",
            "(Ljava/lang/String;)[Ljava/lang/String;",
        )?;
        m.insn(opcodes::DUP)?;
        m.store(ValueKind::Reference, NAMES_SLOT)?;
        m.insn(opcodes::ARRAYLENGTH)?;
        m.anewarray(&ty.name)?;
        m.store(ValueKind::Reference, VALUES_SLOT)?;

        cache_fields(m, ty)?;
        store_elements(m, ty)?;

        m.load(ValueKind::Reference, VALUES_SLOT)?;
        m.putstatic(&ty.name, VALUES_FIELD, &ty.array)?;
        m.insn(opcodes::RETURN)
    })
}

/// `Unsafe.theUnsafe`, read by reflection into [`UNSAFE_SLOT`].
fn load_unsafe(m: &mut MethodBuilder) -> Result<()> {
    m.ldc_class(UNSAFE)?;
    m.ldc_string("theUnsafe")?;
    m.invoke(
        opcodes::INVOKEVIRTUAL,
        CLASS,
        "getDeclaredField",
        "(Ljava/lang/String;)Ljava/lang/reflect/Field;",
    )?;
    m.store(ValueKind::Reference, FIELD_SLOT)?;

    m.load(ValueKind::Reference, FIELD_SLOT)?;
    m.push_int(1)?;
    m.invoke(opcodes::INVOKEVIRTUAL, FIELD, "setAccessible", "(Z)V")?;

    m.load(ValueKind::Reference, FIELD_SLOT)?;
    m.insn(opcodes::ACONST_NULL)?;
    m.invoke(
        opcodes::INVOKEVIRTUAL,
        FIELD,
        "get",
        "(Ljava/lang/Object;)Ljava/lang/Object;",
    )?;
    m.checkcast(UNSAFE)?;
    m.store(ValueKind::Reference, UNSAFE_SLOT)
}

/// Pushes the packed names, concatenating chunks when there is more than one.
fn load_names(m: &mut MethodBuilder, chunks: &[String]) -> Result<()> {
    let [first, rest @ ..] = chunks else {
        return Err(malformed_error!("No packed names to load"));
    };

    if rest.is_empty() {
        return m.ldc_string(first);
    }

    m.new_object(STRING_BUILDER)?;
    m.insn(opcodes::DUP)?;
    m.ldc_string(first)?;
    m.invoke(
        opcodes::INVOKESPECIAL,
        STRING_BUILDER,
        INIT,
        "(Ljava/lang/String;)V",
    )?;
    for chunk in rest {
        m.ldc_string(chunk)?;
        m.invoke(
            opcodes::INVOKEVIRTUAL,
            STRING_BUILDER,
            "append",
            "(Ljava/lang/String;)Ljava/lang/StringBuilder;",
        )?;
    }
    m.invoke(
        opcodes::INVOKEVIRTUAL,
        STRING_BUILDER,
        "toString",
        "()Ljava/lang/String;",
    )
}

/// Maps every declared field by name into a `HashMap` held in [`CACHE_SLOT`].
fn cache_fields(m: &mut MethodBuilder, ty: &EnumType) -> Result<()> {
    const ARRAY: u16 = 6;
    const LENGTH: u16 = 7;
    const INDEX: u16 = 8;
    const CURRENT: u16 = 9;

    m.ldc_class(&ty.name)?;
    m.invoke(
        opcodes::INVOKEVIRTUAL,
        CLASS,
        "getDeclaredFields",
        "()[Ljava/lang/reflect/Field;",
    )?;
    m.store(ValueKind::Reference, FIELDS_SLOT)?;

    m.new_object(HASH_MAP)?;
    m.insn(opcodes::DUP)?;
    m.load(ValueKind::Reference, FIELDS_SLOT)?;
    m.insn(opcodes::ARRAYLENGTH)?;
    m.invoke(opcodes::INVOKESPECIAL, HASH_MAP, INIT, "(I)V")?;
    m.store(ValueKind::Reference, CACHE_SLOT)?;

    m.load(ValueKind::Reference, FIELDS_SLOT)?;
    m.store(ValueKind::Reference, ARRAY)?;
    m.load(ValueKind::Reference, ARRAY)?;
    m.insn(opcodes::ARRAYLENGTH)?;
    m.store(ValueKind::Int, LENGTH)?;
    m.push_int(0)?;
    m.store(ValueKind::Int, INDEX)?;

    m.label("cacheLoop")?;
    let locals = vec![
        m.object_type(FIELD)?,
        m.object_type(UNSAFE)?,
        m.object_type(STRING_ARRAY)?,
        m.object_type(&ty.array)?,
        m.object_type(FIELD_ARRAY)?,
        m.object_type(HASH_MAP)?,
        m.object_type(FIELD_ARRAY)?,
        VerificationType::Integer,
        VerificationType::Integer,
    ];
    m.frame(StackMapFrame::Full {
        locals,
        stack: Vec::new(),
    })?;
    m.load(ValueKind::Int, INDEX)?;
    m.load(ValueKind::Int, LENGTH)?;
    m.branch(opcodes::IF_ICMPGE, "cacheEnd")?;

    m.load(ValueKind::Reference, ARRAY)?;
    m.load(ValueKind::Int, INDEX)?;
    m.insn(opcodes::AALOAD)?;
    m.store(ValueKind::Reference, CURRENT)?;

    m.load(ValueKind::Reference, CACHE_SLOT)?;
    m.load(ValueKind::Reference, CURRENT)?;
    m.invoke(
        opcodes::INVOKEVIRTUAL,
        FIELD,
        "getName",
        "()Ljava/lang/String;",
    )?;
    m.load(ValueKind::Reference, CURRENT)?;
    m.invoke(
        opcodes::INVOKEVIRTUAL,
        HASH_MAP,
        "put",
        "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
    )?;
    m.insn(opcodes::POP)?;
    m.iinc(INDEX, 1)?;
    m.branch(opcodes::GOTO, "cacheLoop")?;

    m.label("cacheEnd")?;
    m.frame(StackMapFrame::Chop(3))
}

/// Constructs every element and writes it into its field and into the values array.
fn store_elements(m: &mut MethodBuilder, ty: &EnumType) -> Result<()> {
    const ORDINAL: u16 = 6;
    const NAME: u16 = 7;
    const FIELD_VALUE: u16 = 8;
    const OFFSET: u16 = 9;

    m.push_int(0)?;
    m.store(ValueKind::Int, ORDINAL)?;

    m.label("elemLoop")?;
    m.frame(StackMapFrame::Append(vec![VerificationType::Integer]))?;
    m.load(ValueKind::Int, ORDINAL)?;
    m.load(ValueKind::Reference, NAMES_SLOT)?;
    m.insn(opcodes::ARRAYLENGTH)?;
    m.branch(opcodes::IF_ICMPGE, "elemEnd")?;

    m.load(ValueKind::Reference, NAMES_SLOT)?;
    m.load(ValueKind::Int, ORDINAL)?;
    m.insn(opcodes::AALOAD)?;
    m.store(ValueKind::Reference, NAME)?;

    m.load(ValueKind::Reference, CACHE_SLOT)?;
    m.load(ValueKind::Reference, NAME)?;
    m.invoke(
        opcodes::INVOKEVIRTUAL,
        HASH_MAP,
        "get",
        "(Ljava/lang/Object;)Ljava/lang/Object;",
    )?;
    m.checkcast(FIELD)?;
    m.store(ValueKind::Reference, FIELD_VALUE)?;

    m.load(ValueKind::Reference, UNSAFE_SLOT)?;
    m.load(ValueKind::Reference, FIELD_VALUE)?;
    m.invoke(
        opcodes::INVOKEVIRTUAL,
        UNSAFE,
        "staticFieldOffset",
        "(Ljava/lang/reflect/Field;)J",
    )?;
    m.store(ValueKind::Long, OFFSET)?;

    // unsafe.putObject(X.class, offset, values[ordinal] = new X(name, ordinal))
    m.load(ValueKind::Reference, UNSAFE_SLOT)?;
    m.ldc_class(&ty.name)?;
    m.load(ValueKind::Long, OFFSET)?;
    m.load(ValueKind::Reference, VALUES_SLOT)?;
    m.load(ValueKind::Int, ORDINAL)?;
    m.new_object(&ty.name)?;
    m.insn(opcodes::DUP)?;
    m.load(ValueKind::Reference, NAME)?;
    m.load(ValueKind::Int, ORDINAL)?;
    m.invoke(
        opcodes::INVOKESPECIAL,
        &ty.name,
        INIT,
        NAME_ORDINAL_CONSTRUCTOR,
    )?;
    m.insn(opcodes::DUP_X2)?;
    m.insn(opcodes::AASTORE)?;
    m.invoke(
        opcodes::INVOKEVIRTUAL,
        UNSAFE,
        "putObject",
        "(Ljava/lang/Object;JLjava/lang/Object;)V",
    )?;
    m.iinc(ORDINAL, 1)?;
    m.branch(opcodes::GOTO, "elemLoop")?;

    m.label("elemEnd")?;
    m.frame(StackMapFrame::Chop(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::{
        constant::Constant,
        instruction::{decode_instructions, Operand},
        reader::ClassFile,
    };

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    fn string_literal(class: &ClassFile, index: u16) -> Option<&str> {
        match class.constant(index)? {
            Constant::String { value } => class.utf8(*value).ok(),
            _ => None,
        }
    }

    fn method_name(class: &ClassFile, index: u16) -> Option<&str> {
        let Constant::Methodref { name_and_type, .. } = class.constant(index)? else {
            return None;
        };
        match class.constant(*name_and_type)? {
            Constant::NameAndType { name, .. } => class.utf8(*name).ok(),
            _ => None,
        }
    }

    #[test]
    fn packing_small_lists() {
        assert!(pack_names(&[]).is_empty());
        assert_eq!(pack_names(&names(&["A"])), vec!["A"]);
        assert_eq!(pack_names(&names(&["A", "B", "C"])), vec!["A,B,C"]);
    }

    #[test]
    fn packing_respects_chunk_limit() {
        let list = crate::generator::names::autogenerate_names(MAX_ELEMENTS);
        let chunks = pack_names(&list);
        // 65410 names of 11 bytes plus 65409 separators
        assert_eq!(chunks.len(), 12);
        assert!(chunks.iter().all(|c| mutf8::encoded_len(c) <= MAX_CHUNK_BYTES));
        assert_eq!(mutf8::encoded_len(&chunks[0]), MAX_CHUNK_BYTES);
        assert_eq!(chunks.concat(), list.join(","));
    }

    #[test]
    fn packing_never_splits_characters() {
        // 3 bytes each in modified UTF-8, preceded by 2 bytes so no cut lands on 65535
        let list = vec!["a".to_string(), "\u{20AC}".repeat(40_000)];
        let chunks = pack_names(&list);
        assert_eq!(chunks.len(), 2);
        assert_eq!(mutf8::encoded_len(&chunks[0]), 65_534);
        assert_eq!(chunks.concat(), list.join(","));
    }

    #[test]
    fn empty_enum() {
        let bytes = generate("X", &[]).unwrap();
        let class = ClassFile::parse(&bytes).unwrap();
        let clinit = class.find_method("<clinit>", "()V").unwrap();
        let code = class.code(clinit).unwrap();
        let mnemonics: Vec<&str> = decode_instructions(&code.code)
            .unwrap()
            .iter()
            .map(|i| i.mnemonic)
            .collect();
        assert_eq!(
            mnemonics,
            vec!["iconst_0", "anewarray", "putstatic", "return"]
        );
        assert!(class.attribute(&code.attributes, "StackMapTable").is_none());
    }

    #[test]
    fn reflective_initializer() {
        let bytes = generate("X", &names(&["A", "B", "C"])).unwrap();
        let class = ClassFile::parse(&bytes).unwrap();
        assert_eq!(class.major_version, 51);
        assert_eq!(class.fields.len(), 4);

        let clinit = class.find_method("<clinit>", "()V").unwrap();
        let code = class.code(clinit).unwrap();
        assert_eq!((code.max_stack, code.max_locals), (10, 11));

        let table = class.attribute(&code.attributes, "StackMapTable").unwrap();
        // four frames: full, chop, append, chop
        assert_eq!(&table.info[..2], &[0, 4]);

        let instructions = decode_instructions(&code.code).unwrap();
        let mnemonics: Vec<&str> = instructions.iter().map(|i| i.mnemonic).collect();
        assert!(mnemonics.contains(&"dup_x2"));
        assert_eq!(mnemonics.iter().filter(|m| **m == "goto").count(), 2);
        assert_eq!(mnemonics.last(), Some(&"return"));
        assert!(class
            .constants
            .iter()
            .any(|c| matches!(c, Some(Constant::Utf8(value)) if value == "A,B,C")));
        assert!(!mnemonics.contains(&"ldc_w"));
    }

    #[test]
    fn multiple_chunks_are_concatenated_in_order() {
        let list: Vec<String> = (0..7_000).map(|i| format!("ELEMENT_{i:012}")).collect();
        let chunks = pack_names(&list);
        assert_eq!(chunks.len(), 3);

        let bytes = generate("X", &list).unwrap();
        let class = ClassFile::parse(&bytes).unwrap();
        let clinit = class.find_method("<clinit>", "()V").unwrap();
        let instructions = decode_instructions(&class.code(clinit).unwrap().code).unwrap();

        let pool_operands = || {
            instructions.iter().filter_map(|i| match i.operand {
                Operand::Pool(index) => Some((i.mnemonic, index)),
                _ => None,
            })
        };

        let literals: Vec<&str> = pool_operands()
            .filter(|(mnemonic, _)| *mnemonic == "ldc" || *mnemonic == "ldc_w")
            .filter_map(|(_, index)| string_literal(&class, index))
            .collect();
        let mut expected = vec!["theUnsafe"];
        expected.extend(chunks.iter().map(String::as_str));
        expected.push(",");
        assert_eq!(literals, expected);

        let invoked: Vec<&str> = pool_operands()
            .filter(|(mnemonic, _)| mnemonic.starts_with("invoke"))
            .filter_map(|(_, index)| method_name(&class, index))
            .collect();
        let concat = ["<init>", "append", "append", "toString", "split"];
        assert!(invoked.windows(concat.len()).any(|w| w == concat));
        assert_eq!(
            invoked.iter().filter(|name| **name == "append").count(),
            chunks.len() - 1
        );
    }
}
