use std::path::Path;

use anyhow::Context;
use hugeenum::{
    classfile::{instruction::decode_instructions, reader::MemberInfo, FieldAccess, MethodAccess},
    ClassFile,
};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    output::{print_output, print_table, table, Align},
};

#[derive(Debug, Serialize)]
pub struct ClassSummary {
    pub name: String,
    pub super_name: String,
    pub version: String,
    pub access_flags: String,
    pub constant_pool_count: usize,
    pub bootstrap_methods: usize,
    pub fields: Vec<MemberSummary>,
    pub methods: Vec<MethodSummary>,
}

#[derive(Debug, Serialize)]
pub struct MemberSummary {
    pub name: String,
    pub descriptor: String,
    pub flags: String,
}

#[derive(Debug, Serialize)]
pub struct MethodSummary {
    #[serde(flatten)]
    pub member: MemberSummary,
    pub code_length: usize,
    pub max_stack: u16,
    pub max_locals: u16,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<String>,
}

fn flag_names<I: Iterator<Item = (&'static str, T)>, T>(names: I) -> String {
    names.map(|(name, _)| name).collect::<Vec<_>>().join(" ")
}

fn member(class: &ClassFile, info: &MemberInfo, flags: String) -> anyhow::Result<MemberSummary> {
    Ok(MemberSummary {
        name: class.utf8(info.name_index)?.to_string(),
        descriptor: class.utf8(info.descriptor_index)?.to_string(),
        flags,
    })
}

pub fn run(
    path: &Path,
    disasm: bool,
    method_filter: Option<&str>,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let data = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let class = ClassFile::parse(&data)
        .with_context(|| format!("failed to parse class file: {}", path.display()))?;

    let fields = class
        .fields
        .iter()
        .map(|f| {
            let flags = flag_names(FieldAccess::from_bits_retain(f.access_flags).iter_names());
            member(&class, f, flags)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut methods = Vec::with_capacity(class.methods.len());
    for m in &class.methods {
        let flags = flag_names(MethodAccess::from_bits_retain(m.access_flags).iter_names());
        let member = member(&class, m, flags)?;
        // Abstract and native methods carry no Code attribute
        if class.attribute(&m.attributes, "Code").is_none() {
            methods.push(MethodSummary {
                member,
                code_length: 0,
                max_stack: 0,
                max_locals: 0,
                instructions: Vec::new(),
            });
            continue;
        }

        let code = class
            .code(m)
            .with_context(|| format!("failed to decode {}{}", member.name, member.descriptor))?;

        let wanted = disasm && method_filter.map_or(true, |name| name == member.name);
        let instructions = if wanted {
            decode_instructions(&code.code)?
                .iter()
                .map(ToString::to_string)
                .collect()
        } else {
            Vec::new()
        };

        methods.push(MethodSummary {
            member,
            code_length: code.code.len(),
            max_stack: code.max_stack,
            max_locals: code.max_locals,
            instructions,
        });
    }

    let summary = ClassSummary {
        name: class.class_name()?.replace('/', "."),
        super_name: class.super_name()?.replace('/', "."),
        version: format!("{}.{}", class.major_version, class.minor_version),
        access_flags: format!("0x{:04X}", class.access_flags),
        constant_pool_count: class.pool_count(),
        bootstrap_methods: class.bootstrap_methods()?.len(),
        fields,
        methods,
    };

    print_output(&summary, opts, |s| {
        println!("Class:           {}", s.name);
        println!("Super class:     {}", s.super_name);
        println!("Version:         {}", s.version);
        println!("Access flags:    {}", s.access_flags);
        println!("Constant pool:   {}", s.constant_pool_count);
        println!("Bootstrap:       {}", s.bootstrap_methods);
        println!("Fields:          {}", s.fields.len());

        println!("\nMethods:");
        let mut t = table(&[
            ("Name", Align::Left),
            ("Descriptor", Align::Left),
            ("Flags", Align::Left),
            ("Code", Align::Right),
            ("Stack", Align::Right),
            ("Locals", Align::Right),
        ]);
        for m in &s.methods {
            t.add_row(vec![
                m.member.name.clone(),
                m.member.descriptor.clone(),
                m.member.flags.clone(),
                m.code_length.to_string(),
                m.max_stack.to_string(),
                m.max_locals.to_string(),
            ]);
        }
        print_table(&t, "  ");

        for m in s.methods.iter().filter(|m| !m.instructions.is_empty()) {
            println!("\n{}{}:", m.member.name, m.member.descriptor);
            for line in &m.instructions {
                println!("  {line}");
            }
        }
    })
}
