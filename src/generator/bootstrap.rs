//! Hand-encoded bootstrap descriptor class for the constant-dynamic strategy.
//!
//! The constant-dynamic enum needs one `CONSTANT_Dynamic` per element, each resolved through
//! the same bootstrap method with the element ordinal as static argument. Routing those
//! entries through the de-duplicating pool would interleave them with everything else, so
//! they are written here directly, at indices fixed by a [`BootstrapLayout`], into a minimal
//! class that carries nothing but the pool and the `BootstrapMethods` attribute. The strategy
//! reads that class back and continues building on top of it, addressing the per-element
//! constants through the same layout.
//!
//! # Layout
//!
//! For `N` elements:
//!
//! | Range / index | Entry |
//! |---------------|-------|
//! | `1 + i` | `Dynamic(bootstrap i, name-and-type 1 + N + i)` |
//! | `1 + N + i` | `NameAndType(name 1 + 2N + i, "LX;")` |
//! | `1 + 2N + i` | `Utf8(name i)` |
//! | `1 + 3N + i` | `Integer(i)` |
//! | `1 + 4N` ... `11 + 4N` | class, super class, attribute name and the bootstrap handle |
//!
//! The pool count field is `12 + 4N`.

use log::debug;

use crate::{
    classfile::{
        constant::{Constant, ReferenceKind},
        descriptor, ClassAccess, ClassVersion, MAGIC, MAX_POOL_COUNT,
    },
    file::writer::ByteWriter,
    generator::common::{ENUM_CLASS, INIT},
    Error, Result,
};

/// Descriptor of the element constructor invoked by the bootstrap handle.
pub const BOOTSTRAP_CONSTRUCTOR: &str =
    "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/Class;I)V";

/// Index plan of the bootstrap descriptor class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapLayout {
    elements: u16,
}

impl BootstrapLayout {
    /// Number of fixed entries following the per-element blocks.
    pub const FIXED_ENTRIES: usize = 11;

    /// Plans the layout for `elements` elements.
    ///
    /// # Errors
    /// Returns [`crate::Error::OversizedSymbolTable`] if the pool count field would exceed
    /// 65535.
    pub fn new(elements: usize) -> Result<Self> {
        let count = Self::pool_count_for(elements);
        if count > MAX_POOL_COUNT {
            return Err(Error::OversizedSymbolTable { count });
        }

        // count fits a u16, so does elements
        Ok(BootstrapLayout {
            elements: elements as u16,
        })
    }

    /// Pool count field required for `elements` elements.
    #[must_use]
    pub fn pool_count_for(elements: usize) -> usize {
        elements
            .saturating_mul(4)
            .saturating_add(Self::FIXED_ENTRIES + 1)
    }

    /// Number of elements.
    #[must_use]
    pub fn elements(&self) -> u16 {
        self.elements
    }

    /// Value of the pool count field.
    #[must_use]
    pub fn pool_count(&self) -> u16 {
        // Checked in new()
        4 * self.elements + Self::FIXED_ENTRIES as u16 + 1
    }

    fn base(&self, block: u16) -> u16 {
        1 + block * self.elements
    }

    /// Dynamic constant of element `i`.
    #[must_use]
    pub fn dynamic(&self, i: u16) -> u16 {
        self.base(0) + i
    }

    /// NameAndType of element `i`.
    #[must_use]
    pub fn name_and_type(&self, i: u16) -> u16 {
        self.base(1) + i
    }

    /// Utf8 name of element `i`.
    #[must_use]
    pub fn name(&self, i: u16) -> u16 {
        self.base(2) + i
    }

    /// Integer ordinal of element `i`.
    #[must_use]
    pub fn ordinal(&self, i: u16) -> u16 {
        self.base(3) + i
    }

    /// Class entry of the enum.
    #[must_use]
    pub fn this_class(&self) -> u16 {
        self.base(4)
    }

    /// Internal name of the enum.
    #[must_use]
    pub fn this_class_name(&self) -> u16 {
        self.base(4) + 1
    }

    /// Class entry of `java/lang/Enum`.
    #[must_use]
    pub fn super_class(&self) -> u16 {
        self.base(4) + 2
    }

    /// `java/lang/Enum`
    #[must_use]
    pub fn super_class_name(&self) -> u16 {
        self.base(4) + 3
    }

    /// `BootstrapMethods`
    #[must_use]
    pub fn bootstrap_methods_name(&self) -> u16 {
        self.base(4) + 4
    }

    /// `LX;`, type of every element constant.
    #[must_use]
    pub fn element_descriptor(&self) -> u16 {
        self.base(4) + 5
    }

    /// `REF_newInvokeSpecial` handle of the element constructor.
    #[must_use]
    pub fn bootstrap_handle(&self) -> u16 {
        self.base(4) + 6
    }

    /// Methodref of the element constructor.
    #[must_use]
    pub fn bootstrap_method_ref(&self) -> u16 {
        self.base(4) + 7
    }

    /// NameAndType of the element constructor.
    #[must_use]
    pub fn bootstrap_name_and_type(&self) -> u16 {
        self.base(4) + 8
    }

    /// `<init>`
    #[must_use]
    pub fn bootstrap_name(&self) -> u16 {
        self.base(4) + 9
    }

    /// Descriptor of the element constructor.
    #[must_use]
    pub fn bootstrap_descriptor(&self) -> u16 {
        self.base(4) + 10
    }
}

/// Encodes the bootstrap descriptor class for `element_names`.
///
/// `type_name` is the internal name of the enum. The result holds no fields or methods.
///
/// # Errors
/// Returns [`crate::Error::OversizedSymbolTable`] before anything is written if the pool
/// would not fit, or [`crate::Error::EncodingFailure`] if a name exceeds the Utf8 limit.
pub fn encode_bootstrap_class(
    version: ClassVersion,
    access: ClassAccess,
    type_name: &str,
    element_names: &[String],
) -> Result<Vec<u8>> {
    let layout = BootstrapLayout::new(element_names.len())?;
    let n = layout.elements();
    debug!(
        "Encoding bootstrap class for {} with {} elements, pool count {}",
        type_name,
        n,
        layout.pool_count()
    );

    let mut writer = ByteWriter::with_capacity(usize::from(layout.pool_count()) * 8);
    writer.u4(MAGIC);
    writer.u2(version.minor);
    writer.u2(version.major);
    writer.u2(layout.pool_count());

    for i in 0..n {
        Constant::Dynamic {
            bootstrap: i,
            name_and_type: layout.name_and_type(i),
        }
        .write(&mut writer)?;
    }
    for i in 0..n {
        Constant::NameAndType {
            name: layout.name(i),
            descriptor: layout.element_descriptor(),
        }
        .write(&mut writer)?;
    }
    for name in element_names {
        Constant::Utf8(name.clone()).write(&mut writer)?;
    }
    for i in 0..n {
        Constant::Integer(i32::from(i)).write(&mut writer)?;
    }

    let fixed = [
        Constant::Class {
            name: layout.this_class_name(),
        },
        Constant::Utf8(type_name.to_string()),
        Constant::Class {
            name: layout.super_class_name(),
        },
        Constant::Utf8(ENUM_CLASS.to_string()),
        Constant::Utf8("BootstrapMethods".to_string()),
        Constant::Utf8(descriptor::object(type_name)),
        Constant::MethodHandle {
            kind: ReferenceKind::NewInvokeSpecial,
            reference: layout.bootstrap_method_ref(),
        },
        Constant::Methodref {
            class: layout.this_class(),
            name_and_type: layout.bootstrap_name_and_type(),
        },
        Constant::NameAndType {
            name: layout.bootstrap_name(),
            descriptor: layout.bootstrap_descriptor(),
        },
        Constant::Utf8(INIT.to_string()),
        Constant::Utf8(BOOTSTRAP_CONSTRUCTOR.to_string()),
    ];
    for constant in &fixed {
        constant.write(&mut writer)?;
    }

    writer.u2(access.bits());
    writer.u2(layout.this_class());
    writer.u2(layout.super_class());
    writer.u2(0); // interfaces
    writer.u2(0); // fields
    writer.u2(0); // methods

    writer.u2(1);
    writer.u2(layout.bootstrap_methods_name());
    writer.u4_len(2 + 6 * usize::from(n))?;
    writer.u2(n);
    for i in 0..n {
        writer.u2(layout.bootstrap_handle());
        writer.u2(1);
        writer.u2(layout.ordinal(i));
    }

    Ok(writer.finish())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{
        classfile::reader::ClassFile,
        generator::{common::class_access, names::autogenerate_names},
    };

    fn roles(layout: &BootstrapLayout) -> Vec<u16> {
        let mut indices = Vec::new();
        for i in 0..layout.elements() {
            indices.extend([
                layout.dynamic(i),
                layout.name_and_type(i),
                layout.name(i),
                layout.ordinal(i),
            ]);
        }
        indices.extend([
            layout.this_class(),
            layout.this_class_name(),
            layout.super_class(),
            layout.super_class_name(),
            layout.bootstrap_methods_name(),
            layout.element_descriptor(),
            layout.bootstrap_handle(),
            layout.bootstrap_method_ref(),
            layout.bootstrap_name_and_type(),
            layout.bootstrap_name(),
            layout.bootstrap_descriptor(),
        ]);
        indices
    }

    #[test]
    fn layout_is_injective_and_dense() {
        for n in [0, 1, 7, 300] {
            let layout = BootstrapLayout::new(n).unwrap();
            let indices = roles(&layout);
            let distinct: HashSet<u16> = indices.iter().copied().collect();
            assert_eq!(distinct.len(), indices.len());
            assert!(indices.iter().all(|&i| i >= 1 && i < layout.pool_count()));
            assert_eq!(indices.len() + 1, usize::from(layout.pool_count()));
        }
    }

    #[test]
    fn layout_limits() {
        assert_eq!(BootstrapLayout::new(16380).unwrap().pool_count(), 65532);
        assert!(matches!(
            BootstrapLayout::new(16381),
            Err(Error::OversizedSymbolTable { count: 65536 })
        ));
        assert!(matches!(
            BootstrapLayout::new(usize::MAX),
            Err(Error::OversizedSymbolTable { .. })
        ));
    }

    #[test]
    fn encoded_class_reads_back() {
        let names: Vec<String> = vec!["RED".into(), "GREEN".into(), "BLUE".into()];
        let bytes = encode_bootstrap_class(
            ClassVersion::JAVA_11,
            class_access(),
            "com/example/Color",
            &names,
        )
        .unwrap();
        let class = ClassFile::parse(&bytes).unwrap();
        let layout = BootstrapLayout::new(3).unwrap();

        assert_eq!(class.major_version, 55);
        assert_eq!(class.pool_count(), 24);
        assert_eq!(class.class_name().unwrap(), "com/example/Color");
        assert_eq!(class.super_name().unwrap(), "java/lang/Enum");
        assert!(class.fields.is_empty() && class.methods.is_empty());

        for (i, name) in names.iter().enumerate() {
            let i = i as u16;
            assert_eq!(
                class.constant(layout.dynamic(i)),
                Some(&Constant::Dynamic {
                    bootstrap: i,
                    name_and_type: layout.name_and_type(i)
                })
            );
            assert_eq!(class.utf8(layout.name(i)).unwrap(), name);
            assert_eq!(
                class.constant(layout.ordinal(i)),
                Some(&Constant::Integer(i32::from(i)))
            );
        }
        assert_eq!(
            class.utf8(layout.element_descriptor()).unwrap(),
            "Lcom/example/Color;"
        );
        assert_eq!(
            class.utf8(layout.bootstrap_descriptor()).unwrap(),
            BOOTSTRAP_CONSTRUCTOR
        );

        let methods = class.bootstrap_methods().unwrap();
        assert_eq!(methods.len(), 3);
        for (i, method) in methods.iter().enumerate() {
            assert_eq!(method.handle, layout.bootstrap_handle());
            assert_eq!(method.arguments, vec![layout.ordinal(i as u16)]);
        }
    }

    #[test]
    fn empty_class_reads_back() {
        let bytes =
            encode_bootstrap_class(ClassVersion::JAVA_11, class_access(), "E", &[]).unwrap();
        let class = ClassFile::parse(&bytes).unwrap();
        assert_eq!(class.pool_count(), 12);
        assert!(class.bootstrap_methods().unwrap().is_empty());
    }

    #[test]
    fn oversized_before_writing() {
        let names = autogenerate_names(16381);
        assert!(matches!(
            encode_bootstrap_class(ClassVersion::JAVA_11, class_access(), "X", &names),
            Err(Error::OversizedSymbolTable { count: 65536 })
        ));
    }

    #[test]
    fn deterministic() {
        let names = autogenerate_names(50);
        let first =
            encode_bootstrap_class(ClassVersion::JAVA_11, class_access(), "X", &names).unwrap();
        let second =
            encode_bootstrap_class(ClassVersion::JAVA_11, class_access(), "X", &names).unwrap();
        assert_eq!(first, second);
    }
}
