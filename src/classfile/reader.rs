//! Class file parser.
//!
//! [`ClassFile::parse`] reads a complete class file into a lightly structured form: the
//! constant pool is fully decoded, members and attributes keep their raw attribute bodies.
//! Accessors decode the few attributes the generators and the inspection tooling care about
//! (`Code`, `BootstrapMethods`, `InnerClasses`) on demand.
//!
//! The parser is strict about structure. Truncated input, unknown constant tags, an incorrect
//! magic number and trailing bytes are all rejected.
//!
//! # Examples
//!
//! ```rust,no_run
//! use hugeenum::ClassFile;
//!
//! let data = std::fs::read("Color.class")?;
//! let class = ClassFile::parse(&data)?;
//! println!("{} has {} methods", class.class_name()?, class.methods.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::{
    classfile::{constant::Constant, pool::BootstrapMethod, MAGIC},
    file::parser::Parser,
    Result,
};

/// An attribute with its body left undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    /// Utf8 index of the attribute name
    pub name_index: u16,
    /// Attribute body
    pub info: Vec<u8>,
}

/// A field or method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    /// Raw access flags
    pub access_flags: u16,
    /// Utf8 index of the name
    pub name_index: u16,
    /// Utf8 index of the descriptor
    pub descriptor_index: u16,
    /// Member attributes
    pub attributes: Vec<AttributeInfo>,
}

/// A decoded `Code` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    /// Maximum operand stack depth
    pub max_stack: u16,
    /// Local variable slots
    pub max_locals: u16,
    /// Bytecode
    pub code: Vec<u8>,
    /// Number of exception handlers
    pub exception_table_length: u16,
    /// Nested attributes such as `StackMapTable`
    pub attributes: Vec<AttributeInfo>,
}

/// One `InnerClasses` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerClassInfo {
    /// Class index of the inner class
    pub inner: u16,
    /// Class index of the outer class, 0 if none
    pub outer: u16,
    /// Utf8 index of the simple name, 0 if anonymous
    pub name: u16,
    /// Raw inner class access flags
    pub access: u16,
}

/// A parsed class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    /// Minor format version
    pub minor_version: u16,
    /// Major format version
    pub major_version: u16,
    /// Constant pool by index, index 0 and the second slot of wide entries are `None`
    pub constants: Vec<Option<Constant>>,
    /// Raw class access flags
    pub access_flags: u16,
    /// Class index of this class
    pub this_class: u16,
    /// Class index of the super class
    pub super_class: u16,
    /// Class indices of implemented interfaces
    pub interfaces: Vec<u16>,
    /// Declared fields
    pub fields: Vec<MemberInfo>,
    /// Declared methods
    pub methods: Vec<MemberInfo>,
    /// Class attributes
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    /// Parses a complete class file.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for structural problems and
    /// [`crate::Error::OutOfBounds`] for truncated input.
    pub fn parse(data: &[u8]) -> Result<ClassFile> {
        let mut parser = Parser::new(data);

        let magic = parser.read_be::<u32>()?;
        if magic != MAGIC {
            return Err(malformed_error!("Invalid class file magic 0x{:08X}", magic));
        }

        let minor_version = parser.read_be::<u16>()?;
        let major_version = parser.read_be::<u16>()?;

        let count = usize::from(parser.read_be::<u16>()?);
        if count == 0 {
            return Err(malformed_error!("Constant pool count must be at least 1"));
        }

        let mut constants = Vec::with_capacity(count);
        constants.push(None);
        while constants.len() < count {
            let constant = Constant::read(&mut parser)?;
            let slots = constant.slots();
            if constants.len() + slots > count {
                return Err(malformed_error!(
                    "Wide constant at {} runs past the pool count {}",
                    constants.len(),
                    count
                ));
            }
            constants.push(Some(constant));
            if slots == 2 {
                constants.push(None);
            }
        }

        let access_flags = parser.read_be::<u16>()?;
        let this_class = parser.read_be::<u16>()?;
        let super_class = parser.read_be::<u16>()?;

        let interface_count = parser.read_be::<u16>()?;
        let mut interfaces = Vec::with_capacity(usize::from(interface_count));
        for _ in 0..interface_count {
            interfaces.push(parser.read_be::<u16>()?);
        }

        let fields = read_members(&mut parser)?;
        let methods = read_members(&mut parser)?;
        let attributes = read_attributes(&mut parser)?;

        if parser.has_more_data() {
            return Err(malformed_error!(
                "{} trailing bytes after the class attributes",
                parser.remaining()
            ));
        }

        Ok(ClassFile {
            minor_version,
            major_version,
            constants,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    /// Value of the `constant_pool_count` field.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.constants.len()
    }

    /// Returns the constant at `index`.
    #[must_use]
    pub fn constant(&self, index: u16) -> Option<&Constant> {
        self.constants
            .get(usize::from(index))
            .and_then(Option::as_ref)
    }

    /// Returns the text of the Utf8 constant at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `index` does not name a Utf8 constant.
    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.constant(index) {
            Some(Constant::Utf8(value)) => Ok(value),
            _ => Err(malformed_error!("Constant #{} is not a Utf8 entry", index)),
        }
    }

    /// Returns the internal name of the Class constant at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `index` does not name a Class constant.
    pub fn class_name_at(&self, index: u16) -> Result<&str> {
        match self.constant(index) {
            Some(Constant::Class { name }) => self.utf8(*name),
            _ => Err(malformed_error!("Constant #{} is not a Class entry", index)),
        }
    }

    /// Internal name of this class.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `this_class` is invalid.
    pub fn class_name(&self) -> Result<&str> {
        self.class_name_at(self.this_class)
    }

    /// Internal name of the super class.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `super_class` is invalid.
    pub fn super_name(&self) -> Result<&str> {
        self.class_name_at(self.super_class)
    }

    /// Finds a method by name and descriptor.
    #[must_use]
    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MemberInfo> {
        find_member(self, &self.methods, name, Some(descriptor))
    }

    /// Finds a field by name.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<&MemberInfo> {
        find_member(self, &self.fields, name, None)
    }

    /// Finds the attribute called `name` in `attributes`.
    #[must_use]
    pub fn attribute<'a>(
        &self,
        attributes: &'a [AttributeInfo],
        name: &str,
    ) -> Option<&'a AttributeInfo> {
        attributes
            .iter()
            .find(|attribute| self.utf8(attribute.name_index).is_ok_and(|n| n == name))
    }

    /// Decodes the `Code` attribute of `method`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the method has no code or the attribute is corrupt.
    pub fn code(&self, method: &MemberInfo) -> Result<CodeAttribute> {
        let attribute = self
            .attribute(&method.attributes, "Code")
            .ok_or_else(|| {
                malformed_error!("Method #{} has no Code attribute", method.name_index)
            })?;

        let mut parser = Parser::new(&attribute.info);
        let max_stack = parser.read_be::<u16>()?;
        let max_locals = parser.read_be::<u16>()?;
        let code_length = parser.read_be::<u32>()? as usize;
        let code = parser.read_bytes(code_length)?.to_vec();

        let exception_table_length = parser.read_be::<u16>()?;
        parser.advance_by(usize::from(exception_table_length) * 8)?;
        let attributes = read_attributes(&mut parser)?;

        if parser.has_more_data() {
            return Err(malformed_error!("Trailing bytes in Code attribute"));
        }

        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table_length,
            attributes,
        })
    }

    /// Decodes the `BootstrapMethods` attribute, empty if the class has none.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the attribute is corrupt.
    pub fn bootstrap_methods(&self) -> Result<Vec<BootstrapMethod>> {
        let Some(attribute) = self.attribute(&self.attributes, "BootstrapMethods") else {
            return Ok(Vec::new());
        };

        let mut parser = Parser::new(&attribute.info);
        let count = parser.read_be::<u16>()?;
        let mut methods = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let handle = parser.read_be::<u16>()?;
            let argument_count = parser.read_be::<u16>()?;
            let mut arguments = Vec::with_capacity(usize::from(argument_count));
            for _ in 0..argument_count {
                arguments.push(parser.read_be::<u16>()?);
            }
            methods.push(BootstrapMethod { handle, arguments });
        }

        if parser.has_more_data() {
            return Err(malformed_error!("Trailing bytes in BootstrapMethods attribute"));
        }
        Ok(methods)
    }

    /// Decodes the `InnerClasses` attribute, empty if the class has none.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the attribute is corrupt.
    pub fn inner_classes(&self) -> Result<Vec<InnerClassInfo>> {
        let Some(attribute) = self.attribute(&self.attributes, "InnerClasses") else {
            return Ok(Vec::new());
        };

        let mut parser = Parser::new(&attribute.info);
        let count = parser.read_be::<u16>()?;
        let mut entries = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            entries.push(InnerClassInfo {
                inner: parser.read_be::<u16>()?,
                outer: parser.read_be::<u16>()?,
                name: parser.read_be::<u16>()?,
                access: parser.read_be::<u16>()?,
            });
        }
        Ok(entries)
    }
}

fn find_member<'a>(
    class: &ClassFile,
    members: &'a [MemberInfo],
    name: &str,
    descriptor: Option<&str>,
) -> Option<&'a MemberInfo> {
    members.iter().find(|member| {
        class.utf8(member.name_index).is_ok_and(|n| n == name)
            && descriptor.map_or(true, |d| {
                class.utf8(member.descriptor_index).is_ok_and(|m| m == d)
            })
    })
}

fn read_members(parser: &mut Parser) -> Result<Vec<MemberInfo>> {
    let count = parser.read_be::<u16>()?;
    let mut members = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let access_flags = parser.read_be::<u16>()?;
        let name_index = parser.read_be::<u16>()?;
        let descriptor_index = parser.read_be::<u16>()?;
        let attributes = read_attributes(parser)?;
        members.push(MemberInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        });
    }
    Ok(members)
}

fn read_attributes(parser: &mut Parser) -> Result<Vec<AttributeInfo>> {
    let count = parser.read_be::<u16>()?;
    let mut attributes = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let name_index = parser.read_be::<u16>()?;
        let length = parser.read_be::<u32>()? as usize;
        let info = parser.read_bytes(length)?.to_vec();
        attributes.push(AttributeInfo { name_index, info });
    }
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    /// `public class X extends Object`, nothing else.
    const MINIMAL: &[u8] = &[
        0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 51, 0, 5, 1, 0, 1, b'X', 7, 0, 1, 1, 0, 16, b'j', b'a',
        b'v', b'a', b'/', b'l', b'a', b'n', b'g', b'/', b'O', b'b', b'j', b'e', b'c', b't', 7, 0,
        3, 0, 0x21, 0, 2, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0,
    ];

    #[test]
    fn parse_minimal() {
        let class = ClassFile::parse(MINIMAL).unwrap();
        assert_eq!(class.major_version, 51);
        assert_eq!(class.pool_count(), 5);
        assert_eq!(class.class_name().unwrap(), "X");
        assert_eq!(class.super_name().unwrap(), "java/lang/Object");
        assert!(class.fields.is_empty());
        assert!(class.bootstrap_methods().unwrap().is_empty());
        assert!(class.inner_classes().unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_magic() {
        let mut data = MINIMAL.to_vec();
        data[0] = 0xCB;
        assert!(matches!(ClassFile::parse(&data), Err(Error::Malformed { .. })));
    }

    #[test]
    fn rejects_truncation() {
        for cut in [3, 9, 20, MINIMAL.len() - 1] {
            assert!(ClassFile::parse(&MINIMAL[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn rejects_trailing_data() {
        let mut data = MINIMAL.to_vec();
        data.push(0);
        assert!(matches!(ClassFile::parse(&data), Err(Error::Malformed { .. })));
    }

    #[test]
    fn wide_constant_slots() {
        let data = [
            0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 51, 0, 4, 5, 0, 0, 0, 0, 0, 0, 0, 42, 3, 0, 0, 0, 7,
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        let class = ClassFile::parse(&data).unwrap();
        assert_eq!(class.constant(1), Some(&Constant::Long(42)));
        assert_eq!(class.constant(2), None);
        assert_eq!(class.constant(3), Some(&Constant::Integer(7)));
    }
}
