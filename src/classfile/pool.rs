//! De-duplicating constant pool and bootstrap method table.
//!
//! [`ConstantPool`] hands out stable indices: adding an entry that is already present returns
//! the existing index, so a class only ever carries one copy of each constant. A pool can be
//! seeded from a parsed class file with [`ConstantPool::from_entries`], which keeps every seeded
//! entry at its original index. This is what allows a generator to address constants by a
//! layout computed before the class was read back.
//!
//! Both tables fail with [`crate::Error::OversizedArtifact`] the moment an addition would push
//! them past what their `u2` count field can express.

use std::collections::HashMap;

use crate::{
    classfile::{
        constant::{Constant, ReferenceKind},
        MAX_POOL_COUNT, MAX_TABLE_ENTRIES,
    },
    file::writer::ByteWriter,
    Error, Result,
};

/// Constant pool under construction.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    /// Entries by index, index 0 and the upper half of wide entries are `None`
    entries: Vec<Option<Constant>>,
    /// First index at which each distinct constant appears
    lookup: HashMap<Constant, u16>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        ConstantPool {
            entries: vec![None],
            lookup: HashMap::new(),
        }
    }

    /// Creates a pool holding `entries` at their original indices.
    ///
    /// `entries[0]` must be `None`, just like the slot after a `Long` or `Double`. When the
    /// same constant occurs more than once the first index wins for later lookups.
    ///
    /// # Errors
    /// Returns [`crate::Error::OversizedArtifact`] if the table does not fit a class file, or
    /// [`crate::Error::Malformed`] if the wide-entry layout is inconsistent.
    pub fn from_entries(entries: &[Option<Constant>]) -> Result<Self> {
        if entries.len() > MAX_POOL_COUNT {
            return Err(Error::OversizedArtifact(format!(
                "constant pool count {} exceeds {MAX_POOL_COUNT}",
                entries.len()
            )));
        }
        if entries.first().is_some_and(Option::is_some) {
            return Err(malformed_error!("Constant pool index 0 must be unused"));
        }

        let mut pool = ConstantPool {
            entries: Vec::with_capacity(entries.len().max(1)),
            lookup: HashMap::with_capacity(entries.len()),
        };
        pool.entries.push(None);

        let mut index = 1;
        while index < entries.len() {
            match &entries[index] {
                Some(constant) => {
                    let slots = constant.slots();
                    if slots == 2 && entries.get(index + 1).is_some_and(Option::is_some) {
                        return Err(malformed_error!(
                            "Wide constant at {} overlaps its successor",
                            index
                        ));
                    }
                    pool.lookup.entry(constant.clone()).or_insert(index as u16);
                    pool.entries.push(Some(constant.clone()));
                    if slots == 2 {
                        pool.entries.push(None);
                    }
                    index += slots;
                }
                None => {
                    return Err(malformed_error!("Constant pool hole at index {}", index));
                }
            }
        }

        Ok(pool)
    }

    /// Value of the `constant_pool_count` field, one more than the highest used index.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Returns the entry stored at `index`.
    #[must_use]
    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries
            .get(usize::from(index))
            .and_then(Option::as_ref)
    }

    /// Returns the text of the Utf8 entry at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `index` does not name a Utf8 entry.
    pub fn utf8_at(&self, index: u16) -> Result<&str> {
        match self.get(index) {
            Some(Constant::Utf8(value)) => Ok(value),
            _ => Err(malformed_error!("Constant #{} is not a Utf8 entry", index)),
        }
    }

    /// Returns the internal name of the Class entry at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `index` does not name a Class entry.
    pub fn class_name_at(&self, index: u16) -> Result<&str> {
        match self.get(index) {
            Some(Constant::Class { name }) => self.utf8_at(*name),
            _ => Err(malformed_error!("Constant #{} is not a Class entry", index)),
        }
    }

    /// Adds `constant` unless an equal entry exists, returning its index either way.
    ///
    /// # Errors
    /// Returns [`crate::Error::OversizedArtifact`] if the entry does not fit below the
    /// 65535 count limit.
    pub fn add(&mut self, constant: Constant) -> Result<u16> {
        if let Some(index) = self.lookup.get(&constant) {
            return Ok(*index);
        }

        let index = self.entries.len();
        let slots = constant.slots();
        if index + slots > MAX_POOL_COUNT {
            return Err(Error::OversizedArtifact(format!(
                "constant pool count would reach {}, the limit is {MAX_POOL_COUNT}",
                index + slots
            )));
        }

        let index = index as u16;
        self.lookup.insert(constant.clone(), index);
        self.entries.push(Some(constant));
        if slots == 2 {
            self.entries.push(None);
        }
        Ok(index)
    }

    /// Adds a Utf8 entry.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn utf8(&mut self, value: &str) -> Result<u16> {
        self.add(Constant::Utf8(value.to_string()))
    }

    /// Adds an Integer entry.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn integer(&mut self, value: i32) -> Result<u16> {
        self.add(Constant::Integer(value))
    }

    /// Adds a String entry and its Utf8 payload.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn string(&mut self, value: &str) -> Result<u16> {
        let value = self.utf8(value)?;
        self.add(Constant::String { value })
    }

    /// Adds a Class entry for an internal name or array descriptor.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn class(&mut self, internal_name: &str) -> Result<u16> {
        let name = self.utf8(internal_name)?;
        self.add(Constant::Class { name })
    }

    /// Adds a NameAndType entry.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name = self.utf8(name)?;
        let descriptor = self.utf8(descriptor)?;
        self.add(Constant::NameAndType { name, descriptor })
    }

    /// Adds a Fieldref entry.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        let class = self.class(owner)?;
        let name_and_type = self.name_and_type(name, descriptor)?;
        self.add(Constant::Fieldref {
            class,
            name_and_type,
        })
    }

    /// Adds a Methodref entry.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        let class = self.class(owner)?;
        let name_and_type = self.name_and_type(name, descriptor)?;
        self.add(Constant::Methodref {
            class,
            name_and_type,
        })
    }

    /// Adds an InterfaceMethodref entry.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn interface_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16> {
        let class = self.class(owner)?;
        let name_and_type = self.name_and_type(name, descriptor)?;
        self.add(Constant::InterfaceMethodref {
            class,
            name_and_type,
        })
    }

    /// Adds a MethodHandle entry pointing at a method.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn method_handle(
        &mut self,
        kind: ReferenceKind,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> Result<u16> {
        let reference = if interface {
            self.interface_method_ref(owner, name, descriptor)?
        } else {
            self.method_ref(owner, name, descriptor)?
        };
        self.add(Constant::MethodHandle { kind, reference })
    }

    /// Adds a Dynamic entry bound to the bootstrap method at `bootstrap`.
    ///
    /// # Errors
    /// See [`ConstantPool::add`].
    pub fn dynamic(&mut self, bootstrap: u16, name: &str, descriptor: &str) -> Result<u16> {
        let name_and_type = self.name_and_type(name, descriptor)?;
        self.add(Constant::Dynamic {
            bootstrap,
            name_and_type,
        })
    }

    /// Writes `constant_pool_count` followed by every entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::EncodingFailure`] if a Utf8 entry is too long.
    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.u2_len(self.count())?;
        for constant in self.entries.iter().flatten() {
            constant.write(writer)?;
        }
        Ok(())
    }
}

/// One record of the `BootstrapMethods` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BootstrapMethod {
    /// MethodHandle index of the bootstrap method
    pub handle: u16,
    /// Pool indices of the static arguments
    pub arguments: Vec<u16>,
}

/// De-duplicating `BootstrapMethods` table.
#[derive(Debug, Clone, Default)]
pub struct BootstrapMethods {
    methods: Vec<BootstrapMethod>,
    lookup: HashMap<BootstrapMethod, u16>,
}

impl BootstrapMethods {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table holding `methods` at their original positions, first occurrence wins.
    ///
    /// # Errors
    /// Returns [`crate::Error::OversizedArtifact`] if there are more than 65535 records.
    pub fn from_methods(methods: Vec<BootstrapMethod>) -> Result<Self> {
        if methods.len() > MAX_TABLE_ENTRIES {
            return Err(Error::OversizedArtifact(format!(
                "{} bootstrap methods exceed {MAX_TABLE_ENTRIES}",
                methods.len()
            )));
        }

        let mut lookup = HashMap::with_capacity(methods.len());
        for (index, method) in methods.iter().enumerate() {
            lookup.entry(method.clone()).or_insert(index as u16);
        }
        Ok(BootstrapMethods { methods, lookup })
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Records in table order.
    #[must_use]
    pub fn methods(&self) -> &[BootstrapMethod] {
        &self.methods
    }

    /// Adds a record unless an equal one exists, returning its index.
    ///
    /// # Errors
    /// Returns [`crate::Error::OversizedArtifact`] if the table is full or the record has more
    /// than 65535 arguments.
    pub fn add(&mut self, handle: u16, arguments: Vec<u16>) -> Result<u16> {
        if arguments.len() > MAX_TABLE_ENTRIES {
            return Err(Error::OversizedArtifact(format!(
                "bootstrap method with {} arguments exceeds {MAX_TABLE_ENTRIES}",
                arguments.len()
            )));
        }

        let method = BootstrapMethod { handle, arguments };
        if let Some(index) = self.lookup.get(&method) {
            return Ok(*index);
        }

        if self.methods.len() >= MAX_TABLE_ENTRIES {
            return Err(Error::OversizedArtifact(format!(
                "bootstrap method table exceeds {MAX_TABLE_ENTRIES} entries"
            )));
        }

        let index = self.methods.len() as u16;
        self.lookup.insert(method.clone(), index);
        self.methods.push(method);
        Ok(index)
    }

    /// Writes the attribute body (everything after `attribute_length`).
    ///
    /// # Errors
    /// Returns [`crate::Error::EncodingFailure`] if a count does not fit its field.
    pub fn write_body(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.u2_len(self.methods.len())?;
        for method in &self.methods {
            writer.u2(method.handle);
            writer.u2_len(method.arguments.len())?;
            for argument in &method.arguments {
                writer.u2(*argument);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_deduplicates() {
        let mut pool = ConstantPool::new();
        let first = pool.class("java/lang/Enum").unwrap();
        let second = pool.class("java/lang/Enum").unwrap();

        assert_eq!(first, second);
        assert_eq!(first, 2);
        assert_eq!(pool.count(), 3);
        assert_eq!(pool.class_name_at(first).unwrap(), "java/lang/Enum");
    }

    #[test]
    fn members_share_name_and_type() {
        let mut pool = ConstantPool::new();
        let get = "(Ljava/lang/Object;)Ljava/lang/Object;";
        let field = pool
            .method_ref("java/lang/reflect/Field", "get", get)
            .unwrap();
        let before = pool.count();
        let map = pool.method_ref("java/util/HashMap", "get", get).unwrap();

        assert_ne!(field, map);
        // Utf8 + Class for HashMap and the Methodref itself.
        assert_eq!(pool.count(), before + 3);
    }

    #[test]
    fn wide_entries_reserve_two_slots() {
        let mut pool = ConstantPool::new();
        let long = pool.add(Constant::Long(5)).unwrap();
        let next = pool.integer(5).unwrap();

        assert_eq!(long, 1);
        assert_eq!(next, 3);
        assert!(pool.get(2).is_none());
    }

    #[test]
    fn overflow_is_reported() {
        let mut pool = ConstantPool::new();
        for i in 0..(MAX_POOL_COUNT - 1) {
            pool.integer(i as i32).unwrap();
        }
        assert_eq!(pool.count(), MAX_POOL_COUNT);
        // Existing constants still resolve.
        assert_eq!(pool.integer(0).unwrap(), 1);
        assert!(matches!(pool.integer(-1), Err(Error::OversizedArtifact(_))));
    }

    #[test]
    fn long_does_not_fit_last_slot() {
        let mut pool = ConstantPool::new();
        for i in 0..(MAX_POOL_COUNT - 2) {
            pool.integer(i as i32).unwrap();
        }
        assert!(matches!(
            pool.add(Constant::Long(1)),
            Err(Error::OversizedArtifact(_))
        ));
        pool.integer(-1).unwrap();
    }

    #[test]
    fn seeded_pool_keeps_indices() {
        let entries = vec![
            None,
            Some(Constant::Utf8("A".to_string())),
            Some(Constant::Long(9)),
            None,
            Some(Constant::Utf8("A".to_string())),
            Some(Constant::Class { name: 1 }),
        ];
        let mut pool = ConstantPool::from_entries(&entries).unwrap();

        assert_eq!(pool.count(), 6);
        assert_eq!(pool.utf8("A").unwrap(), 1);
        assert_eq!(pool.class("A").unwrap(), 5);
        assert_eq!(pool.utf8("B").unwrap(), 6);
    }

    #[test]
    fn seeded_pool_rejects_holes() {
        let entries = vec![None, None, Some(Constant::Integer(1))];
        assert!(matches!(
            ConstantPool::from_entries(&entries),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn bootstrap_table() {
        let mut table = BootstrapMethods::new();
        assert_eq!(table.add(7, vec![1]).unwrap(), 0);
        assert_eq!(table.add(7, vec![2]).unwrap(), 1);
        assert_eq!(table.add(7, vec![1]).unwrap(), 0);

        let mut writer = ByteWriter::new();
        table.write_body(&mut writer).unwrap();
        assert_eq!(
            writer.finish(),
            vec![0, 2, 0, 7, 0, 1, 0, 1, 0, 7, 0, 1, 0, 2]
        );
    }

    #[test]
    fn seeded_bootstrap_table() {
        let methods = vec![
            BootstrapMethod {
                handle: 3,
                arguments: vec![4],
            },
            BootstrapMethod {
                handle: 3,
                arguments: vec![5],
            },
        ];
        let mut table = BootstrapMethods::from_methods(methods).unwrap();
        assert_eq!(table.add(3, vec![5]).unwrap(), 1);
        assert_eq!(table.add(3, vec![4, 5]).unwrap(), 2);
        assert_eq!(table.len(), 3);
    }
}
