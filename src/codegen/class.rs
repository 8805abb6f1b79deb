//! Core classfile structure

use super::constpool::ConstantPool;
use super::defs::{access_flags, JAVA_1_8, MAGIC};
use super::method::MethodInfo;

/// One class as it will be serialized. Interfaces, fields and class attributes are
/// always empty for generated classes.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub methods: Vec<MethodInfo>,
}

impl ClassFile {
    pub fn new() -> Self {
        Self {
            magic: MAGIC,
            minor_version: 0,
            major_version: JAVA_1_8,
            constant_pool: ConstantPool::new(),
            access_flags: access_flags::ACC_PUBLIC | access_flags::ACC_SUPER,
            this_class: 0,
            super_class: 0,
            methods: Vec::new(),
        }
    }

    /// Internal name of this class, when `this_class` is valid.
    pub fn name(&self) -> Option<&str> {
        self.constant_pool.class_name(self.this_class)
    }

    pub fn super_name(&self) -> Option<&str> {
        self.constant_pool.class_name(self.super_class)
    }

    /// Method with the given name, resolving names through the constant pool.
    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| self.constant_pool.utf8(m.name_index) == Some(name))
    }
}

impl Default for ClassFile {
    fn default() -> Self {
        Self::new()
    }
}
