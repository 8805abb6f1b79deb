//! Constant pool and constants for Java class files
//!
//! Every `intern_*` call is idempotent: an entry equal to one already in the
//! pool returns the existing index. Indices start at 1 and never move.

use super::error::{ConstPoolError, ConstPoolResult};
use std::collections::HashMap;

/// Highest index a `u16` constant_pool_count can describe (count = entries + 1).
pub const MAX_POOL_INDEX: usize = u16::MAX as usize - 1;

/// Longest encoded Utf8 entry; its length field is a `u16`.
pub const MAX_UTF8_LENGTH: usize = u16::MAX as usize;

/// Encoded length of `value` in the JVM's modified UTF-8.
pub fn modified_utf8_len(value: &str) -> usize {
    value
        .encode_utf16()
        .map(|unit| match unit {
            0x0001..=0x007f => 1,
            0x0000 | 0x0080..=0x07ff => 2,
            _ => 3,
        })
        .sum()
}

/// `value` in the JVM's modified UTF-8: NUL is `C0 80` and characters outside the
/// BMP are written as two encoded surrogates.
pub fn to_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007f => out.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                out.push(0xc0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                out.push(0xe0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    out
}

/// Decode modified UTF-8; `None` for malformed input, raw NUL bytes included.
pub fn from_modified_utf8(bytes: &[u8]) -> Option<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    let cont = |b: Option<&u8>| b.filter(|b| *b & 0xc0 == 0x80).map(|b| (*b & 0x3f) as u16);
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            0x01..=0x7f => {
                units.push(b as u16);
                i += 1;
            }
            0xc0..=0xdf => {
                let low = cont(bytes.get(i + 1))?;
                units.push(((b & 0x1f) as u16) << 6 | low);
                i += 2;
            }
            0xe0..=0xef => {
                let mid = cont(bytes.get(i + 1))?;
                let low = cont(bytes.get(i + 2))?;
                units.push(((b & 0x0f) as u16) << 12 | mid << 6 | low);
                i += 3;
            }
            _ => return None,
        }
    }
    String::from_utf16(&units).ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Long(i64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    NameAndType(u16, u16),
    /// Second slot of a Long entry; never serialized.
    Unusable,
}

pub mod constant_tags {
    pub const CONSTANT_UTF8: u8 = 1;
    pub const CONSTANT_INTEGER: u8 = 3;
    pub const CONSTANT_LONG: u8 = 5;
    pub const CONSTANT_CLASS: u8 = 7;
    pub const CONSTANT_STRING: u8 = 8;
    pub const CONSTANT_FIELDREF: u8 = 9;
    pub const CONSTANT_METHODREF: u8 = 10;
    pub const CONSTANT_NAMEANDTYPE: u8 = 12;
}

impl Constant {
    /// Number of pool indices this entry occupies.
    pub fn slots(&self) -> usize {
        match self {
            Constant::Long(_) => 2,
            _ => 1,
        }
    }

    pub fn tag_name(&self) -> &'static str {
        match self {
            Constant::Utf8(_) => "Utf8",
            Constant::Integer(_) => "Integer",
            Constant::Long(_) => "Long",
            Constant::Class(_) => "Class",
            Constant::String(_) => "String",
            Constant::FieldRef(..) => "Fieldref",
            Constant::MethodRef(..) => "Methodref",
            Constant::NameAndType(..) => "NameAndType",
            Constant::Unusable => "(unusable)",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConstantPool {
    pub(crate) constants: Vec<Constant>,
    index: HashMap<Constant, u16>,
    limit: usize,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::with_limit(MAX_POOL_INDEX)
    }

    /// Pool whose highest assignable index is `limit` (clamped to the format maximum).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            constants: Vec::with_capacity(64),
            index: HashMap::new(),
            limit: limit.min(MAX_POOL_INDEX),
        }
    }

    /// Number of occupied indices (a Long counts twice).
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Entry at a 1-based pool index.
    pub fn get(&self, index: u16) -> Option<&Constant> {
        if index == 0 {
            return None;
        }
        match self.constants.get(index as usize - 1) {
            Some(Constant::Unusable) | None => None,
            Some(c) => Some(c),
        }
    }

    pub fn lookup(&self, index: u16) -> ConstPoolResult<&Constant> {
        self.get(index).ok_or(ConstPoolError::InvalidIndex(index))
    }

    /// Entries with their indices, in index order, skipping Long continuation slots.
    pub fn entries(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.constants
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, Constant::Unusable))
            .map(|(i, c)| ((i + 1) as u16, c))
    }

    /// Resolve a Utf8 entry to its text.
    pub fn utf8(&self, index: u16) -> Option<&str> {
        match self.get(index) {
            Some(Constant::Utf8(s)) => Some(s),
            _ => None,
        }
    }

    /// Resolve a Class entry to its internal name.
    pub fn class_name(&self, index: u16) -> Option<&str> {
        match self.get(index) {
            Some(Constant::Class(name)) => self.utf8(*name),
            _ => None,
        }
    }

    /// Resolve a Fieldref/Methodref to (class, name, descriptor).
    pub fn member_ref(&self, index: u16) -> Option<(&str, &str, &str)> {
        match self.get(index)? {
            Constant::FieldRef(c, n) | Constant::MethodRef(c, n) => self.member_ref_parts(*c, *n),
            _ => None,
        }
    }

    /// Resolve a Class index and a NameAndType index to (class, name, descriptor).
    pub fn member_ref_parts(&self, class: u16, nat: u16) -> Option<(&str, &str, &str)> {
        let (name, desc) = match self.get(nat)? {
            Constant::NameAndType(n, d) => (*n, *d),
            _ => return None,
        };
        Some((self.class_name(class)?, self.utf8(name)?, self.utf8(desc)?))
    }

    fn intern(&mut self, constant: Constant) -> ConstPoolResult<u16> {
        if let Some(&idx) = self.index.get(&constant) {
            return Ok(idx);
        }
        let adding = constant.slots();
        if self.constants.len() + adding > self.limit {
            return Err(ConstPoolError::PoolOverflow {
                current: self.constants.len(),
                adding,
                max: self.limit,
            });
        }
        let idx = (self.constants.len() + 1) as u16;
        log::trace!("constant pool #{} = {:?}", idx, constant);
        self.constants.push(constant.clone());
        if adding == 2 {
            self.constants.push(Constant::Unusable);
        }
        self.index.insert(constant, idx);
        Ok(idx)
    }

    pub fn intern_utf8(&mut self, value: &str) -> ConstPoolResult<u16> {
        let length = modified_utf8_len(value);
        if length > MAX_UTF8_LENGTH {
            return Err(ConstPoolError::Utf8TooLong { length });
        }
        self.intern(Constant::Utf8(value.to_string()))
    }

    pub fn intern_class(&mut self, name: &str) -> ConstPoolResult<u16> {
        let name_index = self.intern_utf8(name)?;
        self.intern(Constant::Class(name_index))
    }

    pub fn intern_name_and_type(&mut self, name: &str, descriptor: &str) -> ConstPoolResult<u16> {
        let name_index = self.intern_utf8(name)?;
        let descriptor_index = self.intern_utf8(descriptor)?;
        self.intern(Constant::NameAndType(name_index, descriptor_index))
    }

    pub fn intern_field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> ConstPoolResult<u16> {
        let class_index = self.intern_class(class)?;
        let nat_index = self.intern_name_and_type(name, descriptor)?;
        self.intern(Constant::FieldRef(class_index, nat_index))
    }

    pub fn intern_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> ConstPoolResult<u16> {
        let class_index = self.intern_class(class)?;
        let nat_index = self.intern_name_and_type(name, descriptor)?;
        self.intern(Constant::MethodRef(class_index, nat_index))
    }

    pub fn intern_string(&mut self, value: &str) -> ConstPoolResult<u16> {
        let utf8_index = self.intern_utf8(value)?;
        self.intern(Constant::String(utf8_index))
    }

    pub fn intern_integer(&mut self, value: i32) -> ConstPoolResult<u16> {
        self.intern(Constant::Integer(value))
    }

    pub fn intern_long(&mut self, value: i64) -> ConstPoolResult<u16> {
        self.intern(Constant::Long(value))
    }
}

impl ConstantPool {
    /// Pool holding `constants` as read from an existing class file.
    pub fn from_constants(constants: Vec<Constant>) -> Self {
        let mut pool = Self::with_limit(MAX_POOL_INDEX);
        for (i, constant) in constants.iter().enumerate() {
            if !matches!(constant, Constant::Unusable) {
                pool.index.entry(constant.clone()).or_insert((i + 1) as u16);
            }
        }
        pool.constants = constants;
        pool
    }
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_dedup() {
        let mut pool = ConstantPool::new();
        let idx1 = pool.intern_utf8("hello").unwrap();
        assert_eq!(idx1, 1);
        let idx2 = pool.intern_utf8("hello").unwrap();
        assert_eq!(idx2, 1);
        let idx3 = pool.intern_utf8("world").unwrap();
        assert_eq!(idx3, 2);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_method_ref_shares_components() {
        let mut pool = ConstantPool::new();
        let m1 = pool.intern_method_ref("java/io/PrintStream", "println", "(I)V").unwrap();
        let before = pool.len();
        let m2 = pool.intern_method_ref("java/io/PrintStream", "println", "(I)V").unwrap();
        assert_eq!(m1, m2);
        assert_eq!(pool.len(), before);

        let m3 = pool.intern_method_ref("java/io/PrintStream", "println", "(J)V").unwrap();
        assert_ne!(m1, m3);
        // class + name reused, only the new descriptor, NameAndType and Methodref are added
        assert_eq!(pool.len(), before + 3);
        assert_eq!(pool.member_ref(m3), Some(("java/io/PrintStream", "println", "(J)V")));
    }

    #[test]
    fn test_string_and_utf8_are_distinct_kinds() {
        let mut pool = ConstantPool::new();
        let utf8 = pool.intern_utf8("x").unwrap();
        let s = pool.intern_string("x").unwrap();
        assert_ne!(utf8, s);
        assert_eq!(pool.get(s), Some(&Constant::String(utf8)));
    }

    #[test]
    fn test_long_takes_two_slots() {
        let mut pool = ConstantPool::new();
        let l = pool.intern_long(1 << 40).unwrap();
        let next = pool.intern_integer(7).unwrap();
        assert_eq!(l, 1);
        assert_eq!(next, 3);
        assert_eq!(pool.get(2), None);
        assert_eq!(pool.entries().count(), 2);
    }

    #[test]
    fn test_overflow_at_limit() {
        let mut pool = ConstantPool::with_limit(3);
        pool.intern_integer(1).unwrap();
        pool.intern_integer(2).unwrap();
        pool.intern_integer(3).unwrap();
        // re-interning an existing value never overflows
        assert_eq!(pool.intern_integer(2).unwrap(), 2);
        let err = pool.intern_integer(4).unwrap_err();
        assert!(matches!(err, ConstPoolError::PoolOverflow { current: 3, adding: 1, max: 3 }));
    }

    #[test]
    fn test_overflow_full_index_space() {
        let mut pool = ConstantPool::new();
        for v in 0..MAX_POOL_INDEX as i32 {
            pool.intern_integer(v).unwrap();
        }
        assert_eq!(pool.len(), MAX_POOL_INDEX);
        let err = pool.intern_integer(-1).unwrap_err();
        assert!(matches!(err, ConstPoolError::PoolOverflow { .. }));
    }

    #[test]
    fn test_utf8_length_limit() {
        let mut pool = ConstantPool::new();
        assert!(pool.intern_utf8(&"a".repeat(MAX_UTF8_LENGTH)).is_ok());
        let err = pool.intern_utf8(&"b".repeat(MAX_UTF8_LENGTH + 1)).unwrap_err();
        assert_eq!(err, ConstPoolError::Utf8TooLong { length: MAX_UTF8_LENGTH + 1 });
        // NUL takes two bytes once encoded
        let err = pool.intern_string(&"\0".repeat(40_000)).unwrap_err();
        assert_eq!(err, ConstPoolError::Utf8TooLong { length: 80_000 });
    }

    #[test]
    fn test_modified_utf8_encoding() {
        assert_eq!(to_modified_utf8("a\0b"), vec![b'a', 0xc0, 0x80, b'b']);
        assert_eq!(to_modified_utf8("\u{e9}"), vec![0xc3, 0xa9]);
        // U+1F600 as the surrogates D83D DE00
        assert_eq!(to_modified_utf8("\u{1F600}"), vec![0xed, 0xa0, 0xbd, 0xed, 0xb8, 0x80]);
        let text = "a\0b\u{1F600}\u{20ac}";
        assert_eq!(modified_utf8_len(text), to_modified_utf8(text).len());
        assert_eq!(from_modified_utf8(&to_modified_utf8(text)).as_deref(), Some(text));
        assert_eq!(from_modified_utf8(&[b'a', 0, b'b']), None);
        assert_eq!(from_modified_utf8(&[0xf0, 0x9f, 0x98, 0x80]), None);
    }
}
