//! Trait-based serialization for classfile structures

use super::class::ClassFile;
use super::constpool::{constant_tags::*, to_modified_utf8, Constant, ConstantPool};
use super::error::CodeGenResult;
use std::io::Write;
use std::path::{Path, PathBuf};

/// An object which can be written into a classfile.
pub trait ClassfileWritable {
    /// Writes the bytes of this object into the given buffer.
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()>;

    /// Writes the bytes of this object into a newly created buffer.
    fn to_classfile_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        // a Vec sink only fails on an over-long Utf8 entry, which the pool refuses to intern
        let _ = self.write_to_classfile(&mut buffer);
        buffer
    }
}

impl ClassfileWritable for ClassFile {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        buffer.write_all(&self.magic.to_be_bytes())?;
        buffer.write_all(&self.minor_version.to_be_bytes())?;
        buffer.write_all(&self.major_version.to_be_bytes())?;

        self.constant_pool.write_to_classfile(buffer)?;

        buffer.write_all(&self.access_flags.to_be_bytes())?;
        buffer.write_all(&self.this_class.to_be_bytes())?;
        buffer.write_all(&self.super_class.to_be_bytes())?;

        // interfaces, fields
        buffer.write_all(&0u16.to_be_bytes())?;
        buffer.write_all(&0u16.to_be_bytes())?;

        buffer.write_all(&(self.methods.len() as u16).to_be_bytes())?;
        for method in &self.methods {
            buffer.write_all(&method.to_bytes())?;
        }

        // class attributes
        buffer.write_all(&0u16.to_be_bytes())?;
        Ok(())
    }
}

impl ClassfileWritable for ConstantPool {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        let count = (self.constants.len() + 1) as u16;
        buffer.write_all(&count.to_be_bytes())?;
        for constant in &self.constants {
            constant.write_to_classfile(buffer)?;
        }
        Ok(())
    }
}

impl ClassfileWritable for Constant {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        match self {
            Constant::Utf8(value) => {
                let utf8_bytes = to_modified_utf8(value);
                let length = u16::try_from(utf8_bytes.len()).map_err(|_| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("Utf8 constant of {} bytes does not fit its length field", utf8_bytes.len()),
                    )
                })?;
                buffer.write_all(&[CONSTANT_UTF8])?;
                buffer.write_all(&length.to_be_bytes())?;
                buffer.write_all(&utf8_bytes)?;
            }
            Constant::Integer(value) => {
                buffer.write_all(&[CONSTANT_INTEGER])?;
                buffer.write_all(&value.to_be_bytes())?;
            }
            Constant::Long(value) => {
                buffer.write_all(&[CONSTANT_LONG])?;
                buffer.write_all(&value.to_be_bytes())?;
            }
            Constant::Class(name_index) => {
                buffer.write_all(&[CONSTANT_CLASS])?;
                buffer.write_all(&name_index.to_be_bytes())?;
            }
            Constant::String(string_index) => {
                buffer.write_all(&[CONSTANT_STRING])?;
                buffer.write_all(&string_index.to_be_bytes())?;
            }
            Constant::FieldRef(class_index, name_and_type_index) => {
                buffer.write_all(&[CONSTANT_FIELDREF])?;
                buffer.write_all(&class_index.to_be_bytes())?;
                buffer.write_all(&name_and_type_index.to_be_bytes())?;
            }
            Constant::MethodRef(class_index, name_and_type_index) => {
                buffer.write_all(&[CONSTANT_METHODREF])?;
                buffer.write_all(&class_index.to_be_bytes())?;
                buffer.write_all(&name_and_type_index.to_be_bytes())?;
            }
            Constant::NameAndType(name_index, descriptor_index) => {
                buffer.write_all(&[CONSTANT_NAMEANDTYPE])?;
                buffer.write_all(&name_index.to_be_bytes())?;
                buffer.write_all(&descriptor_index.to_be_bytes())?;
            }
            // the second slot of a Long has no bytes of its own
            Constant::Unusable => {}
        }
        Ok(())
    }
}

pub fn class_file_to_bytes(class_file: &ClassFile) -> Vec<u8> {
    class_file.to_classfile_bytes()
}

/// Path of the `.class` file for internal class name `name` below `dir`.
pub fn class_file_path(dir: &Path, name: &str) -> PathBuf {
    let mut path = dir.to_path_buf();
    for part in name.split('/') {
        path.push(part);
    }
    path.set_extension("class");
    path
}

/// Write `class_file` below `dir` as `<name>.class`.
///
/// The bytes go to a temporary file in the target directory which is then renamed
/// into place, so a failed write never leaves a partial class file behind.
pub fn write_class_file(dir: &Path, class_file: &ClassFile) -> CodeGenResult<PathBuf> {
    let name = class_file.name().unwrap_or("Main");
    let path = class_file_path(dir, name);
    let parent = path.parent().unwrap_or(dir);
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    class_file.write_to_classfile(&mut tmp)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&path).map_err(|e| e.error)?;
    log::debug!("wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_class_layout() {
        let mut class = ClassFile::new();
        class.this_class = class.constant_pool.intern_class("Empty").unwrap();
        class.super_class = class.constant_pool.intern_class("java/lang/Object").unwrap();
        let bytes = class_file_to_bytes(&class);
        assert_eq!(&bytes[0..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 52]);
        // four pool entries -> count 5
        assert_eq!(&bytes[8..10], &[0, 5]);
        let tail = &bytes[bytes.len() - 14..];
        assert_eq!(tail, &[0x00, 0x21, 0, 2, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_long_constant_is_written_once() {
        let mut pool = ConstantPool::new();
        pool.intern_long(-2).unwrap();
        let bytes = pool.to_classfile_bytes();
        // count covers both slots, but only one tagged entry is written
        assert_eq!(bytes, vec![0, 3, CONSTANT_LONG, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe]);
    }

    #[test]
    fn test_utf8_entry_uses_modified_encoding() {
        let mut pool = ConstantPool::new();
        pool.intern_utf8("a\0\u{1F600}").unwrap();
        let bytes = pool.to_classfile_bytes();
        assert_eq!(
            bytes,
            vec![0, 2, CONSTANT_UTF8, 0, 9, b'a', 0xc0, 0x80, 0xed, 0xa0, 0xbd, 0xed, 0xb8, 0x80]
        );
    }

    #[test]
    fn test_class_file_path_follows_packages() {
        let path = class_file_path(Path::new("out"), "demo/Hello");
        assert_eq!(path, Path::new("out").join("demo").join("Hello.class"));
    }

    #[test]
    fn test_write_class_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut class = ClassFile::new();
        class.this_class = class.constant_pool.intern_class("demo/Written").unwrap();
        class.super_class = class.constant_pool.intern_class("java/lang/Object").unwrap();
        let path = write_class_file(dir.path(), &class).unwrap();
        assert!(path.ends_with("demo/Written.class"));
        assert_eq!(std::fs::read(&path).unwrap(), class_file_to_bytes(&class));
        // nothing but the class file is left in the package directory
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
