use crate::codegen::class::ClassFile;
use crate::codegen::constpool::{modified_utf8_len, Constant, ConstantPool, MAX_UTF8_LENGTH};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConstantPoolVerifyError {
    #[error("Invalid constant pool index {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("Invalid constant pool index type {index}: expected {expected}, found {found}")]
    InvalidConstantPoolIndexType { index: u16, expected: &'static str, found: &'static str },
    #[error("Long constant at {0} is not followed by its continuation slot")]
    MissingLongContinuation(u16),
    #[error("Utf8 constant {index} encodes to {length} bytes, above the 65535-byte limit")]
    Utf8TooLong { index: u16, length: usize },
}

pub type Result<T> = std::result::Result<T, ConstantPoolVerifyError>;

/// Verify the ClassFile ConstantPool
pub fn verify(class_file: &ClassFile) -> Result<()> {
    let pool = &class_file.constant_pool;
    for (index, constant) in pool.entries() {
        match constant {
            Constant::Class(name_index) => expect(pool, *name_index, "Utf8")?,
            Constant::String(string_index) => expect(pool, *string_index, "Utf8")?,
            Constant::FieldRef(class_index, nat_index) | Constant::MethodRef(class_index, nat_index) => {
                expect(pool, *class_index, "Class")?;
                expect(pool, *nat_index, "NameAndType")?;
            }
            Constant::NameAndType(name_index, desc_index) => {
                expect(pool, *name_index, "Utf8")?;
                expect(pool, *desc_index, "Utf8")?;
            }
            Constant::Long(_) => {
                if !matches!(pool.constants.get(index as usize), Some(Constant::Unusable)) {
                    return Err(ConstantPoolVerifyError::MissingLongContinuation(index));
                }
            }
            Constant::Utf8(value) => {
                let length = modified_utf8_len(value);
                if length > MAX_UTF8_LENGTH {
                    return Err(ConstantPoolVerifyError::Utf8TooLong { index, length });
                }
            }
            Constant::Integer(_) | Constant::Unusable => {}
        }
    }
    Ok(())
}

/// Check that `index` names an entry whose tag is `expected`.
pub fn expect(pool: &ConstantPool, index: u16, expected: &'static str) -> Result<()> {
    let found = pool
        .get(index)
        .ok_or(ConstantPoolVerifyError::InvalidConstantPoolIndex(index))?
        .tag_name();
    if found != expected {
        return Err(ConstantPoolVerifyError::InvalidConstantPoolIndexType { index, expected, found });
    }
    Ok(())
}

/// Like [`expect`], accepting any of `expected`.
pub fn expect_any(pool: &ConstantPool, index: u16, expected: &[&'static str]) -> Result<()> {
    let found = pool
        .get(index)
        .ok_or(ConstantPoolVerifyError::InvalidConstantPoolIndex(index))?
        .tag_name();
    if !expected.contains(&found) {
        return Err(ConstantPoolVerifyError::InvalidConstantPoolIndexType {
            index,
            expected: expected.first().copied().unwrap_or("constant"),
            found,
        });
    }
    Ok(())
}
