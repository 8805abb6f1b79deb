use super::constant_pool::{self, ConstantPoolVerifyError};
use super::methods::{self, MethodVerifyError};
use crate::codegen::class::ClassFile;
use crate::codegen::defs::MAGIC;

/// Java 1.1 through Java 30.
const SUPPORTED_MAJOR_VERSIONS: std::ops::RangeInclusive<u16> = 45..=74;

pub type VerifyResult<T> = Result<T, VerifyError>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Bad magic 0x{0:08x}")]
    BadMagic(u32),
    #[error("Unsupported class file version {0}")]
    UnsupportedVersion(u16),
    #[error("this_class: {0}")]
    ThisClass(ConstantPoolVerifyError),
    #[error("super_class: {0}")]
    SuperClass(ConstantPoolVerifyError),
    #[error(transparent)]
    ConstantPool(#[from] ConstantPoolVerifyError),
    #[error(transparent)]
    Method(#[from] MethodVerifyError),
}

/// Verify the ClassFile by orchestrating all sub-verifiers
pub fn verify(class_file: &ClassFile) -> VerifyResult<()> {
    if class_file.magic != MAGIC {
        return Err(VerifyError::BadMagic(class_file.magic));
    }
    if !SUPPORTED_MAJOR_VERSIONS.contains(&class_file.major_version) {
        return Err(VerifyError::UnsupportedVersion(class_file.major_version));
    }
    constant_pool::verify(class_file)?;
    let pool = &class_file.constant_pool;
    constant_pool::expect(pool, class_file.this_class, "Class").map_err(VerifyError::ThisClass)?;
    constant_pool::expect(pool, class_file.super_class, "Class").map_err(VerifyError::SuperClass)?;
    methods::verify(class_file)?;
    log::trace!(
        "verified {} ({} methods)",
        class_file.name().unwrap_or("<unnamed>"),
        class_file.methods.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ClassFile {
        let mut class = ClassFile::new();
        class.this_class = class.constant_pool.intern_class("Min").unwrap();
        class.super_class = class.constant_pool.intern_class("java/lang/Object").unwrap();
        class
    }

    #[test]
    fn test_minimal_class_verifies() {
        assert_eq!(verify(&minimal()), Ok(()));
    }

    #[test]
    fn test_this_class_must_be_class() {
        let mut class = minimal();
        class.this_class = 1;
        assert!(matches!(verify(&class), Err(VerifyError::ThisClass(_))));
    }

    #[test]
    fn test_missing_super_class() {
        let mut class = minimal();
        class.super_class = 0;
        assert!(matches!(verify(&class), Err(VerifyError::SuperClass(ConstantPoolVerifyError::InvalidConstantPoolIndex(0)))));
    }

    #[test]
    fn test_version_range() {
        let mut class = minimal();
        class.major_version = 12;
        assert_eq!(verify(&class), Err(VerifyError::UnsupportedVersion(12)));
    }
}
