//! Generator configuration

use crate::codegen::constpool::MAX_POOL_INDEX;
use crate::codegen::defs::{access_flags, major_version_for_release, JAVA_1_8};
use crate::codegen::descriptor::OBJECT_CLASS;

/// Options that shape the generated class file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Class-file major version (52 = Java 8).
    pub major_version: u16,
    pub super_class: String,
    pub class_access_flags: u16,
    /// Add `<init>()V` calling the superclass constructor.
    pub emit_default_constructor: bool,
    /// Run the structural verifier before bytes leave the generator.
    pub verify_output: bool,
    /// Log every emitted instruction at debug level.
    pub debug_code: bool,
    /// Highest constant-pool index the generator may assign.
    pub constant_pool_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            major_version: JAVA_1_8,
            super_class: OBJECT_CLASS.to_string(),
            class_access_flags: access_flags::ACC_PUBLIC | access_flags::ACC_SUPER,
            emit_default_constructor: true,
            verify_output: true,
            debug_code: false,
            constant_pool_limit: MAX_POOL_INDEX,
        }
    }
}

impl Config {
    /// Defaults overridden by `JCLASSGEN_DEBUG_CODE`, `JCLASSGEN_NO_VERIFY` and
    /// `JCLASSGEN_TARGET` (a Java release such as `8` or `17`).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if std::env::var("JCLASSGEN_DEBUG_CODE").is_ok() {
            config.debug_code = true;
        }
        if std::env::var("JCLASSGEN_NO_VERIFY").is_ok() {
            log::warn!("JCLASSGEN_NO_VERIFY set: structural verification disabled");
            config.verify_output = false;
        }
        if let Ok(target) = std::env::var("JCLASSGEN_TARGET") {
            match major_version_for_release(&target) {
                Some(major) => config.major_version = major,
                None => log::warn!("ignoring unknown JCLASSGEN_TARGET '{}'", target),
            }
        }
        config
    }

    pub fn with_target(mut self, major_version: u16) -> Self {
        self.major_version = major_version;
        self
    }

    pub fn with_constant_pool_limit(mut self, limit: usize) -> Self {
        self.constant_pool_limit = limit;
        self
    }

    pub fn without_default_constructor(mut self) -> Self {
        self.emit_default_constructor = false;
        self
    }
}
