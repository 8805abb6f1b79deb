//! Generic classfile-specific definitions

/// Header of Java class file (magic number)
pub const MAGIC: u32 = 0xCAFEBABE;

/// Name of a constructor
pub const CONSTRUCTOR_METHOD_NAME: &str = "<init>";

/// Name of the JVM entry point
pub const MAIN_METHOD_NAME: &str = "main";

/// Name of the method body attribute
pub const CODE_ATTRIBUTE_NAME: &str = "Code";

/// JVM version constants
pub mod major_versions {
    pub const JAVA_1_4: u16 = 48;
    pub const JAVA_5_0: u16 = 49;
    pub const JAVA_6_0: u16 = 50;
    pub const JAVA_7: u16 = 51;
    pub const JAVA_8: u16 = 52;
    pub const JAVA_11: u16 = 55;
    pub const JAVA_17: u16 = 61;
    pub const JAVA_21: u16 = 65;
}

pub const JAVA_1_8: u16 = major_versions::JAVA_8;

/// Class and method access flags
pub mod access_flags {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_PRIVATE: u16 = 0x0002;
    pub const ACC_PROTECTED: u16 = 0x0004;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_SUPER: u16 = 0x0020;
}

/// Major version for a Java release number as written on the command line (`8`, `1.8`, `17`).
pub fn major_version_for_release(release: &str) -> Option<u16> {
    let release = release.trim();
    let feature: u16 = release.strip_prefix("1.").unwrap_or(release).parse().ok()?;
    if (1..=30).contains(&feature) {
        Some(44 + feature)
    } else {
        None
    }
}
