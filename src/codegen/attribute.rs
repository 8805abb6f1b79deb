//! Code attribute of a method

use super::code::FinishedCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    /// Constant-pool index of the `Code` Utf8 entry.
    pub name_index: u16,
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
}

impl CodeAttribute {
    pub fn new(name_index: u16, max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        Self { name_index, max_stack, max_locals, code }
    }

    pub fn from_finished(name_index: u16, finished: FinishedCode) -> Self {
        Self::new(name_index, finished.max_stack, finished.max_locals, finished.code)
    }

    /// Attribute payload: everything after name index and length.
    ///
    /// The exception table and the nested attribute list are always empty.
    pub fn info_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(12 + self.code.len());
        bytes.extend_from_slice(&self.max_stack.to_be_bytes());
        bytes.extend_from_slice(&self.max_locals.to_be_bytes());
        bytes.extend_from_slice(&(self.code.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.code);
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let info = self.info_bytes();
        let mut bytes = Vec::with_capacity(6 + info.len());
        bytes.extend_from_slice(&self.name_index.to_be_bytes());
        bytes.extend_from_slice(&(info.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&info);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_attribute_layout() {
        let attr = CodeAttribute::new(7, 2, 3, vec![0x04, 0xac]);
        let bytes = attr.to_bytes();
        assert_eq!(
            bytes,
            vec![
                0, 7, // name
                0, 0, 0, 14, // length
                0, 2, 0, 3, // max_stack, max_locals
                0, 0, 0, 2, 0x04, 0xac, // code
                0, 0, 0, 0, // exception table, attributes
            ]
        );
    }
}
