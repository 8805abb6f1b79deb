//! Utilities to build field and method descriptors

use crate::ast::{DataType, IntWidth};

pub const STRING_CLASS: &str = "java/lang/String";
pub const OBJECT_CLASS: &str = "java/lang/Object";

/// Field descriptor of a source type.
///
/// Pointers have no JVM counterpart and are passed as `java/lang/Object`.
pub fn type_to_descriptor(ty: &DataType) -> String {
    let base = match ty {
        DataType::Void => "V",
        DataType::Bool => "Z",
        DataType::Char => "C",
        DataType::Int { width, unsigned } => match (width, unsigned) {
            (IntWidth::W8, false) => "B",
            (IntWidth::W8, true) | (IntWidth::W16, false) => "S",
            (IntWidth::W16, true) => "C",
            (IntWidth::W32, _) => "I",
            (IntWidth::W64, _) => "J",
        },
        DataType::String => return format!("L{};", STRING_CLASS),
        DataType::Ptr(_) => return format!("L{};", OBJECT_CLASS),
        DataType::Struct(name) | DataType::Object(name) => {
            return format!("L{};", name.replace('.', "/"))
        }
    };
    base.to_string()
}

pub fn method_descriptor<'a, I>(params: I, ret: &DataType) -> String
where
    I: IntoIterator<Item = &'a DataType>,
{
    let mut d = String::new();
    d.push('(');
    for p in params {
        d.push_str(&type_to_descriptor(p));
    }
    d.push(')');
    d.push_str(&type_to_descriptor(ret));
    d
}

/// Descriptor of the JVM entry point `main(String[])`.
pub const MAIN_DESCRIPTOR: &str = "([Ljava/lang/String;)V";

/// Field descriptors of the parameters of a method descriptor, in order.
///
/// Returns `None` for a malformed descriptor.
pub fn split_parameters(descriptor: &str) -> Option<Vec<&str>> {
    let params = descriptor.strip_prefix('(')?;
    let params = &params[..params.find(')')?];
    let bytes = params.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    while start < bytes.len() {
        let mut end = start;
        while bytes[end] == b'[' {
            end += 1;
            if end == bytes.len() {
                return None;
            }
        }
        match bytes[end] {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => end += 1,
            b'L' => end += params[end..].find(';')? + 1,
            _ => return None,
        }
        out.push(&params[start..end]);
        start = end;
    }
    Some(out)
}

/// Argument slots a method descriptor consumes (longs count twice), excluding `this`.
///
/// Returns `None` for a malformed descriptor.
pub fn argument_slots(descriptor: &str) -> Option<u16> {
    let slots = split_parameters(descriptor)?
        .iter()
        .map(|p| if *p == "J" || *p == "D" { 2 } else { 1 })
        .sum();
    Some(slots)
}

/// Return-value stack words of a method descriptor: 0 for `V`, 2 for `J`/`D`, else 1.
pub fn return_slots(descriptor: &str) -> Option<u16> {
    let ret = &descriptor[descriptor.rfind(')')? + 1..];
    match ret.chars().next()? {
        'V' => Some(0),
        'J' | 'D' => Some(2),
        _ => Some(1),
    }
}
