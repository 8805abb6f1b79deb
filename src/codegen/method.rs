//! Callable methods: the table the generator resolves calls against, and the
//! serialized `method_info` records of the class being built

use super::attribute::CodeAttribute;
use super::defs::access_flags::*;
use super::descriptor::{self, STRING_CLASS};
use super::error::{CodeGenError, CodeGenResult};
use super::types;
use crate::ast::{Attr, DataType, Function, IntWidth};
use once_cell::sync::Lazy;

pub const PRINT_STREAM_CLASS: &str = "java/io/PrintStream";
pub const SYSTEM_CLASS: &str = "java/lang/System";

/// How the receiver of a call is obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// Static call.
    None,
    /// Instance method of the class being built; the caller's `this`.
    This,
    /// The first source argument is the receiver (`strlen(s)` is `s.length()`).
    FirstArg,
    /// A static field holds the receiver (`System.out`).
    StaticField { class: String, name: String, descriptor: String },
}

/// One callable method as the generator sees it
#[derive(Debug, Clone, PartialEq)]
pub struct MethodEntry {
    /// Name used by source calls.
    pub name: String,
    pub class: String,
    /// Name in the owning class's constant pool.
    pub jvm_name: String,
    pub descriptor: String,
    /// Source parameter types; with [`Receiver::FirstArg`] the first is the receiver.
    pub params: Vec<DataType>,
    pub return_type: DataType,
    pub receiver: Receiver,
    pub access_flags: u16,
    /// Defined by the class being built (as opposed to imported).
    pub defined: bool,
    /// JVM entry point: callers pass a `null` args array the source never sees.
    pub entry_point: bool,
    /// Constant-pool Methodref, once reserved.
    pub method_ref: Option<u16>,
    pub code_length: usize,
    /// Offset of this method's code within all code emitted for the class.
    pub code_offset: usize,
}

impl MethodEntry {
    /// Imported method of another class.
    pub fn import(
        name: &str,
        class: &str,
        jvm_name: &str,
        descriptor: &str,
        params: Vec<DataType>,
        return_type: DataType,
        receiver: Receiver,
    ) -> Self {
        Self {
            name: name.to_string(),
            class: class.to_string(),
            jvm_name: jvm_name.to_string(),
            descriptor: descriptor.to_string(),
            params,
            return_type,
            receiver,
            access_flags: ACC_PUBLIC,
            defined: false,
            entry_point: false,
            method_ref: None,
            code_length: 0,
            code_offset: 0,
        }
    }

    /// Entry for a source function of the class `class`.
    pub fn for_function(class: &str, function: &Function) -> Self {
        let entry_point = is_entry_point(function);
        let descriptor = if entry_point {
            descriptor::MAIN_DESCRIPTOR.to_string()
        } else {
            descriptor::method_descriptor(function.params.iter().map(|p| &p.ty), &function.return_type)
        };
        Self {
            name: function.name.clone(),
            class: class.to_string(),
            jvm_name: function.name.clone(),
            descriptor,
            params: function.params.iter().map(|p| p.ty.clone()).collect(),
            return_type: function.return_type.clone(),
            receiver: if function.is_static { Receiver::None } else { Receiver::This },
            access_flags: function_access_flags(function),
            defined: true,
            entry_point,
            method_ref: None,
            code_length: 0,
            code_offset: 0,
        }
    }

    pub fn is_static(&self) -> bool {
        self.receiver == Receiver::None
    }

    /// Argument words pushed by the caller, receiver excluded.
    pub fn arg_size(&self) -> u16 {
        let params = match self.receiver {
            Receiver::FirstArg => &self.params[1.min(self.params.len())..],
            _ => &self.params[..],
        };
        let hidden = if self.entry_point { 1 } else { 0 };
        params.iter().map(types::slot_width).sum::<u16>() + hidden
    }

    pub fn return_size(&self) -> u16 {
        types::slot_width(&self.return_type)
    }

    /// Whether `args` fit the parameter list: same arity and stack kinds.
    fn accepts(&self, args: &[DataType]) -> bool {
        self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(p, a)| types::stack_kind(p) == types::stack_kind(a))
    }

    /// Same source types, preferred among overloads.
    fn matches_exactly(&self, args: &[DataType]) -> bool {
        self.params.len() == args.len() && self.params.iter().zip(args).all(|(p, a)| p == a)
    }
}

/// `main()` without parameters becomes the JVM entry point `main(String[])`.
pub fn is_entry_point(function: &Function) -> bool {
    function.name == super::defs::MAIN_METHOD_NAME
        && function.is_static
        && function.params.is_empty()
        && function.return_type.is_void()
}

/// Overload parameter type that holds every value of `ty`: narrow integers go to `int`
/// and `u32` to `long`, so unsigned values never reach `char` or a negative `int`.
fn widened_for_overload(ty: &DataType) -> DataType {
    match ty {
        DataType::Int { width: IntWidth::W8 | IntWidth::W16, .. } => DataType::I32,
        DataType::Int { width: IntWidth::W32, unsigned: true } => DataType::I64,
        other => other.clone(),
    }
}

pub fn function_access_flags(function: &Function) -> u16 {
    let mut flags = match function.attr {
        Attr::Public => ACC_PUBLIC,
        Attr::Protected => ACC_PROTECTED,
        Attr::Private => ACC_PRIVATE,
    };
    if function.is_static {
        flags |= ACC_STATIC;
    }
    flags
}

fn print_overloads(name: &str) -> Vec<MethodEntry> {
    let out = Receiver::StaticField {
        class: SYSTEM_CLASS.to_string(),
        name: "out".to_string(),
        descriptor: format!("L{};", PRINT_STREAM_CLASS),
    };
    [DataType::String, DataType::I32, DataType::I64, DataType::Char, DataType::Bool]
        .into_iter()
        .map(|ty| {
            let desc = descriptor::method_descriptor([&ty], &DataType::Void);
            MethodEntry::import(name, PRINT_STREAM_CLASS, name, &desc, vec![ty], DataType::Void, out.clone())
        })
        .collect()
}

/// Builtins and runtime helpers every class can call.
pub static RUNTIME_METHODS: Lazy<Vec<MethodEntry>> = Lazy::new(|| {
    let mut methods = print_overloads("print");
    methods.extend(print_overloads("println"));
    methods.push(MethodEntry::import(
        "println",
        PRINT_STREAM_CLASS,
        "println",
        "()V",
        Vec::new(),
        DataType::Void,
        Receiver::StaticField {
            class: SYSTEM_CLASS.to_string(),
            name: "out".to_string(),
            descriptor: format!("L{};", PRINT_STREAM_CLASS),
        },
    ));
    methods.push(MethodEntry::import(
        "strcat",
        STRING_CLASS,
        "concat",
        "(Ljava/lang/String;)Ljava/lang/String;",
        vec![DataType::String, DataType::String],
        DataType::String,
        Receiver::FirstArg,
    ));
    methods.push(MethodEntry::import(
        "strlen",
        STRING_CLASS,
        "length",
        "()I",
        vec![DataType::String],
        DataType::I32,
        Receiver::FirstArg,
    ));
    methods.push(MethodEntry::import(
        "streq",
        STRING_CLASS,
        "equals",
        "(Ljava/lang/Object;)Z",
        vec![DataType::String, DataType::String],
        DataType::Bool,
        Receiver::FirstArg,
    ));
    methods
});

/// Ordered collection of the methods a class can call
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    entries: Vec<MethodEntry>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-loaded with [`RUNTIME_METHODS`].
    pub fn with_runtime() -> Self {
        Self { entries: RUNTIME_METHODS.clone() }
    }

    /// Register a function of the class being built.
    pub fn register(&mut self, entry: MethodEntry) -> CodeGenResult<usize> {
        if entry.defined && self.entries.iter().any(|e| e.defined && e.name == entry.name) {
            return Err(CodeGenError::DuplicateDeclaration {
                name: entry.name,
                function: entry.class,
            });
        }
        log::trace!("method table: {} {}.{}{}", entry.name, entry.class, entry.jvm_name, entry.descriptor);
        self.entries.push(entry);
        Ok(self.entries.len() - 1)
    }

    /// Make another class's method callable under `entry.name`.
    pub fn import_method(&mut self, entry: MethodEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Pick the callee for `name` given the resolved argument types.
    ///
    /// Functions of this class shadow imports of the same name.
    pub fn resolve(&self, name: &str, args: &[DataType]) -> CodeGenResult<usize> {
        let candidates: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.name == name)
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return Err(CodeGenError::unresolved(name));
        }
        if let Some(&i) = candidates.iter().find(|&&i| self.entries[i].defined) {
            if !self.entries[i].accepts(args) {
                return Err(CodeGenError::contract(format!(
                    "call to '{}' with {} argument(s) does not match its parameters",
                    name,
                    args.len()
                )));
            }
            return Ok(i);
        }
        let widened: Vec<DataType> = args.iter().map(widened_for_overload).collect();
        candidates
            .iter()
            .copied()
            .find(|&i| self.entries[i].matches_exactly(args))
            .or_else(|| candidates.iter().copied().find(|&i| self.entries[i].matches_exactly(&widened)))
            .or_else(|| candidates.iter().copied().find(|&i| self.entries[i].accepts(args)))
            .ok_or_else(|| CodeGenError::contract(format!("no overload of '{}' accepts these arguments", name)))
    }

    pub fn get(&self, index: usize) -> &MethodEntry {
        &self.entries[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut MethodEntry {
        &mut self.entries[index]
    }

    /// Index of the function `name` defined by this class.
    pub fn defined(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.defined && e.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A serialized method: flags, name, descriptor and its code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub code: CodeAttribute,
}

impl MethodInfo {
    pub fn new(access_flags: u16, name_index: u16, descriptor_index: u16, code: CodeAttribute) -> Self {
        Self { access_flags, name_index, descriptor_index, code }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.access_flags.to_be_bytes());
        bytes.extend_from_slice(&self.name_index.to_be_bytes());
        bytes.extend_from_slice(&self.descriptor_index.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&self.code.to_bytes());
        bytes
    }
}
