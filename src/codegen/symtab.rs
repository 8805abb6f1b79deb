//! Per-function local variable slot allocation
//!
//! One JVM local array is shared by every category. It is laid out as
//! `[this?] [parameters] [integer locals] [reference locals]`: integer locals count up
//! from the end of the parameters and reference locals count up from the end of *all*
//! integer locals, which [`LocalLayout::scan`] learns before anything is emitted.
//! Scope is function-wide; there is no block-local shadowing.

use super::error::{CodeGenError, CodeGenResult};
use super::types::{self, Category};
use crate::ast::{DataType, Function, Stmt};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct LocalSlot {
    pub name: String,
    pub ty: DataType,
    pub category: Category,
    pub slot: u16,
    pub width: u16,
}

/// Slot budget of a function body, computed before code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalLayout {
    /// First slot after `this` and the parameters.
    pub params_end: u16,
    /// Total width of the integer-category locals declared in the body.
    pub integer_width: u16,
    /// Total width of the reference-category locals declared in the body.
    pub reference_width: u16,
}

impl LocalLayout {
    pub fn scan(function: &Function, params_end: u16) -> Self {
        let mut layout = LocalLayout { params_end, ..Default::default() };
        layout.scan_block(&function.body);
        layout
    }

    fn scan_block(&mut self, block: &[Stmt]) {
        for stmt in block {
            match stmt {
                Stmt::VarDec(dec) => match types::category(&dec.ty) {
                    Some(Category::Integer) => self.integer_width += types::slot_width(&dec.ty),
                    Some(Category::Reference) => self.reference_width += 1,
                    None => {}
                },
                Stmt::If(s) => {
                    self.scan_block(&s.then_block);
                    if let Some(else_block) = &s.else_block {
                        self.scan_block(else_block);
                    }
                }
                Stmt::While(s) => self.scan_block(&s.body),
                _ => {}
            }
        }
    }

    pub fn first_reference_slot(&self) -> u16 {
        self.params_end + self.integer_width
    }

    pub fn max_locals(&self) -> u16 {
        self.params_end + self.integer_width + self.reference_width
    }
}

/// Name to slot map for one function
#[derive(Debug)]
pub struct SymbolAllocator {
    function: String,
    locals: HashMap<String, LocalSlot>,
    next_param: u16,
    next_integer: u16,
    next_reference: u16,
    max_locals: u16,
}

impl SymbolAllocator {
    /// Allocator whose parameter slots start at `first_param` (1 for instance methods).
    pub fn new(function: impl Into<String>, first_param: u16, layout: &LocalLayout) -> Self {
        Self {
            function: function.into(),
            locals: HashMap::new(),
            next_param: first_param,
            next_integer: layout.params_end,
            next_reference: layout.first_reference_slot(),
            max_locals: layout.params_end,
        }
    }

    /// Allocator for `function`, with its parameters already declared.
    ///
    /// `reserved` slots (the receiver, or the unused `args` array of an entry point)
    /// precede the parameters.
    pub fn for_function(function: &Function, reserved: u16) -> CodeGenResult<Self> {
        let params_width: u16 = function.params.iter().map(|p| types::slot_width(&p.ty)).sum();
        let layout = LocalLayout::scan(function, reserved + params_width);
        let mut alloc = Self::new(function.name.clone(), reserved, &layout);
        for param in &function.params {
            alloc.declare_param(&param.name, &param.ty)?;
        }
        log::trace!(
            "locals of '{}': params end at {}, integers {}, references from {}",
            function.name,
            layout.params_end,
            layout.integer_width,
            layout.first_reference_slot()
        );
        Ok(alloc)
    }

    fn check_new(&self, name: &str, ty: &DataType) -> CodeGenResult<(Category, u16)> {
        if self.locals.contains_key(name) {
            return Err(CodeGenError::DuplicateDeclaration {
                name: name.to_string(),
                function: self.function.clone(),
            });
        }
        let category = types::category(ty)
            .ok_or_else(|| CodeGenError::contract(format!("variable '{}' declared void", name)))?;
        Ok((category, types::slot_width(ty)))
    }

    fn insert(&mut self, name: &str, ty: &DataType, category: Category, slot: u16, width: u16) -> u16 {
        self.max_locals = self.max_locals.max(slot + width);
        self.locals.insert(
            name.to_string(),
            LocalSlot { name: name.to_string(), ty: ty.clone(), category, slot, width },
        );
        slot
    }

    pub fn declare_param(&mut self, name: &str, ty: &DataType) -> CodeGenResult<u16> {
        let (category, width) = self.check_new(name, ty)?;
        let slot = self.next_param;
        self.next_param += width;
        Ok(self.insert(name, ty, category, slot, width))
    }

    /// Declare a body local; fails on re-declaration anywhere in the function.
    pub fn declare(&mut self, name: &str, ty: &DataType) -> CodeGenResult<u16> {
        let (category, width) = self.check_new(name, ty)?;
        let counter = match category {
            Category::Integer => &mut self.next_integer,
            Category::Reference => &mut self.next_reference,
        };
        let slot = *counter;
        *counter += width;
        Ok(self.insert(name, ty, category, slot, width))
    }

    pub fn resolve(&self, name: &str) -> CodeGenResult<&LocalSlot> {
        self.locals.get(name).ok_or_else(|| CodeGenError::unresolved(name))
    }

    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }

    /// Declared locals in slot order.
    pub fn slots(&self) -> Vec<&LocalSlot> {
        let mut slots: Vec<&LocalSlot> = self.locals.values().collect();
        slots.sort_by_key(|s| s.slot);
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Param};

    fn sample() -> Function {
        Function::new(
            "f",
            vec![Param::new("a", DataType::I32), Param::new("b", DataType::I64)],
            DataType::Void,
            vec![
                Stmt::var("s", DataType::String, None),
                Stmt::var("x", DataType::I32, Some(Expr::int(1))),
                Stmt::while_loop(
                    Expr::boolean(true),
                    vec![Stmt::var("y", DataType::I64, None), Stmt::Break],
                ),
                Stmt::var("o", DataType::object("Foo"), None),
            ],
        )
    }

    #[test]
    fn test_layout_scan() {
        let layout = LocalLayout::scan(&sample(), 3);
        assert_eq!(layout.integer_width, 3);
        assert_eq!(layout.reference_width, 2);
        assert_eq!(layout.first_reference_slot(), 6);
        assert_eq!(layout.max_locals(), 8);
    }

    #[test]
    fn test_slots_follow_layout() {
        let f = sample();
        let mut alloc = SymbolAllocator::for_function(&f, 0).unwrap();
        assert_eq!(alloc.resolve("a").unwrap().slot, 0);
        assert_eq!(alloc.resolve("b").unwrap().slot, 1);
        assert_eq!(alloc.declare("s", &DataType::String).unwrap(), 6);
        assert_eq!(alloc.declare("x", &DataType::I32).unwrap(), 3);
        assert_eq!(alloc.declare("y", &DataType::I64).unwrap(), 4);
        assert_eq!(alloc.declare("o", &DataType::object("Foo")).unwrap(), 7);
        assert_eq!(alloc.max_locals(), 8);
        let order: Vec<&str> = alloc.slots().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "x", "y", "s", "o"]);
    }

    #[test]
    fn test_receiver_is_reserved() {
        let f = sample().instance();
        let alloc = SymbolAllocator::for_function(&f, 1).unwrap();
        assert_eq!(alloc.resolve("a").unwrap().slot, 1);
        assert_eq!(alloc.resolve("b").unwrap().width, 2);
    }

    #[test]
    fn test_duplicate_and_unresolved() {
        let f = sample();
        let mut alloc = SymbolAllocator::for_function(&f, 0).unwrap();
        alloc.declare("x", &DataType::I32).unwrap();
        let err = alloc.declare("x", &DataType::I32).unwrap_err();
        assert!(matches!(err, CodeGenError::DuplicateDeclaration { ref name, .. } if name == "x"));
        // parameters share the namespace
        assert!(alloc.declare("a", &DataType::String).is_err());
        assert!(matches!(alloc.resolve("zz"), Err(CodeGenError::UnresolvedSymbol { .. })));
        assert!(matches!(alloc.declare("v", &DataType::Void), Err(CodeGenError::TypeContract { .. })));
    }
}
