use super::nodes::*;
use super::{Attr, Program};

/// AST printer for debugging and output
pub struct AstPrinter {
    indent_level: usize,
    output: String,
}

impl AstPrinter {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            output: String::new(),
        }
    }

    pub fn print(&mut self, program: &Program) -> String {
        self.output.clear();
        self.writeln(&format!("class {} {{", program.name));
        self.indent();
        for (i, function) in program.functions.iter().enumerate() {
            if i > 0 {
                self.output.push('\n');
            }
            self.print_function(function);
        }
        self.dedent();
        self.writeln("}");
        self.output.clone()
    }

    fn indent(&mut self) {
        self.indent_level += 2;
    }

    fn dedent(&mut self) {
        if self.indent_level >= 2 {
            self.indent_level -= 2;
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.output.push(' ');
        }
    }

    fn writeln(&mut self, s: &str) {
        self.write_indent();
        self.output.push_str(s);
        self.output.push('\n');
    }

    fn print_function(&mut self, function: &Function) {
        let mut header = String::new();
        match function.attr {
            Attr::Public => header.push_str("public "),
            Attr::Protected => header.push_str("protected "),
            Attr::Private => header.push_str("private "),
        }
        if function.is_static {
            header.push_str("static ");
        }
        let params: Vec<String> = function
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect();
        header.push_str(&format!(
            "fn {}({}) -> {} {{",
            function.name,
            params.join(", "),
            function.return_type
        ));
        self.writeln(&header);
        self.print_block(&function.body);
        self.writeln("}");
    }

    fn print_block(&mut self, block: &Block) {
        self.indent();
        for stmt in block {
            self.print_stmt(stmt);
        }
        self.dedent();
    }

    fn print_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDec(dec) => match &dec.init {
                Some(init) => self.writeln(&format!("var {}: {} = {};", dec.name, dec.ty, init)),
                None => self.writeln(&format!("var {}: {};", dec.name, dec.ty)),
            },
            Stmt::VarAssign(assign) => self.writeln(&format!("{} = {};", assign.name, assign.value)),
            Stmt::Return(Some(value)) => self.writeln(&format!("return {};", value)),
            Stmt::Return(None) => self.writeln("return;"),
            Stmt::If(if_stmt) => {
                self.writeln(&format!("if {} {{", if_stmt.cond));
                self.print_block(&if_stmt.then_block);
                if let Some(else_block) = &if_stmt.else_block {
                    self.writeln("} else {");
                    self.print_block(else_block);
                }
                self.writeln("}");
            }
            Stmt::While(while_stmt) => {
                self.writeln(&format!("while {} {{", while_stmt.cond));
                self.print_block(&while_stmt.body);
                self.writeln("}");
            }
            Stmt::Break => self.writeln("break;"),
            Stmt::Continue => self.writeln("continue;"),
            Stmt::FuncCall(call) => self.writeln(&format!("{};", call)),
        }
    }
}

impl Default for AstPrinter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, DataType};

    #[test]
    fn test_print_max() {
        let a = Expr::ident("a", DataType::I32);
        let b = Expr::ident("b", DataType::I32);
        let program = Program::new("Demo").with_function(Function::new(
            "max",
            vec![Param::new("a", DataType::I32), Param::new("b", DataType::I32)],
            DataType::I32,
            vec![Stmt::if_else(
                Expr::binary(BinaryOp::Gt, a.clone(), b.clone()),
                vec![Stmt::ret(a)],
                Some(vec![Stmt::ret(b)]),
            )],
        ));
        let text = AstPrinter::new().print(&program);
        assert!(text.starts_with("class Demo {\n"));
        assert!(text.contains("public static fn max(a: i32, b: i32) -> i32 {"));
        assert!(text.contains("if (a > b) {"));
        assert!(text.contains("} else {"));
        assert!(text.contains("      return b;"));
    }
}
