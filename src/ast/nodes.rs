use super::{Attr, DataType};
use std::fmt;

static BOOL_TYPE: DataType = DataType::Bool;
static CHAR_TYPE: DataType = DataType::Char;
static STRING_TYPE: DataType = DataType::String;

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: DataType,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: DataType) -> Self {
        Self { name: name.into(), ty }
    }
}

/// A top-level function. `is_static` marks a "routine" with no receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub return_type: DataType,
    pub params: Vec<Param>,
    pub body: Block,
    pub attr: Attr,
    pub is_static: bool,
}

impl Function {
    /// A public static function.
    pub fn new(name: impl Into<String>, params: Vec<Param>, return_type: DataType, body: Block) -> Self {
        Self {
            name: name.into(),
            return_type,
            params,
            body,
            attr: Attr::Public,
            is_static: true,
        }
    }

    pub fn instance(mut self) -> Self {
        self.is_static = false;
        self
    }

    pub fn with_attr(mut self, attr: Attr) -> Self {
        self.attr = attr;
        self
    }
}

pub type Block = Vec<Stmt>;

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDec(VarDec),
    VarAssign(VarAssign),
    Return(Option<Expr>),
    If(IfStmt),
    While(WhileStmt),
    Break,
    Continue,
    FuncCall(FuncCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDec {
    pub name: String,
    pub ty: DataType,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarAssign {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_block: Block,
    pub else_block: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Block,
}

/// Call of a function of this class, a builtin, or a runtime helper.
///
/// With `object` set it is a virtual call on that object-typed local instead.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncCall {
    pub name: String,
    pub args: Vec<Expr>,
    /// Resolved return type of the callee.
    pub ty: DataType,
    pub object: Option<String>,
}

impl Stmt {
    pub fn var(name: impl Into<String>, ty: DataType, init: Option<Expr>) -> Self {
        Stmt::VarDec(VarDec { name: name.into(), ty, init })
    }

    pub fn assign(name: impl Into<String>, value: Expr) -> Self {
        Stmt::VarAssign(VarAssign { name: name.into(), value })
    }

    pub fn ret(value: Expr) -> Self {
        Stmt::Return(Some(value))
    }

    pub fn if_else(cond: Expr, then_block: Block, else_block: Option<Block>) -> Self {
        Stmt::If(IfStmt { cond, then_block, else_block })
    }

    pub fn while_loop(cond: Expr, body: Block) -> Self {
        Stmt::While(WhileStmt { cond, body })
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Stmt::FuncCall(FuncCall { name: name.into(), args, ty: DataType::Void, object: None })
    }

    pub fn method_call(object: impl Into<String>, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Stmt::FuncCall(FuncCall {
            name: name.into(),
            args,
            ty: DataType::Void,
            object: Some(object.into()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Gt | BinaryOp::Lt | BinaryOp::Ge | BinaryOp::Le)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::Ge => ">=",
            BinaryOp::Le => "<=",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    /// Bitwise complement
    Not,
    LogicalNot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    pub ty: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub ty: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier { name: String, ty: DataType },
    IntLiteral { value: i64, ty: DataType },
    CharLiteral(char),
    StringLiteral(String),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    FuncCall(FuncCall),
}

impl Expr {
    /// The resolved type of this expression.
    pub fn ty(&self) -> &DataType {
        match self {
            Expr::Identifier { ty, .. } | Expr::IntLiteral { ty, .. } => ty,
            Expr::CharLiteral(_) => &CHAR_TYPE,
            Expr::StringLiteral(_) => &STRING_TYPE,
            Expr::Binary(b) => &b.ty,
            Expr::Unary(u) => &u.ty,
            Expr::FuncCall(c) => &c.ty,
        }
    }

    pub fn ident(name: impl Into<String>, ty: DataType) -> Self {
        Expr::Identifier { name: name.into(), ty }
    }

    /// 32-bit signed integer literal.
    pub fn int(value: i64) -> Self {
        Expr::IntLiteral { value, ty: DataType::I32 }
    }

    pub fn typed_int(value: i64, ty: DataType) -> Self {
        Expr::IntLiteral { value, ty }
    }

    pub fn boolean(value: bool) -> Self {
        Expr::IntLiteral { value: value as i64, ty: BOOL_TYPE.clone() }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::StringLiteral(value.into())
    }

    /// Binary expression; comparisons and logical operators get `bool`, others take the lhs type.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        let ty = if op.is_comparison() || op.is_logical() { DataType::Bool } else { lhs.ty().clone() };
        Expr::Binary(BinaryExpr { op, lhs: Box::new(lhs), rhs: Box::new(rhs), ty })
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        let ty = if op == UnaryOp::LogicalNot { DataType::Bool } else { operand.ty().clone() };
        Expr::Unary(UnaryExpr { op, operand: Box::new(operand), ty })
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>, ty: DataType) -> Self {
        Expr::FuncCall(FuncCall { name: name.into(), args, ty, object: None })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Identifier { name, .. } => write!(f, "{}", name),
            Expr::IntLiteral { value, ty: DataType::Bool } => write!(f, "{}", *value != 0),
            Expr::IntLiteral { value, .. } => write!(f, "{}", value),
            Expr::CharLiteral(c) => write!(f, "{:?}", c),
            Expr::StringLiteral(s) => write!(f, "{:?}", s),
            Expr::Binary(b) => write!(f, "({} {} {})", b.lhs, b.op.symbol(), b.rhs),
            Expr::Unary(u) => {
                let sym = match u.op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Not => "~",
                    UnaryOp::LogicalNot => "!",
                };
                write!(f, "{}{}", sym, u.operand)
            }
            Expr::FuncCall(c) => write!(f, "{}", c),
        }
    }
}

impl fmt::Display for FuncCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(object) = &self.object {
            write!(f, "{}.", object)?;
        }
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}
