//! Abstract syntax tree for the restricted scripting subset.
//!
//! Every statement and expression node carries the 0-based source line it
//! started on, matching the `line` field the heap snapshotter exposes in a
//! `FrameRecord` (`spec.md` §3).

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Assign { targets: Vec<Expr>, value: Expr, line: u32 },
    AugAssign { target: Expr, op: BinOp, value: Expr, line: u32 },
    If { branches: Vec<(Expr, Vec<Stmt>)>, orelse: Vec<Stmt>, line: u32 },
    While { test: Expr, body: Vec<Stmt>, line: u32 },
    For { target: Expr, iter: Expr, body: Vec<Stmt>, line: u32 },
    FunctionDef { name: String, params: Vec<Param>, body: Vec<Stmt>, line: u32 },
    ClassDef { name: String, bases: Vec<String>, body: Vec<Stmt>, line: u32 },
    Return { value: Option<Expr>, line: u32 },
    Pass { line: u32 },
    Break { line: u32 },
    Continue { line: u32 },
    Import { module: String, alias: Option<String>, line: u32 },
    ImportFrom { module: String, names: Vec<String>, line: u32 },
    Global { names: Vec<String>, line: u32 },
}

impl Stmt {
    #[must_use]
    pub fn line(&self) -> u32 {
        match self {
            Stmt::Expr(e) => e.line(),
            Stmt::Assign { line, .. }
            | Stmt::AugAssign { line, .. }
            | Stmt::If { line, .. }
            | Stmt::While { line, .. }
            | Stmt::For { line, .. }
            | Stmt::FunctionDef { line, .. }
            | Stmt::ClassDef { line, .. }
            | Stmt::Return { line, .. }
            | Stmt::Pass { line }
            | Stmt::Break { line }
            | Stmt::Continue { line }
            | Stmt::Import { line, .. }
            | Stmt::ImportFrom { line, .. }
            | Stmt::Global { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Is,
    IsNot,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64, u32),
    Float(f64, u32),
    Str(String, u32),
    Bool(bool, u32),
    None(u32),
    Name(String, u32),
    List(Vec<Expr>, u32),
    Tuple(Vec<Expr>, u32),
    Set(Vec<Expr>, u32),
    Dict(Vec<(Expr, Expr)>, u32),
    BinOp { left: Box<Expr>, op: BinOp, right: Box<Expr>, line: u32 },
    BoolOp { op: BoolOp, values: Vec<Expr>, line: u32 },
    Compare { left: Box<Expr>, ops: Vec<CmpOp>, comparators: Vec<Expr>, line: u32 },
    UnaryOp { op: UnaryOp, operand: Box<Expr>, line: u32 },
    Call { func: Box<Expr>, args: Vec<Expr>, kwargs: Vec<(String, Expr)>, line: u32 },
    Attribute { value: Box<Expr>, attr: String, line: u32 },
    Subscript { value: Box<Expr>, index: Box<Expr>, line: u32 },
}

impl Expr {
    #[must_use]
    pub fn line(&self) -> u32 {
        match self {
            Expr::Int(_, l)
            | Expr::Float(_, l)
            | Expr::Str(_, l)
            | Expr::Bool(_, l)
            | Expr::None(l)
            | Expr::Name(_, l)
            | Expr::List(_, l)
            | Expr::Tuple(_, l)
            | Expr::Set(_, l)
            | Expr::Dict(_, l)
            | Expr::BinOp { line: l, .. }
            | Expr::BoolOp { line: l, .. }
            | Expr::Compare { line: l, .. }
            | Expr::UnaryOp { line: l, .. }
            | Expr::Call { line: l, .. }
            | Expr::Attribute { line: l, .. }
            | Expr::Subscript { line: l, .. } => *l,
        }
    }
}
