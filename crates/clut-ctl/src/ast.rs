//! Syntax tree.

use crate::value::{Type, Value};

/// A parsed translation unit.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Module-level constants, in declaration order.
    pub globals: Vec<Global>,
    /// Function definitions.
    pub functions: Vec<Function>,
}

impl Program {
    /// Index of the function called `name`.
    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == name)
    }
}

/// `const float NAME = expr;`
#[derive(Debug, Clone)]
pub struct Global {
    pub name: String,
    pub ty: Type,
    pub init: Expr,
    pub line: usize,
}

/// Function definition.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub ret: Type,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

/// Function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    /// Declared `output`.
    pub output: bool,
    /// Declared `varying`.
    pub varying: bool,
    pub default: Option<Expr>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Decl {
        ty: Type,
        name: String,
        init: Option<Expr>,
        line: usize,
    },
    Assign {
        target: Place,
        op: AssignOp,
        value: Expr,
        line: usize,
    },
    Expr(Expr),
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        step: Vec<Stmt>,
        body: Vec<Stmt>,
    },
    Return {
        value: Option<Expr>,
        line: usize,
    },
    Block(Vec<Stmt>),
}

/// Assignable location: a variable and an index path into it.
#[derive(Debug, Clone)]
pub struct Place {
    pub name: String,
    pub indices: Vec<Expr>,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Expression with its source line.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Lit(Value),
    Var(String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    /// `{a, b, c}` initializer.
    List(Vec<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, line: usize) -> Self {
        Self { kind, line }
    }

    /// Converts `a` or `a[i][j]` into a [`Place`].
    pub fn into_place(self) -> Option<Place> {
        let line = self.line;
        let mut indices = Vec::new();
        let mut cur = self;
        loop {
            match cur.kind {
                ExprKind::Var(name) => {
                    indices.reverse();
                    return Some(Place { name, indices, line });
                }
                ExprKind::Index(base, idx) => {
                    indices.push(*idx);
                    cur = *base;
                }
                _ => return None,
            }
        }
    }
}
