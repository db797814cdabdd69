//! Expression AST nodes

use super::Spanned;
use serde::{Deserialize, Serialize};

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal constant
    Literal(Literal),

    /// Variable reference (name is lowercased by the parser)
    Var(String),

    /// Unary operation
    Unary {
        op: UnOp,
        expr: Box<Spanned<Expr>>,
    },

    /// Binary operation, including comparisons, boolean and keyword operators
    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },

    /// Built-in function call
    Call {
        func: String,
        args: Vec<Spanned<Expr>>,
    },

    /// Array literal: [a, b, c]
    Array(Vec<Spanned<Expr>>),

    /// Array element read: base[index]
    Index {
        base: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },

    /// Assignment: name := value
    Assign {
        name: String,
        value: Box<Spanned<Expr>>,
    },

    /// Array append: name[] := value
    Append {
        name: String,
        value: Box<Spanned<Expr>>,
    },

    /// Array element store: name[index] := value
    IndexAssign {
        name: String,
        index: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },

    /// Conditional: `if cond then a else b end` or `cond ? a : b`
    If {
        cond: Box<Spanned<Expr>>,
        then_branch: Box<Spanned<Expr>>,
        else_branch: Option<Box<Spanned<Expr>>>,
    },

    /// Semicolon-separated statements; evaluates to the last one
    Block(Vec<Spanned<Expr>>),

    /// Parenthesised sub-expression
    Group(Box<Spanned<Expr>>),
}

impl Expr {
    /// Direct sub-expressions, in source order
    pub fn children(&self) -> Vec<&Spanned<Expr>> {
        match self {
            Expr::Literal(_) | Expr::Var(_) => Vec::new(),
            Expr::Unary { expr, .. } => vec![&**expr],
            Expr::Binary { left, right, .. } => vec![&**left, &**right],
            Expr::Call { args: items, .. } | Expr::Array(items) | Expr::Block(items) => {
                items.iter().collect()
            }
            Expr::Index { base, index } => vec![&**base, &**index],
            Expr::Assign { value, .. } | Expr::Append { value, .. } => vec![&**value],
            Expr::IndexAssign { index, value, .. } => vec![&**index, &**value],
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let mut children = vec![&**cond, &**then_branch];
                children.extend(else_branch.as_deref());
                children
            }
            Expr::Group(inner) => vec![&**inner],
        }
    }

    /// Name written by an assignment node
    pub fn assigned_name(&self) -> Option<&str> {
        match self {
            Expr::Assign { name, .. } | Expr::Append { name, .. } | Expr::IndexAssign { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }
}

/// Literal constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,

    // Equality family
    Eq,
    StrictEq,
    Ne,
    StrictNe,

    // Ordering family
    Lt,
    Gt,
    Le,
    Ge,

    // Boolean
    And,
    Or,
    Xor,

    // Keyword operators
    In,
    Contains,
    Like,
    Rlike,
    Irlike,
}

/// Which side of the comparison-chain rule an operator falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFamily {
    Equality,
    Ordering,
}

impl BinOp {
    pub fn compare_family(self) -> Option<CompareFamily> {
        match self {
            BinOp::Eq | BinOp::StrictEq | BinOp::Ne | BinOp::StrictNe => {
                Some(CompareFamily::Equality)
            }
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => Some(CompareFamily::Ordering),
            _ => None,
        }
    }

    pub fn is_logic(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or | BinOp::Xor)
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            BinOp::In | BinOp::Contains | BinOp::Like | BinOp::Rlike | BinOp::Irlike
        )
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Eq => "==",
            BinOp::StrictEq => "===",
            BinOp::Ne => "!=",
            BinOp::StrictNe => "!==",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Xor => "^",
            BinOp::In => "in",
            BinOp::Contains => "contains",
            BinOp::Like => "like",
            BinOp::Rlike => "rlike",
            BinOp::Irlike => "irlike",
        };
        f.write_str(s)
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Unary plus (+), a numeric no-op
    Plus,
    /// Logical not (!)
    Not,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Plus => write!(f, "+"),
            UnOp::Not => write!(f, "!"),
        }
    }
}
