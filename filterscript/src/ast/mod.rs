//! Abstract Syntax Tree definitions

mod expr;
mod span;

pub use expr::*;
pub use span::*;

use serde::{Deserialize, Serialize};

/// A parsed rule. The body is `None` for a rule with no statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub body: Option<Spanned<Expr>>,
}

impl Rule {
    pub fn empty() -> Self {
        Rule { body: None }
    }
}
