//! filterscript library
//!
//! A small rule expression language for screening edits: tokenizer,
//! recursive-descent parser, tree-walking evaluator with condition
//! accounting, and a static checker.

pub mod ast;
pub mod builtins;
pub mod checker;
pub mod config;
pub mod error;
pub mod filter;
pub mod interp;
pub mod keywords;
pub mod lexer;
pub mod logger;
pub mod parser;
pub mod status;
pub mod util;

pub use ast::{Rule, Span};
pub use checker::CheckerMode;
pub use config::FilterConfig;
pub use error::{ExceptionId, Result, UserVisibleException};
pub use filter::RuleChecker;
pub use interp::{EvalError, Value, VarEnv};
pub use status::RuleCheckerStatus;
