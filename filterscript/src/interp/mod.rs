//! Tree-walking interpreter

mod env;
mod error;
mod eval;
mod value;

pub use env::{UndefinedSupplier, VarEnv, VariableSupplier};
pub use error::{EvalError, EvalResult};
pub use eval::{evaluate, Evaluator};
pub use value::{
    add, div, format_float, is_numeric_str, modulo, mul, neg, parse_numeric_prefix, pow, sub,
    Number, Value, ValueType,
};
