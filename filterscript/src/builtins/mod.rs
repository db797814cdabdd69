//! Built-in function table
//!
//! [`FUNCTIONS`] is the single source of truth for every function name, its
//! argument-count contract and its implementation. The parser, the static
//! checker and the evaluator all resolve calls through it.

mod equivset;
mod ip;
mod pattern;
mod string;

pub(crate) use pattern::{glob_matches, regex_matches};
pub(crate) use string::contains;

use crate::error::{ExceptionId, Result, UserVisibleException};
use crate::interp::{EvalResult, Value};

/// Built-in function signature. Arguments have already been arity-checked
/// and are free of `Undefined`; the position is the call site.
pub type BuiltinFn = fn(&[Value], usize) -> EvalResult<Value>;

/// Accepted argument counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` for variadic functions
    pub max: Option<usize>,
}

impl Arity {
    const fn exactly(n: usize) -> Self {
        Arity { min: n, max: Some(n) }
    }

    const fn between(min: usize, max: usize) -> Self {
        Arity {
            min,
            max: Some(max),
        }
    }

    const fn at_least(min: usize) -> Self {
        Arity { min, max: None }
    }
}

/// A function rules can call
#[derive(Debug, Clone, Copy)]
pub struct Function {
    pub name: &'static str,
    pub arity: Arity,
    pub handler: BuiltinFn,
}

impl Function {
    pub fn is_variadic(&self) -> bool {
        self.arity.max.is_none()
    }

    /// Validate an argument count for a call at `position`
    pub fn check_arity(&self, given: usize, position: usize) -> Result<()> {
        let Arity { min, max } = self.arity;
        if given < min {
            if min == 1 && given == 0 {
                return Err(UserVisibleException::new(
                    ExceptionId::NoParams,
                    position,
                    vec![self.name.to_string()],
                ));
            }
            return Err(UserVisibleException::new(
                ExceptionId::NotEnoughArgs,
                position,
                vec![self.name.to_string(), min.to_string(), given.to_string()],
            ));
        }
        if let Some(max) = max.filter(|max| given > *max) {
            return Err(UserVisibleException::new(
                ExceptionId::TooManyArgs,
                position,
                vec![self.name.to_string(), max.to_string(), given.to_string()],
            ));
        }
        Ok(())
    }
}

macro_rules! function {
    ($name:literal, $arity:expr, $handler:path) => {
        Function {
            name: $name,
            arity: $arity,
            handler: $handler,
        }
    };
}

pub static FUNCTIONS: &[Function] = &[
    function!("lcase", Arity::exactly(1), string::lcase),
    function!("ucase", Arity::exactly(1), string::ucase),
    function!("length", Arity::exactly(1), string::length),
    function!("string", Arity::exactly(1), string::to_string),
    function!("int", Arity::exactly(1), string::to_int),
    function!("float", Arity::exactly(1), string::to_float),
    function!("bool", Arity::exactly(1), string::to_bool),
    function!("norm", Arity::exactly(1), string::norm),
    function!("ccnorm", Arity::exactly(1), string::ccnorm),
    function!("ccnorm_contains_any", Arity::at_least(2), string::ccnorm_contains_any),
    function!("ccnorm_contains_all", Arity::at_least(2), string::ccnorm_contains_all),
    function!("specialratio", Arity::exactly(1), string::specialratio),
    function!("rmspecials", Arity::exactly(1), string::rmspecials),
    function!("rmdoubles", Arity::exactly(1), string::rmdoubles),
    function!("rmwhitespace", Arity::exactly(1), string::rmwhitespace),
    function!("count", Arity::between(1, 2), string::count),
    function!("rcount", Arity::between(1, 2), pattern::rcount),
    function!("get_matches", Arity::exactly(2), pattern::get_matches),
    function!("ip_in_range", Arity::exactly(2), ip::ip_in_range),
    function!("ip_in_ranges", Arity::at_least(2), ip::ip_in_ranges),
    function!("contains_any", Arity::at_least(2), string::contains_any),
    function!("contains_all", Arity::at_least(2), string::contains_all),
    function!("equals_to_any", Arity::at_least(2), string::equals_to_any),
    function!("substr", Arity::between(2, 3), string::substr),
    function!("strlen", Arity::exactly(1), string::length),
    function!("strpos", Arity::between(2, 3), string::strpos),
    function!("str_replace", Arity::exactly(3), string::str_replace),
    function!("str_replace_regexp", Arity::exactly(3), pattern::str_replace_regexp),
    function!("rescape", Arity::exactly(1), string::rescape),
    function!("set", Arity::exactly(2), set_var),
    function!("set_var", Arity::exactly(2), set_var),
    function!("sanitize", Arity::exactly(1), string::sanitize),
];

/// Names the parser rewrites into assignments
pub const SETTERS: &[&str] = &["set", "set_var"];

pub fn lookup(name: &str) -> Option<&'static Function> {
    FUNCTIONS.iter().find(|f| f.name == name)
}

pub fn is_function(name: &str) -> bool {
    lookup(name).is_some()
}

pub fn function_names() -> impl Iterator<Item = &'static str> {
    FUNCTIONS.iter().map(|f| f.name)
}

/// `set(name, value)` evaluates to the value; the parser turns calls into
/// assignment nodes, so this only runs for calls built by hand.
fn set_var(args: &[Value], _pos: usize) -> EvalResult<Value> {
    Ok(args[1].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let mut seen = HashSet::new();
        for name in function_names() {
            assert!(seen.insert(name), "duplicate function {name}");
        }
    }

    #[test]
    fn test_every_name_resolves_to_its_own_entry() {
        for f in FUNCTIONS {
            let found = lookup(f.name).unwrap();
            assert_eq!(found.name, f.name);
            assert_eq!(found.arity, f.arity);
        }
    }

    #[test]
    fn test_table_matches_documented_function_set() {
        let documented: HashSet<&str> = [
            "lcase", "ucase", "length", "string", "int", "float", "bool", "norm", "ccnorm",
            "ccnorm_contains_any", "ccnorm_contains_all", "specialratio", "rmspecials",
            "rmdoubles", "rmwhitespace", "count", "rcount", "get_matches", "ip_in_range",
            "ip_in_ranges", "contains_any", "contains_all", "equals_to_any", "substr",
            "strlen", "strpos", "str_replace", "str_replace_regexp", "rescape", "set",
            "set_var", "sanitize",
        ]
        .into_iter()
        .collect();
        let table: HashSet<&str> = function_names().collect();
        assert_eq!(table, documented);
        for setter in SETTERS {
            assert!(table.contains(setter));
        }
    }

    #[test]
    fn test_arity_contracts_are_sane() {
        for f in FUNCTIONS {
            assert!(f.arity.min >= 1, "{} takes no arguments", f.name);
            if let Some(max) = f.arity.max {
                assert!(max >= f.arity.min, "{}", f.name);
            }
        }
    }

    #[test]
    fn test_every_handler_runs_with_minimal_args() {
        for f in FUNCTIONS {
            let args: Vec<Value> = match f.name {
                "ip_in_range" | "ip_in_ranges" => {
                    vec![Value::from("1.2.3.4"); f.arity.min]
                }
                _ => vec![Value::from("a"); f.arity.min],
            };
            assert!((f.handler)(&args, 0).is_ok(), "{} failed", f.name);
        }
    }

    #[test]
    fn test_check_arity_errors() {
        let lcase = lookup("lcase").unwrap();
        assert_eq!(lcase.check_arity(0, 3).unwrap_err().id, ExceptionId::NoParams);
        assert_eq!(lcase.check_arity(2, 3).unwrap_err().id, ExceptionId::TooManyArgs);
        assert!(lcase.check_arity(1, 3).is_ok());

        let substr = lookup("substr").unwrap();
        let err = substr.check_arity(1, 0).unwrap_err();
        assert_eq!(err.id, ExceptionId::NotEnoughArgs);
        assert_eq!(err.params, vec!["substr", "2", "1"]);
        assert_eq!(substr.check_arity(0, 0).unwrap_err().id, ExceptionId::NotEnoughArgs);

        let any = lookup("contains_any").unwrap();
        assert!(any.is_variadic());
        assert!(any.check_arity(20, 0).is_ok());
    }

    #[test]
    fn test_unknown_name() {
        assert!(lookup("lcasee").is_none());
        assert!(!is_function("timestamp"));
    }
}
