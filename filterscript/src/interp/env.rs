//! Variable environment
//!
//! One flat namespace per evaluation. User variables are created by
//! assignment and live until the evaluation ends; builtin variables come
//! from a [`VariableSupplier`] on first use and are memoised.

use super::Value;
use std::collections::HashMap;

/// Host-side source of builtin variable values
pub trait VariableSupplier {
    /// `None` when the host has no value for `name`. May return
    /// [`Value::Undefined`] for values deliberately not computed.
    fn get(&self, name: &str) -> Option<Value>;
}

impl VariableSupplier for HashMap<String, Value> {
    fn get(&self, name: &str) -> Option<Value> {
        HashMap::get(self, name).cloned()
    }
}

impl<F> VariableSupplier for F
where
    F: Fn(&str) -> Option<Value>,
{
    fn get(&self, name: &str) -> Option<Value> {
        self(name)
    }
}

/// Answers `Undefined` for every builtin; used by syntax-only checking
#[derive(Debug, Clone, Copy, Default)]
pub struct UndefinedSupplier;

impl VariableSupplier for UndefinedSupplier {
    fn get(&self, _name: &str) -> Option<Value> {
        Some(Value::Undefined)
    }
}

/// Variables visible to one evaluation
#[derive(Default)]
pub struct VarEnv {
    user: HashMap<String, Value>,
    builtins: HashMap<String, Value>,
    supplier: Option<Box<dyn VariableSupplier>>,
}

impl VarEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_supplier(supplier: impl VariableSupplier + 'static) -> Self {
        VarEnv {
            supplier: Some(Box::new(supplier)),
            ..Self::default()
        }
    }

    /// Provide a builtin value up front, bypassing the supplier
    pub fn set_builtin(&mut self, name: &str, value: impl Into<Value>) {
        self.builtins.insert(name.to_lowercase(), value.into());
    }

    /// Builtin value, asking the supplier once and memoising the answer
    pub fn builtin(&mut self, name: &str) -> Option<Value> {
        if let Some(value) = self.builtins.get(name) {
            return Some(value.clone());
        }
        let value = self.supplier.as_ref()?.get(name)?;
        self.builtins.insert(name.to_string(), value.clone());
        Some(value)
    }

    pub fn user_var(&self, name: &str) -> Option<&Value> {
        self.user.get(name)
    }

    pub fn has_user_var(&self, name: &str) -> bool {
        self.user.contains_key(name)
    }

    pub fn set_user_var(&mut self, name: &str, value: Value) {
        self.user.insert(name.to_string(), value);
    }

    /// Names of user variables, sorted
    pub fn user_var_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.user.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for VarEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VarEnv")
            .field("user", &self.user)
            .field("builtins", &self.builtins)
            .field("has_supplier", &self.supplier.is_some())
            .finish()
    }
}
