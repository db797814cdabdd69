//! Expression evaluator
//!
//! Walks the AST against a [`VarEnv`]. With short-circuiting on (normal
//! evaluation) the untaken side of `&`, `|` and conditionals is never run;
//! instead every variable it would have assigned becomes `Undefined`. With
//! short-circuiting off (syntax checking) every branch runs so latent errors
//! surface.

use super::env::VarEnv;
use super::error::{EvalError, EvalResult};
use super::value::{self, Value};
use crate::ast::{BinOp, Expr, Literal, Rule, Spanned, UnOp};
use crate::builtins;
use crate::error::{ExceptionId, InternalError, UserVisibleWarning, WarningId};
use crate::keywords;
use crate::logger::{Logger, TracingLogger};
use crate::status::{RuleCheckerStatus, RuleException};
use std::cmp::Ordering;

/// Stack growth parameters for deeply nested rules
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

/// Evaluate a rule with short-circuiting and the default logger.
/// User errors end up in the status; only interpreter bugs are `Err`.
pub fn evaluate(
    rule: &Rule,
    vars: &mut VarEnv,
    cost_limit: Option<u32>,
) -> Result<RuleCheckerStatus, InternalError> {
    let mut evaluator = Evaluator::new(vars).with_condition_limit(cost_limit);
    let outcome = evaluator.run(rule);
    evaluator.finish(outcome)
}

/// The evaluator
pub struct Evaluator<'a> {
    env: &'a mut VarEnv,
    logger: &'a dyn Logger,
    /// Skip untaken branches
    allow_short: bool,
    limit: Option<u32>,
    conditions: u32,
    warnings: Vec<UserVisibleWarning>,
}

impl<'a> Evaluator<'a> {
    pub fn new(env: &'a mut VarEnv) -> Self {
        Evaluator {
            env,
            logger: &TracingLogger,
            allow_short: true,
            limit: None,
            conditions: 0,
            warnings: Vec::new(),
        }
    }

    pub fn with_logger(mut self, logger: &'a dyn Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_condition_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }

    pub fn short_circuit(mut self, allow: bool) -> Self {
        self.allow_short = allow;
        self
    }

    pub fn conditions(&self) -> u32 {
        self.conditions
    }

    pub fn warnings(&self) -> &[UserVisibleWarning] {
        &self.warnings
    }

    /// Evaluate the whole rule. An empty rule is `Null`.
    pub fn run(&mut self, rule: &Rule) -> EvalResult<Value> {
        match &rule.body {
            Some(body) => self.eval(body),
            None => Ok(Value::Null),
        }
    }

    /// Fold an outcome into a status. `Undefined` counts as no match.
    pub fn finish(self, outcome: EvalResult<Value>) -> Result<RuleCheckerStatus, InternalError> {
        let conds = self.conditions;
        let mut status = match outcome {
            Ok(value) => RuleCheckerStatus::matched(!value.is_undefined() && value.to_bool()?, conds),
            Err(EvalError::UserVisible(e)) => RuleCheckerStatus::failed(RuleException::User(e), conds),
            Err(EvalError::ConditionLimit { limit }) => {
                RuleCheckerStatus::failed(RuleException::ConditionLimit { limit }, conds)
            }
            Err(EvalError::Internal(e)) => return Err(e),
        };
        status.warnings = self.warnings;
        Ok(status)
    }

    /// Evaluate an expression with automatic stack growth for deep nesting
    pub fn eval(&mut self, expr: &Spanned<Expr>) -> EvalResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(expr))
    }

    fn eval_inner(&mut self, expr: &Spanned<Expr>) -> EvalResult<Value> {
        let pos = expr.span.start;
        match &expr.node {
            Expr::Literal(lit) => Ok(literal(lit)),

            Expr::Var(name) => self.read_var(name, pos),

            Expr::Unary { op, expr: operand } => {
                let v = self.eval(operand)?;
                if v.has_undefined() {
                    return Ok(Value::Undefined);
                }
                Ok(match op {
                    UnOp::Neg => value::neg(&v)?,
                    UnOp::Plus => v.to_number()?.into_value(),
                    UnOp::Not => Value::Bool(!v.to_bool()?),
                })
            }

            Expr::Binary { left, op, right } => self.eval_binary(left, *op, right, pos),

            Expr::Call { func, args } => self.call(func, args, pos),

            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::Array(values))
            }

            Expr::Index { base, index } => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                if base.has_undefined() || index.has_undefined() {
                    return Ok(Value::Undefined);
                }
                let Value::Array(items) = base else {
                    return Err(EvalError::at(ExceptionId::NotArray, pos));
                };
                let i = checked_index(&index, items.len(), pos)?;
                Ok(items[i].clone())
            }

            Expr::Assign { name, value } => {
                self.check_writable(name, pos)?;
                let v = self.eval(value)?;
                self.env.set_user_var(name, v.clone());
                Ok(v)
            }

            Expr::Append { name, value } => {
                self.check_writable(name, pos)?;
                self.require_user_var(name, pos)?;
                let v = self.eval(value)?;
                match self.env.user_var(name).cloned().unwrap_or(Value::Undefined) {
                    Value::Undefined => {}
                    Value::Array(mut items) => {
                        items.push(v.clone());
                        self.env.set_user_var(name, Value::Array(items));
                    }
                    _ => return Err(EvalError::user(ExceptionId::NotArray, pos, vec![name.clone()])),
                }
                Ok(v)
            }

            Expr::IndexAssign { name, index, value } => {
                self.check_writable(name, pos)?;
                self.require_user_var(name, pos)?;
                let index = self.eval(index)?;
                let v = self.eval(value)?;
                if index.has_undefined() {
                    // An unknown slot poisons the whole array
                    self.env.set_user_var(name, Value::Undefined);
                    return Ok(v);
                }
                match self.env.user_var(name).cloned().unwrap_or(Value::Undefined) {
                    Value::Undefined => {}
                    Value::Array(mut items) => {
                        let i = checked_index(&index, items.len(), pos)?;
                        items[i] = v.clone();
                        self.env.set_user_var(name, Value::Array(items));
                    }
                    _ => return Err(EvalError::user(ExceptionId::NotArray, pos, vec![name.clone()])),
                }
                Ok(v)
            }

            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => self.eval_if(cond, then_branch, else_branch.as_deref()),

            Expr::Block(stmts) => {
                let mut last = Value::Null;
                for stmt in stmts {
                    last = self.eval(stmt)?;
                }
                Ok(last)
            }

            Expr::Group(inner) => self.eval(inner),
        }
    }

    fn eval_if(
        &mut self,
        cond: &Spanned<Expr>,
        then_branch: &Spanned<Expr>,
        else_branch: Option<&Spanned<Expr>>,
    ) -> EvalResult<Value> {
        let cond = self.eval(cond)?;

        if !self.allow_short {
            let then_value = self.eval(then_branch)?;
            let else_value = match else_branch {
                Some(e) => self.eval(e)?,
                None => Value::Null,
            };
            return Ok(if cond.is_undefined() {
                Value::Undefined
            } else if cond.to_bool()? {
                then_value
            } else {
                else_value
            });
        }

        if cond.is_undefined() {
            self.discard(then_branch);
            if let Some(e) = else_branch {
                self.discard(e);
            }
            return Ok(Value::Undefined);
        }

        if cond.to_bool()? {
            let v = self.eval(then_branch)?;
            if let Some(e) = else_branch {
                self.discard(e);
            }
            Ok(v)
        } else {
            self.discard(then_branch);
            match else_branch {
                Some(e) => self.eval(e),
                None => Ok(Value::Null),
            }
        }
    }

    fn eval_binary(
        &mut self,
        left: &Spanned<Expr>,
        op: BinOp,
        right: &Spanned<Expr>,
        pos: usize,
    ) -> EvalResult<Value> {
        match op {
            BinOp::And | BinOp::Or => {
                let l = truthy(&self.eval(left)?)?;
                // false & x, true | x
                let decided = if op == BinOp::And { !l } else { l };
                if decided && self.allow_short {
                    self.discard(right);
                    return Ok(Value::Bool(l));
                }
                let r = truthy(&self.eval(right)?)?;
                Ok(Value::Bool(if op == BinOp::And { l && r } else { l || r }))
            }

            BinOp::Xor => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                if l.has_undefined() || r.has_undefined() {
                    return Ok(Value::Undefined);
                }
                Ok(Value::Bool(l.to_bool()? ^ r.to_bool()?))
            }

            BinOp::Div | BinOp::Mod => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                // The divisor is checked before Undefined can hide the error
                if !r.has_undefined() {
                    let zero = if op == BinOp::Div {
                        r.to_float()? == 0.0
                    } else {
                        r.to_int()? == 0
                    };
                    if zero {
                        return Err(EvalError::at(ExceptionId::DivideByZero, right.span.start));
                    }
                }
                if l.has_undefined() || r.has_undefined() {
                    return Ok(Value::Undefined);
                }
                Ok(if op == BinOp::Div {
                    value::div(&l, &r)?
                } else {
                    value::modulo(&l, &r)?
                })
            }

            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Pow => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                if l.has_undefined() || r.has_undefined() {
                    return Ok(Value::Undefined);
                }
                Ok(match op {
                    BinOp::Add => value::add(&l, &r)?,
                    BinOp::Sub => value::sub(&l, &r)?,
                    BinOp::Mul => value::mul(&l, &r)?,
                    _ => value::pow(&l, &r)?,
                })
            }

            _ => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                self.count_condition()?;
                if l.has_undefined() || r.has_undefined() {
                    return Ok(Value::Undefined);
                }
                let matched = if op.compare_family().is_some() {
                    compare(op, &l, &r)?
                } else {
                    self.keyword_op(op, &l, &r, right.span.start)?
                };
                Ok(Value::Bool(matched))
            }
        }
    }

    fn keyword_op(&mut self, op: BinOp, l: &Value, r: &Value, pos: usize) -> EvalResult<bool> {
        match op {
            BinOp::In => builtins::contains(r, l),
            BinOp::Contains => builtins::contains(l, r),
            BinOp::Like => builtins::glob_matches(l, r, pos),
            BinOp::Rlike | BinOp::Irlike => {
                if r.to_str()?.is_empty() {
                    self.warnings.push(UserVisibleWarning::new(
                        WarningId::MatchEmptyRegex,
                        pos,
                        Vec::new(),
                    ));
                }
                builtins::regex_matches(l, r, op == BinOp::Irlike, pos)
            }
            other => Err(InternalError::Invariant(format!("`{other}` is not a keyword operator")).into()),
        }
    }

    fn call(&mut self, func: &str, args: &[Spanned<Expr>], pos: usize) -> EvalResult<Value> {
        let function = builtins::lookup(func).ok_or_else(|| {
            EvalError::user(ExceptionId::UnknownFunction, pos, vec![func.to_string()])
        })?;
        function.check_arity(args.len(), pos)?;

        let values = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<EvalResult<Vec<_>>>()?;
        self.count_condition()?;
        if values.iter().any(Value::has_undefined) {
            return Ok(Value::Undefined);
        }
        (function.handler)(&values, pos)
    }

    fn read_var(&mut self, name: &str, pos: usize) -> EvalResult<Value> {
        if let Some(v) = self.env.user_var(name) {
            return Ok(v.clone());
        }
        if keywords::is_disabled_var(name) {
            return Err(EvalError::user(ExceptionId::DisabledVar, pos, vec![name.to_string()]));
        }
        if let Some(current) = keywords::deprecated_alias(name) {
            self.logger.debug(&format!(
                "deprecated variable `{name}` used at char {pos}, use `{current}` instead"
            ));
            return Ok(self.env.builtin(current).unwrap_or(Value::Null));
        }
        if keywords::is_builtin_var(name) {
            return Ok(self.env.builtin(name).unwrap_or(Value::Null));
        }
        let id = if builtins::is_function(name) {
            ExceptionId::UseBuiltin
        } else {
            ExceptionId::UnrecognisedVar
        };
        Err(EvalError::user(id, pos, vec![name.to_string()]))
    }

    fn check_writable(&self, name: &str, pos: usize) -> EvalResult<()> {
        if keywords::is_builtin_var(name) || builtins::is_function(name) {
            return Err(EvalError::user(ExceptionId::OverrideBuiltin, pos, vec![name.to_string()]));
        }
        Ok(())
    }

    fn require_user_var(&self, name: &str, pos: usize) -> EvalResult<()> {
        if self.env.has_user_var(name) {
            Ok(())
        } else {
            Err(EvalError::user(ExceptionId::UnrecognisedVar, pos, vec![name.to_string()]))
        }
    }

    /// Mark everything a skipped branch would have assigned as `Undefined`
    fn discard(&mut self, expr: &Spanned<Expr>) {
        let mut pending = vec![expr];
        while let Some(e) = pending.pop() {
            if let Some(name) = e.node.assigned_name() {
                if !keywords::is_builtin_var(name) && !builtins::is_function(name) {
                    self.env.set_user_var(name, Value::Undefined);
                }
            }
            pending.extend(e.node.children());
        }
    }

    fn count_condition(&mut self) -> EvalResult<()> {
        self.conditions += 1;
        match self.limit {
            Some(limit) if self.conditions > limit => {
                self.logger.warn(&format!("condition limit of {limit} reached"));
                Err(EvalError::ConditionLimit { limit })
            }
            _ => Ok(()),
        }
    }
}

fn literal(lit: &Literal) -> Value {
    match lit {
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(f) => Value::Float(*f),
        Literal::Str(s) => Value::Str(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

/// Boolean view for `&` and `|`; `Undefined` counts as false
fn truthy(v: &Value) -> EvalResult<bool> {
    if v.is_undefined() {
        return Ok(false);
    }
    Ok(v.to_bool()?)
}

fn compare(op: BinOp, l: &Value, r: &Value) -> EvalResult<bool> {
    Ok(match op {
        BinOp::Eq => l.loose_equals(r)?,
        BinOp::Ne => !l.loose_equals(r)?,
        BinOp::StrictEq => l.strict_equals(r)?,
        BinOp::StrictNe => !l.strict_equals(r)?,
        BinOp::Lt => l.compare(r)? == Some(Ordering::Less),
        BinOp::Gt => l.compare(r)? == Some(Ordering::Greater),
        BinOp::Le => matches!(l.compare(r)?, Some(Ordering::Less | Ordering::Equal)),
        BinOp::Ge => matches!(l.compare(r)?, Some(Ordering::Greater | Ordering::Equal)),
        other => {
            return Err(InternalError::Invariant(format!("`{other}` is not a comparison")).into());
        }
    })
}

fn checked_index(index: &Value, len: usize, pos: usize) -> EvalResult<usize> {
    let i = index.to_int()?;
    if i < 0 {
        return Err(EvalError::user(ExceptionId::NegativeIndex, pos, vec![i.to_string()]));
    }
    match usize::try_from(i) {
        Ok(i) if i < len => Ok(i),
        _ => Err(EvalError::user(
            ExceptionId::OutOfBounds,
            pos,
            vec![i.to_string(), len.to_string()],
        )),
    }
}
